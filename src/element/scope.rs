//! The ambient "current parent" stack that lets element construction
//! auto-mount to whatever scope is open, without callers threading a parent
//! handle through every constructor.

use std::cell::RefCell;

use super::node::Element;
use crate::error::LoomError;

thread_local! {
    static SCOPE_STACK: RefCell<Vec<Element>> = RefCell::new(Vec::new());
}

pub(crate) fn current_parent() -> Option<Element> {
    SCOPE_STACK.with(|s| s.borrow().last().cloned())
}

/// A token proving its holder pushed the top of the scope stack. Exiting
/// out of order (the stack's top isn't this token's element when `exit` is
/// called) is a programmer error — `LoomError::DetachedScope`.
pub struct ScopeGuard {
    depth: usize,
    closed: bool,
}

pub(crate) fn enter(element: Element) -> ScopeGuard {
    let depth = SCOPE_STACK.with(|s| {
        let mut s = s.borrow_mut();
        s.push(element);
        s.len()
    });
    ScopeGuard { depth, closed: false }
}

impl ScopeGuard {
    /// Close the scope. Must be called at exactly the depth it was opened
    /// at — nested scopes must close innermost-first.
    pub fn exit(mut self) -> Result<(), LoomError> {
        self.close()
    }

    fn close(&mut self) -> Result<(), LoomError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let ok = SCOPE_STACK.with(|s| {
            let mut s = s.borrow_mut();
            if s.len() == self.depth {
                s.pop();
                true
            } else {
                // Out of order: still remove this guard's own slot so the
                // stack doesn't carry a dangling entry forever, but report
                // the mismatch.
                if self.depth >= 1 && self.depth <= s.len() {
                    s.remove(self.depth - 1);
                }
                false
            }
        });
        if ok {
            Ok(())
        } else {
            Err(LoomError::DetachedScope)
        }
    }
}

impl Drop for ScopeGuard {
    /// A guard dropped without an explicit `exit()` (e.g. a panic unwinding
    /// through it) still needs to vacate its stack slot so later scopes
    /// don't inherit a stale parent.
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::node::Element;

    #[test]
    fn nested_scopes_must_close_innermost_first() {
        let a = Element::new("div").unwrap();
        let b = Element::new("div").unwrap();
        let guard_a = enter(a);
        let guard_b = enter(b);
        assert!(guard_a.exit().is_err(), "closing the outer scope first is detached");
        let _ = guard_b;
    }

    #[test]
    fn well_nested_scopes_close_cleanly() {
        let a = Element::new("div").unwrap();
        let b = Element::new("div").unwrap();
        let guard_a = enter(a);
        let guard_b = enter(b);
        assert!(guard_b.exit().is_ok());
        assert!(guard_a.exit().is_ok());
    }
}
