//! Handler registry: `(target_id, event name)` to handler closure. A full
//! rerender clears it and re-registers the whole tree; a partial rerender
//! unregisters only the replaced subtree's ids before re-registering them.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::error::LoomError;
use crate::event::EventValue;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), String>>>>;
pub type Handler = Box<dyn FnMut(Option<EventValue>, Option<String>) -> HandlerFuture>;

/// Wrap a synchronous handler body as a `Handler`, for the common case
/// where nothing needs to be awaited.
pub fn sync_handler(mut body: impl FnMut(Option<EventValue>, Option<String>) + 'static) -> Handler {
    Box::new(move |value, key| {
        body(value, key);
        Box::pin(async { Ok(()) })
    })
}

#[derive(Default)]
pub struct Registry {
    handlers: HashMap<(u64, String), Handler>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target_id: u64, event: impl Into<String>, handler: Handler) {
        self.handlers.insert((target_id, event.into()), handler);
    }

    /// Remove every handler belonging to one of `target_ids`, regardless of
    /// event name. Used before re-registering a replaced subtree.
    pub fn unregister_subtree(&mut self, target_ids: &[u64]) {
        self.handlers.retain(|(id, _), _| !target_ids.contains(id));
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Look up and invoke the handler for `(target_id, event)`. The
    /// distinction between a target with no such event and a target with no
    /// registrations at all surfaces as two different error kinds.
    pub fn dispatch(
        &mut self,
        target_id: u64,
        event: &str,
        value: Option<EventValue>,
        key: Option<String>,
    ) -> Result<HandlerFuture, LoomError> {
        if let Some(handler) = self.handlers.get_mut(&(target_id, event.to_string())) {
            return Ok(handler(value, key));
        }
        if self.handlers.keys().any(|(id, _)| *id == target_id) {
            Err(LoomError::UnknownHandler(target_id, event.to_string()))
        } else {
            Err(LoomError::UnknownTarget(target_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_runs_the_registered_handler() {
        let mut registry = Registry::new();
        let seen = std::rc::Rc::new(std::cell::Cell::new(false));
        let seen2 = seen.clone();
        registry.register(1, "click", sync_handler(move |_, _| seen2.set(true)));

        let fut = registry.dispatch(1, "click", None, None).unwrap();
        block_on_first_poll(fut).unwrap();
        assert!(seen.get());
    }

    #[test]
    fn dispatch_on_unregistered_target_is_unknown_target() {
        let mut registry = Registry::new();
        let err = registry.dispatch(99, "click", None, None).unwrap_err();
        assert!(matches!(err, LoomError::UnknownTarget(99)));
    }

    #[test]
    fn dispatch_on_registered_target_missing_event_is_unknown_handler() {
        let mut registry = Registry::new();
        registry.register(1, "click", sync_handler(|_, _| {}));
        let err = registry.dispatch(1, "change", None, None).unwrap_err();
        assert!(matches!(err, LoomError::UnknownHandler(1, ref e) if e == "change"));
    }

    #[test]
    fn unregister_subtree_drops_only_named_ids() {
        let mut registry = Registry::new();
        registry.register(1, "click", sync_handler(|_, _| {}));
        registry.register(2, "click", sync_handler(|_, _| {}));
        registry.unregister_subtree(&[1]);
        assert_eq!(registry.len(), 1);
        assert!(registry.dispatch(2, "click", None, None).is_ok());
    }

    /// Minimal single-poll executor: every `HandlerFuture` in this crate
    /// (sync handlers, the in-memory transport) resolves on its first poll,
    /// so no real async runtime is needed in these unit tests.
    fn block_on_first_poll<F: Future>(mut fut: F) -> F::Output {
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        let waker = unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) };
        let mut cx = Context::from_waker(&waker);
        let mut fut = unsafe { Pin::new_unchecked(&mut fut) };
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(v) => v,
            Poll::Pending => panic!("handler future did not resolve on first poll"),
        }
    }
}
