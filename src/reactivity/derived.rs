//! `Derived<T>` — a cached computation that behaves as a signal to readers
//! and as an effect toward its own dependencies.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::runtime::{self, next_id, run_tracked, DepSource, Subscriber};

struct DerivedInner<T> {
    id: u64,
    compute: RefCell<Box<dyn FnMut() -> T>>,
    cached: RefCell<Option<T>>,
    deps: RefCell<Vec<Rc<dyn DepSource>>>,
    dirty: Cell<bool>,
    subscribers: RefCell<Vec<(u64, std::rc::Weak<dyn Subscriber>)>>,
}

impl<T> DepSource for DerivedInner<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn unsubscribe(&self, subscriber_id: u64) {
        self.subscribers.borrow_mut().retain(|(id, _)| *id != subscriber_id);
    }
}

impl<T: 'static> Subscriber for DerivedInner<T> {
    fn id(&self) -> u64 {
        self.id
    }

    /// An upstream dependency changed. Eagerly mark dirty and propagate to
    /// our own subscribers — but only the first time; once dirty, further
    /// upstream changes this flush are no-ops, which is what keeps a
    /// diamond dependency's derived from being marked (and later recomputed)
    /// more than the single time its value actually needs refreshing.
    fn notify(self: Rc<Self>) {
        if self.dirty.replace(true) {
            return;
        }
        let subs: Vec<Rc<dyn Subscriber>> = {
            let mut list = self.subscribers.borrow_mut();
            list.retain(|(_, weak)| weak.strong_count() > 0);
            list.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };
        for sub in subs {
            sub.notify();
        }
    }
}

/// A lazily-recomputed, cached derived value. First read after invalidation
/// runs the computation and captures its own dependency set; subsequent
/// reads return the cached value until a dependency changes again.
pub struct Derived<T> {
    inner: Rc<DerivedInner<T>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Clone + 'static> Derived<T> {
    pub fn new(compute: impl FnMut() -> T + 'static) -> Self {
        Self {
            inner: Rc::new(DerivedInner {
                id: next_id(),
                compute: RefCell::new(Box::new(compute)),
                cached: RefCell::new(None),
                deps: RefCell::new(Vec::new()),
                dirty: Cell::new(true),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Read the value, recomputing first if dirty. Records a dependency on
    /// this derived if called inside an active effect or outer derived.
    pub fn get(&self) -> T {
        self.recompute_if_dirty();
        self.track();
        self.inner.cached.borrow().clone().expect("computed above")
    }

    /// Read without tracking as a dependency on the caller's side (the
    /// derived still recomputes if dirty).
    pub fn get_untracked(&self) -> T {
        self.recompute_if_dirty();
        self.inner.cached.borrow().clone().expect("computed above")
    }

    fn track(&self) {
        if let Some(subscriber) = runtime::active_subscriber() {
            let already = self
                .inner
                .subscribers
                .borrow()
                .iter()
                .any(|(id, _)| *id == subscriber.id());
            if !already {
                self.inner
                    .subscribers
                    .borrow_mut()
                    .push((subscriber.id(), Rc::downgrade(&subscriber)));
            }
            runtime::record_dependency(self.inner.clone());
        }
    }

    fn recompute_if_dirty(&self) {
        if !self.inner.dirty.get() {
            return;
        }
        let self_as_subscriber: Rc<dyn Subscriber> = self.inner.clone();
        let inner = &self.inner;
        let (value, new_deps) = run_tracked(self_as_subscriber, || (inner.compute.borrow_mut())());
        let old_deps = self.inner.deps.replace(new_deps.clone());
        for old in &old_deps {
            if !new_deps.iter().any(|d| d.id() == old.id()) {
                old.unsubscribe(self.inner.id);
            }
        }
        *self.inner.cached.borrow_mut() = Some(value);
        self.inner.dirty.set(false);
    }
}

impl<T: Clone + std::fmt::Debug + 'static> std::fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Derived")
            .field("id", &self.inner.id)
            .field("dirty", &self.inner.dirty.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactivity::Signal;
    use std::cell::Cell as StdCell;

    #[test]
    fn memoizes_until_dependency_changes() {
        let count = Signal::new(2);
        let count2 = count.clone();
        let calls = Rc::new(StdCell::new(0));
        let c = calls.clone();
        let squared = Derived::new(move || {
            c.set(c.get() + 1);
            count2.get() * count2.get()
        });
        assert_eq!(squared.get(), 4);
        assert_eq!(squared.get(), 4);
        assert_eq!(calls.get(), 1, "second read must hit cache");
        count.set(3);
        assert_eq!(squared.get(), 9);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn diamond_dependency_runs_once_per_flush() {
        let a = Signal::new(1);
        let (a_b, a_c) = (a.clone(), a.clone());
        let b = Derived::new(move || a_b.get() + 1);
        let c = Derived::new(move || a_c.get() * 2);
        let (b_d, c_d) = (b.clone(), c.clone());
        let d_calls = Rc::new(StdCell::new(0));
        let dc = d_calls.clone();
        let d = Derived::new(move || {
            dc.set(dc.get() + 1);
            b_d.get() + c_d.get()
        });

        assert_eq!(d.get(), 1 + 1 + 1 * 2);
        a.set(3);
        assert_eq!(d.get(), 10);
        assert_eq!(d_calls.get(), 2, "d recomputed exactly once for this read after the change");
    }
}
