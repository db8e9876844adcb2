//! `Effect` — a thunk that re-runs when any signal it reads changes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::runtime::{next_id, run_tracked, schedule, DepSource, ScheduledRun, Subscriber};

struct EffectInner {
    id: u64,
    thunk: RefCell<Box<dyn FnMut()>>,
    deps: RefCell<Vec<Rc<dyn DepSource>>>,
    dirty: Cell<bool>,
    scheduled: Cell<bool>,
    disposed: Cell<bool>,
}

impl EffectInner {
    fn rerun(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        let self_as_subscriber: Rc<dyn Subscriber> = self.clone();
        let (_, new_deps) = run_tracked(self_as_subscriber, || {
            (self.thunk.borrow_mut())();
        });
        let old_deps = self.deps.replace(new_deps.clone());
        for old in &old_deps {
            if !new_deps.iter().any(|d| d.id() == old.id()) {
                old.unsubscribe(self.id);
            }
        }
    }

    fn dispose_inner(&self) {
        if self.disposed.replace(true) {
            return;
        }
        for dep in self.deps.borrow_mut().drain(..) {
            dep.unsubscribe(self.id);
        }
    }
}

impl Subscriber for EffectInner {
    fn id(&self) -> u64 {
        self.id
    }

    fn notify(self: Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        self.dirty.set(true);
        if !self.scheduled.replace(true) {
            schedule(self.clone() as Rc<dyn ScheduledRun>);
        }
    }
}

impl ScheduledRun for EffectInner {
    fn id(&self) -> u64 {
        self.id
    }

    fn run(self: Rc<Self>) {
        self.scheduled.set(false);
        if self.disposed.get() {
            return;
        }
        if self.dirty.replace(false) {
            self.rerun();
        }
    }
}

/// A live effect handle. Runs its thunk immediately to capture initial
/// dependencies; reruns on a scheduler flush whenever a tracked signal
/// changes.
pub struct Effect {
    inner: Rc<EffectInner>,
}

/// An opaque handle that can dispose its effect; returned in place of
/// `Effect` when the caller only needs the ability to stop it.
pub type EffectHandle = Box<dyn FnOnce()>;

impl Effect {
    /// Create and immediately run an effect.
    pub fn new(thunk: impl FnMut() + 'static) -> Self {
        let inner = Rc::new(EffectInner {
            id: next_id(),
            thunk: RefCell::new(Box::new(thunk)),
            deps: RefCell::new(Vec::new()),
            dirty: Cell::new(false),
            scheduled: Cell::new(false),
            disposed: Cell::new(false),
        });
        inner.rerun();
        Effect { inner }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Disposal is idempotent: unsubscribes from all current dependencies
    /// and tombstones the effect so later scheduler visits skip it.
    pub fn dispose(&self) {
        self.inner.dispose_inner();
    }

    /// Convert into a boxed dispose closure, for APIs that want a plain
    /// `Cleanup` handle rather than a typed `Effect`.
    pub fn into_handle(self) -> EffectHandle {
        Box::new(move || self.dispose())
    }
}

/// Convenience free function for creating an effect and immediately
/// discarding its typed handle in favor of a plain dispose closure.
pub fn effect(thunk: impl FnMut() + 'static) -> EffectHandle {
    Effect::new(thunk).into_handle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactivity::Signal;
    use std::cell::Cell as StdCell;

    #[test]
    fn effect_runs_immediately_and_on_change() {
        let s = Signal::new(0);
        let s2 = s.clone();
        let runs = Rc::new(StdCell::new(0));
        let r = runs.clone();
        let _eff = Effect::new(move || {
            s2.get();
            r.set(r.get() + 1);
        });
        assert_eq!(runs.get(), 1);
        s.set(1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn dispose_stops_future_reruns() {
        let s = Signal::new(0);
        let s2 = s.clone();
        let runs = Rc::new(StdCell::new(0));
        let r = runs.clone();
        let eff = Effect::new(move || {
            s2.get();
            r.set(r.get() + 1);
        });
        assert_eq!(runs.get(), 1);
        eff.dispose();
        s.set(1);
        assert_eq!(runs.get(), 1, "disposed effect must not rerun");
    }

    #[test]
    fn conditional_dependency_drops_stale_branch() {
        let flag = Signal::new(true);
        let x = Signal::new(1);
        let y = Signal::new(100);
        let (flag2, x2, y2) = (flag.clone(), x.clone(), y.clone());
        let runs = Rc::new(StdCell::new(0));
        let r = runs.clone();
        let _eff = Effect::new(move || {
            let _ = if flag2.get() { x2.get() } else { y2.get() };
            r.set(r.get() + 1);
        });
        assert_eq!(runs.get(), 1);
        flag.set(false);
        assert_eq!(runs.get(), 2);
        x.set(2);
        assert_eq!(runs.get(), 2, "x is no longer a tracked dependency");
        y.set(200);
        assert_eq!(runs.get(), 3);
    }
}
