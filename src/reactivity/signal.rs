//! `Signal<T>` — the atomic reactive value cell.

use std::cell::RefCell;
use std::rc::Rc;

use super::runtime::{self, next_id, DepSource, Subscriber};
use crate::config::EqualityMode;

type EqFn<T> = Box<dyn Fn(&T, &T) -> bool>;

struct SignalInner<T> {
    id: u64,
    value: RefCell<T>,
    subscribers: RefCell<Vec<(u64, std::rc::Weak<dyn Subscriber>)>>,
    eq: EqFn<T>,
}

impl<T> DepSource for SignalInner<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn unsubscribe(&self, subscriber_id: u64) {
        self.subscribers.borrow_mut().retain(|(id, _)| *id != subscriber_id);
    }
}

/// A reactive value cell. `get` records the active subscriber (if any) as a
/// dependent; `set` notifies subscribers, in insertion order, when the new
/// value differs from the current one.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Create a signal using the active session's configured equality rule:
    /// `Value` compares by `PartialEq`; `Identity` never short-circuits a
    /// write, since an owned `T` has no reference identity to compare by.
    pub fn new(initial: T) -> Self {
        match Self::equality_mode() {
            EqualityMode::Value => Self::with_equality(initial, |a, b| a == b),
            EqualityMode::Identity => Self::with_equality(initial, |_, _| false),
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Create a signal with a custom equality rule (e.g. identity
    /// comparison for non-scalar payloads, matching `EqualityMode::Identity`).
    pub fn with_equality(initial: T, eq: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id: next_id(),
                value: RefCell::new(initial),
                subscribers: RefCell::new(Vec::new()),
                eq: Box::new(eq),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Read the current value, recording a dependency if called inside an
    /// active effect or derived computation.
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Read without tracking as a dependency.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Record a dependency on this signal without reading the value.
    pub fn track(&self) {
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

    /// Replace the current value. A no-op (no notification) if the new
    /// value is equal to the current one under this signal's equality rule.
    pub fn set(&self, value: T) {
        let changed = {
            let mut current = self.inner.value.borrow_mut();
            let equal = (self.inner.eq)(&current, &value);
            if !equal {
                *current = value;
            }
            !equal
        };
        if changed {
            self.notify();
        }
    }

    /// Update the value in place via `f`, then notify if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get_untracked();
        f(&mut value);
        self.set(value);
    }

    fn notify(&self) {
        // Snapshot subscribers first: notifying one can (re)subscribe or
        // unsubscribe others, and we must not alias the RefCell borrow
        // across that.
        let subs: Vec<Rc<dyn Subscriber>> = {
            let mut list = self.inner.subscribers.borrow_mut();
            list.retain(|(_, weak)| weak.strong_count() > 0);
            list.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };
        for sub in subs {
            sub.notify();
        }
    }

    /// Current equality mode in effect is process-global config for
    /// default scalar signals; see `with_equality` for identity-style
    /// overrides. Exposed for callers building generic signal factories.
    pub fn equality_mode() -> EqualityMode {
        runtime::equality_mode()
    }
}

impl<T: Clone + std::fmt::Debug + 'static> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &self.get_untracked())
            .finish()
    }
}
