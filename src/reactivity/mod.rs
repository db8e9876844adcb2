//! Fine-grained reactivity: signals, derived values, and effects with
//! automatic dependency tracking and glitch-free propagation.
//!
//! A single `Signal<T>` handle (no separate read/write halves), backed by a
//! thread-local active-subscriber slot and a microtask-style flush queue.
//! `Derived` adds lazy dirty propagation on top, with idempotent disposal
//! and a depth-capped cycle guard.

mod derived;
mod effect;
mod runtime;
mod signal;

pub use derived::Derived;
pub use effect::{effect, Effect, EffectHandle};
pub use runtime::{batch, configure, current_depth_cap, untrack};
pub use signal::Signal;

pub(crate) use runtime::{next_id, DepSource, Subscriber};
