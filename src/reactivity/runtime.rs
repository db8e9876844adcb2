//! Task-local reactive runtime: active-subscriber tracking slot and the
//! microtask-style effect scheduler.
//!
//! Tracking state lives in a `thread_local!` stack that nested tracked runs
//! push and pop, so it stays correct per-task without any process-wide
//! global.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::EngineConfig;
use crate::error::{LoomError, LoomResult};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Implemented by anything a signal read can depend on (`Signal`, `Derived`).
pub(crate) trait DepSource {
    fn id(&self) -> u64;
    fn unsubscribe(&self, subscriber_id: u64);
}

/// Implemented by anything that reacts to a source changing (`Effect`,
/// `Derived`).
pub(crate) trait Subscriber {
    fn id(&self) -> u64;
    /// A dependency changed. Mark dirty and, if this subscriber needs to
    /// actually run work (an effect), schedule it.
    fn notify(self: Rc<Self>);
}

struct TrackingFrame {
    subscriber: Rc<dyn Subscriber>,
    deps: RefCell<Vec<Rc<dyn DepSource>>>,
}

thread_local! {
    static ACTIVE: RefCell<Vec<TrackingFrame>> = RefCell::new(Vec::new());
    static QUEUE: RefCell<VecDeque<Rc<dyn ScheduledRun>>> = RefCell::new(VecDeque::new());
    static SCHEDULED_IDS: RefCell<HashSet<u64>> = RefCell::new(HashSet::new());
    static FLUSHING: Cell<bool> = const { Cell::new(false) };
    static BATCH_DEPTH: Cell<u32> = const { Cell::new(0) };
    static CONFIG: Cell<EngineConfig> = Cell::new(EngineConfig::default());
}

/// Anything the scheduler can run once per flush (effects).
pub(crate) trait ScheduledRun {
    fn id(&self) -> u64;
    fn run(self: Rc<Self>);
}

/// Set the engine configuration for the current task. Called by
/// `Session::new`; never a process-wide global — each session's task sets
/// its own.
pub fn configure(config: EngineConfig) {
    CONFIG.with(|c| c.set(config));
}

pub fn current_depth_cap() -> u32 {
    CONFIG.with(|c| c.get().max_propagation_depth)
}

pub(crate) fn equality_mode() -> crate::config::EqualityMode {
    CONFIG.with(|c| c.get().equality)
}

/// The currently active subscriber, if a read is happening inside
/// `run_tracked` (an effect or derived computation).
pub(crate) fn active_subscriber() -> Option<Rc<dyn Subscriber>> {
    ACTIVE.with(|active| active.borrow().last().map(|f| f.subscriber.clone()))
}

/// Record that the active subscriber (if any) read `source`.
pub(crate) fn record_dependency(source: Rc<dyn DepSource>) {
    ACTIVE.with(|active| {
        if let Some(frame) = active.borrow().last() {
            frame.deps.borrow_mut().push(source);
        }
    });
}

/// Run `f` with `subscriber` active, returning the dependency set it
/// collected (by `DepSource::id`, deduplicated by the source side, so we
/// hand back the raw list — callers diff it against their previous set).
pub(crate) fn run_tracked<R>(subscriber: Rc<dyn Subscriber>, f: impl FnOnce() -> R) -> (R, Vec<Rc<dyn DepSource>>) {
    ACTIVE.with(|active| {
        active.borrow_mut().push(TrackingFrame {
            subscriber,
            deps: RefCell::new(Vec::new()),
        });
    });
    let result = f();
    let deps = ACTIVE.with(|active| active.borrow_mut().pop().unwrap().deps.into_inner());
    (result, deps)
}

/// Run `f` with tracking suspended: reads inside `f` do not register as
/// dependencies of the outer active subscriber (if any).
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let saved = ACTIVE.with(|active| active.borrow_mut().pop());
    let result = f();
    if let Some(frame) = saved {
        ACTIVE.with(|active| active.borrow_mut().push(frame));
    }
    result
}

/// Batch multiple signal writes so dependent effects run once, after all
/// writes in the batch complete.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    BATCH_DEPTH.with(|d| d.set(d.get() + 1));
    let result = f();
    let depth = BATCH_DEPTH.with(|d| {
        let next = d.get() - 1;
        d.set(next);
        next
    });
    if depth == 0 {
        let _ = flush();
    }
    result
}

fn is_batching() -> bool {
    BATCH_DEPTH.with(|d| d.get() > 0)
}

/// Enqueue an effect to run. Deduplicates by identity: an effect already
/// pending in this flush is not queued twice.
pub(crate) fn schedule(effect: Rc<dyn ScheduledRun>) {
    let was_new = SCHEDULED_IDS.with(|set| set.borrow_mut().insert(effect.id()));
    if !was_new {
        return;
    }
    QUEUE.with(|q| q.borrow_mut().push_back(effect));
    if is_batching() {
        return;
    }
    let _ = flush();
}

/// Drain the scheduler queue, running each effect at most once, in FIFO
/// order. Effects scheduled while flushing are appended to the same flush
/// (depth-first settlement) up to the configured depth cap.
pub(crate) fn flush() -> LoomResult<()> {
    if FLUSHING.with(|f| f.get()) {
        // Reentrant: the outer flush call owns draining the queue.
        return Ok(());
    }
    FLUSHING.with(|f| f.set(true));
    let cap = current_depth_cap();
    let mut ran: u32 = 0;
    let mut result = Ok(());

    loop {
        let next = QUEUE.with(|q| q.borrow_mut().pop_front());
        let Some(effect) = next else { break };
        SCHEDULED_IDS.with(|set| set.borrow_mut().remove(&effect.id()));

        if ran >= cap {
            tracing::error!(depth_cap = cap, "dependency cycle: propagation exceeded max depth");
            result = Err(LoomError::DependencyCycle(cap));
            QUEUE.with(|q| q.borrow_mut().clear());
            SCHEDULED_IDS.with(|set| set.borrow_mut().clear());
            break;
        }

        effect.run();
        ran += 1;
    }

    FLUSHING.with(|f| f.set(false));
    result
}
