//! Live session: the per-connection state machine, grounded in the same
//! "one render effect watches the pipeline" shape as a mount/render-effect
//! loop, generalized from a terminal-only render target to the abstract
//! patch/transport pair below.

mod registry;
mod transport;

pub use registry::{sync_handler, Handler, HandlerFuture, Registry};
pub use transport::{InMemoryHandle, InMemoryTransport, Transport};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use tracing::warn;

use crate::config::EngineConfig;
use crate::error::LoomError;
use crate::event::{InboundEvent, OutboundPatch, PatchOp, PatchPayload};
use crate::reactivity::EffectHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Initializing,
    Active,
    Closing,
    Closed,
}

#[derive(Clone)]
struct UpdateQueue {
    items: Rc<RefCell<VecDeque<u64>>>,
    /// Fired on every `push` so the active loop's outbound side can drain
    /// promptly instead of waiting for a suspended inbound handler to
    /// resolve first.
    notify: Rc<tokio::sync::Notify>,
}

impl Default for UpdateQueue {
    fn default() -> Self {
        Self { items: Rc::new(RefCell::new(VecDeque::new())), notify: Rc::new(tokio::sync::Notify::new()) }
    }
}

impl UpdateQueue {
    fn push(&self, target_id: u64) {
        let mut q = self.items.borrow_mut();
        if !q.contains(&target_id) {
            q.push_back(target_id);
        }
        drop(q);
        self.notify.notify_one();
    }

    fn drain(&self) -> Vec<u64> {
        self.items.borrow_mut().drain(..).collect()
    }

    fn notified(&self) -> tokio::sync::futures::Notified<'_> {
        self.notify.notified()
    }
}

/// Handed to a root effect so it can enqueue a subtree for redraw without
/// holding a reference to the `Session` itself (the effect outlives the
/// borrow of any single `run` call).
#[derive(Clone, Default)]
pub struct UpdateQueueHandle(UpdateQueue);

impl UpdateQueueHandle {
    pub fn mark_dirty(&self, target_id: u64) {
        self.0.push(target_id);
    }
}

/// A live connection: owns the handler registry and drives the inbound/
/// outbound loop over a [`Transport`]. Does not own the element tree or
/// layout/render state directly — `render_subtree` is the caller's hook
/// back into whichever `Renderer` backend and element tree it chose.
pub struct Session<T: Transport> {
    state: SessionState,
    transport: T,
    registry: Registry,
    config: EngineConfig,
    updates: UpdateQueueHandle,
    root_effect: Option<EffectHandle>,
    render_subtree: Box<dyn FnMut(u64) -> PatchPayload>,
}

impl<T: Transport> Session<T> {
    /// Applies `config` to the current task's reactive runtime — there is
    /// no global configuration, so each session's task sets its own before
    /// any signal/effect in that task runs.
    pub fn new(transport: T, config: EngineConfig, render_subtree: Box<dyn FnMut(u64) -> PatchPayload>) -> Self {
        crate::reactivity::configure(config);
        Self {
            state: SessionState::Connecting,
            transport,
            registry: Registry::new(),
            config,
            updates: UpdateQueueHandle::default(),
            root_effect: None,
            render_subtree,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// A cloneable handle a caller-constructed root effect can close over
    /// to mark subtrees dirty whenever a tracked signal changes.
    pub fn updates(&self) -> UpdateQueueHandle {
        self.updates.clone()
    }

    /// Install the effect that watches the reactive pipeline. Its first run
    /// (which already happened by the time this is called, per `Effect`'s
    /// run-on-construction contract) is expected to have already enqueued
    /// the root id via the handle from [`Session::updates`].
    pub fn set_root_effect(&mut self, handle: EffectHandle) {
        self.root_effect = Some(handle);
    }

    /// `CONNECTING` is implicit in having a `Transport` to construct with;
    /// `run` starts at `INITIALIZING` and drives the session to `CLOSED`.
    pub async fn run(mut self, shutdown_deadline: Duration) -> Result<(), LoomError> {
        self.state = SessionState::Initializing;
        let init_result = self.flush_updates().await;

        self.state = SessionState::Active;
        let result = match init_result {
            Ok(()) => self.active_loop().await,
            Err(e) => Err(e),
        };

        self.state = SessionState::Closing;
        if let Some(stop) = self.root_effect.take() {
            stop();
        }
        self.registry.clear();
        let _ = tokio::time::timeout(shutdown_deadline, std::future::ready(())).await;

        self.state = SessionState::Closed;
        result
    }

    /// Events are dispatched strictly in arrival order (never two handlers
    /// running concurrently), but a suspended handler's `.await` must not
    /// hold up outbound delivery of patches its own earlier signal writes
    /// (or an unrelated already-queued target) already produced: each
    /// iteration races the pending handler future against the update
    /// queue's notify, flushing as soon as either is ready.
    async fn active_loop(&mut self) -> Result<(), LoomError> {
        let mut pending: Option<(u64, String, HandlerFuture)> = None;
        loop {
            if let Some((target_id, kind, mut fut)) = pending.take() {
                tokio::select! {
                    biased;
                    _ = self.updates.0.notified() => {
                        self.flush_updates().await?;
                        pending = Some((target_id, kind, fut));
                    }
                    result = &mut fut => {
                        if let Err(message) = result {
                            let err = LoomError::HandlerException(target_id, kind, message.clone());
                            warn!(%err, "handler raised");
                            let patch = OutboundPatch {
                                op: PatchOp::Replace,
                                target_id,
                                payload: PatchPayload::Error { error: message },
                            };
                            self.transport.send(patch).await?;
                        }
                        self.flush_updates().await?;
                    }
                }
            } else {
                tokio::select! {
                    biased;
                    _ = self.updates.0.notified() => {
                        self.flush_updates().await?;
                    }
                    event = self.transport.recv() => {
                        match event {
                            Some(InboundEvent { kind, target_id, value, key }) => {
                                match self.registry.dispatch(target_id, &kind, value, key) {
                                    Ok(fut) => pending = Some((target_id, kind, fut)),
                                    Err(err) => warn!(%err, "dropping inbound event"),
                                }
                            }
                            None => return Ok(()),
                        }
                    }
                }
            }
        }
    }

    async fn flush_updates(&mut self) -> Result<(), LoomError> {
        for target_id in self.updates.0.drain() {
            let payload = (self.render_subtree)(target_id);
            let patch = OutboundPatch { op: PatchOp::Replace, target_id, payload };
            self.transport.send(patch).await?;
        }
        Ok(())
    }

    /// A full rerender clears the registry and hands it to `register` to
    /// re-populate from scratch.
    pub fn full_rerender(&mut self, register: impl FnOnce(&mut Registry)) {
        self.registry.clear();
        register(&mut self.registry);
    }

    /// A partial rerender unregisters only `old_subtree_ids` before handing
    /// the registry to `register` for the replacement subtree.
    pub fn partial_rerender(&mut self, old_subtree_ids: &[u64], register: impl FnOnce(&mut Registry)) {
        self.registry.unregister_subtree(old_subtree_ids);
        register(&mut self.registry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventValue;

    fn patch_payload_for(id: u64) -> PatchPayload {
        PatchPayload::Html(format!("<div data-id=\"{id}\"></div>"))
    }

    #[tokio::test]
    async fn initializing_sends_one_full_render_for_the_root() {
        let (transport, mut handle) = InMemoryTransport::pair(8);
        let mut session = Session::new(transport, EngineConfig::default(), Box::new(patch_payload_for));
        session.updates().mark_dirty(1);
        drop(handle.inbound);

        session.run(Duration::from_millis(10)).await.unwrap();

        let patch = handle.outbound.recv().await.unwrap();
        assert_eq!(patch.target_id, 1);
        assert!(matches!(patch.payload, PatchPayload::Html(_)));
    }

    #[tokio::test]
    async fn unknown_target_is_discarded_not_fatal() {
        let (transport, handle) = InMemoryTransport::pair(8);
        let mut session = Session::new(transport, EngineConfig::default(), Box::new(patch_payload_for));
        session.updates().mark_dirty(1);

        handle.inbound.send(InboundEvent { kind: "click".into(), target_id: 999, value: None, key: None }).await.unwrap();
        drop(handle.inbound);

        let result = session.run(Duration::from_millis(10)).await;
        assert!(result.is_ok(), "an unknown target must not terminate the session");
    }

    #[tokio::test]
    async fn handler_exception_emits_an_error_patch_and_stays_alive() {
        let (transport, mut handle) = InMemoryTransport::pair(8);
        let mut session = Session::new(transport, EngineConfig::default(), Box::new(patch_payload_for));
        session.registry_mut().register(
            1,
            "click",
            Box::new(|_, _| Box::pin(async { Err("boom".to_string()) })),
        );
        session.updates().mark_dirty(1);

        handle.inbound.send(InboundEvent { kind: "click".into(), target_id: 1, value: None, key: None }).await.unwrap();
        drop(handle.inbound);

        let result = session.run(Duration::from_millis(10)).await;
        assert!(result.is_ok());

        // First patch is the initial full render; the second is the error.
        let _initial = handle.outbound.recv().await.unwrap();
        let error_patch = handle.outbound.recv().await.unwrap();
        assert!(matches!(error_patch.payload, PatchPayload::Error { ref error } if error == "boom"));
    }

    #[tokio::test]
    async fn handler_value_reaches_the_handler() {
        let (transport, mut handle) = InMemoryTransport::pair(8);
        let mut session = Session::new(transport, EngineConfig::default(), Box::new(patch_payload_for));
        let seen = Rc::new(RefCell::new(None));
        let seen2 = seen.clone();
        session.registry_mut().register(
            1,
            "input",
            sync_handler(move |value, _| *seen2.borrow_mut() = value),
        );
        session.updates().mark_dirty(1);

        handle
            .inbound
            .send(InboundEvent { kind: "input".into(), target_id: 1, value: Some(EventValue::Text("hi".into())), key: None })
            .await
            .unwrap();
        drop(handle.inbound);

        session.run(Duration::from_millis(10)).await.unwrap();
        assert_eq!(*seen.borrow(), Some(EventValue::Text("hi".into())));
    }

    #[tokio::test]
    async fn suspended_handler_does_not_block_outbound_flush() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (transport, mut handle) = InMemoryTransport::pair(8);
                let mut session = Session::new(transport, EngineConfig::default(), Box::new(patch_payload_for));

                let (unblock_tx, unblock_rx) = tokio::sync::oneshot::channel::<()>();
                let unblock_rx = Rc::new(RefCell::new(Some(unblock_rx)));
                let updates = session.updates();
                session.registry_mut().register(
                    1,
                    "click",
                    Box::new(move |_, _| {
                        updates.mark_dirty(1);
                        let rx = unblock_rx.borrow_mut().take().unwrap();
                        Box::pin(async move {
                            let _ = rx.await;
                            Ok(())
                        })
                    }),
                );

                handle.inbound.send(InboundEvent { kind: "click".into(), target_id: 1, value: None, key: None }).await.unwrap();

                let run = tokio::task::spawn_local(async move { session.run(Duration::from_millis(200)).await });

                let _initial = handle.outbound.recv().await.unwrap();
                let click_patch = tokio::time::timeout(Duration::from_millis(200), handle.outbound.recv())
                    .await
                    .expect("outbound flush must not wait for the suspended handler to resolve")
                    .unwrap();
                assert_eq!(click_patch.target_id, 1);

                unblock_tx.send(()).unwrap();
                drop(handle.inbound);
                run.await.unwrap().unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn transport_close_ends_the_session_cleanly() {
        let (transport, handle) = InMemoryTransport::pair(8);
        let mut session = Session::new(transport, EngineConfig::default(), Box::new(patch_payload_for));
        session.updates().mark_dirty(1);
        drop(handle.inbound);

        let result = session.run(Duration::from_millis(10)).await;
        assert!(result.is_ok());
    }
}
