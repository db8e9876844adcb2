//! The opaque duplex channel a session reads events from and writes
//! patches to. Deliberately thin: parsing/framing belongs to whatever
//! carries the bytes (websocket, stdio, a test harness), not to this crate.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::LoomError;
use crate::event::{InboundEvent, OutboundPatch};

/// `?Send` because a session's reactive state (`Signal`/`Effect`, `Rc`-based)
/// never leaves its own task; the transport lives on that same task and
/// carries no such requirement of its own.
#[async_trait(?Send)]
pub trait Transport {
    async fn send(&mut self, patch: OutboundPatch) -> Result<(), LoomError>;

    /// `None` signals the peer closed the connection.
    async fn recv(&mut self) -> Option<InboundEvent>;
}

/// In-memory transport pair for tests: one half is driven by the session,
/// the other is held by the test to inject events and collect patches.
pub struct InMemoryTransport {
    inbound: mpsc::Receiver<InboundEvent>,
    outbound: mpsc::Sender<OutboundPatch>,
}

pub struct InMemoryHandle {
    pub inbound: mpsc::Sender<InboundEvent>,
    pub outbound: mpsc::Receiver<OutboundPatch>,
}

impl InMemoryTransport {
    pub fn pair(capacity: usize) -> (Self, InMemoryHandle) {
        let (in_tx, in_rx) = mpsc::channel(capacity);
        let (out_tx, out_rx) = mpsc::channel(capacity);
        (Self { inbound: in_rx, outbound: out_tx }, InMemoryHandle { inbound: in_tx, outbound: out_rx })
    }
}

#[async_trait(?Send)]
impl Transport for InMemoryTransport {
    async fn send(&mut self, patch: OutboundPatch) -> Result<(), LoomError> {
        self.outbound.send(patch).await.map_err(|e| LoomError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<InboundEvent> {
        self.inbound.recv().await
    }
}
