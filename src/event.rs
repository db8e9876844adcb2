//! Wire shapes for the live session transport. Opaque JSON objects in and
//! out; the transport itself is a collaborator (a `Transport` trait in
//! [`crate::session`]), not a byte-level protocol this crate defines.

use serde::{Deserialize, Serialize};

/// `{ "type": "click", "target_id": 4, "value": ..., "key": ... }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub target_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<EventValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// `value` may be a string or a number on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EventValue {
    Text(String),
    Number(f64),
}

/// `{ "op": "replace", "target_id": 4, "payload": ... }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboundPatch {
    pub op: PatchOp,
    pub target_id: u64,
    pub payload: PatchPayload,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatchOp {
    Replace,
}

/// Renderer-specific payload: an HTML string, terminal diff op bytes, or a
/// small error payload for `HandlerException` patches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PatchPayload {
    Html(String),
    TerminalOps(Vec<u8>),
    Error { error: String },
}

impl InboundEvent {
    pub fn from_json(text: &str) -> Result<Self, crate::error::LoomError> {
        serde_json::from_str(text).map_err(|e| crate::error::LoomError::MalformedEvent(e.to_string()))
    }
}

impl OutboundPatch {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("OutboundPatch is always representable as JSON")
    }
}
