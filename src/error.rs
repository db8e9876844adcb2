//! Crate-wide error type.
//!
//! Most variants are recovered locally (logged and swallowed at the call
//! site); a few are propagated to the caller; transport loss and detached
//! scopes are the only session-terminating errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoomError {
    #[error("dependency cycle exceeded max propagation depth ({0})")]
    DependencyCycle(u32),

    #[error("scope exited with a token that does not match the current scope stack")]
    DetachedScope,

    #[error("add_child called on an element with a measure callback set")]
    MeasuredHasChild,

    #[error("malformed inbound event: {0}")]
    MalformedEvent(String),

    #[error("no element registered for target_id {0}")]
    UnknownTarget(u64),

    #[error("element {0} has no handler for event {1:?}")]
    UnknownHandler(u64, String),

    #[error("handler for element {0} event {1:?} raised: {2}")]
    HandlerException(u64, String, String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("layout produced a non-finite measurement, clamped to 0")]
    LayoutOverflow,
}

pub type LoomResult<T> = Result<T, LoomError>;
