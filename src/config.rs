//! Engine-wide configuration record.
//!
//! Passed explicitly to a [`crate::session::Session`] at construction and to
//! [`crate::layout::solve`] — there is no global/process-wide configuration
//! state, so that a session's behavior never leaks across sessions.

/// Equality rule used by [`crate::reactivity::Signal::set`] to decide
/// whether a write is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityMode {
    /// Compare by value (`PartialEq`).
    Value,
    /// Compare by identity (pointer/ref equality of the payload).
    Identity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Signal equality rule. Default: value equality.
    pub equality: EqualityMode,
    /// Cycle-abort threshold for propagation depth. Default: 100.
    pub max_propagation_depth: u32,
    /// Float-equality tolerance used throughout the layout engine.
    pub layout_epsilon: f64,
    /// Enable boundary-parallel layout solving.
    pub parallel_layout: bool,
    /// Dump transformed client source on import (collaborator hook only;
    /// the core does not implement the transform itself).
    pub debug_client_transform: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            equality: EqualityMode::Value,
            max_propagation_depth: 100,
            layout_epsilon: 0.001,
            parallel_layout: true,
            debug_client_transform: false,
        }
    }
}
