//! # loom
//!
//! A fine-grained reactive core for building UI on top of: signals and
//! derived values, a scoped element tree, a flexbox-compatible layout
//! solver, and an abstract render protocol with HTML and terminal
//! cell-buffer backends.
//!
//! ## Modules
//!
//! - [`reactivity`] - signals, derived values, effects, the dependency
//!   tracking runtime
//! - [`element`] - the scoped builder API for constructing element trees
//! - [`layout`] - style vocabulary, node tree, and the flexbox solver
//! - [`render`] - the `RenderNode` protocol and its HTML/cell-buffer backends
//! - [`event`] - inbound event and outbound patch wire types
//! - [`session`] - session lifecycle, handler registry, transport

pub mod config;
pub mod element;
pub mod error;
pub mod event;
pub mod layout;
pub mod reactivity;
pub mod render;
pub mod session;

pub use config::{EngineConfig, EqualityMode};
pub use error::{LoomError, LoomResult};

pub use reactivity::{batch, configure, untrack, Derived, Effect, EffectHandle, Signal};

pub use element::Element;

pub use layout::{
    solve, AlignContent, AlignItems, AlignSelf, AvailableSpace, BaselineFunc, BoxSizing,
    CachedMeasurement, ComputedRect, Dimension, Direction, Display, Edges, FlexDirection, FlexWrap,
    Gap, Insets, JustifyContent, LayoutNode, LayoutStyle, MarginEdge, MeasureFunc, Overflow,
    Position, SizingMode,
};

pub use render::{Cell, CellAttrs, CellBufferRenderer, CellOp, HtmlRenderer, RenderNode, Renderer};

pub use event::{EventValue, InboundEvent, OutboundPatch, PatchOp, PatchPayload};

pub use session::{Session, SessionState, Transport};
