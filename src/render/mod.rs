//! Render protocol: an abstract `RenderNode` tree plus two backends, an
//! HTML string renderer and a terminal cell-buffer differ. Neither backend
//! owns layout — they consume already-solved rects.

mod cell_buffer;
mod html;

pub use cell_buffer::{Cell, CellAttrs, CellBufferRenderer, CellOp};
pub use html::HtmlRenderer;

use crate::layout::ComputedRect;

/// A single node handed to a renderer: enough to draw without walking back
/// into the element tree or the layout solver.
#[derive(Debug, Clone)]
pub struct RenderNode {
    pub id: u64,
    pub tag: String,
    pub text: Option<String>,
    pub attrs: Vec<(String, String)>,
    /// Geometry-utility class names (e.g. `flex`, `gap-2`) present on the
    /// originating element's class list, independent of whether an
    /// explicit layout prop also set that property.
    pub utility_classes: Vec<String>,
    pub has_explicit_layout_props: bool,
    pub rect: ComputedRect,
    pub children: Vec<RenderNode>,
}

/// Implemented by each render backend. `render` walks the whole tree and
/// produces the backend's native output type; `render_node` renders a
/// single node without recursing, for callers that manage their own walk
/// (e.g. a partial re-render after a single signal write).
pub trait Renderer {
    type Output;

    fn render(&mut self, root: &RenderNode) -> Self::Output;
    fn render_node(&mut self, node: &RenderNode) -> Self::Output;
}
