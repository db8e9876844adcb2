//! Terminal backend: rasterizes a `RenderNode` tree into a grid of cells
//! and diffs against the previous frame to produce a minimal op list.
//!
//! Producing real ANSI escape bytes from that op list is a collaborator's
//! job, not this crate's — `CellOp` is the abstract boundary.

use unicode_width::UnicodeWidthStr;

use super::{RenderNode, Renderer};

bitflags::bitflags! {
    /// Per-cell text attributes, combined with bitwise OR. Same bit layout
    /// as a terminal `SGR` attribute byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellAttrs: u8 {
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK = 1 << 4;
        const INVERSE = 1 << 5;
        const HIDDEN = 1 << 6;
        const STRIKETHROUGH = 1 << 7;
    }
}

/// Map the same geometry-adjacent utility-class vocabulary `html.rs` reads
/// for layout onto terminal text attributes, for the subset of classes that
/// name a text style rather than a box property.
fn attrs_from_utility_classes(classes: &[String]) -> CellAttrs {
    let mut attrs = CellAttrs::empty();
    for class in classes {
        attrs |= match class.as_str() {
            "bold" | "font-bold" => CellAttrs::BOLD,
            "dim" => CellAttrs::DIM,
            "italic" => CellAttrs::ITALIC,
            "underline" => CellAttrs::UNDERLINE,
            "blink" | "animate-pulse" => CellAttrs::BLINK,
            "inverse" => CellAttrs::INVERSE,
            "hidden" => CellAttrs::HIDDEN,
            "strikethrough" | "line-through" => CellAttrs::STRIKETHROUGH,
            _ => CellAttrs::empty(),
        };
    }
    attrs
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    pub grapheme: String,
    pub fg: Option<String>,
    pub bg: Option<String>,
    pub attrs: CellAttrs,
}

impl Cell {
    fn blank() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellOp {
    pub x: u16,
    pub y: u16,
    pub cell: Cell,
}

struct Grid {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Grid {
    fn new(width: u16, height: u16) -> Self {
        Self { width, height, cells: vec![Cell::blank(); width as usize * height as usize] }
    }

    fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.cells[y as usize * self.width as usize + x as usize] = cell;
    }

    fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(&self.cells[y as usize * self.width as usize + x as usize])
    }

    fn paint_text(&mut self, x0: u16, y0: u16, text: &str, attrs: CellAttrs) {
        let mut x = x0;
        for grapheme in unicode_segmentation::UnicodeSegmentation::graphemes(text, true) {
            let w = grapheme.width().max(1) as u16;
            self.set(x, y0, Cell { grapheme: grapheme.to_string(), fg: None, bg: None, attrs });
            x += w;
        }
    }
}

/// Front/back double-buffered cell grid. `render` rasterizes into the back
/// buffer, diffs against the front buffer, swaps, and returns only the
/// cells that changed.
pub struct CellBufferRenderer {
    width: u16,
    height: u16,
    front: Option<Grid>,
}

impl CellBufferRenderer {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height, front: None }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.front = None;
    }

    fn paint(&self, grid: &mut Grid, node: &RenderNode) {
        let x = node.rect.x.round().max(0.0) as u16;
        let y = node.rect.y.round().max(0.0) as u16;
        if let Some(text) = &node.text {
            grid.paint_text(x, y, text, attrs_from_utility_classes(&node.utility_classes));
        }
        for child in &node.children {
            self.paint(grid, child);
        }
    }

    fn diff(&mut self, back: Grid) -> Vec<CellOp> {
        let mut ops = Vec::new();
        for y in 0..back.height {
            for x in 0..back.width {
                let changed = match &self.front {
                    Some(front) if front.width == back.width && front.height == back.height => {
                        front.get(x, y) != back.get(x, y)
                    }
                    _ => true,
                };
                if changed {
                    ops.push(CellOp { x, y, cell: back.get(x, y).cloned().unwrap_or_default() });
                }
            }
        }
        self.front = Some(back);
        ops
    }
}

impl Renderer for CellBufferRenderer {
    type Output = Vec<CellOp>;

    fn render(&mut self, root: &RenderNode) -> Vec<CellOp> {
        let mut back = Grid::new(self.width, self.height);
        self.paint(&mut back, root);
        self.diff(back)
    }

    /// A single node is rasterized against a fresh blank grid the size of
    /// the node's own rect, with no diffing: used for a caller that already
    /// knows the region needs a full repaint.
    fn render_node(&mut self, node: &RenderNode) -> Vec<CellOp> {
        let w = node.rect.width.round().max(1.0) as u16;
        let h = node.rect.height.round().max(1.0) as u16;
        let mut grid = Grid::new(w, h);
        if let Some(text) = &node.text {
            grid.paint_text(0, 0, text, attrs_from_utility_classes(&node.utility_classes));
        }
        let mut ops = Vec::new();
        for y in 0..h {
            for x in 0..w {
                if let Some(cell) = grid.get(x, y) {
                    if *cell != Cell::blank() {
                        ops.push(CellOp { x, y, cell: cell.clone() });
                    }
                }
            }
        }
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ComputedRect;

    fn text_node(text: &str, x: f32, y: f32) -> RenderNode {
        RenderNode {
            id: 1,
            tag: "text".to_string(),
            text: Some(text.to_string()),
            attrs: vec![],
            utility_classes: vec![],
            has_explicit_layout_props: false,
            rect: ComputedRect { x, y, width: text.width() as f32, height: 1.0 },
            children: vec![],
        }
    }

    #[test]
    fn first_render_reports_every_painted_cell() {
        let mut r = CellBufferRenderer::new(10, 2);
        let ops = r.render(&text_node("hi", 0.0, 0.0));
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn second_render_with_no_changes_reports_nothing() {
        let mut r = CellBufferRenderer::new(10, 2);
        r.render(&text_node("hi", 0.0, 0.0));
        let ops = r.render(&text_node("hi", 0.0, 0.0));
        assert!(ops.is_empty());
    }

    #[test]
    fn changed_text_reports_only_the_differing_cells() {
        let mut r = CellBufferRenderer::new(10, 2);
        r.render(&text_node("hi", 0.0, 0.0));
        let ops = r.render(&text_node("ho", 0.0, 0.0));
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].cell.grapheme, "o");
    }

    #[test]
    fn bold_utility_class_sets_the_bold_attr_on_every_painted_cell() {
        let mut node = text_node("hi", 0.0, 0.0);
        node.utility_classes.push("bold".to_string());
        let mut r = CellBufferRenderer::new(10, 2);
        let ops = r.render(&node);
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| op.cell.attrs.contains(CellAttrs::BOLD)));
    }

    #[test]
    fn unrecognized_utility_class_leaves_attrs_empty() {
        let mut node = text_node("hi", 0.0, 0.0);
        node.utility_classes.push("rounded-lg".to_string());
        let mut r = CellBufferRenderer::new(10, 2);
        let ops = r.render(&node);
        assert!(ops.iter().all(|op| op.cell.attrs.is_empty()));
    }
}
