//! HTML string backend: each `RenderNode` becomes a tag with an inline
//! `style` attribute carrying its solved rect, plus whatever attributes and
//! text the element declared.

use super::{RenderNode, Renderer};

/// Utility-class prefixes that encode layout (flex/grid/gap/position
/// sizing). When an element also carries explicit layout props — meaning
/// the solver, not a stylesheet, is authoritative for its geometry — these
/// are stripped from the emitted `class` attribute so the two systems never
/// fight over the same box.
const GEOMETRY_UTILITY_PREFIXES: &[&str] =
    &["flex", "grid", "gap-", "w-", "h-", "p-", "m-", "absolute", "relative", "static", "inset-", "justify-", "items-"];

fn is_geometry_utility(class: &str) -> bool {
    GEOMETRY_UTILITY_PREFIXES.iter().any(|p| class == *p || class.starts_with(p))
}

pub fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attr(input: &str) -> String {
    let mut out = escape_text(input);
    out = out.replace('"', "&quot;");
    out
}

#[derive(Debug, Default)]
pub struct HtmlRenderer {
    buf: String,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_node(&mut self, node: &RenderNode) {
        self.buf.push('<');
        self.buf.push_str(&node.tag);
        self.buf.push_str(&format!(
            " data-id=\"{}\" style=\"position:absolute;left:{}px;top:{}px;width:{}px;height:{}px;\"",
            node.id, node.rect.x, node.rect.y, node.rect.width, node.rect.height
        ));

        let classes: Vec<&str> = node
            .utility_classes
            .iter()
            .map(|c| c.as_str())
            .filter(|c| !(node.has_explicit_layout_props && is_geometry_utility(c)))
            .collect();
        if !classes.is_empty() {
            self.buf.push_str(&format!(" class=\"{}\"", escape_attr(&classes.join(" "))));
        }

        for (key, value) in &node.attrs {
            self.buf.push(' ');
            self.buf.push_str(key);
            self.buf.push_str("=\"");
            self.buf.push_str(&escape_attr(value));
            self.buf.push('"');
        }
        self.buf.push('>');

        if let Some(text) = &node.text {
            self.buf.push_str(&escape_text(text));
        }
        for child in &node.children {
            self.write_node(child);
        }

        self.buf.push_str("</");
        self.buf.push_str(&node.tag);
        self.buf.push('>');
    }
}

impl Renderer for HtmlRenderer {
    type Output = String;

    fn render(&mut self, root: &RenderNode) -> String {
        self.buf.clear();
        self.write_node(root);
        std::mem::take(&mut self.buf)
    }

    fn render_node(&mut self, node: &RenderNode) -> String {
        self.buf.clear();
        self.write_node(node);
        std::mem::take(&mut self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ComputedRect;

    fn node(tag: &str, classes: &[&str], explicit: bool) -> RenderNode {
        RenderNode {
            id: 1,
            tag: tag.to_string(),
            text: Some("<script>".to_string()),
            attrs: vec![],
            utility_classes: classes.iter().map(|s| s.to_string()).collect(),
            has_explicit_layout_props: explicit,
            rect: ComputedRect { x: 1.0, y: 2.0, width: 3.0, height: 4.0 },
            children: vec![],
        }
    }

    #[test]
    fn escapes_text_content() {
        let mut r = HtmlRenderer::new();
        let out = r.render(&node("div", &[], false));
        assert!(out.contains("&lt;script&gt;"));
        assert!(!out.contains("<script>"));
    }

    #[test]
    fn strips_geometry_utilities_when_explicit_layout_present() {
        let mut r = HtmlRenderer::new();
        let out = r.render(&node("div", &["flex", "text-red-500"], true));
        assert!(!out.contains("flex"));
        assert!(out.contains("text-red-500"));
    }

    #[test]
    fn keeps_geometry_utilities_without_explicit_layout() {
        let mut r = HtmlRenderer::new();
        let out = r.render(&node("div", &["flex"], false));
        assert!(out.contains("class=\"flex\""));
    }
}
