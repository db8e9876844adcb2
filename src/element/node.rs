//! `Element` — the node type built by application code. Construction
//! auto-mounts to whichever scope is currently open; children are owned
//! strongly, parents held weakly so a subtree can be dropped independent of
//! its ancestors.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::scope::{self, ScopeGuard};
use crate::error::{LoomError, LoomResult};
use crate::layout::{BaselineFunc, LayoutNode, LayoutStyle, MeasureFunc};
use crate::render::RenderNode;
use crate::reactivity::next_id;

pub(crate) struct ElementInner {
    pub id: u64,
    pub tag: String,
    pub props: HashMap<String, String>,
    pub utility_classes: Vec<String>,
    pub style: LayoutStyle,
    pub has_explicit_layout_props: bool,
    pub text: Option<String>,
    pub children: Vec<Element>,
    pub parent: Option<Weak<RefCell<ElementInner>>>,
    pub measure: Option<MeasureFunc>,
    pub baseline: Option<BaselineFunc>,
}

/// A node in the element tree. Cheap to clone (an `Rc` handle); children
/// are kept alive by their parent, so a detached subtree is freed once its
/// last `Element` handle and its parent's child-list entry both drop.
#[derive(Clone)]
pub struct Element {
    pub(crate) inner: Rc<RefCell<ElementInner>>,
}

impl Element {
    /// Construct a new element with `tag`, and mount it into the
    /// currently-open scope's child list, if one is open. Fails if that
    /// scope's element already has a measure callback set (a measured leaf
    /// cannot also have children) — see `add_child`.
    pub fn new(tag: impl Into<String>) -> LoomResult<Self> {
        let element = Self {
            inner: Rc::new(RefCell::new(ElementInner {
                id: next_id(),
                tag: tag.into(),
                props: HashMap::new(),
                utility_classes: Vec::new(),
                style: LayoutStyle::default(),
                has_explicit_layout_props: false,
                text: None,
                children: Vec::new(),
                parent: None,
                measure: None,
                baseline: None,
            })),
        };
        if let Some(parent) = scope::current_parent() {
            parent.add_child(element.clone())?;
        }
        Ok(element)
    }

    pub fn id(&self) -> u64 {
        self.inner.borrow().id
    }

    pub fn tag(&self) -> String {
        self.inner.borrow().tag.clone()
    }

    pub fn set_prop(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.borrow_mut().props.insert(key.into(), value.into());
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.inner.borrow_mut().text = Some(text.into());
    }

    pub fn set_utility_classes(&self, classes: Vec<String>) {
        self.inner.borrow_mut().utility_classes = classes;
    }

    /// Set the layout style, and record whether it carries any explicit
    /// (non-default) sizing/position props — the render layer uses this to
    /// decide whether to strip geometry utility classes.
    pub fn set_style(&self, style: LayoutStyle, has_explicit_layout_props: bool) {
        let mut inner = self.inner.borrow_mut();
        inner.style = style;
        inner.has_explicit_layout_props = has_explicit_layout_props;
    }

    pub fn set_measure(&self, measure: MeasureFunc) {
        self.inner.borrow_mut().measure = Some(measure);
    }

    pub fn set_baseline(&self, baseline: BaselineFunc) {
        self.inner.borrow_mut().baseline = Some(baseline);
    }

    pub fn parent(&self) -> Option<Element> {
        self.inner.borrow().parent.as_ref().and_then(|w| w.upgrade()).map(|inner| Element { inner })
    }

    /// Append `child` to this element's children, reparenting it. Fails if
    /// this element has a measure callback set — a measured leaf cannot
    /// also have children, the same rule `LayoutNode` enforces.
    pub fn add_child(&self, child: Element) -> LoomResult<()> {
        if self.inner.borrow().measure.is_some() {
            return Err(LoomError::MeasuredHasChild);
        }
        child.inner.borrow_mut().parent = Some(Rc::downgrade(&self.inner));
        self.inner.borrow_mut().children.push(child);
        Ok(())
    }

    pub fn children(&self) -> Vec<Element> {
        self.inner.borrow().children.clone()
    }

    /// Open a scope with this element as the ambient parent: elements
    /// constructed before the returned guard is exited auto-mount here.
    pub fn enter(&self) -> ScopeGuard {
        scope::enter(self.clone())
    }

    /// Build a [`LayoutNode`] subtree mirroring this element's current
    /// shape, carrying `id()` through as `element_id` so a renderer can
    /// correlate the solved rect back to this element.
    pub fn to_layout_node(&self) -> LayoutNode {
        let inner = self.inner.borrow();
        let mut node = if let Some(measure) = inner.measure.clone() {
            LayoutNode::leaf(inner.style.clone(), measure)
        } else {
            LayoutNode::new(inner.style.clone())
        };
        node.baseline = inner.baseline.clone();
        node.element_id = Some(inner.id);
        for child in &inner.children {
            // `add_child` above already rejects building a second child on
            // a measured element, so this cannot fail here.
            node.add_child(child.to_layout_node()).expect("measured elements cannot have children");
        }
        node
    }

    /// Build a [`RenderNode`] mirroring this element's current shape. The
    /// geometry is read back from `layout_root`, which must be the
    /// already-solved tree produced by [`Element::to_layout_node`] on this
    /// same element (matched up by `element_id`, depth-first).
    pub fn to_render_node(&self, layout_root: &LayoutNode) -> RenderNode {
        let inner = self.inner.borrow();
        let mut children = Vec::with_capacity(inner.children.len());
        for (child, layout_child) in inner.children.iter().zip(layout_root.children.iter()) {
            children.push(child.to_render_node(layout_child));
        }
        RenderNode {
            id: inner.id,
            tag: inner.tag.clone(),
            text: inner.text.clone(),
            attrs: inner.props.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            utility_classes: inner.utility_classes.clone(),
            has_explicit_layout_props: inner.has_explicit_layout_props,
            rect: layout_root.result,
            children,
        }
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Element").field("id", &inner.id).field("tag", &inner.tag).finish()
    }
}
