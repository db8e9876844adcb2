//! `LayoutNode` — the tree the solver operates on, plus the measurement
//! cache each node keeps between solves.

use std::sync::Arc;

use super::style::LayoutStyle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingMode {
    /// Stretch-fit the given value.
    Exactly(f32),
    /// Fit-content upper bound.
    AtMost(f32),
    /// Unbounded.
    MaxContent,
}

impl SizingMode {
    pub fn value(&self) -> Option<f32> {
        match self {
            SizingMode::Exactly(v) | SizingMode::AtMost(v) => Some(*v),
            SizingMode::MaxContent => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvailableSpace {
    pub width: SizingMode,
    pub height: SizingMode,
}

impl AvailableSpace {
    pub fn exact(width: f32, height: f32) -> Self {
        Self { width: SizingMode::Exactly(width), height: SizingMode::Exactly(height) }
    }
}

/// Result written into a node after solving.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComputedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A measure callback for leaf nodes: given the available space per axis,
/// returns an intrinsic (width, height).
pub type MeasureFunc = Arc<dyn Fn(AvailableSpace) -> (f32, f32) + Send + Sync>;

/// A baseline callback: returns the distance from the node's top edge to
/// its baseline.
pub type BaselineFunc = Arc<dyn Fn(ComputedRect) -> f32 + Send + Sync>;

/// One cache slot: the four `(mode, available)` inputs from the last solve
/// plus the computed size they produced.
#[derive(Debug, Clone, Copy)]
pub struct CachedMeasurement {
    pub available_width: f32,
    pub available_height: f32,
    pub width_mode: SizingMode,
    pub height_mode: SizingMode,
    pub computed_width: f32,
    pub computed_height: f32,
}

impl CachedMeasurement {
    /// Cache is valid if: exact match on modes+values; requested `exactly`
    /// equals cached computed size; or requested `fit-content` (`at_most`)
    /// is <= cached `max-content` result.
    pub fn satisfies(&self, requested: AvailableSpace, epsilon: f64) -> bool {
        axis_satisfies(self.width_mode, self.available_width, self.computed_width, requested.width, epsilon)
            && axis_satisfies(self.height_mode, self.available_height, self.computed_height, requested.height, epsilon)
    }
}

fn axis_satisfies(cached_mode: SizingMode, cached_avail: f32, cached_computed: f32, requested: SizingMode, epsilon: f64) -> bool {
    let close = |a: f32, b: f32| ((a - b) as f64).abs() <= epsilon;
    match (cached_mode, requested) {
        (SizingMode::Exactly(cv), SizingMode::Exactly(rv)) => close(cv, rv),
        (SizingMode::AtMost(cv), SizingMode::AtMost(rv)) => close(cv, rv),
        (SizingMode::MaxContent, SizingMode::MaxContent) => true,
        (_, SizingMode::Exactly(rv)) => close(cached_computed, rv),
        (SizingMode::MaxContent, SizingMode::AtMost(rv)) => cached_computed <= rv + epsilon as f32,
        _ => {
            let _ = cached_avail;
            false
        }
    }
}

pub struct LayoutNode {
    pub style: LayoutStyle,
    pub children: Vec<LayoutNode>,
    pub measure: Option<MeasureFunc>,
    pub baseline: Option<BaselineFunc>,
    pub result: ComputedRect,
    pub dirty: bool,
    pub cache: Vec<CachedMeasurement>,
    /// Identifier carried through from the originating element, used by
    /// renderers that need to correlate layout results back to render
    /// nodes.
    pub element_id: Option<u64>,
}

impl LayoutNode {
    pub fn new(style: LayoutStyle) -> Self {
        Self {
            style,
            children: Vec::new(),
            measure: None,
            baseline: None,
            result: ComputedRect::default(),
            dirty: true,
            cache: Vec::new(),
            element_id: None,
        }
    }

    pub fn leaf(style: LayoutStyle, measure: MeasureFunc) -> Self {
        let mut node = Self::new(style);
        node.measure = Some(measure);
        node
    }

    /// A node with a measure callback is a leaf; adding children is an
    /// error, mirroring `Element::add_child`'s own rule.
    pub fn add_child(&mut self, child: LayoutNode) -> Result<(), crate::error::LoomError> {
        if self.measure.is_some() {
            return Err(crate::error::LoomError::MeasuredHasChild);
        }
        self.children.push(child);
        Ok(())
    }

    /// A node whose style has both width and height resolved to concrete
    /// values is a layout boundary: dirtying below it never needs to
    /// propagate above it.
    pub fn is_boundary(&self) -> bool {
        use super::style::Dimension;
        matches!(self.style.width, Dimension::Points(_)) && matches!(self.style.height, Dimension::Points(_))
    }

    pub fn probe_cache(&self, requested: AvailableSpace, epsilon: f64) -> Option<ComputedRect> {
        self.cache.iter().find(|c| c.satisfies(requested, epsilon)).map(|c| ComputedRect {
            x: self.result.x,
            y: self.result.y,
            width: c.computed_width,
            height: c.computed_height,
        })
    }

    pub fn store_cache(&mut self, requested: AvailableSpace, computed_width: f32, computed_height: f32) {
        self.cache.push(CachedMeasurement {
            available_width: requested.width.value().unwrap_or(f32::INFINITY),
            available_height: requested.height.value().unwrap_or(f32::INFINITY),
            width_mode: requested.width,
            height_mode: requested.height,
            computed_width,
            computed_height,
        });
    }

    /// Shift this already-solved subtree's absolute position by `(dx, dy)`,
    /// recursively. Used to reposition a subtree solved at a provisional
    /// origin without re-running the solver, which would cache-hit and skip
    /// re-walking descendants, leaving them at their stale absolute position.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.result.x += dx;
        self.result.y += dy;
        for child in &mut self.children {
            child.translate(dx, dy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hits_on_exact_match() {
        let mut node = LayoutNode::new(LayoutStyle::default());
        node.store_cache(AvailableSpace::exact(100.0, 100.0), 80.0, 40.0);
        let hit = node.probe_cache(AvailableSpace::exact(100.0, 100.0), 0.001);
        assert!(hit.is_some());
    }

    #[test]
    fn cache_extends_from_max_content_to_fit_content() {
        let mut node = LayoutNode::new(LayoutStyle::default());
        node.store_cache(
            AvailableSpace { width: SizingMode::MaxContent, height: SizingMode::MaxContent },
            80.0,
            20.0,
        );
        let requested = AvailableSpace { width: SizingMode::AtMost(200.0), height: SizingMode::AtMost(200.0) };
        assert!(node.probe_cache(requested, 0.001).is_some());
    }
}
