//! The flexbox layout engine: a style vocabulary, a node tree with a
//! per-node measurement cache, and a solver that writes computed rects
//! into that tree.

mod node;
mod solve;
mod style;

pub use node::{AvailableSpace, BaselineFunc, CachedMeasurement, ComputedRect, LayoutNode, MeasureFunc, SizingMode};
pub use solve::{baseline_of, solve_subtree};
pub use style::{
    AlignContent, AlignItems, AlignSelf, BoxSizing, Dimension, Direction, Display, Edges, FlexDirection, FlexWrap,
    Gap, Insets, JustifyContent, LayoutStyle, MarginEdge, Overflow, Position,
};

use crate::config::EngineConfig;

/// Solve layout for a tree rooted at `root`, given the space available to
/// it. The top-level call always runs at the root's origin; nested
/// boundary subtrees may be solved concurrently, governed by
/// `config.parallel_layout`.
pub fn solve(root: &mut LayoutNode, available: AvailableSpace, config: &EngineConfig) {
    solve_subtree(root, available, (0.0, 0.0), config);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn parallel_and_sequential_solves_agree() {
        let build = || {
            let mut root = LayoutNode::new(LayoutStyle {
                justify_content: JustifyContent::SpaceBetween,
                ..LayoutStyle::default()
            });
            for i in 0..6 {
                let mut child = LayoutNode::new(LayoutStyle { width: Dimension::Points(10.0), height: Dimension::Points(10.0), ..LayoutStyle::default() });
                let mut grandchild = LayoutNode::leaf(LayoutStyle::default(), Arc::new(move |_| (5.0 + i as f32, 5.0)));
                grandchild.style.margin = Edges::all(MarginEdge::Points(1.0));
                child.add_child(grandchild).unwrap();
                root.add_child(child).unwrap();
            }
            root
        };

        let mut sequential = build();
        let seq_config = EngineConfig { parallel_layout: false, ..EngineConfig::default() };
        solve(&mut sequential, AvailableSpace::exact(400.0, 100.0), &seq_config);

        let mut parallel = build();
        let par_config = EngineConfig { parallel_layout: true, ..EngineConfig::default() };
        solve(&mut parallel, AvailableSpace::exact(400.0, 100.0), &par_config);

        for (a, b) in sequential.children.iter().zip(parallel.children.iter()) {
            assert_eq!(a.result, b.result);
            assert_eq!(a.children[0].result, b.children[0].result);
        }
    }
}
