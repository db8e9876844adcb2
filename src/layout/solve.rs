//! The flexbox solver: turns a [`LayoutNode`] tree plus an available-space
//! constraint into written `ComputedRect`s, depth-first.

use super::node::{AvailableSpace, ComputedRect, LayoutNode, SizingMode};
use super::style::{AlignContent, AlignItems, AlignSelf, Dimension, Display, JustifyContent, MarginEdge, Position};
use crate::config::EngineConfig;
use crate::error::LoomError;

fn resolve_dimension(dim: Dimension, reference: f32) -> Option<f32> {
    match dim {
        Dimension::Auto => None,
        Dimension::Points(v) => Some(v),
        Dimension::Percent(p) => Some(reference * p / 100.0),
    }
}

fn clamp(value: f32, min: Dimension, max: Dimension, reference: f32) -> f32 {
    let mut v = value;
    if let Some(min) = resolve_dimension(min, reference) {
        v = v.max(min);
    }
    if let Some(max) = resolve_dimension(max, reference) {
        v = v.min(max);
    }
    v.max(0.0)
}

struct BoxMetrics {
    padding: (f32, f32, f32, f32), // top, right, bottom, left
    border: (f32, f32, f32, f32),
}

impl BoxMetrics {
    /// `main_ref` is the parent's main-axis content size — every padding
    /// edge, not just the main-axis ones, resolves its percentage against
    /// it, the same single reference the margin code at line ~276 uses.
    fn of(node: &LayoutNode, main_ref: f32) -> Self {
        let s = &node.style;
        let pad = |d: Dimension| resolve_dimension(d, main_ref).unwrap_or(0.0);
        Self {
            padding: (pad(s.padding.top), pad(s.padding.right), pad(s.padding.bottom), pad(s.padding.left)),
            border: (s.border.top, s.border.right, s.border.bottom, s.border.left),
        }
    }

    fn main_axis_inset(&self, is_row: bool) -> f32 {
        if is_row {
            self.padding.1 + self.padding.3 + self.border.1 + self.border.3
        } else {
            self.padding.0 + self.padding.2 + self.border.0 + self.border.2
        }
    }

    fn cross_axis_inset(&self, is_row: bool) -> f32 {
        self.main_axis_inset(!is_row)
    }
}

fn margin_value(m: MarginEdge, reference: f32) -> Option<f32> {
    match m {
        MarginEdge::Auto => None,
        MarginEdge::Points(v) => Some(v),
        MarginEdge::Percent(p) => Some(reference * p / 100.0),
    }
}

/// Clamp a measure callback's result to zero (and log) on a non-finite
/// axis, so a stray NaN/Inf never propagates into summed flex geometry.
fn guard_finite((w, h): (f32, f32)) -> (f32, f32) {
    let mut out = (w, h);
    if !w.is_finite() {
        tracing::warn!(error = %LoomError::LayoutOverflow, axis = "width", value = w, "measure callback returned a non-finite width");
        out.0 = 0.0;
    }
    if !h.is_finite() {
        tracing::warn!(error = %LoomError::LayoutOverflow, axis = "height", value = h, "measure callback returned a non-finite height");
        out.1 = 0.0;
    }
    out
}

/// Index path to a flow participant, descending through zero or more
/// transparent `Display::Contents` ancestors.
type FlowPath = Vec<usize>;

fn path_ref<'a>(node: &'a LayoutNode, path: &[usize]) -> &'a LayoutNode {
    path.iter().fold(node, |n, &i| &n.children[i])
}

fn path_mut<'a>(node: &'a mut LayoutNode, path: &[usize]) -> &'a mut LayoutNode {
    path.iter().fold(node, |n, &i| &mut n.children[i])
}

/// Collect the index paths of `children`'s actual flow participants,
/// transparently flattening `Display::Contents` children's own children in
/// (recursively, so nested `Contents` wrappers flatten fully) — per
/// spec.md §4.L step 4, a `display: contents` node's children join the
/// parent's flex flow directly, as if the wrapper node were not there.
fn flatten_flow(children: &[LayoutNode]) -> Vec<FlowPath> {
    let mut out = Vec::new();
    for (i, child) in children.iter().enumerate() {
        if child.style.position == Position::Absolute || child.style.display == Display::None {
            continue;
        }
        if child.style.display == Display::Contents {
            for mut sub in flatten_flow(&child.children) {
                let mut path = vec![i];
                path.append(&mut sub);
                out.push(path);
            }
        } else {
            out.push(vec![i]);
        }
    }
    out
}

/// Solve layout for `root` given the space available to it, writing
/// `ComputedRect`s into the tree in place. Entry point used directly for a
/// single subtree, and by [`crate::layout::solve`] for the whole-tree pass
/// with parallel boundary dispatch.
pub fn solve_subtree(node: &mut LayoutNode, available: AvailableSpace, origin: (f32, f32), config: &EngineConfig) {
    if node.style.display == Display::None {
        node.result = ComputedRect { x: origin.0, y: origin.1, width: 0.0, height: 0.0 };
        node.dirty = false;
        return;
    }

    if let Some(cached) = node.probe_cache(available, config.layout_epsilon) {
        node.result = ComputedRect { x: origin.0, y: origin.1, width: cached.width, height: cached.height };
        node.dirty = false;
        return;
    }

    let (width, height) = measure_node(node, available, config);
    node.result = ComputedRect { x: origin.0, y: origin.1, width, height };
    node.store_cache(available, width, height);

    if node.measure.is_some() {
        node.dirty = false;
        return;
    }

    layout_children(node, config);
    layout_absolute_children(node, config);
    node.dirty = false;
}

fn measure_node(node: &LayoutNode, available: AvailableSpace, config: &EngineConfig) -> (f32, f32) {
    if let Some(measure) = &node.measure {
        let (w, h) = guard_finite(measure(available));
        let s = &node.style;
        let width_ref = available.width.value().unwrap_or(w);
        let height_ref = available.height.value().unwrap_or(h);
        let w = resolve_dimension(s.width, width_ref).unwrap_or(w);
        let h = resolve_dimension(s.height, height_ref).unwrap_or(h);
        return (
            clamp(w, s.min_width, s.max_width, width_ref),
            clamp(h, s.min_height, s.max_height, height_ref),
        );
    }

    let s = &node.style;
    let width_ref = available.width.value().unwrap_or(0.0);
    let height_ref = available.height.value().unwrap_or(0.0);

    let explicit_w = resolve_dimension(s.width, width_ref);
    let explicit_h = resolve_dimension(s.height, height_ref);

    let width = match (explicit_w, available.width) {
        (Some(w), _) => w,
        (None, SizingMode::Exactly(v)) => v,
        _ => intrinsic_main_size(node, true, available, config),
    };
    let height = match (explicit_h, available.height) {
        (Some(h), _) => h,
        (None, SizingMode::Exactly(v)) => v,
        _ => intrinsic_main_size(node, false, available, config),
    };

    (
        clamp(width, s.min_width, s.max_width, width_ref.max(width)),
        clamp(height, s.min_height, s.max_height, height_ref.max(height)),
    )
}

/// A crude but self-consistent intrinsic size for a container with no
/// explicit dimension along `axis_is_width`: the accumulated main-axis
/// extent of its children (sum for the matching axis, max for the other),
/// plus padding/border. Children that also lack explicit sizes measure
/// themselves against max-content first.
fn intrinsic_main_size(node: &LayoutNode, axis_is_width: bool, available: AvailableSpace, config: &EngineConfig) -> f32 {
    if node.style.display == Display::Contents {
        return 0.0;
    }
    let is_row = node.style.flex_direction.is_row();
    let main_ref = if is_row { available.width.value().unwrap_or(0.0) } else { available.height.value().unwrap_or(0.0) };
    let metrics = BoxMetrics::of(node, main_ref);
    if node.children.is_empty() {
        return if axis_is_width { metrics.main_axis_inset(true) } else { metrics.main_axis_inset(false) };
    }

    let child_available = AvailableSpace { width: SizingMode::MaxContent, height: SizingMode::MaxContent };
    let mut sum_main = 0.0f32;
    let mut max_cross = 0.0f32;
    let gap = node.style.gap.main_gap(is_row);
    let flow = flatten_flow(&node.children);
    for (i, path) in flow.iter().enumerate() {
        let child = path_ref(node, path);
        let (cw, ch) = measure_node(child, child_available, config);
        let (main, cross) = if is_row { (cw, ch) } else { (ch, cw) };
        sum_main += main;
        if i > 0 {
            sum_main += gap;
        }
        max_cross = max_cross.max(cross);
    }

    let content = if is_row == axis_is_width { sum_main } else { max_cross };
    content + if axis_is_width { metrics.main_axis_inset(true) } else { metrics.main_axis_inset(false) }
}

struct FlexItem {
    index: FlowPath,
    main_base: f32,
    main_final: f32,
    cross_final: f32,
    grow: f32,
    shrink: f32,
    margin_main_start: Option<f32>,
    margin_main_end: Option<f32>,
    margin_cross_start: Option<f32>,
    margin_cross_end: Option<f32>,
    /// Resolved `align-self`, set once during Step 2 and read again in
    /// Step 4's placement loop (needed ahead of placement so baseline
    /// items can be fully solved before their line's cross size settles).
    align: AlignItems,
    /// Distance from this item's own top edge to its baseline, valid only
    /// when `align == AlignItems::Baseline`.
    baseline: f32,
}

fn layout_children(node: &mut LayoutNode, config: &EngineConfig) {
    if node.children.is_empty() {
        return;
    }

    let resolved_direction = node.style.flex_direction.resolve_rtl(node.style.direction);
    let is_row = resolved_direction.is_row();
    let is_main_reverse = resolved_direction.is_reverse();

    let origin_x = node.result.x;
    let origin_y = node.result.y;

    let main_ref = if is_row { node.result.width } else { node.result.height };
    let metrics = BoxMetrics::of(node, main_ref);
    let content_x = metrics.padding.3 + metrics.border.3;
    let content_y = metrics.padding.0 + metrics.border.0;
    let content_width = (node.result.width - metrics.main_axis_inset(true)).max(0.0);
    let content_height = (node.result.height - metrics.cross_axis_inset(true)).max(0.0);

    let main_size = if is_row { content_width } else { content_height };
    let cross_size = if is_row { content_height } else { content_width };

    let flow: Vec<FlowPath> = flatten_flow(&node.children);

    if flow.is_empty() {
        return;
    }

    let gap = node.style.gap.main_gap(is_row);
    let cross_gap = node.style.gap.main_gap(!is_row);

    // --- Step 1: collect lines (wrap support) ---
    let no_wrap = node.style.flex_wrap == super::style::FlexWrap::NoWrap;
    let mut lines: Vec<Vec<FlowPath>> = Vec::new();
    let mut current: Vec<FlowPath> = Vec::new();
    let mut current_main = 0.0f32;

    for path in &flow {
        let child = path_ref(node, path);
        let child_available = AvailableSpace {
            width: if is_row { SizingMode::MaxContent } else { SizingMode::Exactly(content_width) },
            height: if is_row { SizingMode::Exactly(content_height) } else { SizingMode::MaxContent },
        };
        let (w, h) = measure_node(child, child_available, config);
        let item_main = if is_row { w } else { h };

        if !no_wrap && !current.is_empty() && current_main + item_main + gap > main_size {
            lines.push(std::mem::take(&mut current));
            current_main = 0.0;
        }
        current_main += item_main + gap;
        current.push(path.clone());
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if node.style.flex_wrap == super::style::FlexWrap::WrapReverse {
        lines.reverse();
    }

    // --- Step 2: resolve each line's flex items (grow/shrink) ---
    let mut line_items: Vec<Vec<FlexItem>> = Vec::new();
    let mut line_cross_sizes = Vec::with_capacity(lines.len());

    for line in &lines {
        let mut items = Vec::with_capacity(line.len());
        let mut used_main = 0.0f32;
        let mut total_grow = 0.0f32;
        let mut total_shrink = 0.0f32;

        for (pos, path) in line.iter().enumerate() {
            let child = path_ref(node, path);
            let basis_ref = if is_row { content_width } else { content_height };
            let explicit = resolve_dimension(child.style.flex_basis, basis_ref).or_else(|| {
                resolve_dimension(if is_row { child.style.width } else { child.style.height }, basis_ref)
            });
            let child_available = AvailableSpace {
                width: if is_row { SizingMode::MaxContent } else { SizingMode::Exactly(content_width) },
                height: if is_row { SizingMode::Exactly(content_height) } else { SizingMode::MaxContent },
            };
            let base = match explicit {
                Some(v) => v,
                None => {
                    let (w, h) = measure_node(child, child_available, config);
                    if is_row { w } else { h }
                }
            };

            let margin_ref = if is_row { content_width } else { content_height };
            let (m_start, m_end) = if is_row {
                (margin_value(child.style.margin.left, margin_ref), margin_value(child.style.margin.right, margin_ref))
            } else {
                (margin_value(child.style.margin.top, margin_ref), margin_value(child.style.margin.bottom, margin_ref))
            };
            let (c_start, c_end) = if is_row {
                (margin_value(child.style.margin.top, margin_ref), margin_value(child.style.margin.bottom, margin_ref))
            } else {
                (margin_value(child.style.margin.left, margin_ref), margin_value(child.style.margin.right, margin_ref))
            };

            used_main += base + m_start.unwrap_or(0.0) + m_end.unwrap_or(0.0);
            if pos > 0 {
                used_main += gap;
            }
            total_grow += child.style.flex_grow;
            total_shrink += child.style.flex_shrink;

            items.push(FlexItem {
                index: path.clone(),
                main_base: base,
                main_final: base,
                cross_final: 0.0,
                grow: child.style.flex_grow,
                shrink: child.style.flex_shrink,
                margin_main_start: m_start,
                margin_main_end: m_end,
                margin_cross_start: c_start,
                margin_cross_end: c_end,
                align: resolve_align_self(child.style.align_self, node.style.align_items),
                baseline: 0.0,
            });
        }

        let free_space = main_size - used_main;
        if free_space > config.layout_epsilon as f32 && total_grow > 0.0 {
            for item in &mut items {
                item.main_final = item.main_base + (item.grow / total_grow) * free_space;
            }
        } else if free_space < -(config.layout_epsilon as f32) && total_shrink > 0.0 {
            let weighted_total: f32 = items.iter().map(|i| i.shrink * i.main_base).sum();
            if weighted_total > 0.0 {
                for item in &mut items {
                    let weight = item.shrink * item.main_base;
                    item.main_final = (item.main_base + (weight / weighted_total) * free_space).max(0.0);
                }
            }
        }

        // cross size: measure at resolved main size. A baseline item is
        // fully solved here (not just measured) at a provisional origin, so
        // its own baseline offset is known before the line's cross size
        // settles; Step 4 repositions it with `LayoutNode::translate` rather
        // than re-solving, since a second `solve_subtree` pass would hit the
        // cache and leave descendants' absolute positions stale.
        let mut line_cross = 0.0f32;
        for item in &mut items {
            let cross_available = AvailableSpace {
                width: if is_row { SizingMode::Exactly(item.main_final) } else { SizingMode::MaxContent },
                height: if is_row { SizingMode::MaxContent } else { SizingMode::Exactly(item.main_final) },
            };
            let (w, h) = if item.align == AlignItems::Baseline {
                let child = path_mut(node, &item.index);
                solve_subtree(child, cross_available, (0.0, 0.0), config);
                item.baseline = baseline_of(child);
                (child.result.width, child.result.height)
            } else {
                measure_node(path_ref(node, &item.index), cross_available, config)
            };
            let cross = if is_row { h } else { w };
            item.cross_final = cross + item.margin_cross_start.unwrap_or(0.0) + item.margin_cross_end.unwrap_or(0.0);
            line_cross = line_cross.max(item.cross_final);
        }

        line_cross_sizes.push(line_cross);
        line_items.push(items);
    }

    // --- Step 3: distribute lines across the cross axis (align-content) ---
    let total_cross_used: f32 =
        line_cross_sizes.iter().sum::<f32>() + cross_gap * (line_cross_sizes.len().saturating_sub(1)) as f32;
    let cross_free = (cross_size - total_cross_used).max(0.0);
    let line_count = line_items.len();

    let (mut cross_cursor, extra_between, extra_each) = match node.style.align_content {
        AlignContent::FlexStart | AlignContent::Stretch if line_count <= 1 => (0.0, 0.0, 0.0),
        AlignContent::FlexStart => (0.0, 0.0, 0.0),
        AlignContent::FlexEnd => (cross_free, 0.0, 0.0),
        AlignContent::Center => (cross_free / 2.0, 0.0, 0.0),
        AlignContent::SpaceBetween if line_count > 1 => (0.0, cross_free / (line_count - 1) as f32, 0.0),
        AlignContent::SpaceBetween => (0.0, 0.0, 0.0),
        AlignContent::SpaceAround => (cross_free / (2.0 * line_count as f32), 0.0, cross_free / line_count as f32),
        AlignContent::SpaceEvenly => (cross_free / (line_count + 1) as f32, 0.0, cross_free / (line_count + 1) as f32),
        AlignContent::Stretch => (0.0, 0.0, 0.0),
    };
    let stretch_lines = node.style.align_content == AlignContent::Stretch && line_count >= 1;
    let stretch_extra = if stretch_lines { cross_free / line_count as f32 } else { 0.0 };

    for (li, items) in line_items.iter_mut().enumerate() {
        let line_cross = line_cross_sizes[li] + stretch_extra;

        // --- Step 4: main-axis placement (justify-content + auto margins) ---
        let used_main: f32 = items.iter().map(|i| i.main_final + i.margin_main_start.unwrap_or(0.0) + i.margin_main_end.unwrap_or(0.0)).sum::<f32>()
            + gap * items.len().saturating_sub(1) as f32;
        let free_main = (main_size - used_main).max(0.0);
        let auto_margins = items.iter().filter(|i| i.margin_main_start.is_none()).count()
            + items.iter().filter(|i| i.margin_main_end.is_none()).count();

        let (mut main_cursor, main_between, main_each) = if auto_margins > 0 {
            (0.0, 0.0, 0.0)
        } else {
            match node.style.justify_content {
                JustifyContent::FlexStart => (0.0, 0.0, 0.0),
                JustifyContent::FlexEnd => (free_main, 0.0, 0.0),
                JustifyContent::Center => (free_main / 2.0, 0.0, 0.0),
                JustifyContent::SpaceBetween if items.len() > 1 => (0.0, free_main / (items.len() - 1) as f32, 0.0),
                JustifyContent::SpaceBetween => (0.0, 0.0, 0.0),
                JustifyContent::SpaceAround => (free_main / (2.0 * items.len() as f32), 0.0, free_main / items.len() as f32),
                JustifyContent::SpaceEvenly => (free_main / (items.len() + 1) as f32, 0.0, free_main / (items.len() + 1) as f32),
            }
        };
        let auto_margin_share = if auto_margins > 0 { free_main / auto_margins as f32 } else { 0.0 };

        // Placement is inherently sequential (each item's offset depends on
        // the running cursor), so resolve every item's local rect first and
        // only then hand the now-independent subtrees to the solver —
        // sequentially, or in parallel when every item is a layout boundary.
        // Baseline items were already fully solved in Step 2 at a
        // provisional origin, so they're repositioned by translation
        // instead of going through `dispatch_children`.
        let line_baseline = items
            .iter()
            .filter(|i| i.align == AlignItems::Baseline)
            .map(|i| i.baseline)
            .fold(0.0f32, f32::max);

        let mut rects: Vec<(FlowPath, f32, f32, f32, f32)> = Vec::with_capacity(items.len());
        let mut baseline_rects: Vec<(FlowPath, f32, f32, f32, f32)> = Vec::new();

        for (pos, item) in items.iter_mut().enumerate() {
            if pos > 0 {
                main_cursor += gap + main_between;
            }
            let m_start = item.margin_main_start.unwrap_or(auto_margin_share);
            let m_end = item.margin_main_end.unwrap_or(auto_margin_share);
            main_cursor += m_start;

            let cross_margin_start = item.margin_cross_start.unwrap_or(0.0);
            let cross_margin_end = item.margin_cross_end.unwrap_or(0.0);
            let available_cross = (line_cross - cross_margin_start - cross_margin_end).max(0.0);
            let item_cross = item.cross_final - cross_margin_start - cross_margin_end;
            let cross_offset = match item.align {
                AlignItems::FlexStart => cross_margin_start,
                AlignItems::FlexEnd => (line_cross - item_cross - cross_margin_end).max(cross_margin_start),
                AlignItems::Center => cross_margin_start + (available_cross - item_cross).max(0.0) / 2.0,
                AlignItems::Stretch => cross_margin_start,
                AlignItems::Baseline => cross_margin_start + (line_baseline - item.baseline).max(0.0),
            };
            let final_cross_size = if item.align == AlignItems::Stretch { available_cross } else { item_cross };

            let (x, y, w, h) = if is_row {
                (main_cursor, cross_cursor + cross_offset, item.main_final, final_cross_size)
            } else {
                (cross_cursor + cross_offset, main_cursor, final_cross_size, item.main_final)
            };
            if item.align == AlignItems::Baseline {
                baseline_rects.push((item.index.clone(), x, y, w, h));
            } else {
                rects.push((item.index.clone(), x, y, w, h));
            }

            main_cursor += item.main_final + m_end;
            main_cursor += main_each;
        }

        if is_main_reverse {
            mirror_main_axis_rects(&mut rects, main_size, is_row);
            mirror_main_axis_rects(&mut baseline_rects, main_size, is_row);
        }

        for (path, x, y, _, _) in baseline_rects {
            path_mut(node, &path).translate(origin_x + content_x + x, origin_y + content_y + y);
        }

        dispatch_children(node, rects, origin_x, origin_y, content_x, content_y, config);

        cross_cursor += line_cross + cross_gap + extra_between + extra_each;
    }
}

/// Solve each child named in `rects` at its already-resolved box. Runs the
/// children concurrently when the engine is configured for it and every
/// child in this batch is a direct (depth-1, `Display::Contents`-free) layout
/// boundary — otherwise falls back to the sequential order, which must (and
/// does) produce bit-identical output. A path with depth greater than one
/// names a child hoisted out of a `Display::Contents` wrapper; those are
/// always solved sequentially through the path, bypassing the parallel
/// thread-scope dispatch below.
fn dispatch_children(
    node: &mut LayoutNode,
    rects: Vec<(FlowPath, f32, f32, f32, f32)>,
    origin_x: f32,
    origin_y: f32,
    content_x: f32,
    content_y: f32,
    config: &EngineConfig,
) {
    let (direct, nested): (Vec<_>, Vec<_>) = rects.into_iter().partition(|(path, ..)| path.len() == 1);

    for (path, x, y, w, h) in nested {
        let child = path_mut(node, &path);
        solve_subtree(child, AvailableSpace::exact(w, h), (origin_x + content_x + x, origin_y + content_y + y), config);
    }

    let direct: Vec<(usize, f32, f32, f32, f32)> = direct.into_iter().map(|(path, x, y, w, h)| (path[0], x, y, w, h)).collect();

    let parallel = config.parallel_layout
        && direct.len() > 1
        && direct.iter().all(|(idx, _, _, _, _)| node.children[*idx].is_boundary());

    if !parallel {
        for (idx, x, y, w, h) in direct {
            let child = &mut node.children[idx];
            solve_subtree(child, AvailableSpace::exact(w, h), (origin_x + content_x + x, origin_y + content_y + y), config);
        }
        return;
    }

    let mut by_index: std::collections::HashMap<usize, &mut LayoutNode> = node.children.iter_mut().enumerate().collect();
    let mut jobs: Vec<(&mut LayoutNode, AvailableSpace, (f32, f32))> = direct
        .into_iter()
        .map(|(idx, x, y, w, h)| {
            (
                by_index.remove(&idx).expect("index came from this node's own children"),
                AvailableSpace::exact(w, h),
                (origin_x + content_x + x, origin_y + content_y + y),
            )
        })
        .collect();

    std::thread::scope(|scope| {
        for (child, available, origin) in jobs.iter_mut() {
            let available = *available;
            let origin = *origin;
            scope.spawn(move || solve_subtree(child, available, origin, config));
        }
    });
}

fn resolve_align_self(self_align: AlignSelf, container: AlignItems) -> AlignItems {
    match self_align {
        AlignSelf::Auto => container,
        AlignSelf::Stretch => AlignItems::Stretch,
        AlignSelf::FlexStart => AlignItems::FlexStart,
        AlignSelf::Center => AlignItems::Center,
        AlignSelf::FlexEnd => AlignItems::FlexEnd,
        AlignSelf::Baseline => AlignItems::Baseline,
    }
}

/// Mirror already-placed children across the main axis, for
/// `row-reverse`/`column-reverse`.
fn mirror_main_axis_rects(rects: &mut [(FlowPath, f32, f32, f32, f32)], main_size: f32, is_row: bool) {
    for (_, x, y, w, h) in rects.iter_mut() {
        if is_row {
            *x = main_size - *x - *w;
        } else {
            *y = main_size - *y - *h;
        }
    }
}

fn layout_absolute_children(node: &mut LayoutNode, config: &EngineConfig) {
    let width = node.result.width;
    let height = node.result.height;
    let x0 = node.result.x;
    let y0 = node.result.y;
    for child in node.children.iter_mut() {
        if child.style.position != Position::Absolute {
            continue;
        }
        let inset = child.style.inset;
        let left = inset.left.and_then(|d| resolve_dimension(d, width));
        let top = inset.top.and_then(|d| resolve_dimension(d, height));
        let right = inset.right.and_then(|d| resolve_dimension(d, width));
        let bottom = inset.bottom.and_then(|d| resolve_dimension(d, height));

        let available = AvailableSpace {
            width: left.zip(right).map(|(l, r)| SizingMode::Exactly(width - l - r)).unwrap_or(SizingMode::MaxContent),
            height: top.zip(bottom).map(|(t, b)| SizingMode::Exactly(height - t - b)).unwrap_or(SizingMode::MaxContent),
        };
        let (w, h) = measure_node(child, available, config);
        let x = left.unwrap_or_else(|| right.map(|r| width - r - w).unwrap_or(0.0));
        let y = top.unwrap_or_else(|| bottom.map(|b| height - b - h).unwrap_or(0.0));
        solve_subtree(child, AvailableSpace::exact(w, h), (x0 + x, y0 + y), config);
    }
}

/// Distance from `node`'s top edge to its first in-flow child's baseline,
/// or its own measured height when no baseline callback and no children
/// provide one (used by `AlignItems::Baseline`).
pub fn baseline_of(node: &LayoutNode) -> f32 {
    if let Some(baseline) = &node.baseline {
        return baseline(node.result);
    }
    node.children
        .iter()
        .find(|c| c.style.position != Position::Absolute && c.style.display != Display::None)
        .map(baseline_of)
        .unwrap_or(node.result.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::style::LayoutStyle;

    fn leaf(w: f32, h: f32) -> LayoutNode {
        LayoutNode::leaf(LayoutStyle::default(), std::sync::Arc::new(move |_| (w, h)))
    }

    #[test]
    fn row_children_are_placed_left_to_right() {
        let mut root = LayoutNode::new(LayoutStyle::default());
        root.add_child(leaf(10.0, 10.0)).unwrap();
        root.add_child(leaf(20.0, 10.0)).unwrap();
        let config = EngineConfig::default();
        solve_subtree(&mut root, AvailableSpace::exact(100.0, 50.0), (0.0, 0.0), &config);
        assert_eq!(root.children[0].result.x, 0.0);
        assert_eq!(root.children[1].result.x, 10.0);
    }

    #[test]
    fn flex_grow_distributes_free_space() {
        let mut root = LayoutNode::new(LayoutStyle::default());
        let mut a = leaf(10.0, 10.0);
        a.style.flex_grow = 1.0;
        let mut b = leaf(10.0, 10.0);
        b.style.flex_grow = 1.0;
        root.add_child(a).unwrap();
        root.add_child(b).unwrap();
        let config = EngineConfig::default();
        solve_subtree(&mut root, AvailableSpace::exact(100.0, 50.0), (0.0, 0.0), &config);
        assert!((root.children[0].result.width - 50.0).abs() < 0.01);
        assert!((root.children[1].result.width - 50.0).abs() < 0.01);
    }

    #[test]
    fn justify_content_center_splits_remaining_space() {
        let mut root = LayoutNode::new(LayoutStyle::default());
        root.style.justify_content = JustifyContent::Center;
        root.add_child(leaf(20.0, 10.0)).unwrap();
        let config = EngineConfig::default();
        solve_subtree(&mut root, AvailableSpace::exact(100.0, 50.0), (0.0, 0.0), &config);
        assert!((root.children[0].result.x - 40.0).abs() < 0.01);
    }

    #[test]
    fn baseline_alignment_lines_up_items_by_their_baseline_offset() {
        let mut root = LayoutNode::new(LayoutStyle::default());
        root.style.align_items = AlignItems::Baseline;

        let mut a = leaf(10.0, 40.0);
        a.baseline = Some(std::sync::Arc::new(|rect| rect.height - 24.0)); // baseline 16 from top
        let mut b = leaf(10.0, 48.0);
        b.baseline = Some(std::sync::Arc::new(|rect| rect.height - 16.0)); // baseline 32 from top

        root.add_child(a).unwrap();
        root.add_child(b).unwrap();
        let config = EngineConfig::default();
        solve_subtree(&mut root, AvailableSpace::exact(100.0, 50.0), (0.0, 0.0), &config);

        let a_y = root.children[0].result.y;
        let b_y = root.children[1].result.y;
        assert!((b_y + 32.0 - (a_y + 16.0)).abs() < 0.01);
    }

    #[test]
    fn display_contents_hoists_children_into_the_parent_flex_flow() {
        let mut root = LayoutNode::new(LayoutStyle::default());
        let mut wrapper = LayoutNode::new(LayoutStyle::default());
        wrapper.style.display = Display::Contents;
        wrapper.add_child(leaf(10.0, 10.0)).unwrap();
        wrapper.add_child(leaf(20.0, 10.0)).unwrap();
        root.add_child(wrapper).unwrap();
        root.add_child(leaf(5.0, 10.0)).unwrap();

        let config = EngineConfig::default();
        solve_subtree(&mut root, AvailableSpace::exact(100.0, 50.0), (0.0, 0.0), &config);

        let wrapper = &root.children[0];
        assert_eq!(wrapper.result.width, 0.0);
        assert_eq!(wrapper.children[0].result.x, 0.0);
        assert_eq!(wrapper.children[1].result.x, 10.0);
        assert_eq!(root.children[1].result.x, 30.0);
    }

    #[test]
    fn cache_hit_skips_recomputation_of_children() {
        let mut root = LayoutNode::new(LayoutStyle::default());
        root.add_child(leaf(10.0, 10.0)).unwrap();
        let config = EngineConfig::default();
        solve_subtree(&mut root, AvailableSpace::exact(100.0, 50.0), (0.0, 0.0), &config);
        let first_child_x = root.children[0].result.x;
        root.children[0].result.x = -999.0; // perturb to detect a fresh solve
        solve_subtree(&mut root, AvailableSpace::exact(100.0, 50.0), (0.0, 0.0), &config);
        assert_eq!(root.children[0].result.x, -999.0, "cache hit must not re-walk children");
        let _ = first_child_x;
    }
}
