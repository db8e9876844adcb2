//! The Flexbox style vocabulary: every property a `LayoutNode` carries into
//! the solver, expressed as plain Rust enums rather than packed numeric
//! slots, since this crate's tree is a plain owned structure rather than a
//! parallel-array layout.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Points(f32),
    Percent(f32),
}

impl Default for Dimension {
    fn default() -> Self {
        Dimension::Auto
    }
}

/// Margins additionally admit `auto` per individual edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginEdge {
    Auto,
    Points(f32),
    Percent(f32),
}

impl Default for MarginEdge {
    fn default() -> Self {
        MarginEdge::Points(0.0)
    }
}

/// Border widths are always concrete points, never percent.
pub type Border = f32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Flex,
    None,
    Contents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Static,
    Relative,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inherit,
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    Visible,
    Hidden,
    Scroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxSizing {
    BorderBox,
    ContentBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    RowReverse,
    Column,
    ColumnReverse,
}

impl FlexDirection {
    pub fn is_row(self) -> bool {
        matches!(self, FlexDirection::Row | FlexDirection::RowReverse)
    }

    pub fn is_reverse(self) -> bool {
        matches!(self, FlexDirection::RowReverse | FlexDirection::ColumnReverse)
    }

    /// RTL swaps `row` <-> `row-reverse`; column axes are unaffected.
    pub fn resolve_rtl(self, direction: Direction) -> FlexDirection {
        if direction != Direction::Rtl {
            return self;
        }
        match self {
            FlexDirection::Row => FlexDirection::RowReverse,
            FlexDirection::RowReverse => FlexDirection::Row,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexWrap {
    NoWrap,
    Wrap,
    WrapReverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    FlexStart,
    Center,
    FlexEnd,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Stretch,
    FlexStart,
    Center,
    FlexEnd,
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignSelf {
    Auto,
    Stretch,
    FlexStart,
    Center,
    FlexEnd,
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignContent {
    Stretch,
    FlexStart,
    Center,
    FlexEnd,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges<T> {
    pub top: T,
    pub right: T,
    pub bottom: T,
    pub left: T,
}

impl<T: Copy> Edges<T> {
    pub fn all(v: T) -> Self {
        Self { top: v, right: v, bottom: v, left: v }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Insets {
    pub top: Option<Dimension>,
    pub right: Option<Dimension>,
    pub bottom: Option<Dimension>,
    pub left: Option<Dimension>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gap {
    pub row: Option<f32>,
    pub column: Option<f32>,
    pub general: f32,
}

impl Gap {
    /// CSS precedence: the axis-specific value wins where set, otherwise
    /// `gap` applies.
    pub fn row_gap(&self) -> f32 {
        self.row.unwrap_or(self.general)
    }

    pub fn column_gap(&self) -> f32 {
        self.column.unwrap_or(self.general)
    }

    pub fn main_gap(&self, is_row: bool) -> f32 {
        if is_row { self.column_gap() } else { self.row_gap() }
    }
}

/// Immutable Flexbox style record.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutStyle {
    pub display: Display,
    pub position: Position,
    pub direction: Direction,
    pub overflow: Overflow,
    pub box_sizing: BoxSizing,

    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub align_content: AlignContent,

    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub flex_basis: Dimension,
    pub align_self: AlignSelf,

    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub max_width: Dimension,
    pub min_height: Dimension,
    pub max_height: Dimension,
    pub aspect_ratio: Option<f32>,

    pub margin: Edges<MarginEdge>,
    pub padding: Edges<Dimension>,
    pub border: Edges<Border>,
    pub gap: Gap,
    pub inset: Insets,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            display: Display::Flex,
            position: Position::Static,
            direction: Direction::Inherit,
            overflow: Overflow::Visible,
            box_sizing: BoxSizing::BorderBox,

            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            justify_content: JustifyContent::FlexStart,
            align_items: AlignItems::Stretch,
            align_content: AlignContent::Stretch,

            flex_grow: 0.0,
            flex_shrink: 1.0,
            flex_basis: Dimension::Auto,
            align_self: AlignSelf::Auto,

            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            max_width: Dimension::Auto,
            min_height: Dimension::Auto,
            max_height: Dimension::Auto,
            aspect_ratio: None,

            margin: Edges::default(),
            padding: Edges::default(),
            border: Edges::default(),
            gap: Gap::default(),
            inset: Insets::default(),
        }
    }
}
