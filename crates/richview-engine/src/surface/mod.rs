//! The rendering surface seen from the engine.
//!
//! A surface lays a document out and owns the host's native selection. It
//! knows nothing about document positions: everything crosses this boundary
//! as [`NativePoint`]s (a rendered unit plus an offset) and screen geometry.

pub mod monospace;

pub use monospace::{Metrics, MonospaceSurface};

use serde::{Deserialize, Serialize};

use crate::position::{Document, NodeId};
use crate::selection::Bias;

/// A point in the rendered output.
///
/// - text unit: `offset` counts characters
/// - element unit: `offset` is a child index
/// - leaf unit: `0` is before the leaf, `1` after it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativePoint {
    pub unit: NodeId,
    pub offset: usize,
}

impl NativePoint {
    pub fn new(unit: NodeId, offset: usize) -> Self {
        Self { unit, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSelection {
    pub anchor: NativePoint,
    pub head: NativePoint,
}

impl NativeSelection {
    pub fn collapsed(point: NativePoint) -> Self {
        Self {
            anchor: point,
            head: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }
}

/// Screen rectangle. `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Rect {
    /// Zero-width rectangle at `x` spanning `top..bottom`
    pub fn caret(x: f32, top: f32, bottom: f32) -> Self {
        Self {
            top,
            bottom,
            left: x,
            right: x,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.left + self.right) / 2.0,
            y: (self.top + self.bottom) / 2.0,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Document order this direction moves in
    pub fn bias(self) -> Bias {
        match self {
            Direction::Left | Direction::Up => Bias::Backward,
            Direction::Right | Direction::Down => Bias::Forward,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

/// Outcome of asking the surface to move a caret on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeMove {
    Moved(NativePoint),
    /// The surface refused, e.g. at the edge of the document
    Unchanged,
}

/// Capabilities the engine needs from a host rendering surface.
pub trait RenderSurface {
    /// Lay out a new document snapshot. Geometry queries reflect it afterwards.
    fn render(&mut self, doc: &Document);

    /// The host's current selection, if it has one.
    fn read_selection(&self) -> Option<NativeSelection>;

    /// Replace the host's selection. Applied before the next geometry query.
    fn write_selection(&mut self, selection: NativeSelection);

    /// For a text unit, the box of the character at `offset`; for element and
    /// leaf units, the unit's bounding box. `None` when nothing is rendered
    /// there.
    fn rect_for_offset(&self, point: NativePoint) -> Option<Rect>;

    /// Coarse hit test.
    fn hit_test(&self, point: Point) -> Option<NativePoint>;

    /// Where the host would move a caret at `from` by itself.
    fn native_move(&self, direction: Direction, from: NativePoint) -> NativeMove;
}
