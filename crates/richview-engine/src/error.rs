use thiserror::Error;

use crate::position::NodeId;

/// Errors raised by the position model, selection constructors and the
/// native-point mapping.
///
/// `OutOfRange`, `NotSelectable` and `NotTextPosition` are programming errors
/// and propagate to the caller. `UnresolvableNativePoint` and `AmbiguousHit`
/// come from the host side; the reader and the coordinate mapper recover from
/// them without touching the current selection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    #[error("position {pos} is outside the document (size {size})")]
    OutOfRange { pos: usize, size: usize },

    #[error("no selectable leaf node at position {pos}")]
    NotSelectable { pos: usize },

    #[error("position {pos} does not point into a textblock")]
    NotTextPosition { pos: usize },

    #[error("native point ({unit:?}, {offset}) does not belong to the current document")]
    UnresolvableNativePoint { unit: NodeId, offset: usize },

    #[error("hit test at ({x}, {y}) has no unique position")]
    AmbiguousHit { x: f32, y: f32 },
}

pub type Result<T> = std::result::Result<T, ViewError>;
