//! Position model, selection synchronisation, coordinate mapping and cursor
//! motion for a rich-text view over an abstract rendering surface.

pub mod error;
pub mod model;
pub mod position;
pub mod selection;
pub mod surface;
pub mod view;

// Re-export key types for easier usage
pub use error::{Result, ViewError};
pub use model::{Mark, Node, NodeKind, markdown::parse_markdown};
pub use position::{Document, IndexedNode, NodeId, ResolvedPos};
pub use selection::{Bias, NodeSelection, Selection, TextSelection};
pub use surface::{
    Direction, Metrics, MonospaceSurface, NativeMove, NativePoint, NativeSelection, Point, Rect,
    RenderSurface,
};
pub use view::{EditorView, PositionAtCoords, ViewEvent};
