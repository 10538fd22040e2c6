//! # Editor view
//!
//! [`EditorView`] keeps a document snapshot, the document selection and a
//! [`RenderSurface`] in agreement:
//!
//! - host selection changes are read back through [`reader`]
//! - arrow motion goes through [`motion`] and is written out through
//!   [`native`]
//! - [`coords`] maps between positions and screen points
//!
//! ```rust
//! use richview_engine::model::build::*;
//! use richview_engine::surface::{Direction, Metrics, MonospaceSurface};
//! use richview_engine::view::{EditorView, ViewEvent};
//!
//! let surface = MonospaceSurface::new(Metrics::default());
//! let mut view = EditorView::new(doc([p([text("foo"), img(), text("bar")])]), surface);
//!
//! // The caret starts at the beginning of the first textblock
//! assert_eq!(view.selection().map(|sel| sel.head()), Some(1));
//!
//! for _ in 0..4 {
//!     view.dispatch(ViewEvent::Move(Direction::Right));
//! }
//! // The image is selected instead of being skipped
//! assert_eq!(view.selection().map(|sel| sel.to_string()), Some("node 4".to_string()));
//! ```

pub mod coords;
pub mod motion;
pub mod native;
pub mod reader;

pub use coords::PositionAtCoords;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::Node;
use crate::position::Document;
use crate::selection::{Bias, NodeSelection, Selection};
use crate::surface::{Direction, Point, Rect, RenderSurface};

/// Host events the view reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewEvent {
    /// The host's native selection changed, e.g. after a click
    SelectionChanged,
    /// Arrow key
    Move(Direction),
}

/// A document, its selection and the surface it is rendered on.
#[derive(Debug)]
pub struct EditorView<S: RenderSurface> {
    doc: Document,
    /// `None` only for documents without any selectable place
    selection: Option<Selection>,
    surface: S,
    /// Incremented on every document replacement
    version: u64,
}

impl<S: RenderSurface> EditorView<S> {
    /// Render `root` on `surface` with the caret at the start of the document.
    pub fn new(root: Node, mut surface: S) -> Self {
        let doc = Document::new(root);
        surface.render(&doc);
        let selection = Selection::at_start(&doc);
        let mut view = Self {
            doc,
            selection: None,
            surface,
            version: 0,
        };
        if let Some(selection) = selection {
            view.apply(selection);
        }
        view
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace the document with a new version. The selection is kept where
    /// it still fits and snapped to the nearest valid place otherwise.
    pub fn update_document(&mut self, root: Node) {
        self.version += 1;
        self.doc = Document::new(root);
        self.surface.render(&self.doc);
        trace!("rendered document version {}", self.version);

        let selection = self
            .selection
            .and_then(|selection| selection.revalidate(&self.doc))
            .or_else(|| Selection::at_start(&self.doc));
        self.selection = None;
        if let Some(selection) = selection {
            self.apply(selection);
        }
    }

    /// Make `selection` current and show it on the surface.
    pub fn set_selection(&mut self, selection: Selection) -> Result<()> {
        let native = native::native_selection_for(&self.doc, &selection)?;
        self.surface.write_selection(native);
        self.selection = Some(selection);
        Ok(())
    }

    /// Handle one host event. Returns whether the selection changed.
    pub fn dispatch(&mut self, event: ViewEvent) -> bool {
        trace!("dispatch {event:?} at version {}", self.version);
        match event {
            ViewEvent::SelectionChanged => self.read_selection(),
            ViewEvent::Move(direction) => self.move_cursor(direction),
        }
    }

    /// Take over the surface's current native selection. Unreadable
    /// selections leave the current one in place.
    pub fn read_selection(&mut self) -> bool {
        let Some(native) = self.surface.read_selection() else {
            return false;
        };
        match reader::selection_from_native(&self.doc, native) {
            Ok(selection) => {
                let changed = self.selection != Some(selection);
                self.selection = Some(selection);
                changed
            }
            Err(err) => {
                debug!("discarding native selection {native:?}: {err}");
                false
            }
        }
    }

    pub fn move_cursor(&mut self, direction: Direction) -> bool {
        let Some(current) = self.selection else {
            return false;
        };
        match motion::move_selection(&self.doc, &self.surface, &current, direction) {
            Some(next) => {
                self.apply(next);
                next != current
            }
            None => false,
        }
    }

    /// Select whatever lies under a screen point: a selectable leaf when the
    /// point is on one, else the closest caret position.
    pub fn select_at(&mut self, point: Point) -> bool {
        let found = self.pos_at_coords(point);
        let selection = found
            .inside
            .and_then(|leaf| NodeSelection::new(&self.doc, leaf).ok().map(Selection::Node))
            .or_else(|| Selection::near(&self.doc, found.pos, Bias::Forward));
        match selection {
            Some(selection) => {
                let changed = self.selection != Some(selection);
                self.apply(selection);
                changed
            }
            None => false,
        }
    }

    pub fn coords_at_pos(&self, pos: usize) -> Result<Rect> {
        coords::coords_at_pos(&self.doc, &self.surface, pos)
    }

    pub fn pos_at_coords(&self, point: Point) -> PositionAtCoords {
        coords::pos_at_coords(&self.doc, &self.surface, point)
    }

    fn apply(&mut self, selection: Selection) {
        if let Err(err) = self.set_selection(selection) {
            debug!("could not show {selection}: {err}");
        }
    }
}
