//! Turning the host's native selection into a document selection.

use crate::error::{Result, ViewError};
use crate::position::Document;
use crate::selection::{Bias, NodeSelection, Selection, TextSelection};
use crate::surface::{NativePoint, NativeSelection};

use super::native::pos_from_native;

/// Interpret a native selection against `doc`.
///
/// Fails with [`ViewError::UnresolvableNativePoint`] when either end names a
/// unit or offset that does not exist in `doc`; callers keep their previous
/// selection in that case.
pub fn selection_from_native(doc: &Document, native: NativeSelection) -> Result<Selection> {
    if let Some(node) = spanned_leaf(doc, &native) {
        return Ok(Selection::Node(node));
    }

    let anchor = toward_text(doc, native.anchor)?;
    let head = toward_text(doc, native.head)?;

    if anchor == head {
        let entry = doc.entry(head.unit);
        if entry.node.is_selectable() {
            return Ok(Selection::Node(NodeSelection::new(doc, entry.start)?));
        }
    }

    let anchor_pos = pos_from_native(doc, anchor)?;
    let head_pos = pos_from_native(doc, head)?;
    if let Ok(text) = TextSelection::new(doc, anchor_pos, head_pos) {
        return Ok(Selection::Text(text));
    }

    let unresolvable = || ViewError::UnresolvableNativePoint {
        unit: native.head.unit,
        offset: native.head.offset,
    };
    if anchor_pos == head_pos {
        return Selection::near(doc, head_pos, Bias::Forward).ok_or_else(unresolvable);
    }
    let snap = |pos| match Selection::near(doc, pos, Bias::Forward)? {
        Selection::Text(text) => Some(text.head()),
        Selection::Node(_) => None,
    };
    match (snap(anchor_pos), snap(head_pos)) {
        (Some(anchor), Some(head)) => Ok(Selection::Text(TextSelection::new(doc, anchor, head)?)),
        _ => Selection::near(doc, head_pos, Bias::Forward).ok_or_else(unresolvable),
    }
}

/// A native range `(element, i)..(element, i + 1)` around one selectable leaf
/// is how node selections are written, so it reads back as one.
fn spanned_leaf(doc: &Document, native: &NativeSelection) -> Option<NodeSelection> {
    let (anchor, head) = (native.anchor, native.head);
    if anchor.unit != head.unit || anchor.offset.abs_diff(head.offset) != 1 {
        return None;
    }
    let element = doc.get(anchor.unit)?;
    if element.node.is_text() || element.node.is_leaf() {
        return None;
    }
    let child = doc.entry(*element.children.get(anchor.offset.min(head.offset))?);
    if !child.node.is_selectable() {
        return None;
    }
    NodeSelection::new(doc, child.start).ok()
}

/// Walk an element point down toward text: into the child after the offset
/// when there is one, else into the end of the child before it. Stops at
/// textblocks, text units, leaves and empty elements.
fn toward_text(doc: &Document, point: NativePoint) -> Result<NativePoint> {
    let unresolvable = ViewError::UnresolvableNativePoint {
        unit: point.unit,
        offset: point.offset,
    };
    let mut point = point;
    loop {
        let entry = doc.get(point.unit).ok_or_else(|| unresolvable.clone())?;
        if entry.node.is_text() || entry.node.is_leaf() || entry.node.is_textblock() {
            return Ok(point);
        }
        if point.offset > entry.children.len() {
            return Err(unresolvable);
        }
        if let Some(&after) = entry.children.get(point.offset) {
            point = NativePoint::new(after, 0);
        } else if let Some(&before) = point.offset.checked_sub(1).and_then(|i| entry.children.get(i)) {
            point = NativePoint::new(before, end_offset(doc, before));
        } else {
            return Ok(point);
        }
    }
}

/// The native offset at the end of a unit.
fn end_offset(doc: &Document, unit: crate::position::NodeId) -> usize {
    let entry = doc.entry(unit);
    if entry.node.is_text() {
        entry.node.size()
    } else if entry.node.is_leaf() {
        1
    } else {
        entry.children.len()
    }
}
