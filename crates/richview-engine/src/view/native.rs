//! Mapping between document positions and native points.

use crate::error::{Result, ViewError};
use crate::position::Document;
use crate::selection::Selection;
use crate::surface::{NativePoint, NativeSelection};

/// The native point for a caret at `pos`.
///
/// A text unit is used wherever one touches `pos`; when one text unit ends
/// and another starts there, the later one wins. Anywhere else the point is
/// a child index of the innermost containing element.
pub fn native_point_at(doc: &Document, pos: usize) -> Result<NativePoint> {
    let resolved = doc.resolve(pos)?;
    let depth = resolved.depth();
    let parent = doc.entry(resolved.parent());

    let texts = move || {
        parent
            .children
            .iter()
            .map(move |&child| doc.entry(child))
            .filter(|child| child.node.is_text())
    };
    if let Some(text) = texts().find(|text| text.start <= pos && pos < text.end) {
        return Ok(NativePoint::new(text.id, pos - text.start));
    }
    if let Some(text) = texts().find(|text| text.end == pos) {
        return Ok(NativePoint::new(text.id, pos - text.start));
    }
    Ok(NativePoint::new(parent.id, resolved.index(depth)))
}

/// The native selection that represents `selection`.
///
/// A node selection becomes the range `(parent, i)..(parent, i + 1)` around
/// the selected child.
pub fn native_selection_for(doc: &Document, selection: &Selection) -> Result<NativeSelection> {
    match selection {
        Selection::Text(text) => Ok(NativeSelection {
            anchor: native_point_at(doc, text.anchor())?,
            head: native_point_at(doc, text.head())?,
        }),
        Selection::Node(node) => {
            let resolved = doc.resolve(node.pos())?;
            let parent = resolved.parent();
            let index = resolved.index(resolved.depth());
            Ok(NativeSelection {
                anchor: NativePoint::new(parent, index),
                head: NativePoint::new(parent, index + 1),
            })
        }
    }
}

/// The document position a native point denotes.
pub fn pos_from_native(doc: &Document, point: NativePoint) -> Result<usize> {
    let unresolvable = || ViewError::UnresolvableNativePoint {
        unit: point.unit,
        offset: point.offset,
    };
    let entry = doc.get(point.unit).ok_or_else(unresolvable)?;

    if entry.node.is_text() {
        return (point.offset <= entry.node.size())
            .then(|| entry.start + point.offset)
            .ok_or_else(unresolvable);
    }
    if entry.node.is_leaf() {
        return match point.offset {
            0 => Ok(entry.start),
            1 => Ok(entry.end),
            _ => Err(unresolvable()),
        };
    }
    match entry.children.get(point.offset) {
        Some(&child) => Ok(doc.entry(child).start),
        None if point.offset == entry.children.len() => Ok(entry.content_end),
        None => Err(unresolvable()),
    }
}
