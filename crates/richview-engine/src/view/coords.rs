//! Screen geometry for document positions and back.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewError};
use crate::model::NodeKind;
use crate::position::{Document, NodeId};
use crate::surface::{NativePoint, Point, Rect, RenderSurface};

use super::native::{native_point_at, pos_from_native};

/// Result of mapping a screen point to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionAtCoords {
    pub pos: usize,
    /// Position of the selectable leaf the point lies on, if any
    pub inside: Option<usize>,
}

/// Zero-width caret rectangle for `pos`.
pub fn coords_at_pos<S: RenderSurface + ?Sized>(doc: &Document, surface: &S, pos: usize) -> Result<Rect> {
    let point = native_point_at(doc, pos)?;
    Ok(caret_rect(doc, surface, point).unwrap_or_else(|| {
        debug!("no geometry for position {pos} at {point:?}");
        Rect::default()
    }))
}

fn caret_rect<S: RenderSurface + ?Sized>(doc: &Document, surface: &S, point: NativePoint) -> Option<Rect> {
    let entry = doc.get(point.unit)?;

    if entry.node.is_text() {
        let after = surface
            .rect_for_offset(point)
            .filter(|rect| rect.width() > 0.0)
            .map(|rect| Rect::caret(rect.left, rect.top, rect.bottom));
        let before = || {
            let offset = point.offset.checked_sub(1)?;
            let rect = surface.rect_for_offset(NativePoint::new(point.unit, offset))?;
            Some(Rect::caret(rect.right, rect.top, rect.bottom))
        };
        return after.or_else(before);
    }
    if entry.node.is_leaf() {
        let rect = surface.rect_for_offset(NativePoint::new(point.unit, 0))?;
        let x = if point.offset == 0 { rect.left } else { rect.right };
        return Some(Rect::caret(x, rect.top, rect.bottom));
    }

    if let Some(&after) = entry.children.get(point.offset) {
        return start_rect(surface, after);
    }
    if let Some(&before) = point.offset.checked_sub(1).and_then(|i| entry.children.get(i)) {
        if doc.entry(before).node.kind() == &NodeKind::HardBreak {
            return after_break_rect(surface, point.unit, before);
        }
        return end_rect(doc, surface, before);
    }
    let rect = surface.rect_for_offset(NativePoint::new(point.unit, 0))?;
    Some(Rect::caret(rect.left, rect.top, rect.bottom))
}

/// Left edge of a unit: its first character for text, its box otherwise
fn start_rect<S: RenderSurface + ?Sized>(surface: &S, unit: NodeId) -> Option<Rect> {
    let rect = surface.rect_for_offset(NativePoint::new(unit, 0))?;
    Some(Rect::caret(rect.left, rect.top, rect.bottom))
}

/// Start of the line a trailing hard break opens in `textblock`
fn after_break_rect<S: RenderSurface + ?Sized>(surface: &S, textblock: NodeId, br: NodeId) -> Option<Rect> {
    let br = surface.rect_for_offset(NativePoint::new(br, 0))?;
    let block = surface.rect_for_offset(NativePoint::new(textblock, 0))?;
    Some(Rect::caret(block.left, br.bottom, br.bottom + br.height()))
}

/// Right edge of a unit: its last character for text, its box otherwise
fn end_rect<S: RenderSurface + ?Sized>(doc: &Document, surface: &S, unit: NodeId) -> Option<Rect> {
    let entry = doc.entry(unit);
    let offset = if entry.node.is_text() {
        entry.node.size().checked_sub(1)?
    } else {
        0
    };
    let rect = surface.rect_for_offset(NativePoint::new(unit, offset))?;
    Some(Rect::caret(rect.right, rect.top, rect.bottom))
}

/// The document position closest to a screen point.
///
/// Points the surface cannot place resolve to the nearest document boundary:
/// `0` above the first block, the document size anywhere else.
pub fn pos_at_coords<S: RenderSurface + ?Sized>(doc: &Document, surface: &S, point: Point) -> PositionAtCoords {
    match find_pos_at_coords(doc, surface, point) {
        Ok(found) => found,
        Err(err) => {
            debug!("{err}, falling back to a document boundary");
            let above = surface
                .rect_for_offset(NativePoint::new(NodeId::ROOT, 0))
                .is_none_or(|root| point.y < root.top);
            PositionAtCoords {
                pos: if above { 0 } else { doc.size() },
                inside: None,
            }
        }
    }
}

fn find_pos_at_coords<S: RenderSurface + ?Sized>(
    doc: &Document,
    surface: &S,
    point: Point,
) -> Result<PositionAtCoords> {
    let hit = surface
        .hit_test(point)
        .ok_or(ViewError::AmbiguousHit {
            x: point.x,
            y: point.y,
        })?;
    let entry = doc.get(hit.unit).ok_or(ViewError::UnresolvableNativePoint {
        unit: hit.unit,
        offset: hit.offset,
    })?;
    let parent = entry.parent.map(|parent| doc.entry(parent));
    let in_textblock = parent.is_some_and(|parent| parent.node.is_textblock());

    let inside = entry.node.is_selectable().then_some(entry.start);
    if entry.node.is_leaf() && !in_textblock {
        let pos = match surface.rect_for_offset(NativePoint::new(entry.id, 0)) {
            Some(rect) if point.x >= rect.center().x => entry.end,
            _ => entry.start,
        };
        return Ok(PositionAtCoords { pos, inside });
    }

    let textblock = if entry.node.is_textblock() {
        Some(entry.id)
    } else if in_textblock {
        entry.parent
    } else {
        textblock_band(doc, surface, entry.id, point.y)
    };
    let pos = match textblock {
        Some(textblock) => closest_in_textblock(doc, surface, textblock, point)?,
        None => pos_from_native(doc, hit)?,
    };
    Ok(PositionAtCoords { pos, inside })
}

/// The textblock inside `container` whose lines cover `y`.
fn textblock_band<S: RenderSurface + ?Sized>(
    doc: &Document,
    surface: &S,
    container: NodeId,
    y: f32,
) -> Option<NodeId> {
    let container = doc.entry(container);
    doc.textblocks()
        .filter(|textblock| {
            textblock.depth > container.depth
                && textblock.start >= container.content_start
                && textblock.end <= container.content_end
        })
        .find(|textblock| {
            let top = coords_at_pos(doc, surface, textblock.content_start);
            let bottom = coords_at_pos(doc, surface, textblock.content_end);
            matches!((top, bottom), (Ok(top), Ok(bottom)) if y >= top.top && y < bottom.bottom)
        })
        .map(|textblock| textblock.id)
}

/// Binary search the positions of a textblock in (line, x) order and pick
/// the closer of the two candidates that straddle `point` on its line.
fn closest_in_textblock<S: RenderSurface + ?Sized>(
    doc: &Document,
    surface: &S,
    textblock: NodeId,
    point: Point,
) -> Result<usize> {
    let entry = doc.entry(textblock);
    let before_point = |pos: usize| -> Result<bool> {
        let rect = coords_at_pos(doc, surface, pos)?;
        Ok(if point.y < rect.top {
            false
        } else if point.y >= rect.bottom {
            true
        } else {
            rect.left <= point.x
        })
    };

    // First position at or after the point
    let (mut low, mut high) = (entry.content_start, entry.content_end + 1);
    while low < high {
        let mid = low + (high - low) / 2;
        if before_point(mid)? {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    let split = low;

    let mut closest: Option<(usize, f32)> = None;
    let candidates = [split.checked_sub(1), Some(split)];
    for pos in candidates.into_iter().flatten() {
        if pos < entry.content_start || pos > entry.content_end {
            continue;
        }
        let rect = coords_at_pos(doc, surface, pos)?;
        if point.y < rect.top || point.y >= rect.bottom {
            continue;
        }
        let distance = (rect.left - point.x).abs();
        // Ties go to the later position
        if closest.is_none_or(|(_, best)| distance <= best) {
            closest = Some((pos, distance));
        }
    }

    Ok(match closest {
        Some((pos, _)) => pos,
        None => split.min(entry.content_end),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::*;
    use crate::surface::{Metrics, MonospaceSurface};
    use pretty_assertions::assert_eq;

    fn rendered(tree: crate::model::Node) -> (Document, MonospaceSurface) {
        let doc = Document::new(tree);
        let mut surface = MonospaceSurface::new(Metrics::default());
        surface.render(&doc);
        (doc, surface)
    }

    #[test]
    fn caret_rects_have_zero_width() {
        let (doc, surface) = rendered(doc([p([text("one")]), p([text("two")])]));
        for pos in [1, 2, 4, 6, 9] {
            let rect = coords_at_pos(&doc, &surface, pos).unwrap();
            assert_eq!(rect.left, rect.right);
            assert!(rect.bottom > rect.top);
        }
        assert_eq!(coords_at_pos(&doc, &surface, 4).unwrap().left, 24.0);
        assert_eq!(coords_at_pos(&doc, &surface, 6).unwrap().top, 16.0);
    }

    #[test]
    fn empty_textblock_uses_its_own_box() {
        let (doc, surface) = rendered(doc([p([text("a")]), p([])]));
        let rect = coords_at_pos(&doc, &surface, 4).unwrap();
        assert_eq!(rect, Rect::caret(0.0, 16.0, 32.0));
    }

    #[test]
    fn trailing_hard_break_puts_the_caret_on_the_next_line() {
        let (doc, surface) = rendered(doc([p([text("a"), br()])]));
        assert_eq!(coords_at_pos(&doc, &surface, 2).unwrap(), Rect::caret(8.0, 0.0, 16.0));
        assert_eq!(coords_at_pos(&doc, &surface, 3).unwrap(), Rect::caret(0.0, 16.0, 32.0));
        for pos in 1..=3 {
            let rect = coords_at_pos(&doc, &surface, pos).unwrap();
            let centre = Point::new(rect.left, (rect.top + rect.bottom) / 2.0);
            assert_eq!(pos_at_coords(&doc, &surface, centre).pos, pos, "position {pos}");
        }
    }

    #[test]
    fn positions_between_blocks_use_the_neighbouring_box() {
        let (doc, surface) = rendered(doc([p([text("one")]), hr()]));
        let before_rule = coords_at_pos(&doc, &surface, 5).unwrap();
        assert_eq!(before_rule, Rect::caret(0.0, 16.0, 32.0));
        let after_rule = coords_at_pos(&doc, &surface, 6).unwrap();
        assert_eq!(after_rule, Rect::caret(640.0, 16.0, 32.0));
    }

    #[test]
    fn out_of_range_positions_fail() {
        let (doc, surface) = rendered(doc([p([text("one")])]));
        assert_eq!(
            coords_at_pos(&doc, &surface, 6).unwrap_err(),
            ViewError::OutOfRange { pos: 6, size: 5 }
        );
    }

    #[test]
    fn point_on_a_rule_picks_a_side() {
        let (doc, surface) = rendered(doc([p([text("one")]), hr(), p([text("two")])]));
        assert_eq!(
            pos_at_coords(&doc, &surface, Point::new(10.0, 20.0)),
            PositionAtCoords { pos: 5, inside: Some(5) }
        );
        assert_eq!(
            pos_at_coords(&doc, &surface, Point::new(600.0, 20.0)),
            PositionAtCoords { pos: 6, inside: Some(5) }
        );
    }

    #[test]
    fn point_on_an_image_reports_it() {
        let (doc, surface) = rendered(doc([p([text("foo"), img(), text("bar")])]));
        assert_eq!(
            pos_at_coords(&doc, &surface, Point::new(27.0, 8.0)),
            PositionAtCoords { pos: 4, inside: Some(4) }
        );
        assert_eq!(
            pos_at_coords(&doc, &surface, Point::new(37.0, 8.0)),
            PositionAtCoords { pos: 5, inside: Some(4) }
        );
    }

    #[test]
    fn point_in_a_quote_margin_refines_into_its_text() {
        let (doc, surface) = rendered(doc([blockquote([p([text("one")]), p([text("two")])])]));
        assert_eq!(pos_at_coords(&doc, &surface, Point::new(2.0, 20.0)).pos, 7);
    }

    #[test]
    fn equal_distance_prefers_the_later_position() {
        let (doc, surface) = rendered(doc([p([text("ab")])]));
        assert_eq!(pos_at_coords(&doc, &surface, Point::new(4.0, 8.0)).pos, 2);
    }

    #[test]
    fn points_off_the_document_fall_back_to_a_boundary() {
        let (doc, surface) = rendered(doc([p([text("one")]), p([text("two")])]));
        assert_eq!(pos_at_coords(&doc, &surface, Point::new(5.0, -10.0)).pos, 0);
        assert_eq!(pos_at_coords(&doc, &surface, Point::new(5.0, 500.0)).pos, 10);

        let (empty, surface) = rendered(crate::model::build::doc([]));
        assert_eq!(pos_at_coords(&empty, &surface, Point::new(5.0, 5.0)).pos, 0);
    }
}
