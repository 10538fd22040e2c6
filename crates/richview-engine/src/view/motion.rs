//! Arrow key motion.
//!
//! The surface's own caret motion is used wherever it does the right thing
//! (inside a textblock, between wrapped lines). Where it would skip an atomic
//! node, stop at a container boundary or refuse to move, the selection is
//! moved in document order instead.

use log::debug;

use crate::error::Result;
use crate::position::Document;
use crate::selection::{Bias, NodeSelection, Selection, TextSelection};
use crate::surface::{Direction, NativeMove, RenderSurface};

use super::coords::coords_at_pos;
use super::native::{native_point_at, pos_from_native};

/// The selection after moving `selection` one step in `direction`, or `None`
/// when the motion has nowhere to go.
pub fn move_selection<S: RenderSurface + ?Sized>(
    doc: &Document,
    surface: &S,
    selection: &Selection,
    direction: Direction,
) -> Option<Selection> {
    let moved = match selection {
        Selection::Node(node) => move_node(doc, surface, selection, node, direction),
        Selection::Text(text) if !text.is_empty() => collapse(doc, text, direction),
        Selection::Text(text) if direction.is_vertical() => {
            move_caret_vertically(doc, surface, selection, text.head(), direction)
        }
        Selection::Text(text) => move_caret_horizontally(doc, surface, selection, text.head(), direction),
    };
    moved.unwrap_or_else(|err| {
        debug!("motion {direction:?} from {selection} rejected: {err}");
        None
    })
}

fn collapse(doc: &Document, text: &TextSelection, direction: Direction) -> Result<Option<Selection>> {
    let pos = match direction.bias() {
        Bias::Backward => text.from(),
        Bias::Forward => text.to(),
    };
    Ok(Some(TextSelection::caret(doc, pos)?.into()))
}

/// Step out of the current textblock or leaf in document order.
fn move_block(doc: &Document, selection: &Selection, bias: Bias) -> Result<Option<Selection>> {
    let side = match bias {
        Bias::Backward => selection.from(),
        Bias::Forward => selection.to(),
    };
    let block_leaf = matches!(selection, Selection::Node(node) if !is_inline_leaf(doc, node));
    let start = if block_leaf {
        side
    } else {
        let resolved = doc.resolve(side)?;
        let depth = resolved.depth();
        let boundary = match bias {
            Bias::Backward => resolved.before(depth),
            Bias::Forward => resolved.after(depth),
        };
        boundary.unwrap_or(side)
    };
    Ok(Selection::find_from(doc, start, bias, false))
}

fn is_inline_leaf(doc: &Document, node: &NodeSelection) -> bool {
    node.node(doc)
        .and_then(|id| doc.entry(id).parent)
        .is_some_and(|parent| doc.entry(parent).node.is_textblock())
}

fn move_node<S: RenderSurface + ?Sized>(
    doc: &Document,
    surface: &S,
    selection: &Selection,
    node: &NodeSelection,
    direction: Direction,
) -> Result<Option<Selection>> {
    let inline = is_inline_leaf(doc, node);
    if !direction.is_vertical() {
        if inline {
            let pos = match direction.bias() {
                Bias::Backward => node.from(),
                Bias::Forward => node.to(),
            };
            let resolved = doc.resolve(pos)?;
            let neighbour = match direction.bias() {
                Bias::Backward => resolved.node_before(),
                Bias::Forward => resolved.node_after(),
            };
            // Another atomic leaf right behind this one is visited, not skipped
            if let Some(leaf) = neighbour.filter(|&id| doc.is_selectable(id)) {
                return Ok(Some(NodeSelection::new(doc, doc.entry(leaf).start)?.into()));
            }
            return Ok(Some(TextSelection::caret(doc, pos)?.into()));
        }
        return move_block(doc, selection, direction.bias());
    }

    let x = coords_at_pos(doc, surface, node.from())?.left;
    if inline && !on_edge_line(doc, surface, node.from(), direction)? {
        if let NativeMove::Moved(point) = surface.native_move(direction, native_point_at(doc, node.from())?) {
            let target = pos_from_native(doc, point)?;
            return Ok(Some(TextSelection::caret(doc, target)?.into()));
        }
    }
    leave_vertically(doc, surface, selection, direction, x, None)
}

fn move_caret_horizontally<S: RenderSurface + ?Sized>(
    doc: &Document,
    surface: &S,
    selection: &Selection,
    pos: usize,
    direction: Direction,
) -> Result<Option<Selection>> {
    let bias = direction.bias();
    let resolved = doc.resolve(pos)?;
    if resolved.text_offset() == 0 {
        let adjacent = match bias {
            Bias::Backward => resolved.node_before(),
            Bias::Forward => resolved.node_after(),
        };
        if let Some(leaf) = adjacent.filter(|&id| doc.is_selectable(id)) {
            return Ok(Some(NodeSelection::new(doc, doc.entry(leaf).start)?.into()));
        }
    }

    match surface.native_move(direction, native_point_at(doc, pos)?) {
        NativeMove::Unchanged => move_block(doc, selection, bias),
        NativeMove::Moved(point) => {
            let target = pos_from_native(doc, point)?;
            if doc.depths_between(pos, target)? > 0 || !doc.is_text_position(target) {
                move_block(doc, selection, bias)
            } else {
                Ok(Some(TextSelection::caret(doc, target)?.into()))
            }
        }
    }
}

fn move_caret_vertically<S: RenderSurface + ?Sized>(
    doc: &Document,
    surface: &S,
    selection: &Selection,
    pos: usize,
    direction: Direction,
) -> Result<Option<Selection>> {
    let textblock = doc.entry(doc.resolve(pos)?.parent());
    let native = match surface.native_move(direction, native_point_at(doc, pos)?) {
        NativeMove::Moved(point) => pos_from_native(doc, point).ok(),
        NativeMove::Unchanged => None,
    };

    if !on_edge_line(doc, surface, pos, direction)? {
        // Wrapped line inside the same textblock
        if let Some(target) =
            native.filter(|&target| (textblock.content_start..=textblock.content_end).contains(&target))
        {
            return Ok(Some(TextSelection::caret(doc, target)?.into()));
        }
    }
    let x = coords_at_pos(doc, surface, pos)?.left;
    leave_vertically(doc, surface, selection, direction, x, native)
}

/// Whether `pos` sits on the first (moving up) or last (moving down) visual
/// line of its textblock.
fn on_edge_line<S: RenderSurface + ?Sized>(
    doc: &Document,
    surface: &S,
    pos: usize,
    direction: Direction,
) -> Result<bool> {
    let textblock = doc.entry(doc.resolve(pos)?.parent());
    let edge = match direction.bias() {
        Bias::Backward => textblock.content_start,
        Bias::Forward => textblock.content_end,
    };
    Ok(coords_at_pos(doc, surface, pos)?.top == coords_at_pos(doc, surface, edge)?.top)
}

/// Move out of the current block vertically. A node found in document order
/// wins; a textblock found there receives the caret either where the
/// surface's own motion put it or at the position closest to `x` on its
/// facing line.
fn leave_vertically<S: RenderSurface + ?Sized>(
    doc: &Document,
    surface: &S,
    selection: &Selection,
    direction: Direction,
    x: f32,
    native: Option<usize>,
) -> Result<Option<Selection>> {
    let found = match move_block(doc, selection, direction.bias())? {
        Some(Selection::Text(found)) => found,
        other => return Ok(other),
    };
    let textblock = doc.entry(doc.resolve(found.head())?.parent());
    let range = textblock.content_start..=textblock.content_end;

    if let Some(target) = native.filter(|target| range.contains(target)) {
        return Ok(Some(TextSelection::caret(doc, target)?.into()));
    }

    let facing = match direction.bias() {
        Bias::Forward => textblock.content_start,
        Bias::Backward => textblock.content_end,
    };
    let line_top = coords_at_pos(doc, surface, facing)?.top;
    let mut closest: Option<(usize, f32)> = None;
    for pos in range {
        let rect = coords_at_pos(doc, surface, pos)?;
        if rect.top != line_top {
            continue;
        }
        let distance = (rect.left - x).abs();
        if closest.is_none_or(|(_, best)| distance <= best) {
            closest = Some((pos, distance));
        }
    }
    let target = closest.map_or(facing, |(pos, _)| pos);
    Ok(Some(TextSelection::caret(doc, target)?.into()))
}
