//! Document selections.
//!
//! A selection is either a text range between two positions inside
//! textblocks, or a single selectable leaf (image, rule). Both variants are
//! built through validating constructors, so a `Selection` held by the view
//! always describes something the document can actually select.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewError};
use crate::position::{Document, NodeId};

/// Search direction in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Backward,
    Forward,
}

impl Bias {
    pub fn reverse(self) -> Self {
        match self {
            Bias::Backward => Bias::Forward,
            Bias::Forward => Bias::Backward,
        }
    }
}

/// A caret or range whose ends both lie inside textblocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSelection {
    anchor: usize,
    head: usize,
}

impl TextSelection {
    pub fn new(doc: &Document, anchor: usize, head: usize) -> Result<Self> {
        check_text_position(doc, anchor)?;
        check_text_position(doc, head)?;
        Ok(Self { anchor, head })
    }

    pub fn caret(doc: &Document, pos: usize) -> Result<Self> {
        Self::new(doc, pos, pos)
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }
}

fn check_text_position(doc: &Document, pos: usize) -> Result<()> {
    doc.resolve(pos)?;
    if doc.is_text_position(pos) {
        Ok(())
    } else {
        Err(ViewError::NotTextPosition { pos })
    }
}

/// A single selectable leaf covering `[pos, pos + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSelection {
    pos: usize,
}

impl NodeSelection {
    pub fn new(doc: &Document, pos: usize) -> Result<Self> {
        doc.resolve(pos)?;
        match doc.node_at(pos) {
            Some(id) if doc.is_selectable(id) => Ok(Self { pos }),
            _ => Err(ViewError::NotSelectable { pos }),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn from(&self) -> usize {
        self.pos
    }

    pub fn to(&self) -> usize {
        self.pos + 1
    }

    /// The selected node. `None` only when `doc` is not the version the
    /// selection was created for.
    pub fn node(&self, doc: &Document) -> Option<NodeId> {
        doc.node_at(self.pos).filter(|&id| doc.is_selectable(id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    Text(TextSelection),
    Node(NodeSelection),
}

impl Selection {
    pub fn anchor(&self) -> usize {
        match self {
            Selection::Text(text) => text.anchor(),
            Selection::Node(node) => node.from(),
        }
    }

    pub fn head(&self) -> usize {
        match self {
            Selection::Text(text) => text.head(),
            Selection::Node(node) => node.to(),
        }
    }

    pub fn from(&self) -> usize {
        match self {
            Selection::Text(text) => text.from(),
            Selection::Node(node) => node.from(),
        }
    }

    pub fn to(&self) -> usize {
        match self {
            Selection::Text(text) => text.to(),
            Selection::Node(node) => node.to(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Selection::Text(text) => text.is_empty(),
            Selection::Node(_) => false,
        }
    }

    /// Find the first valid selection starting at `pos` and moving in
    /// `bias` direction. A position directly inside a textblock is itself a
    /// caret; otherwise siblings are searched outward, one ancestor at a time.
    /// With `text_only`, selectable leaves are skipped.
    pub fn find_from(doc: &Document, pos: usize, bias: Bias, text_only: bool) -> Option<Selection> {
        let resolved = doc.resolve(pos).ok()?;
        let depth = resolved.depth();
        if let Some(found) = find_in(
            doc,
            resolved.parent(),
            pos,
            resolved.index(depth),
            bias,
            text_only,
        ) {
            return Some(found);
        }
        (0..depth).rev().find_map(|depth| {
            let (pos, index) = match bias {
                Bias::Backward => (resolved.before(depth + 1)?, resolved.index(depth)),
                Bias::Forward => (resolved.after(depth + 1)?, resolved.index(depth) + 1),
            };
            find_in(doc, resolved.node(depth), pos, index, bias, text_only)
        })
    }

    /// The valid selection closest to `pos`, looking in `bias` direction
    /// first. `None` only for a document without any selectable place.
    pub fn near(doc: &Document, pos: usize, bias: Bias) -> Option<Selection> {
        Self::find_from(doc, pos, bias, false)
            .or_else(|| Self::find_from(doc, pos, bias.reverse(), false))
    }

    pub fn at_start(doc: &Document) -> Option<Selection> {
        find_in(doc, NodeId::ROOT, 0, 0, Bias::Forward, false)
    }

    pub fn at_end(doc: &Document) -> Option<Selection> {
        let children = doc.entry(NodeId::ROOT).children.len();
        find_in(doc, NodeId::ROOT, doc.size(), children, Bias::Backward, false)
    }

    /// Re-anchor this selection onto a new document version, keeping it
    /// where it is when still valid and snapping to the nearest valid
    /// selection otherwise.
    pub fn revalidate(&self, doc: &Document) -> Option<Selection> {
        let clamp = |pos: usize| pos.min(doc.size());
        match *self {
            Selection::Node(node) => NodeSelection::new(doc, clamp(node.pos()))
                .map(Selection::Node)
                .ok()
                .or_else(|| Self::near(doc, clamp(node.pos()), Bias::Forward)),
            Selection::Text(text) => {
                let anchor = clamp(text.anchor());
                let head = clamp(text.head());
                if let Ok(text) = TextSelection::new(doc, anchor, head) {
                    return Some(Selection::Text(text));
                }
                let snap = |pos| match Self::near(doc, pos, Bias::Forward)? {
                    Selection::Text(text) => Some(text.head()),
                    Selection::Node(_) => None,
                };
                match (snap(anchor), snap(head)) {
                    (Some(anchor), Some(head)) => {
                        TextSelection::new(doc, anchor, head).ok().map(Selection::Text)
                    }
                    _ => Self::near(doc, head, Bias::Forward),
                }
            }
        }
    }
}

/// Search the children of `id` from child `index` in `bias` direction.
/// `pos` is the position the search starts at, used when `id` is itself a
/// textblock.
fn find_in(
    doc: &Document,
    id: NodeId,
    pos: usize,
    index: usize,
    bias: Bias,
    text_only: bool,
) -> Option<Selection> {
    let entry = doc.entry(id);
    if entry.node.is_textblock() {
        return Some(Selection::Text(TextSelection {
            anchor: pos,
            head: pos,
        }));
    }

    let index = index.min(entry.children.len());
    let candidates: Vec<NodeId> = match bias {
        Bias::Forward => entry.children[index..].to_vec(),
        Bias::Backward => entry.children[..index].iter().rev().copied().collect(),
    };
    for child_id in candidates {
        let child = doc.entry(child_id);
        if !child.node.is_leaf() {
            let (inner_pos, inner_index) = match bias {
                Bias::Forward => (child.content_start, 0),
                Bias::Backward => (child.content_end, child.children.len()),
            };
            if let Some(found) = find_in(doc, child_id, inner_pos, inner_index, bias, text_only) {
                return Some(found);
            }
        } else if !text_only && child.node.is_selectable() {
            return Some(Selection::Node(NodeSelection { pos: child.start }));
        }
    }
    None
}

impl From<TextSelection> for Selection {
    fn from(selection: TextSelection) -> Self {
        Selection::Text(selection)
    }
}

impl From<NodeSelection> for Selection {
    fn from(selection: NodeSelection) -> Self {
        Selection::Node(selection)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Text(text) if text.is_empty() => write!(f, "caret {}", text.head()),
            Selection::Text(text) => write!(f, "text {}..{}", text.anchor(), text.head()),
            Selection::Node(node) => write!(f, "node {}", node.pos()),
        }
    }
}
