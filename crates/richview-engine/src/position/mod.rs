//! # Position Model
//!
//! A [`Document`] is one immutable version of the tree together with an
//! index built once when the version is created: every node is recorded in a
//! pre-order table with the range of positions it covers. Parent links live
//! only in this table, never in the tree itself.
//!
//! ## Flattening rule
//!
//! - a text node covers one position per character
//! - a leaf (rule, image, hard break) covers exactly one position
//! - any other node covers its content plus one boundary on each side
//! - the root contributes no boundaries, so positions run from `0` to
//!   `root.content_size()` inclusive
//!
//! ```text
//! doc(p("one"), hr, blockquote(p("two")))
//!
//!  0   1 2 3 4   5    6   7   8 9 10 11  12   13
//!  <p> o n e </p> <hr> <bq> <p> t w  o  </p> </bq>
//! ```
//!
//! Resolution walks down from the root and binary-searches the children of
//! each level, producing an explicit parent chain ([`ResolvedPos`]).

mod resolved;

pub use resolved::ResolvedPos;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewError};
use crate::model::Node;

/// Index of a node in a document version's pre-order table.
///
/// Every node is rendered as exactly one unit on the surface, so the same id
/// names the node's renderable unit. Ids are only meaningful for the
/// document version that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// One row of the flattened index.
#[derive(Debug, Clone)]
pub struct IndexedNode {
    pub id: NodeId,
    pub node: Node,
    /// Position before the node (0 for the root)
    pub start: usize,
    /// Position after the node (document size for the root)
    pub end: usize,
    /// First position inside the node's content
    pub content_start: usize,
    /// Last position inside the node's content
    pub content_end: usize,
    /// 0 for the root
    pub depth: usize,
    pub parent: Option<NodeId>,
    /// Index among the parent's children
    pub index: usize,
    pub children: Vec<NodeId>,
}

/// An immutable document version with its position index.
#[derive(Debug, Clone)]
pub struct Document {
    root: Node,
    entries: Vec<IndexedNode>,
}

impl Document {
    /// Flatten `root` into a position index.
    pub fn new(root: Node) -> Self {
        let mut entries = Vec::new();
        flatten(&root, 0, 0, None, 0, &mut entries);
        Self { root, entries }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Largest valid position
    pub fn size(&self) -> usize {
        self.root.content_size()
    }

    /// All indexed nodes in document order (pre-order).
    pub fn nodes(&self) -> &[IndexedNode] {
        &self.entries
    }

    pub fn get(&self, id: NodeId) -> Option<&IndexedNode> {
        self.entries.get(id.0)
    }

    /// Like [`Document::get`] for ids that came out of this document.
    pub(crate) fn entry(&self, id: NodeId) -> &IndexedNode {
        &self.entries[id.0]
    }

    /// True only for non-text leaves marked atomic/selectable.
    pub fn is_selectable(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|entry| entry.node.is_selectable())
    }

    /// Textblocks in document order.
    pub fn textblocks(&self) -> impl Iterator<Item = &IndexedNode> {
        self.entries.iter().filter(|entry| entry.node.is_textblock())
    }

    /// Resolve a position into its parent chain.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos> {
        let size = self.size();
        if pos > size {
            return Err(ViewError::OutOfRange { pos, size });
        }

        let mut resolved = ResolvedPos::builder(pos);
        let mut current = self.entry(NodeId::ROOT);
        loop {
            // First child that ends after `pos`
            let index = current
                .children
                .partition_point(|&child| self.entry(child).end <= pos);
            resolved.step(current.id, index, current.content_start, current.content_end);

            let after = current.children.get(index).map(|&child| self.entry(child));
            match after {
                Some(child) if child.start < pos && child.node.is_text() => {
                    return Ok(resolved.finish(pos - child.start, Some(child.id), Some(child.id)));
                }
                Some(child) if child.start < pos && !child.node.is_leaf() => {
                    current = child;
                }
                _ => {
                    let before = index
                        .checked_sub(1)
                        .and_then(|i| current.children.get(i).copied());
                    return Ok(resolved.finish(0, before, after.map(|child| child.id)));
                }
            }
        }
    }

    /// The node that starts exactly at `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<NodeId> {
        let resolved = self.resolve(pos).ok()?;
        if resolved.text_offset() > 0 {
            return None;
        }
        resolved.node_after()
    }

    /// Number of container boundaries crossed when going from `a` to `b`.
    pub fn depths_between(&self, a: usize, b: usize) -> Result<usize> {
        let from = self.resolve(a)?;
        let to = self.resolve(b)?;
        let shared = from.shared_depth(&to);
        Ok((from.depth() - shared) + (to.depth() - shared))
    }

    /// True when `pos` lies inside a textblock, where a caret can be placed.
    pub fn is_text_position(&self, pos: usize) -> bool {
        self.resolve(pos)
            .is_ok_and(|resolved| self.entry(resolved.parent()).node.is_textblock())
    }
}

fn flatten(
    node: &Node,
    start: usize,
    depth: usize,
    parent: Option<NodeId>,
    index: usize,
    entries: &mut Vec<IndexedNode>,
) -> NodeId {
    let id = NodeId(entries.len());
    let is_root = parent.is_none();
    let (content_start, end) = if is_root {
        (0, node.content_size())
    } else if node.is_text() {
        (start, start + node.size())
    } else if node.is_leaf() {
        (start, start + 1)
    } else {
        (start + 1, start + node.size())
    };
    let content_end = content_start + node.content_size();

    entries.push(IndexedNode {
        id,
        node: node.clone(),
        start,
        end,
        content_start,
        content_end,
        depth,
        parent,
        index,
        children: Vec::new(),
    });

    let children: Vec<NodeId> = node
        .children_with_offsets()
        .enumerate()
        .map(|(i, (offset, child))| {
            flatten(child, content_start + offset, depth + 1, Some(id), i, entries)
        })
        .collect();
    entries[id.0].children = children;
    id
}
