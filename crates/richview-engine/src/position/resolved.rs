use super::NodeId;

/// One level of a resolved position's parent chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    node: NodeId,
    /// Index of the child the position is in front of (or inside, for text)
    index: usize,
    /// Content start of `node`
    start: usize,
    /// Content end of `node`
    end: usize,
}

/// A position together with the chain of nodes that contain it.
///
/// Depth 0 is the document root; `depth()` is the innermost node that
/// contains the position (the "parent"). Text nodes never appear in the chain:
/// a position inside a text node reports a non-zero `text_offset` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<Step>,
    text_offset: usize,
    node_before: Option<NodeId>,
    node_after: Option<NodeId>,
}

impl ResolvedPos {
    pub(super) fn builder(pos: usize) -> ResolvedPosBuilder {
        ResolvedPosBuilder {
            pos,
            path: Vec::new(),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// The node at `depth` in the chain
    pub fn node(&self, depth: usize) -> NodeId {
        self.path[depth].node
    }

    /// The innermost containing node
    pub fn parent(&self) -> NodeId {
        self.node(self.depth())
    }

    /// Child index at `depth`
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Content start of the node at `depth`
    pub fn start(&self, depth: usize) -> usize {
        self.path[depth].start
    }

    /// Content end of the node at `depth`
    pub fn end(&self, depth: usize) -> usize {
        self.path[depth].end
    }

    /// Position directly before the node at `depth`; `None` for the root.
    pub fn before(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            return None;
        }
        self.start(depth).checked_sub(1)
    }

    /// Position directly after the node at `depth`; `None` for the root.
    pub fn after(&self, depth: usize) -> Option<usize> {
        (depth > 0).then(|| self.end(depth) + 1)
    }

    /// Offset of the position inside its parent's content
    pub fn parent_offset(&self) -> usize {
        self.pos - self.start(self.depth())
    }

    /// Offset into the text node the position points into, 0 at node boundaries
    pub fn text_offset(&self) -> usize {
        self.text_offset
    }

    /// The node directly after the position (a text node may be cut)
    pub fn node_after(&self) -> Option<NodeId> {
        self.node_after
    }

    /// The node directly before the position (a text node may be cut)
    pub fn node_before(&self) -> Option<NodeId> {
        self.node_before
    }

    /// Depth of the deepest node containing both positions
    pub fn shared_depth(&self, other: &ResolvedPos) -> usize {
        self.path
            .iter()
            .zip(&other.path)
            .take_while(|(a, b)| a.node == b.node)
            .count()
            .saturating_sub(1)
    }
}

pub(super) struct ResolvedPosBuilder {
    pos: usize,
    path: Vec<Step>,
}

impl ResolvedPosBuilder {
    pub(super) fn step(&mut self, node: NodeId, index: usize, start: usize, end: usize) {
        self.path.push(Step {
            node,
            index,
            start,
            end,
        });
    }

    pub(super) fn finish(
        self,
        text_offset: usize,
        node_before: Option<NodeId>,
        node_after: Option<NodeId>,
    ) -> ResolvedPos {
        ResolvedPos {
            pos: self.pos,
            path: self.path,
            text_offset,
            node_before,
            node_after,
        }
    }
}
