//! Immutable document tree.
//!
//! Nodes are cheap to clone (content is shared behind `Arc`) and never change
//! after construction. A new document version is a new tree; nothing in this
//! module points from a child back to its parent.

pub mod build;
pub mod markdown;

use std::sync::Arc;

/// Inline formatting carried by text and inline leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Em,
    Strong,
    Code,
    Link { href: String },
}

/// The kind of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Doc,
    Paragraph,
    Heading { level: u8 },
    CodeBlock { language: Option<String> },
    Blockquote,
    BulletList,
    OrderedList { start: u64 },
    ListItem,
    /// Thematic break: selectable block leaf
    HorizontalRule,
    /// Selectable inline leaf
    Image { src: String, alt: String },
    /// Inline leaf that can not be selected on its own
    HardBreak,
    Text,
}

impl NodeKind {
    /// Kinds whose content is inline (text, images, breaks).
    pub fn is_textblock(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph | NodeKind::Heading { .. } | NodeKind::CodeBlock { .. }
        )
    }
}

/// Classification used by the position model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    /// Has characters and supports sub-offsets
    Text,
    /// Occupies exactly one position
    Leaf { selectable: bool },
    /// Holds children and contributes a boundary position on each side
    Container,
}

#[derive(Debug, Clone, PartialEq)]
enum Content {
    Text(Arc<str>),
    Children(Arc<[Node]>),
    Empty,
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    marks: Vec<Mark>,
    content: Content,
    content_size: usize,
}

impl Node {
    /// Create a text node. Callers must not pass an empty string; element
    /// constructors drop empty text children.
    pub fn text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        let content_size = text.chars().count();
        Self {
            kind: NodeKind::Text,
            marks: Vec::new(),
            content: Content::Text(Arc::from(text)),
            content_size,
        }
    }

    /// Create a leaf node (rule, image, hard break).
    pub fn leaf(kind: NodeKind) -> Self {
        Self {
            kind,
            marks: Vec::new(),
            content: Content::Empty,
            content_size: 0,
        }
    }

    /// Create a node that holds children.
    pub fn element(kind: NodeKind, children: impl IntoIterator<Item = Node>) -> Self {
        let children: Vec<Node> = children
            .into_iter()
            .filter(|child| !(child.is_text() && child.content_size == 0))
            .collect();
        let content_size = children.iter().map(Node::size).sum();
        Self {
            kind,
            marks: Vec::new(),
            content: Content::Children(children.into()),
            content_size,
        }
    }

    /// Return a copy of this node with `mark` added (if not already present).
    pub fn with_mark(mut self, mark: Mark) -> Self {
        if !self.marks.contains(&mark) {
            self.marks.push(mark);
        }
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Characters of a text node
    pub fn text_str(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text.as_ref()),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match &self.content {
            Content::Children(children) => children.as_ref(),
            _ => &[],
        }
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// Iterate children together with their offset inside this node's content.
    pub fn children_with_offsets(&self) -> impl Iterator<Item = (usize, &Node)> {
        self.children().iter().scan(0usize, |offset, child| {
            let start = *offset;
            *offset += child.size();
            Some((start, child))
        })
    }

    /// Size of this node's content
    pub fn content_size(&self) -> usize {
        self.content_size
    }

    /// Number of positions this node occupies inside its parent.
    pub fn size(&self) -> usize {
        match self.class() {
            NodeClass::Text => self.content_size,
            NodeClass::Leaf { .. } => 1,
            NodeClass::Container => self.content_size + 2,
        }
    }

    pub fn class(&self) -> NodeClass {
        match self.kind {
            NodeKind::Text => NodeClass::Text,
            NodeKind::HorizontalRule | NodeKind::Image { .. } => {
                NodeClass::Leaf { selectable: true }
            }
            NodeKind::HardBreak => NodeClass::Leaf { selectable: false },
            _ => NodeClass::Container,
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.class(), NodeClass::Leaf { .. })
    }

    /// True only for non-text leaves marked atomic/selectable.
    pub fn is_selectable(&self) -> bool {
        matches!(self.class(), NodeClass::Leaf { selectable: true })
    }

    /// A block whose content is inline (text, images, breaks).
    pub fn is_textblock(&self) -> bool {
        self.kind.is_textblock()
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Text | NodeKind::Image { .. } | NodeKind::HardBreak
        )
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    /// Plain text of this node and its descendants. Leaves contribute nothing
    /// except hard breaks, which become newlines.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match (&self.content, &self.kind) {
            (Content::Text(text), _) => out.push_str(text),
            (_, NodeKind::HardBreak) => out.push('\n'),
            _ => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
        }
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::text(text)
    }
}
