//! Shorthand constructors for document trees.
//!
//! ```rust
//! use richview_engine::model::build::*;
//!
//! let tree = doc([p([text("foo"), img(), text("bar")]), hr()]);
//! assert_eq!(tree.content_size(), 10);
//! ```

use super::{Mark, Node, NodeKind};

pub fn doc(children: impl IntoIterator<Item = Node>) -> Node {
    Node::element(NodeKind::Doc, children)
}

pub fn p(children: impl IntoIterator<Item = Node>) -> Node {
    Node::element(NodeKind::Paragraph, children)
}

pub fn h(level: u8, children: impl IntoIterator<Item = Node>) -> Node {
    Node::element(NodeKind::Heading { level }, children)
}

pub fn code_block(children: impl IntoIterator<Item = Node>) -> Node {
    Node::element(NodeKind::CodeBlock { language: None }, children)
}

pub fn blockquote(children: impl IntoIterator<Item = Node>) -> Node {
    Node::element(NodeKind::Blockquote, children)
}

pub fn ul(children: impl IntoIterator<Item = Node>) -> Node {
    Node::element(NodeKind::BulletList, children)
}

pub fn ol(children: impl IntoIterator<Item = Node>) -> Node {
    Node::element(NodeKind::OrderedList { start: 1 }, children)
}

pub fn li(children: impl IntoIterator<Item = Node>) -> Node {
    Node::element(NodeKind::ListItem, children)
}

pub fn hr() -> Node {
    Node::leaf(NodeKind::HorizontalRule)
}

pub fn img() -> Node {
    Node::leaf(NodeKind::Image {
        src: "img.png".to_string(),
        alt: String::new(),
    })
}

pub fn br() -> Node {
    Node::leaf(NodeKind::HardBreak)
}

pub fn text(text: &str) -> Node {
    Node::text(text)
}

/// Mark a single inline node. Marks do not form nodes of their own, so
/// `em(strong(text("x")))` is one text node carrying both marks.
pub fn em(node: Node) -> Node {
    node.with_mark(Mark::Em)
}

pub fn strong(node: Node) -> Node {
    node.with_mark(Mark::Strong)
}

pub fn code(node: Node) -> Node {
    node.with_mark(Mark::Code)
}
