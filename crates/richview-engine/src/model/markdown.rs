//! Build a document tree from Markdown source with pulldown-cmark.
//!
//! Only the constructs the position model knows about are kept: paragraphs,
//! headings, code blocks, block quotes, lists, thematic breaks, images, hard
//! breaks and the em/strong/code/link marks. Anything else contributes its
//! text (or nothing).

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

use super::{Mark, Node, NodeKind};

/// Parse Markdown into a `Doc` node.
pub fn parse_markdown(source: &str) -> Node {
    let mut builder = TreeBuilder::new();
    for event in Parser::new(source) {
        builder.event(event);
    }
    builder.finish()
}

struct Frame {
    kind: NodeKind,
    children: Vec<Node>,
    /// Paragraph opened for inline content of a tight list item
    implicit: bool,
}

struct TreeBuilder {
    stack: Vec<Frame>,
    marks: Vec<Mark>,
    /// Image being collected: (src, alt text so far)
    image: Option<(String, String)>,
    /// Newlines seen in a code block that still have to become hard breaks
    pending_breaks: usize,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame {
                kind: NodeKind::Doc,
                children: Vec::new(),
                implicit: false,
            }],
            marks: Vec::new(),
            image: None,
            pending_breaks: 0,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) | Event::InlineMath(text) | Event::DisplayMath(text) => {
                if let Some((_, alt)) = self.image.as_mut() {
                    alt.push_str(&text);
                } else {
                    self.push_text(&text, &[]);
                }
            }
            Event::Code(text) => self.push_text(&text, &[Mark::Code]),
            Event::SoftBreak => self.push_text(" ", &[]),
            Event::HardBreak => self.push_inline(Node::leaf(NodeKind::HardBreak)),
            Event::Rule => {
                self.close_implicit();
                self.push_child(Node::leaf(NodeKind::HorizontalRule));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.open(NodeKind::Paragraph),
            Tag::Heading { level, .. } => self.open(NodeKind::Heading { level: level as u8 }),
            Tag::BlockQuote(_) => self.open(NodeKind::Blockquote),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                self.open(NodeKind::CodeBlock { language });
            }
            Tag::List(Some(start)) => self.open(NodeKind::OrderedList { start }),
            Tag::List(None) => self.open(NodeKind::BulletList),
            Tag::Item => self.open(NodeKind::ListItem),
            Tag::Emphasis => self.marks.push(Mark::Em),
            Tag::Strong => self.marks.push(Mark::Strong),
            Tag::Link { dest_url, .. } => self.marks.push(Mark::Link {
                href: dest_url.to_string(),
            }),
            Tag::Image { dest_url, .. } => self.image = Some((dest_url.to_string(), String::new())),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::BlockQuote(_)
            | TagEnd::CodeBlock
            | TagEnd::List(_)
            | TagEnd::Item => {
                self.close_implicit();
                self.close();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Link => {
                self.marks.pop();
            }
            TagEnd::Image => {
                if let Some((src, alt)) = self.image.take() {
                    let image = Node::leaf(NodeKind::Image { src, alt });
                    self.push_inline(self.apply_marks(image, &[]));
                }
            }
            _ => {}
        }
    }

    fn open(&mut self, kind: NodeKind) {
        self.close_implicit();
        self.pending_breaks = 0;
        self.stack.push(Frame {
            kind,
            children: Vec::new(),
            implicit: false,
        });
    }

    fn close(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(frame) = self.stack.pop() {
            self.push_child(Node::element(frame.kind, frame.children));
        }
    }

    fn close_implicit(&mut self) {
        if self.stack.last().is_some_and(|frame| frame.implicit) {
            self.close();
        }
    }

    fn push_child(&mut self, node: Node) {
        if let Some(frame) = self.stack.last_mut() {
            frame.children.push(node);
        }
    }

    /// Push inline content, opening an implicit paragraph when the current
    /// frame is not a textblock (tight list items put text straight into the
    /// item).
    fn push_inline(&mut self, node: Node) {
        let in_textblock = self
            .stack
            .last()
            .is_some_and(|frame| frame.kind.is_textblock());
        if !in_textblock {
            self.stack.push(Frame {
                kind: NodeKind::Paragraph,
                children: Vec::new(),
                implicit: true,
            });
        }
        self.push_child(node);
    }

    fn push_text(&mut self, text: &str, extra: &[Mark]) {
        let in_code_block = self
            .stack
            .last()
            .is_some_and(|frame| matches!(frame.kind, NodeKind::CodeBlock { .. }));
        if !in_code_block {
            self.push_text_run(text, extra);
            return;
        }
        // Code block lines become hard breaks. A newline is only emitted once
        // more text follows, so the terminating newline is dropped.
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.pending_breaks += 1;
            }
            if !line.is_empty() {
                for _ in 0..std::mem::take(&mut self.pending_breaks) {
                    self.push_inline(Node::leaf(NodeKind::HardBreak));
                }
                self.push_text_run(line, extra);
            }
        }
    }

    fn push_text_run(&mut self, text: &str, extra: &[Mark]) {
        if text.is_empty() {
            return;
        }
        let node = self.apply_marks(Node::text(text), extra);
        let merged = self
            .stack
            .last()
            .and_then(|frame| frame.children.last())
            .filter(|last| last.is_text() && last.marks() == node.marks())
            .map(|last| format!("{}{}", last.text_str().unwrap_or_default(), text));
        if let Some(merged) = merged {
            let replacement = self.apply_marks(Node::text(merged), extra);
            if let Some(last) = self
                .stack
                .last_mut()
                .and_then(|frame| frame.children.last_mut())
            {
                *last = replacement;
            }
            return;
        }
        self.push_inline(node);
    }

    fn apply_marks(&self, node: Node, extra: &[Mark]) -> Node {
        self.marks
            .iter()
            .chain(extra)
            .fold(node, |node, mark| node.with_mark(mark.clone()))
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.close();
        }
        match self.stack.pop() {
            Some(root) => Node::element(root.kind, root.children),
            None => Node::element(NodeKind::Doc, []),
        }
    }
}
