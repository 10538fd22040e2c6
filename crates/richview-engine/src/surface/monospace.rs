//! A fixed-pitch reference surface.
//!
//! Every character is `char_width` wide and every line `line_height` tall.
//! Blocks stack top to bottom; block quotes and list items indent their
//! children. Textblocks wrap at character level once a line would pass
//! `wrap_width`. Horizontal rules take one full-width line.
//!
//! Native caret motion imitates a browser: left/right step one caret slot
//! inside the current textblock and stop at its edges, up/down jump to the
//! nearest slot on the adjacent *text* line anywhere in the document, so a
//! rule between two paragraphs is skipped.

use std::collections::HashMap;

use log::trace;
use serde::{Deserialize, Serialize};

use super::{Direction, NativeMove, NativePoint, NativeSelection, Point, Rect, RenderSurface};
use crate::model::NodeKind;
use crate::position::{Document, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub char_width: f32,
    pub line_height: f32,
    /// Right edge of every line
    pub wrap_width: f32,
    /// Added to the left edge inside block quotes and list items
    pub indent: f32,
    pub image_width: f32,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 16.0,
            wrap_width: 640.0,
            indent: 16.0,
            image_width: 16.0,
        }
    }
}

/// Something to paint.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub rect: Rect,
    pub content: GlyphContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlyphContent {
    Char(char),
    Image { alt: String },
    Rule,
    /// List item marker, drawn in the indent left of the item
    Bullet,
    /// Left border of a block quote, spanning the whole quote
    QuoteBar,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Line {
    textblock: NodeId,
    top: f32,
    bottom: f32,
}

/// A place a caret can sit inside a textblock.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    point: NativePoint,
    line: usize,
    x: f32,
}

#[derive(Debug, Default)]
pub struct MonospaceSurface {
    metrics: Metrics,
    doc: Option<Document>,
    /// Bounding box per unit, indexed by node id
    boxes: Vec<Option<Rect>>,
    chars: HashMap<NodeId, Vec<Rect>>,
    lines: Vec<Line>,
    slots: HashMap<NodeId, Vec<Slot>>,
    /// Every native point that denotes a caret slot: (textblock, slot index)
    aliases: HashMap<NativePoint, (NodeId, usize)>,
    glyphs: Vec<Glyph>,
    selection: Option<NativeSelection>,
}

impl MonospaceSurface {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
            ..Self::default()
        }
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    /// Height of the laid out document
    pub fn height(&self) -> f32 {
        self.unit_box(NodeId::ROOT)
            .map(|root| root.bottom)
            .unwrap_or_default()
    }

    /// Paint list of the current layout
    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    fn nearest_slot_on_line(&self, line: usize, x: f32) -> Option<&Slot> {
        let textblock = self.lines.get(line)?.textblock;
        self.slots
            .get(&textblock)?
            .iter()
            .filter(|slot| slot.line == line)
            .fold(None, |best: Option<&Slot>, slot| match best {
                // Ties go to the later slot
                Some(best) if (best.x - x).abs() < (slot.x - x).abs() => Some(best),
                _ => Some(slot),
            })
    }

    fn unit_box(&self, id: NodeId) -> Option<Rect> {
        self.boxes.get(id.0).copied().flatten()
    }

    /// Deepest non-textblock element whose box contains `point`.
    fn container_at(&self, doc: &Document, point: Point) -> Option<NativePoint> {
        let container = doc
            .nodes()
            .iter()
            .filter(|entry| !entry.node.is_leaf() && !entry.node.is_text() && !entry.node.is_textblock())
            .filter(|entry| {
                self.unit_box(entry.id).is_some_and(|rect| {
                    point.y >= rect.top && point.y < rect.bottom && point.x >= rect.left
                })
            })
            .max_by_key(|entry| entry.depth)?;
        let index = container
            .children
            .iter()
            .filter(|&&child| self.unit_box(child).is_some_and(|rect| rect.bottom <= point.y))
            .count();
        Some(NativePoint::new(container.id, index))
    }
}

impl RenderSurface for MonospaceSurface {
    fn render(&mut self, doc: &Document) {
        let mut layout = Layout {
            doc,
            metrics: self.metrics,
            y: 0.0,
            boxes: vec![None; doc.nodes().len()],
            chars: HashMap::new(),
            lines: Vec::new(),
            slots: HashMap::new(),
            aliases: HashMap::new(),
            glyphs: Vec::new(),
        };
        layout.block(NodeId::ROOT, 0.0);
        trace!(
            "laid out {} units on {} lines",
            doc.nodes().len(),
            layout.lines.len()
        );

        self.boxes = layout.boxes;
        self.chars = layout.chars;
        self.lines = layout.lines;
        self.slots = layout.slots;
        self.aliases = layout.aliases;
        self.glyphs = layout.glyphs;
        self.doc = Some(doc.clone());
        self.selection = None;
    }

    fn read_selection(&self) -> Option<NativeSelection> {
        self.selection
    }

    fn write_selection(&mut self, selection: NativeSelection) {
        self.selection = Some(selection);
    }

    fn rect_for_offset(&self, point: NativePoint) -> Option<Rect> {
        match self.chars.get(&point.unit) {
            Some(chars) => chars.get(point.offset).copied(),
            None => self.unit_box(point.unit),
        }
    }

    fn hit_test(&self, point: Point) -> Option<NativePoint> {
        let doc = self.doc.as_ref()?;

        let line = self
            .lines
            .iter()
            .position(|line| point.y >= line.top && point.y < line.bottom);
        if let Some(line) = line {
            let textblock = self.lines[line].textblock;
            let inside_block = self
                .unit_box(textblock)
                .is_some_and(|rect| point.x >= rect.left);
            if inside_block {
                let image = doc.entry(textblock).children.iter().copied().find(|&child| {
                    matches!(doc.entry(child).node.kind(), NodeKind::Image { .. })
                        && self.unit_box(child).is_some_and(|rect| rect.contains(point))
                });
                if let Some(image) = image {
                    return Some(NativePoint::new(image, 0));
                }
                return self.nearest_slot_on_line(line, point.x).map(|slot| slot.point);
            }
        }

        let rule = doc.nodes().iter().find(|entry| {
            entry.node.kind() == &NodeKind::HorizontalRule
                && self.unit_box(entry.id).is_some_and(|rect| {
                    point.y >= rect.top && point.y < rect.bottom && point.x >= rect.left
                })
        });
        if let Some(rule) = rule {
            return Some(NativePoint::new(rule.id, 0));
        }

        self.container_at(doc, point)
    }

    fn native_move(&self, direction: Direction, from: NativePoint) -> NativeMove {
        let Some(&(textblock, index)) = self.aliases.get(&from) else {
            return NativeMove::Unchanged;
        };
        let Some(slots) = self.slots.get(&textblock) else {
            return NativeMove::Unchanged;
        };
        let target = match direction {
            Direction::Left => index.checked_sub(1).and_then(|i| slots.get(i)),
            Direction::Right => slots.get(index + 1),
            Direction::Up | Direction::Down => {
                let slot = slots[index];
                let line = match direction {
                    Direction::Up => slot.line.checked_sub(1),
                    _ => Some(slot.line + 1),
                };
                line.and_then(|line| self.nearest_slot_on_line(line, slot.x))
            }
        };
        match target {
            Some(slot) => NativeMove::Moved(slot.point),
            None => NativeMove::Unchanged,
        }
    }
}

/// Inline item of a textblock: one per position inside it
#[derive(Debug, Clone, Copy)]
struct Item {
    line: usize,
    left: f32,
    right: f32,
    is_break: bool,
}

struct Layout<'a> {
    doc: &'a Document,
    metrics: Metrics,
    y: f32,
    boxes: Vec<Option<Rect>>,
    chars: HashMap<NodeId, Vec<Rect>>,
    lines: Vec<Line>,
    slots: HashMap<NodeId, Vec<Slot>>,
    aliases: HashMap<NativePoint, (NodeId, usize)>,
    glyphs: Vec<Glyph>,
}

impl Layout<'_> {
    fn block(&mut self, id: NodeId, left: f32) {
        let doc = self.doc;
        let entry = doc.entry(id);
        let right = self.metrics.wrap_width.max(left + self.metrics.char_width);

        if entry.node.is_textblock() {
            self.textblock(id, left, right);
            return;
        }

        let top = self.y;
        if entry.node.is_leaf() {
            self.y += self.metrics.line_height;
            let rect = Rect {
                top,
                bottom: self.y,
                left,
                right,
            };
            self.boxes[id.0] = Some(rect);
            self.glyphs.push(Glyph {
                rect,
                content: GlyphContent::Rule,
            });
            return;
        }

        let indented = matches!(entry.node.kind(), NodeKind::Blockquote | NodeKind::ListItem);
        let child_left = if indented {
            left + self.metrics.indent
        } else {
            left
        };
        for &child in &entry.children {
            self.block(child, child_left);
        }
        let rect = Rect {
            top,
            bottom: self.y,
            left,
            right,
        };
        self.boxes[id.0] = Some(rect);

        match entry.node.kind() {
            NodeKind::Blockquote => self.glyphs.push(Glyph {
                rect,
                content: GlyphContent::QuoteBar,
            }),
            NodeKind::ListItem => self.glyphs.push(Glyph {
                rect: Rect {
                    top,
                    bottom: top + self.metrics.line_height,
                    left,
                    right: child_left,
                },
                content: GlyphContent::Bullet,
            }),
            _ => {}
        }
    }

    fn new_line(&mut self, textblock: NodeId) -> usize {
        self.lines.push(Line {
            textblock,
            top: self.y,
            bottom: self.y + self.metrics.line_height,
        });
        self.lines.len() - 1
    }

    fn textblock(&mut self, id: NodeId, left: f32, right: f32) {
        let doc = self.doc;
        let entry = doc.entry(id);
        let top = self.y;
        let mut line = self.new_line(id);
        let first_line = line;
        let mut x = left;
        let mut items: Vec<Item> = Vec::new();

        for &child_id in &entry.children {
            let child = doc.entry(child_id);
            match child.node.kind() {
                NodeKind::Text => {
                    let mut rects = Vec::new();
                    for ch in child.node.text_str().unwrap_or_default().chars() {
                        let width = self.metrics.char_width;
                        if x + width > right && x > left {
                            self.y += self.metrics.line_height;
                            line = self.new_line(id);
                            x = left;
                        }
                        let rect = Rect {
                            top: self.y,
                            bottom: self.y + self.metrics.line_height,
                            left: x,
                            right: x + width,
                        };
                        rects.push(rect);
                        items.push(Item {
                            line,
                            left: x,
                            right: x + width,
                            is_break: false,
                        });
                        self.glyphs.push(Glyph {
                            rect,
                            content: GlyphContent::Char(ch),
                        });
                        x += width;
                    }
                    self.boxes[child_id.0] = bounding(&rects);
                    self.chars.insert(child_id, rects);
                }
                NodeKind::Image { alt, .. } => {
                    let width = self.metrics.image_width;
                    if x + width > right && x > left {
                        self.y += self.metrics.line_height;
                        line = self.new_line(id);
                        x = left;
                    }
                    let rect = Rect {
                        top: self.y,
                        bottom: self.y + self.metrics.line_height,
                        left: x,
                        right: x + width,
                    };
                    self.boxes[child_id.0] = Some(rect);
                    self.glyphs.push(Glyph {
                        rect,
                        content: GlyphContent::Image { alt: alt.clone() },
                    });
                    items.push(Item {
                        line,
                        left: x,
                        right: x + width,
                        is_break: false,
                    });
                    x += width;
                }
                _ => {
                    // Hard break: zero width, then a new line
                    self.boxes[child_id.0] = Some(Rect::caret(
                        x,
                        self.y,
                        self.y + self.metrics.line_height,
                    ));
                    items.push(Item {
                        line,
                        left: x,
                        right: x,
                        is_break: true,
                    });
                    self.y += self.metrics.line_height;
                    line = self.new_line(id);
                    x = left;
                }
            }
        }
        self.y += self.metrics.line_height;
        self.boxes[id.0] = Some(Rect {
            top,
            bottom: self.y,
            left,
            right,
        });
        self.index_slots(id, &items, first_line, left);
    }

    fn index_slots(&mut self, id: NodeId, items: &[Item], first_line: usize, left: f32) {
        let doc = self.doc;
        let entry = doc.entry(id);
        let content_start = entry.content_start;

        let slots: Vec<Slot> = (0..=items.len())
            .map(|i| {
                let (line, x) = match (i.checked_sub(1).map(|j| items[j]), items.get(i)) {
                    (_, Some(after)) => (after.line, after.left),
                    (Some(before), None) if before.is_break => (before.line + 1, left),
                    (Some(before), None) => (before.line, before.right),
                    (None, None) => (first_line, left),
                };
                Slot {
                    point: self.slot_point(id, content_start + i),
                    line,
                    x,
                }
            })
            .collect();

        for (i, slot) in slots.iter().enumerate() {
            self.aliases.insert(slot.point, (id, i));
        }
        for (index, &child_id) in entry.children.iter().enumerate() {
            let child = doc.entry(child_id);
            let start = child.start - content_start;
            self.aliases.insert(NativePoint::new(id, index), (id, start));
            if child.node.is_text() {
                for offset in 0..=child.node.size() {
                    self.aliases
                        .insert(NativePoint::new(child_id, offset), (id, start + offset));
                }
            } else {
                self.aliases.insert(NativePoint::new(child_id, 0), (id, start));
                self.aliases.insert(NativePoint::new(child_id, 1), (id, start + 1));
            }
        }
        self.aliases
            .insert(NativePoint::new(id, entry.children.len()), (id, items.len()));
        self.slots.insert(id, slots);
    }

    /// The point a host would report for a caret at `pos` inside `textblock`:
    /// the text unit around `pos` (one starting there wins over one ending
    /// there), else a child index of the textblock.
    fn slot_point(&self, textblock: NodeId, pos: usize) -> NativePoint {
        let doc = self.doc;
        let children = &doc.entry(textblock).children;
        let texts = move || {
            children
                .iter()
                .map(move |&child| doc.entry(child))
                .filter(|child| child.node.is_text())
        };
        if let Some(child) = texts().find(|child| child.start <= pos && pos < child.end) {
            return NativePoint::new(child.id, pos - child.start);
        }
        if let Some(child) = texts().find(|child| child.end == pos) {
            return NativePoint::new(child.id, pos - child.start);
        }
        let index = children
            .iter()
            .filter(|&&child| doc.entry(child).end <= pos)
            .count();
        NativePoint::new(textblock, index)
    }
}

fn bounding(rects: &[Rect]) -> Option<Rect> {
    let first = rects.first()?;
    Some(rects.iter().skip(1).fold(*first, |acc, rect| Rect {
        top: acc.top.min(rect.top),
        bottom: acc.bottom.max(rect.bottom),
        left: acc.left.min(rect.left),
        right: acc.right.max(rect.right),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn surface_for(tree: crate::model::Node) -> (Document, MonospaceSurface) {
        let doc = Document::new(tree);
        let mut surface = MonospaceSurface::new(Metrics::default());
        surface.render(&doc);
        (doc, surface)
    }

    fn text_unit(doc: &Document, pos: usize) -> NodeId {
        doc.node_at(pos).unwrap()
    }

    #[test]
    fn blocks_stack_and_indent() {
        let (doc, surface) = surface_for(doc([p([text("one")]), hr(), blockquote([p([text("two")])])]));
        let one = text_unit(&doc, 1);
        let two = text_unit(&doc, 8);

        assert_eq!(
            surface.rect_for_offset(NativePoint::new(one, 1)),
            Some(Rect {
                top: 0.0,
                bottom: 16.0,
                left: 8.0,
                right: 16.0
            })
        );
        let rule = surface.rect_for_offset(NativePoint::new(doc.node_at(5).unwrap(), 0));
        assert_eq!(rule.map(|rect| (rect.top, rect.left, rect.right)), Some((16.0, 0.0, 640.0)));
        let quoted = surface.rect_for_offset(NativePoint::new(two, 0)).unwrap();
        assert_eq!((quoted.top, quoted.left), (32.0, 16.0));
        assert_eq!(surface.rect_for_offset(NativePoint::new(two, 3)), None);
    }

    #[test]
    fn long_text_wraps_at_character_level() {
        let metrics = Metrics {
            wrap_width: 80.0,
            ..Metrics::default()
        };
        let doc = Document::new(doc([p([text("abcdefghijklm")])]));
        let mut surface = MonospaceSurface::new(metrics);
        surface.render(&doc);
        let unit = text_unit(&doc, 1);

        let last_on_first_line = surface.rect_for_offset(NativePoint::new(unit, 9)).unwrap();
        let first_on_second_line = surface.rect_for_offset(NativePoint::new(unit, 10)).unwrap();
        assert_eq!(last_on_first_line.top, 0.0);
        assert_eq!(first_on_second_line.top, 16.0);
        assert_eq!(first_on_second_line.left, 0.0);
    }

    #[test]
    fn hard_break_starts_a_new_line() {
        let (doc, surface) = surface_for(doc([p([text("a"), br(), text("b")])]));
        let after = text_unit(&doc, 3);
        let rect = surface.rect_for_offset(NativePoint::new(after, 0)).unwrap();
        assert_eq!((rect.top, rect.left), (16.0, 0.0));
    }

    #[test]
    fn horizontal_native_motion_stops_at_textblock_edges() {
        let (doc, surface) = surface_for(doc([p([text("foo")]), p([text("bar")])]));
        let foo = text_unit(&doc, 1);

        assert_eq!(
            surface.native_move(Direction::Right, NativePoint::new(foo, 1)),
            NativeMove::Moved(NativePoint::new(foo, 2))
        );
        assert_eq!(
            surface.native_move(Direction::Right, NativePoint::new(foo, 3)),
            NativeMove::Unchanged
        );
        assert_eq!(
            surface.native_move(Direction::Left, NativePoint::new(foo, 0)),
            NativeMove::Unchanged
        );
    }

    #[test]
    fn vertical_native_motion_skips_rules() {
        let (doc, surface) = surface_for(doc([p([text("hello")]), hr(), p([text("there")])]));
        let hello = text_unit(&doc, 1);
        let there = text_unit(&doc, 9);

        assert_eq!(
            surface.native_move(Direction::Down, NativePoint::new(hello, 2)),
            NativeMove::Moved(NativePoint::new(there, 2))
        );
        assert_eq!(
            surface.native_move(Direction::Up, NativePoint::new(hello, 2)),
            NativeMove::Unchanged
        );
    }

    #[test]
    fn points_around_an_image_are_aliases() {
        let (doc, surface) = surface_for(doc([p([text("foo"), img(), text("bar")])]));
        let foo = text_unit(&doc, 1);
        let image = doc.node_at(4).unwrap();
        let bar = text_unit(&doc, 5);

        assert_eq!(
            surface.native_move(Direction::Right, NativePoint::new(foo, 3)),
            NativeMove::Moved(NativePoint::new(bar, 0))
        );
        assert_eq!(
            surface.native_move(Direction::Right, NativePoint::new(image, 0)),
            NativeMove::Moved(NativePoint::new(bar, 0))
        );
        assert_eq!(
            surface.native_move(Direction::Left, NativePoint::new(bar, 0)),
            NativeMove::Moved(NativePoint::new(foo, 3))
        );
    }

    #[rstest]
    #[case(Point::new(9.0, 4.0), 1, 1)]
    #[case(Point::new(13.0, 4.0), 1, 2)]
    #[case(Point::new(500.0, 4.0), 1, 3)]
    fn hit_test_snaps_to_the_nearest_slot(
        #[case] point: Point,
        #[case] unit_pos: usize,
        #[case] offset: usize,
    ) {
        let (doc, surface) = surface_for(doc([p([text("one")]), hr(), blockquote([p([text("two")])])]));
        assert_eq!(
            surface.hit_test(point),
            Some(NativePoint::new(text_unit(&doc, unit_pos), offset))
        );
    }

    #[test]
    fn hit_test_outside_text() {
        let (doc, surface) = surface_for(doc([p([text("one")]), hr(), blockquote([p([text("two")])])]));
        let rule = doc.node_at(5).unwrap();
        let quote = doc.node_at(6).unwrap();

        assert_eq!(surface.hit_test(Point::new(100.0, 20.0)), Some(NativePoint::new(rule, 0)));
        // Indent area of the quote
        assert_eq!(surface.hit_test(Point::new(4.0, 40.0)), Some(NativePoint::new(quote, 0)));
        assert_eq!(surface.hit_test(Point::new(4.0, 400.0)), None);
    }

    #[test]
    fn hit_test_on_an_image_reports_the_image() {
        let (doc, surface) = surface_for(doc([p([text("foo"), img(), text("bar")])]));
        let image = doc.node_at(4).unwrap();
        assert_eq!(surface.hit_test(Point::new(30.0, 8.0)), Some(NativePoint::new(image, 0)));
    }

    #[test]
    fn render_clears_the_selection() {
        let (doc, mut surface) = surface_for(doc([p([text("one")])]));
        let point = NativePoint::new(text_unit(&doc, 1), 1);
        surface.write_selection(NativeSelection::collapsed(point));
        assert_eq!(surface.read_selection(), Some(NativeSelection::collapsed(point)));
        surface.render(&doc);
        assert_eq!(surface.read_selection(), None);
    }

    #[test]
    fn glyphs_cover_text_rules_and_markers() {
        let (_, surface) = surface_for(doc([p([text("ab")]), hr(), ul([li([p([text("c")])])])]));
        let kinds: Vec<&GlyphContent> = surface.glyphs().iter().map(|glyph| &glyph.content).collect();
        assert_eq!(
            kinds,
            vec![
                &GlyphContent::Char('a'),
                &GlyphContent::Char('b'),
                &GlyphContent::Rule,
                &GlyphContent::Char('c'),
                &GlyphContent::Bullet,
            ]
        );
    }
}
