use pretty_assertions::assert_eq;
use rstest::rstest;

use richview_engine::model::build::*;
use richview_engine::RenderSurface;
use richview_engine::{
    Direction, EditorView, Metrics, MonospaceSurface, NativePoint, NativeSelection, Node, NodeId,
    NodeSelection, Point, Selection, TextSelection, ViewEvent, parse_markdown,
};

fn view_of(tree: Node) -> EditorView<MonospaceSurface> {
    EditorView::new(tree, MonospaceSurface::new(Metrics::default()))
}

/// doc(p("one"), hr, blockquote(p("two")))
///
/// Node ids: 0 doc, 1 p, 2 "one", 3 hr, 4 blockquote, 5 p, 6 "two"
fn sample() -> EditorView<MonospaceSurface> {
    view_of(doc([p([text("one")]), hr(), blockquote([p([text("two")])])]))
}

fn caret(view: &EditorView<MonospaceSurface>, pos: usize) -> Selection {
    TextSelection::caret(view.document(), pos).unwrap().into()
}

fn node(view: &EditorView<MonospaceSurface>, pos: usize) -> Selection {
    NodeSelection::new(view.document(), pos).unwrap().into()
}

fn read_native(view: &mut EditorView<MonospaceSurface>, unit: usize, offset: usize) -> Option<Selection> {
    view.surface_mut()
        .write_selection(NativeSelection::collapsed(NativePoint::new(NodeId(unit), offset)));
    view.dispatch(ViewEvent::SelectionChanged);
    view.selection()
}

fn press(view: &mut EditorView<MonospaceSurface>, direction: Direction) -> Option<Selection> {
    view.dispatch(ViewEvent::Move(direction));
    view.selection()
}

#[rstest]
#[case(2, 0, 1)]
#[case(2, 1, 2)]
#[case(2, 3, 4)]
#[case(1, 0, 1)]
#[case(1, 1, 4)]
#[case(6, 0, 8)]
#[case(6, 3, 11)]
#[case(5, 1, 11)]
#[case(0, 2, 8)]
#[case(0, 3, 11)]
fn reads_native_carets(#[case] unit: usize, #[case] offset: usize, #[case] expected: usize) {
    let mut view = sample();
    let selection = read_native(&mut view, unit, offset).unwrap();
    assert_eq!(selection.head(), expected);
    assert!(selection.is_empty());
}

#[test]
fn reads_a_point_before_a_rule_as_a_node_selection() {
    let mut view = sample();
    let selection = read_native(&mut view, 0, 1).unwrap();
    assert_eq!(selection, node(&view, 5));
    assert_eq!(selection.from(), 5);
}

#[test]
fn reading_the_same_native_selection_twice_changes_nothing() {
    let mut view = sample();
    view.surface_mut()
        .write_selection(NativeSelection::collapsed(NativePoint::new(NodeId(6), 1)));
    assert!(view.dispatch(ViewEvent::SelectionChanged));
    assert!(!view.dispatch(ViewEvent::SelectionChanged));
    assert_eq!(view.selection(), Some(caret(&view, 9)));
}

#[rstest]
#[case(1, 2, 0)]
#[case(2, 2, 1)]
#[case(4, 2, 3)]
#[case(8, 6, 0)]
#[case(10, 6, 2)]
fn writes_native_selections(#[case] pos: usize, #[case] unit: usize, #[case] offset: usize) {
    let mut view = sample();
    view.set_selection(caret(&view, pos)).unwrap();
    assert_eq!(
        view.surface().read_selection(),
        Some(NativeSelection::collapsed(NativePoint::new(NodeId(unit), offset)))
    );
}

#[test]
fn node_selections_are_written_around_the_node() {
    let mut view = sample();
    view.set_selection(node(&view, 5)).unwrap();
    assert_eq!(
        view.surface().read_selection(),
        Some(NativeSelection {
            anchor: NativePoint::new(NodeId::ROOT, 1),
            head: NativePoint::new(NodeId::ROOT, 2),
        })
    );
    // and read back unchanged
    assert!(!view.dispatch(ViewEvent::SelectionChanged));
    assert_eq!(view.selection(), Some(node(&view, 5)));
}

#[test]
fn returns_sensible_screen_coordinates() {
    let view = view_of(doc([p([text("one")]), p([text("two")])]));
    let rect = |pos| view.coords_at_pos(pos).unwrap();

    assert_eq!(rect(1).top, rect(2).top);
    assert_eq!(rect(1).top, rect(4).top);
    assert!(rect(1).left < rect(2).left);
    assert!(rect(2).left < rect(4).left);
    assert!(rect(6).top > rect(1).top);
    assert_eq!(rect(6).top, rect(9).top);
    assert!(rect(6).left < rect(9).left);
}

#[test]
fn coordinates_round_trip_through_corner_cases() {
    let view = view_of(doc([
        p([
            text("one"),
            em(text("two")),
            em(strong(text("three"))),
            em(img()),
            br(),
            code(text("foo")),
        ]),
        p([]),
    ]));

    for pos in (1..=17).chain([19]) {
        let center = view.coords_at_pos(pos).unwrap().center();
        assert_eq!(view.pos_at_coords(center).pos, pos, "position {pos} at {center:?}");
    }
}

#[test]
fn caret_after_a_trailing_break_sits_on_its_own_line() {
    let view = view_of(doc([p([text("a"), br()])]));
    let before_break = view.coords_at_pos(2).unwrap();
    let after_break = view.coords_at_pos(3).unwrap();
    assert!(after_break.top >= before_break.bottom);

    for pos in 1..=3 {
        let center = view.coords_at_pos(pos).unwrap().center();
        assert_eq!(view.pos_at_coords(center).pos, pos, "position {pos} at {center:?}");
    }
}

#[test]
fn selection_and_coordinates_agree_back_and_forth() {
    let mut view = view_of(doc([
        p([text("one")]),
        blockquote([p([text("two")]), p([text("three")])]),
    ]));

    for pos in [1, 2, 4, 7, 14, 15] {
        view.set_selection(caret(&view, pos)).unwrap();
        assert!(!view.dispatch(ViewEvent::SelectionChanged));
        assert_eq!(view.selection().map(|sel| sel.head()), Some(pos));

        let center = view.coords_at_pos(pos).unwrap().center();
        assert_eq!(view.pos_at_coords(center).pos, pos, "position {pos}");
    }
}

#[test]
fn finds_the_end_of_a_wrapped_line() {
    let mut view = view_of(doc([p([])]));
    let mut content = String::new();

    let pos = loop {
        content.push_str("abc def ghi ");
        view.update_document(doc([p([text(&content)])]));
        let pos = 1 + content.chars().count();
        let end = view.coords_at_pos(pos).unwrap();
        let start = view.coords_at_pos(1).unwrap();
        if end.bottom > start.bottom + 4.0 {
            break pos;
        }
    };

    let end = view.coords_at_pos(pos).unwrap();
    assert_eq!(view.pos_at_coords(Point::new(end.left + 50.0, end.top + 5.0)).pos, pos);
}

#[test]
fn clicking_a_rule_selects_it() {
    let mut view = sample();
    assert!(view.select_at(Point::new(100.0, 24.0)));
    assert_eq!(view.selection(), Some(node(&view, 5)));
}

#[test]
fn arrows_stop_on_inline_images() {
    let mut view = view_of(doc([p([text("foo"), img(), text("bar")])]));
    for _ in 0..3 {
        press(&mut view, Direction::Right);
    }
    assert_eq!(view.selection(), Some(caret(&view, 4)));
    assert_eq!(press(&mut view, Direction::Right), Some(node(&view, 4)));
    assert_eq!(press(&mut view, Direction::Right), Some(caret(&view, 5)));
    assert_eq!(press(&mut view, Direction::Left), Some(node(&view, 4)));
    assert_eq!(press(&mut view, Direction::Left), Some(caret(&view, 4)));
    assert_eq!(press(&mut view, Direction::Left), Some(caret(&view, 3)));
}

#[test]
fn arrows_visit_each_of_two_adjacent_images() {
    let mut view = view_of(doc([p([img(), img()])]));
    assert_eq!(view.selection(), Some(caret(&view, 1)));

    assert_eq!(press(&mut view, Direction::Right), Some(node(&view, 1)));
    assert_eq!(press(&mut view, Direction::Right), Some(node(&view, 2)));
    assert_eq!(press(&mut view, Direction::Right), Some(caret(&view, 3)));
    assert_eq!(press(&mut view, Direction::Left), Some(node(&view, 2)));
    assert_eq!(press(&mut view, Direction::Left), Some(node(&view, 1)));
    assert_eq!(press(&mut view, Direction::Left), Some(caret(&view, 1)));
}

#[test]
fn a_lone_rule_keeps_its_selection() {
    let mut view = view_of(doc([hr()]));
    view.set_selection(node(&view, 0)).unwrap();

    for direction in [Direction::Right, Direction::Left, Direction::Down, Direction::Up] {
        assert!(!view.dispatch(ViewEvent::Move(direction)), "{direction:?}");
        assert_eq!(view.selection(), Some(node(&view, 0)));
    }
}

#[test]
fn an_image_ending_the_document_lets_the_caret_out_once() {
    let mut view = view_of(doc([p([img()])]));
    view.set_selection(node(&view, 1)).unwrap();

    assert!(view.dispatch(ViewEvent::Move(Direction::Right)));
    assert_eq!(view.selection(), Some(caret(&view, 2)));
    assert!(!view.dispatch(ViewEvent::Move(Direction::Right)));
    assert_eq!(view.selection(), Some(caret(&view, 2)));
}

#[test]
fn vertical_arrows_select_a_rule_between_paragraphs() {
    let mut view = view_of(doc([p([text("hello")]), hr(), ul([li([p([text("there")])])])]));

    view.set_selection(caret(&view, 6)).unwrap();
    assert_eq!(press(&mut view, Direction::Down), Some(node(&view, 7)));

    view.set_selection(caret(&view, 11)).unwrap();
    assert_eq!(press(&mut view, Direction::Up), Some(node(&view, 7)));
}

#[test]
fn vertical_arrows_walk_over_adjacent_rules() {
    let mut view = view_of(doc([blockquote([p([text("hello")])]), hr(), hr(), p([text("there")])]));

    view.set_selection(caret(&view, 7)).unwrap();
    assert_eq!(press(&mut view, Direction::Down), Some(node(&view, 9)));
    assert_eq!(press(&mut view, Direction::Down), Some(node(&view, 10)));
    assert_eq!(press(&mut view, Direction::Down), Some(caret(&view, 12)));

    view.set_selection(caret(&view, 14)).unwrap();
    assert_eq!(press(&mut view, Direction::Up), Some(node(&view, 10)));
    assert_eq!(press(&mut view, Direction::Up), Some(node(&view, 9)));
    assert_eq!(press(&mut view, Direction::Up), Some(caret(&view, 2)));
}

#[test]
fn horizontal_arrows_walk_over_adjacent_rules() {
    let mut view = view_of(doc([p([text("foo")]), hr(), hr(), p([text("bar")])]));
    view.set_selection(caret(&view, 4)).unwrap();

    assert_eq!(press(&mut view, Direction::Right), Some(node(&view, 5)));
    assert_eq!(press(&mut view, Direction::Right), Some(node(&view, 6)));
    assert_eq!(press(&mut view, Direction::Right), Some(caret(&view, 8)));
    assert_eq!(press(&mut view, Direction::Left), Some(node(&view, 6)));
    assert_eq!(press(&mut view, Direction::Left), Some(node(&view, 5)));
    assert_eq!(press(&mut view, Direction::Left), Some(caret(&view, 4)));
}

#[test]
fn vertical_arrows_leave_inline_images_for_a_rule() {
    let mut view = view_of(doc([p([text("foo"), img()]), hr(), p([img(), text("bar")])]));

    view.set_selection(node(&view, 4)).unwrap();
    assert_eq!(press(&mut view, Direction::Down), Some(node(&view, 6)));

    view.set_selection(node(&view, 8)).unwrap();
    assert_eq!(press(&mut view, Direction::Up), Some(node(&view, 6)));
}

#[test]
fn markdown_documents_behave_like_built_ones() {
    let mut view = view_of(parse_markdown("# Title\n\nSome *text*\n\n---\n\nEnd\n"));
    assert_eq!(view.document().size(), 24);

    view.set_selection(caret(&view, 17)).unwrap();
    assert_eq!(press(&mut view, Direction::Right), Some(node(&view, 18)));
    assert_eq!(press(&mut view, Direction::Right), Some(caret(&view, 20)));
}
