use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::{Buffer, Cell},
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect as Area},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use richview_config::{Config, LayoutConfig};
use richview_engine::surface::monospace::GlyphContent;
use richview_engine::{
    Direction, EditorView, Metrics, MonospaceSurface, NativePoint, Point, Rect, RenderSurface,
    Selection, ViewEvent, parse_markdown,
};
use std::{env, io::stdout, path::PathBuf, process};

struct App {
    document_path: PathBuf,
    view: EditorView<MonospaceSurface>,
    /// First document row shown
    scroll: u16,
    /// Inner area of the document panel in the last frame
    viewport: Area,
}

impl App {
    fn new(document_path: PathBuf, source: &str, layout: LayoutConfig) -> Self {
        let surface = MonospaceSurface::new(metrics_for(layout));
        let view = EditorView::new(parse_markdown(source), surface);
        log::info!(
            "loaded {} with {} positions",
            document_path.display(),
            view.document().size()
        );
        Self {
            document_path,
            view,
            scroll: 0,
            viewport: Area::default(),
        }
    }

    fn move_cursor(&mut self, direction: Direction) {
        if !self.view.dispatch(ViewEvent::Move(direction)) {
            log::debug!("{direction:?} left the selection unchanged");
        }
        self.scroll_to_selection();
    }

    fn click(&mut self, column: u16, row: u16) {
        let inside = column >= self.viewport.x
            && row >= self.viewport.y
            && column < self.viewport.right()
            && row < self.viewport.bottom();
        if !inside {
            return;
        }
        // Cell left edge: a click on a character puts the caret before it
        let point = Point::new(
            f32::from(column - self.viewport.x),
            f32::from(row - self.viewport.y + self.scroll) + 0.5,
        );
        self.view.select_at(point);
    }

    fn scroll_to_selection(&mut self) {
        let Some(top) = self.cursor_rect().map(|rect| rect.top as u16) else {
            return;
        };
        let height = self.viewport.height.max(1);
        if top < self.scroll {
            self.scroll = top;
        } else if top >= self.scroll + height {
            self.scroll = top + 1 - height;
        }
    }

    fn cursor_rect(&self) -> Option<Rect> {
        let selection = self.view.selection()?;
        self.view.coords_at_pos(selection.head()).ok()
    }

    /// Box of the selected node, if a node is selected
    fn selected_box(&self) -> Option<Rect> {
        let Some(Selection::Node(node)) = self.view.selection() else {
            return None;
        };
        let id = node.node(self.view.document())?;
        self.view.surface().rect_for_offset(NativePoint::new(id, 0))
    }

    fn status(&self) -> String {
        let selection = self
            .view
            .selection()
            .map_or_else(|| "no selection".to_string(), |sel| sel.to_string());
        format!("{} | {selection}", self.document_path.display())
    }
}

fn metrics_for(layout: LayoutConfig) -> Metrics {
    Metrics {
        char_width: 1.0,
        line_height: 1.0,
        wrap_width: f32::from(layout.wrap_column),
        indent: f32::from(layout.indent_columns),
        image_width: f32::from(layout.image_columns.max(1)),
    }
}

fn main() -> Result<()> {
    // The terminal belongs to the UI, so only warnings by default
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    // Determine the document from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let document_path = if args.len() == 2 {
        PathBuf::from(&args[1])
    } else if args.len() == 1 {
        match config.document_path.clone() {
            Some(path) => path,
            None => {
                eprintln!("Error: No document provided and none configured");
                eprintln!("Usage: {} <file.md>", args[0]);
                eprintln!(
                    "Or set document_path in a config file at {}",
                    config_path.display()
                );
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [file.md]", args[0]);
        process::exit(1);
    };

    let source = match std::fs::read_to_string(&document_path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!(
                "Error: Could not read document '{}': {e}",
                document_path.display()
            );
            process::exit(1);
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(document_path, &source, config.layout);

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        match event::read()? {
            Event::Key(key) => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Left => app.move_cursor(Direction::Left),
                KeyCode::Right => app.move_cursor(Direction::Right),
                KeyCode::Up => app.move_cursor(Direction::Up),
                KeyCode::Down => app.move_cursor(Direction::Down),
                _ => {}
            },
            Event::Mouse(mouse) => {
                if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                    app.click(mouse.column, mouse.row);
                }
            }
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(f.area());

    let block = Block::default().borders(Borders::ALL).title("Document");
    app.viewport = block.inner(chunks[0]);
    f.render_widget(block, chunks[0]);

    draw_document(f.buffer_mut(), app);

    if let Some(rect) = app.cursor_rect() {
        let (x, y) = (rect.left as u16, rect.top as u16);
        if y >= app.scroll && y - app.scroll < app.viewport.height && x < app.viewport.width {
            f.set_cursor_position((app.viewport.x + x, app.viewport.y + y - app.scroll));
        }
    }

    let help = Line::from(vec![
        Span::styled(app.status(), Style::default().fg(Color::Yellow)),
        Span::raw(" | ←↑↓→: Move | Click: Select | q: Quit"),
    ]);
    f.render_widget(Paragraph::new(vec![help]), chunks[1]);
}

/// Buffer cell for document cell `(x, y)`, if it is scrolled into view
fn cell_at<'a>(buf: &'a mut Buffer, app: &App, x: u16, y: u16) -> Option<&'a mut Cell> {
    let viewport = app.viewport;
    if y < app.scroll || y - app.scroll >= viewport.height || x >= viewport.width {
        return None;
    }
    buf.cell_mut((viewport.x + x, viewport.y + y - app.scroll))
}

fn draw_document(buf: &mut Buffer, app: &App) {
    let mut put = |x: u16, y: u16, symbol: &str, style: Style| {
        if let Some(cell) = cell_at(buf, app, x, y) {
            cell.set_symbol(symbol).set_style(style);
        }
    };

    for glyph in app.view.surface().glyphs() {
        let (left, right) = (glyph.rect.left as u16, glyph.rect.right as u16);
        let (top, bottom) = (glyph.rect.top as u16, glyph.rect.bottom as u16);
        match &glyph.content {
            GlyphContent::Char(ch) => {
                let mut symbol = [0; 4];
                put(left, top, ch.encode_utf8(&mut symbol), Style::default());
            }
            GlyphContent::Image { alt } => {
                let label: Vec<char> = format!("[{alt}]").chars().collect();
                for (i, column) in (left..right).enumerate() {
                    let symbol = label.get(i).map_or_else(|| "▣".to_string(), |ch| ch.to_string());
                    put(column, top, &symbol, Style::default().fg(Color::Cyan));
                }
            }
            GlyphContent::Rule => {
                for column in left..right {
                    put(column, top, "─", Style::default().fg(Color::DarkGray));
                }
            }
            GlyphContent::Bullet => put(left, top, "•", Style::default()),
            GlyphContent::QuoteBar => {
                for row in top..bottom {
                    put(left, row, "│", Style::default().fg(Color::DarkGray));
                }
            }
        }
    }

    if let Some(selected) = app.selected_box() {
        let highlight = Style::default().add_modifier(Modifier::REVERSED);
        for row in selected.top as u16..selected.bottom as u16 {
            for column in selected.left as u16..selected.right as u16 {
                if let Some(cell) = cell_at(buf, app, column, row) {
                    cell.set_style(highlight);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn app(source: &str) -> App {
        let mut app = App::new(PathBuf::from("test.md"), source, LayoutConfig::default());
        app.viewport = Area::new(1, 1, 40, 10);
        app
    }

    #[test]
    fn metrics_use_character_cells() {
        let metrics = metrics_for(LayoutConfig {
            wrap_column: 60,
            indent_columns: 4,
            image_columns: 0,
        });
        assert_eq!(metrics.char_width, 1.0);
        assert_eq!(metrics.wrap_width, 60.0);
        assert_eq!(metrics.image_width, 1.0);
    }

    #[test]
    fn arrow_keys_reach_a_rule() {
        let mut app = app("one\n\n---\n\ntwo\n");
        assert_eq!(app.status(), "test.md | caret 1");
        for _ in 0..4 {
            app.move_cursor(Direction::Right);
        }
        assert_eq!(app.status(), "test.md | node 5");
        assert!(app.selected_box().is_some());
    }

    #[test]
    fn clicks_outside_the_document_panel_are_ignored() {
        let mut app = app("hello\n");
        app.click(0, 0);
        assert_eq!(app.status(), "test.md | caret 1");
        app.click(4, 1);
        assert_eq!(app.status(), "test.md | caret 4");
    }

    #[test]
    fn scrolling_follows_the_cursor() {
        let source = (0..30).map(|i| format!("line {i}\n\n")).collect::<String>();
        let mut app = app(&source);
        for _ in 0..15 {
            app.move_cursor(Direction::Down);
        }
        assert_eq!(app.scroll, 6);
    }
}
