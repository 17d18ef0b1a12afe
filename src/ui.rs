use crate::app::App;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};
use tui_tilemap::braille::{Canvas, Rgb};

/// Render the UI
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Split into map area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
}

fn render_map(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " tui-tilemap ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let canvas = app.refresh();
    frame.render_widget(MapWidget { canvas }, inner);
}

fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

/// Copies canvas cells into the terminal buffer
struct MapWidget<'a> {
    canvas: &'a Canvas,
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for (col, row, cell) in self.canvas.cells() {
            if col >= area.width as usize || row >= area.height as usize {
                continue;
            }
            // blank cells keep the terminal background
            if cell.ch == ' ' {
                continue;
            }
            let x = area.x + col as u16;
            let y = area.y + row as u16;
            let target = &mut buf[(x, y)];
            target.set_char(cell.ch);
            if let Some(color) = cell.color {
                target.set_fg(rgb(color));
            }
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (tiles, tiles_color) = app.tile_status();
    let report = app.report();

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | tiles ", Style::default().fg(Color::DarkGray)),
        Span::styled(tiles, Style::default().fg(rgb(tiles_color))),
        Span::styled(" labels ", Style::default().fg(Color::DarkGray)),
        Span::styled(report.labels_placed.to_string(), Style::default().fg(Color::Magenta)),
        Span::styled(
            " | hjkl:pan +/-:zoom r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let paragraph = Paragraph::new(status);
    frame.render_widget(paragraph, area);
}
