use crate::app::App;
use crate::braille::BrailleCanvas;
use crate::map::{CursorIcon, FillPaint, Popup, SurfaceFrame};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
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

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Site Map ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let surface_frame = app.surface.render_frame();

    // Cursor marker position in character coordinates
    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        if cx < inner.width && cy < inner.height {
            Some((cx, cy))
        } else {
            None
        }
    });

    let map_widget = MapWidget {
        frame: surface_frame,
        cursor_pos,
        cursor_icon: app.surface.cursor(),
    };
    frame.render_widget(map_widget, inner);

    if let Some(popup) = app.surface.popup() {
        render_popup(frame, app, popup, inner);
    }
}

/// Braille map widget: base outlines below, fill layers on top
struct MapWidget {
    frame: SurfaceFrame,
    cursor_pos: Option<(u16, u16)>,
    cursor_icon: CursorIcon,
}

impl MapWidget {
    /// Render one braille canvas with a fixed color
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for cy in 0..canvas.height().min(area.height as usize) {
            for cx in 0..canvas.width().min(area.width as usize) {
                if let Some(ch) = canvas.cell_char(cx, cy) {
                    let x = area.x + cx as u16;
                    let y = area.y + cy as u16;
                    buf[(x, y)].set_char(ch).set_fg(color);
                }
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Self::render_layer(&self.frame.base, Color::Cyan, area, buf);

        for (paint, canvas) in &self.frame.fills {
            Self::render_layer(canvas, paint_color(paint), area, buf);
        }

        // Cursor marker: the glyph doubles as the pointer affordance
        if let Some((cx, cy)) = self.cursor_pos {
            let x = area.x + cx;
            let y = area.y + cy;
            if x < area.x + area.width && y < area.y + area.height {
                let (glyph, color) = match self.cursor_icon {
                    CursorIcon::Default => ('╋', Color::DarkGray),
                    CursorIcon::Pointer => ('╋', Color::Yellow),
                };
                buf[(x, y)].set_char(glyph).set_fg(color);
            }
        }
    }
}

/// Fill paint mapped onto a terminal color, opacity approximated by
/// dimming toward black
fn paint_color(paint: &FillPaint) -> Color {
    let dim = |c: u8| (c as f64 * paint.opacity.clamp(0.0, 1.0).max(0.2)) as u8;
    Color::Rgb(dim(paint.color.0), dim(paint.color.1), dim(paint.color.2))
}

/// Popup box anchored at the clicked location
fn render_popup(frame: &mut Frame, app: &App, popup: &Popup, map_area: Rect) {
    let (px, py) = app
        .surface
        .viewport
        .project(popup.lng_lat.0, popup.lng_lat.1);
    let anchor_x = map_area.x + ((px.max(0) / 2) as u16).min(map_area.width.saturating_sub(1));
    let anchor_y = map_area.y + ((py.max(0) / 4) as u16).min(map_area.height.saturating_sub(1));

    let body = if popup.body.is_empty() {
        " "
    } else {
        popup.body.as_str()
    };
    let body_len = body.chars().count().min(36) as u16;
    let width = (body_len + 4).clamp(12, 40).min(map_area.width);
    let height = 3u16;

    // Keep the box inside the map area, preferring below-right of the anchor
    let x = anchor_x.min((map_area.x + map_area.width).saturating_sub(width));
    let y = if anchor_y + height <= map_area.y + map_area.height {
        anchor_y
    } else {
        (map_area.y + map_area.height).saturating_sub(height)
    };
    let area = Rect::new(x, y, width, height.min(map_area.height));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(" Site ", Style::default().fg(Color::Yellow)));
    let paragraph = Paragraph::new(body.to_string())
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: true })
        .block(block);

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.fetch_status(), Style::default().fg(Color::Green)),
        Span::styled(
            " | hjkl:pan +/-:zoom click:info x:close q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let paragraph = Paragraph::new(status);
    frame.render_widget(paragraph, area);
}
