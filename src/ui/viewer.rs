use crate::app::App;
use crate::catalog::repository::CatalogRepository;
use crate::viewer::ViewerSession;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::{centered_rect, truncate_str};

const THUMB_WIDTH: u16 = 6;

/// Image modal. Returns the image area and the thumbnail rects.
pub fn render<R: CatalogRepository>(
    app: &App<R>,
    session: &ViewerSession,
    frame: &mut Frame,
) -> (Rect, Vec<Rect>) {
    let area = centered_rect(80, 80, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", app.viewer_title))
        .title_bottom(
            Line::from(format!(" {} · {}% ", session.counter(), session.zoom_percent()))
                .alignment(Alignment::Right),
        );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let nav_height = if session.has_navigation() { 4 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(nav_height),
        ])
        .split(inner);

    render_controls(session, frame, chunks[0]);
    let image_area = chunks[1];
    render_image(app, session, frame, image_area);

    let thumbnails = if session.has_navigation() {
        render_navigation(session, frame, chunks[2])
    } else {
        Vec::new()
    };
    (image_area, thumbnails)
}

fn render_controls(session: &ViewerSession, frame: &mut Frame, area: Rect) {
    let on = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let off = Style::default().fg(Color::DarkGray);
    let pick = |enabled: bool| if enabled { on } else { off };

    let mut spans = Vec::new();
    if session.has_navigation() {
        spans.extend([
            Span::styled(" ← prev", pick(session.can_go_prev())),
            Span::raw("  "),
            Span::styled("next →", pick(session.can_go_next())),
            Span::raw("   "),
        ]);
    }
    spans.extend([
        Span::styled("+", pick(session.can_zoom_in())),
        Span::raw("/"),
        Span::styled("-", pick(session.can_zoom_out())),
        Span::raw(" zoom  "),
        Span::styled("0", on),
        Span::raw(" reset  "),
        Span::styled("Esc", on),
        Span::raw(" close"),
    ]);
    if session.zoom_percent() > 100 {
        spans.push(Span::styled("   drag or H/J/K/L to pan", off));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw the image frame scaled by zoom and shifted by the pan.
fn render_image<R: CatalogRepository>(
    app: &App<R>,
    session: &ViewerSession,
    frame: &mut Frame,
    area: Rect,
) {
    if area.width < 4 || area.height < 3 {
        return;
    }
    let zoom = session.zoom();
    let base_w = (area.width as f32 * 0.45).max(12.0);
    let base_h = (area.height as f32 * 0.45).max(3.0);
    let w = (base_w * zoom).round() as i32;
    let h = (base_h * zoom).round() as i32;

    // The offset is applied inside the scaled space, so on screen it moves by offset × zoom
    let offset = session.display_offset();
    let dx = (offset.x * zoom).round() as i32;
    let dy = (offset.y * zoom).round() as i32;

    let cx = area.x as i32 + area.width as i32 / 2 + dx;
    let cy = area.y as i32 + area.height as i32 / 2 + dy;
    let left = (cx - w / 2).max(area.x as i32);
    let top = (cy - h / 2).max(area.y as i32);
    let right = (cx - w / 2 + w).min(area.right() as i32);
    let bottom = (cy - h / 2 + h).min(area.bottom() as i32);
    if right - left < 2 || bottom - top < 2 {
        return;
    }
    let image_rect = Rect::new(left as u16, top as u16, (right - left) as u16, (bottom - top) as u16);

    let url = session.current_image();
    let name = url.rsplit('/').next().unwrap_or(url);
    let text_width = image_rect.width.saturating_sub(2) as usize;
    let lines = if session.is_loading() {
        vec![
            Line::from(""),
            Line::from(Span::styled("Loading…", Style::default().fg(Color::Yellow))),
        ]
    } else {
        let size = app
            .prefetcher
            .size_of(url)
            .map(|bytes| format!("{:.1} KB", bytes as f64 / 1024.0))
            .unwrap_or_default();
        vec![
            Line::from(""),
            Line::from(Span::styled(
                truncate_str(name, text_width),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(size, Style::default().fg(Color::DarkGray))),
        ]
    };
    let image = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if session.is_loading() {
                Color::DarkGray
            } else {
                Color::Green
            })),
    );
    frame.render_widget(image, image_rect);
}

/// Position dots and the thumbnail strip. Returns one rect per image;
/// thumbnails that do not fit get an empty rect.
fn render_navigation(session: &ViewerSession, frame: &mut Frame, area: Rect) -> Vec<Rect> {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(3)])
        .split(area);

    let dots: Vec<Span> = (0..session.images().len())
        .map(|i| {
            if i == session.index() {
                Span::styled("● ", Style::default().fg(Color::Cyan))
            } else {
                Span::styled("○ ", Style::default().fg(Color::DarkGray))
            }
        })
        .collect();
    frame.render_widget(
        Paragraph::new(Line::from(dots)).alignment(Alignment::Center),
        chunks[0],
    );

    let strip = chunks[1];
    let fits = (strip.width / (THUMB_WIDTH + 1)) as usize;
    let shown = session.images().len().min(fits);
    let used = shown as u16 * (THUMB_WIDTH + 1);
    let start_x = strip.x + strip.width.saturating_sub(used) / 2;

    (0..session.images().len())
        .map(|i| {
            if i >= shown {
                return Rect::default();
            }
            let rect = Rect::new(start_x + i as u16 * (THUMB_WIDTH + 1), strip.y, THUMB_WIDTH, strip.height);
            let current = i == session.index();
            let style = if current {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let thumb = Paragraph::new((i + 1).to_string())
                .alignment(Alignment::Center)
                .style(style)
                .block(Block::default().borders(Borders::ALL).border_style(style));
            frame.render_widget(thumb, rect);
            rect
        })
        .collect()
}
