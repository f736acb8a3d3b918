use crate::app::App;
use crate::catalog::repository::CatalogRepository;
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::truncate_str;

const CARD_HEIGHT: u16 = 5;

/// Current page as a grid of cards. Returns one rect per visible record.
pub fn render<R: CatalogRepository>(app: &App<R>, frame: &mut Frame, area: Rect) -> Vec<Rect> {
    let store = app.catalog.store();
    let visible = store.visible();
    let dragged = app.catalog.ordering().dragged_id();

    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Currencies ")
        .title_bottom(
            Line::from(format!(
                " page {}/{} · {} per page ",
                store.current_page(),
                store.page_count().max(1),
                store.page_size()
            ))
            .alignment(Alignment::Right),
        );
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let columns = app.grid_columns.max(1) as u16;
    let card_width = (inner.width / columns).max(1);
    let visible_rows = (inner.height / CARD_HEIGHT).max(1) as usize;

    // Scroll whole card rows so the selection stays visible
    let selected_row = app.selected / columns as usize;
    let first_row = selected_row.saturating_sub(visible_rows - 1);

    let mut cells = Vec::with_capacity(visible.len());
    for (i, record) in visible.iter().enumerate() {
        let row = i / columns as usize;
        let col = (i % columns as usize) as u16;
        if row < first_row || row >= first_row + visible_rows {
            cells.push(Rect::default());
            continue;
        }
        let cell = Rect::new(
            inner.x + col * card_width,
            inner.y + (row - first_row) as u16 * CARD_HEIGHT,
            card_width,
            CARD_HEIGHT,
        )
        .intersection(inner);
        cells.push(cell);

        let is_selected = i == app.selected;
        let is_dragged = dragged == Some(record.id);
        let border = if is_dragged {
            Style::default().fg(Color::Yellow)
        } else if is_selected {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let text_width = card_width.saturating_sub(2) as usize;
        let card = Paragraph::new(vec![
            Line::from(Span::raw(truncate_str(&record.name, text_width))),
            Line::from(Span::styled(
                format!("{} banknotes", record.banknote_count()),
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                truncate_str(record.first_banknote().unwrap_or("no image"), text_width),
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(Span::styled(
                    format!(" {} ", record.code),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        );
        frame.render_widget(card, cell);
    }
    cells
}
