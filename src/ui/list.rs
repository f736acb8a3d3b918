use crate::app::{App, InputMode};
use crate::catalog::repository::CatalogRepository;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
};
use unicode_width::UnicodeWidthStr;

use super::truncate_str;

/// Header, search bar and status bar. Returns the body area between them.
pub fn render_chrome<R: CatalogRepository>(app: &App<R>, frame: &mut Frame) -> Rect {
    let area = frame.area();

    // Layout: header(3) + search(3) + body(min) + status(1)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    // ── Header ──
    let store = app.catalog.store();
    let totals = store.totals();
    let mut header_spans = vec![
        Span::styled(
            " Banknote Explorer",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "   [{} currencies · {} banknotes]",
                totals.currency_count, totals.banknote_count
            ),
            Style::default().fg(Color::Cyan),
        ),
    ];
    header_spans.push(Span::styled(
        format!("  {} view", app.layout.label()),
        Style::default().fg(Color::DarkGray),
    ));
    if store.is_filtered() {
        header_spans.push(Span::styled(
            format!("  {} shown", totals.filtered_count),
            Style::default().fg(Color::Yellow),
        ));
    }
    if app.loading {
        header_spans.push(Span::styled("  loading…", Style::default().fg(Color::DarkGray)));
    }
    if app.catalog.is_saving() {
        header_spans.push(Span::styled("  saving…", Style::default().fg(Color::Cyan)));
    } else if app.catalog.is_dirty() {
        header_spans.push(Span::styled(
            "  ● unsaved order",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }
    let header = Paragraph::new(Line::from(header_spans))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(header, chunks[0]);

    // ── Search bar ──
    let search_style = match app.input_mode {
        InputMode::Editing => Style::default().fg(Color::Yellow),
        InputMode::Normal => Style::default().fg(Color::DarkGray),
    };
    let search_label = if app.input_mode == InputMode::Editing {
        " Code or name (Enter to apply, Esc to cancel): "
    } else {
        " Code or name (/): "
    };
    let search_bar = Paragraph::new(format!("{}{}", search_label, app.filter))
        .style(search_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(search_style)
                .title(" Search "),
        );
    frame.render_widget(search_bar, chunks[1]);

    if app.input_mode == InputMode::Editing {
        let cursor_x = chunks[1].x + 1 + (search_label.width() + app.filter.width()) as u16;
        frame.set_cursor_position((cursor_x.min(chunks[1].right().saturating_sub(2)), chunks[1].y + 1));
    }

    // ── Status bar ──
    let key = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut status = vec![
        Span::styled(" ↑↓", key),
        Span::raw(" Select  "),
        Span::styled("Enter", key),
        Span::raw(" View  "),
    ];
    if app.catalog.can_reorder() {
        status.push(Span::styled("K/J", key));
        status.push(Span::raw(" Move  "));
    }
    if app.catalog.is_dirty() && !app.catalog.is_saving() {
        status.push(Span::styled("s", key));
        status.push(Span::raw(" Save  "));
    }
    status.extend([
        Span::styled("?", key),
        Span::raw(" Help  "),
        Span::styled("q", key),
        Span::raw(" Quit  "),
        Span::styled(app.status_msg.as_str(), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(Line::from(status)), chunks[3]);

    chunks[2]
}

/// Current page as a table. Returns one rect per visible record.
pub fn render_table<R: CatalogRepository>(app: &App<R>, frame: &mut Frame, area: Rect) -> Vec<Rect> {
    let store = app.catalog.store();
    let visible = store.visible();
    let offset = store.page_offset();
    let dragged = app.catalog.ordering().dragged_id();

    let name_width = (area.width as usize).saturating_sub(40).max(8);
    let rows: Vec<Row> = visible
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let is_dragged = dragged == Some(record.id);
            let marker = if is_dragged { "≡" } else { " " };
            let rank = record
                .sort_order
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            let style = if is_dragged {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(format!("{}{:>4}", marker, offset + i + 1)),
                Cell::from(record.code.clone()).style(Style::default().fg(Color::Cyan)),
                Cell::from(truncate_str(&record.name, name_width)),
                Cell::from(record.banknote_count().to_string()),
                Cell::from(if record.flag_url.is_empty() { "no" } else { "yes" }),
                Cell::from(rank).style(Style::default().fg(Color::DarkGray)),
            ])
            .style(style)
        })
        .collect();

    let page_info = format!(
        " page {}/{} · {} per page ",
        store.current_page(),
        store.page_count().max(1),
        store.page_size()
    );
    let title = if app.catalog.can_reorder() {
        " Currencies (drag rows to reorder) "
    } else {
        " Currencies "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title)
        .title_bottom(Line::from(page_info).alignment(Alignment::Right));
    let inner = block.inner(area);

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Min(8),
            Constraint::Length(10),
            Constraint::Length(5),
            Constraint::Length(5),
        ],
    )
    .header(
        Row::new(vec!["#", "Code", "Name", "Banknotes", "Flag", "Rank"])
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD)),
    )
    .block(block)
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");

    // Keep the selection on screen and mirror the scroll for hit-testing
    let capacity = inner.height.saturating_sub(1).max(1) as usize;
    let scroll = app.selected.saturating_sub(capacity - 1);
    let mut state = TableState::default()
        .with_offset(scroll)
        .with_selected(if visible.is_empty() { None } else { Some(app.selected) });
    frame.render_stateful_widget(table, area, &mut state);

    (0..visible.len())
        .map(|i| {
            if i < scroll || i >= scroll + capacity {
                Rect::default()
            } else {
                Rect::new(inner.x, inner.y + 1 + (i - scroll) as u16, inner.width, 1)
            }
        })
        .collect()
}
