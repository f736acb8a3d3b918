use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::centered_rect;

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        format!("  {}", title),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))
}

fn binding<'a>(keys: &'a str, action: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("    {:<12}", keys), Style::default().fg(Color::Yellow)),
        Span::raw(action),
    ])
}

pub fn render(frame: &mut Frame) {
    let area = centered_rect(70, 80, frame.area());

    // Clear the area behind the popup
    frame.render_widget(Clear, area);

    let help_text = vec![
        Line::from(""),
        section("Global"),
        binding("?", "Toggle this help"),
        binding("q", "Quit application"),
        binding("Esc", "Clear search / close"),
        Line::from(""),
        section("Catalog"),
        binding("↑/k ↓/j", "Select previous/next currency"),
        binding("n/p", "Next/previous page"),
        binding("g/G", "Jump to first/last page"),
        binding("P", "Cycle page size"),
        binding("v", "Toggle table/grid layout"),
        binding("/", "Search by code or name"),
        binding("Enter", "Open banknote viewer"),
        binding("r", "Reload (discards unsaved order)"),
        binding("d", "Delete selected currency"),
        Line::from(""),
        section("Ordering (no active search)"),
        binding("K/J", "Move selected up/down"),
        binding("mouse drag", "Drag a row to a new position"),
        binding("s", "Save order"),
        Line::from(""),
        section("Viewer"),
        binding("←/h →/l", "Previous/next image"),
        binding("1-9", "Jump to image"),
        binding("+/- 0", "Zoom in/out, reset"),
        binding("H/J/K/L", "Pan while zoomed"),
        binding("mouse", "Drag to pan, click thumbnail, scroll to zoom"),
        Line::from(""),
    ];

    let help = Paragraph::new(help_text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help: Keybindings ")
                .title_bottom(
                    Line::from(" Press ? or Esc to close ").style(Style::default().fg(Color::DarkGray)),
                ),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(help, area);
}
