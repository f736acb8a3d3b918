mod grid;
mod help;
mod list;
mod viewer;

pub mod confirm;
pub mod notice;

use crate::app::{App, Layout as PageLayout};
use crate::catalog::repository::CatalogRepository;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Screen areas from the last frame, used to hit-test mouse events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Regions {
    /// One rect per visible record, in page order
    pub rows: Vec<Rect>,
    /// Viewer image area, when the viewer is open
    pub image: Option<Rect>,
    /// Viewer thumbnail strip, in image order
    pub thumbnails: Vec<Rect>,
}

impl Regions {
    pub fn row_at(&self, column: u16, row: u16) -> Option<usize> {
        let pos = Position::new(column, row);
        self.rows.iter().position(|r| r.contains(pos))
    }

    pub fn thumbnail_at(&self, column: u16, row: u16) -> Option<usize> {
        let pos = Position::new(column, row);
        self.thumbnails.iter().position(|r| r.contains(pos))
    }

    pub fn in_image(&self, column: u16, row: u16) -> bool {
        self.image
            .is_some_and(|r| r.contains(Position::new(column, row)))
    }
}

/// Top-level render dispatch.
pub fn render<R: CatalogRepository>(app: &App<R>, frame: &mut Frame) -> Regions {
    let body = list::render_chrome(app, frame);
    let mut regions = Regions {
        rows: match app.layout {
            PageLayout::Table => list::render_table(app, frame, body),
            PageLayout::Grid => grid::render(app, frame, body),
        },
        ..Regions::default()
    };

    if let Some(session) = app.viewer.session() {
        let (image, thumbnails) = viewer::render(app, session, frame);
        regions.image = Some(image);
        regions.thumbnails = thumbnails;
        // Rows underneath the modal are not clickable
        regions.rows.clear();
    }

    if let Some(confirm) = &app.confirm {
        confirm.render(frame);
    }

    if let Some((completed, total)) = app.persist_progress() {
        notice::render_save_progress(frame, notice::SaveProgress { completed, total });
    }

    if let Some(toast) = app.toasts.latest() {
        notice::render_toast(frame, toast);
    }

    if app.show_help {
        help::render(frame);
    }

    regions
}

/// Create a centered rectangle using percentage of parent area.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

/// Truncate a string to `max_width` display columns, adding "…" if truncated.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let budget = max_width.saturating_sub(1);
    let mut used = 0;
    let mut result = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        result.push(c);
    }
    result.push('…');
    result
}
