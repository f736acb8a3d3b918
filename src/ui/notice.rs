use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph};

use super::truncate_str;
use crate::toast::{Toast, ToastKind};

/// Progress of an order save, as rank writes completed out of total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveProgress {
    pub completed: usize,
    pub total: usize,
}

impl SaveProgress {
    /// Get the progress as a ratio (0.0-1.0)
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64).clamp(0.0, 1.0)
        }
    }
}

/// Gauge shown along the bottom while a save is running.
pub fn render_save_progress(frame: &mut Frame, progress: SaveProgress) {
    let area = frame.area();
    if area.height < 4 {
        return;
    }
    let width = area.width.min(50);
    let gauge_area = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + area.height - 4,
        width,
        3,
    );
    frame.render_widget(Clear, gauge_area);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Saving order "),
        )
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(progress.ratio())
        .label(format!("{}/{}", progress.completed, progress.total));
    frame.render_widget(gauge, gauge_area);
}

/// Latest toast, pinned to the top-right corner.
pub fn render_toast(frame: &mut Frame, toast: &Toast) {
    let area = frame.area();
    let max_text = (area.width as usize).saturating_sub(8).min(48);
    let text = truncate_str(&toast.message, max_text);
    let width = (unicode_width::UnicodeWidthStr::width(text.as_str()) as u16 + 4).min(area.width);
    if area.height < 3 || width < 5 {
        return;
    }
    let toast_area = Rect::new(area.x + area.width - width, area.y, width, 3);

    let (color, title) = match toast.kind {
        ToastKind::Success => (Color::Green, " ✓ "),
        ToastKind::Error => (Color::Red, " ✗ "),
    };

    frame.render_widget(Clear, toast_area);
    let widget = Paragraph::new(text)
        .style(Style::default().fg(color))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(title),
        );
    frame.render_widget(widget, toast_area);
}
