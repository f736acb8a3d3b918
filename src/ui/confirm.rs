use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::centered_rect;

/// Answer given in the confirmation overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResult {
    Confirm,
    Cancel,
}

/// Yes/no prompt guarding a destructive action on one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOverlay {
    target: i64,
    label: String,
    prompt: String,
}

impl ConfirmOverlay {
    /// Prompt for deleting the record `id`.
    pub fn delete(id: i64, code: &str, name: &str) -> Self {
        Self {
            target: id,
            label: code.to_string(),
            prompt: format!("Delete {} ({}) from the catalog?", code, name),
        }
    }

    pub fn target(&self) -> i64 {
        self.target
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn handle_key(&self, key: KeyEvent) -> Option<ConfirmResult> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(ConfirmResult::Confirm),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
                Some(ConfirmResult::Cancel)
            }
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = centered_rect(50, 25, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(" Confirm delete ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(2), Constraint::Length(1)])
            .split(inner);

        let prompt = Paragraph::new(self.prompt.as_str())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(prompt, chunks[0]);

        let help = Paragraph::new("y/Enter: Delete | n/Esc: Keep")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(help, chunks[1]);
    }
}
