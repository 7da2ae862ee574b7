//! Retro window chrome: title bar, menu bar and status bar

use crate::connection::ConnectionStatus;
use crate::events::ConnectionState;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

const TITLE_BLUE: Color = Color::Rgb(0, 0, 128);
const FACE_GREY: Color = Color::Rgb(192, 192, 192);

/// Areas of the chat window, top to bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLayout {
    pub title: Rect,
    pub menu: Rect,
    pub history: Rect,
    pub typing: Rect,
    pub composer: Rect,
    pub status: Rect,
}

impl WindowLayout {
    pub fn split(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Title bar
                Constraint::Length(1), // Menu bar
                Constraint::Min(3),    // History
                Constraint::Length(1), // Typing indicator
                Constraint::Length(3), // Composer
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        Self {
            title: chunks[0],
            menu: chunks[1],
            history: chunks[2],
            typing: chunks[3],
            composer: chunks[4],
            status: chunks[5],
        }
    }
}

pub struct TitleBar<'a> {
    pub title: &'a str,
}

impl Widget for TitleBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        let style = Style::default().fg(Color::White).bg(TITLE_BLUE);
        buf.set_style(area, style);

        let controls = " _ □ x ";
        let line = Line::from(vec![Span::styled(
            format!(" 🖥 {}", self.title),
            style.add_modifier(Modifier::BOLD),
        )]);
        buf.set_line(area.x, area.y, &line, area.width);

        let controls_width = controls.chars().count() as u16;
        if area.width > controls_width {
            let x = area.x + area.width - controls_width;
            buf.set_string(x, area.y, controls, Style::default().fg(Color::Black).bg(FACE_GREY));
        }
    }
}

pub struct MenuBar;

impl Widget for MenuBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        let style = Style::default().fg(Color::Black).bg(FACE_GREY);
        buf.set_style(area, style);

        let spans: Vec<Span> = ["File", "Edit", "View", "Help"]
            .iter()
            .map(|item| Span::styled(format!(" {} ", item), style))
            .collect();
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

pub struct StatusBar<'a> {
    pub status: ConnectionStatus,
    pub endpoint: &'a str,
    pub notice: Option<&'a str>,
}

impl StatusBar<'_> {
    pub fn describe(status: ConnectionStatus) -> (String, Color) {
        match status.state {
            ConnectionState::Online => ("● Online".to_string(), Color::Green),
            ConnectionState::Connecting if status.retries > 0 => (
                format!("◌ Connecting (retry {})", status.retries),
                Color::Yellow,
            ),
            ConnectionState::Connecting => ("◌ Connecting".to_string(), Color::Yellow),
            ConnectionState::Offline => ("○ Offline".to_string(), Color::Red),
            ConnectionState::PermanentlyClosed => {
                ("✕ Connection closed".to_string(), Color::Red)
            }
        }
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        let base = Style::default().fg(Color::Black).bg(FACE_GREY);
        buf.set_style(area, base);

        let (label, color) = Self::describe(self.status);
        let mut spans = vec![
            Span::styled(format!(" {} ", label), base.fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(format!("│ {} ", self.endpoint), base),
        ];
        if let Some(notice) = self.notice {
            spans.push(Span::styled(format!("│ {}", notice), base.fg(Color::Red)));
        }
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_reserves_fixed_rows() {
        let layout = WindowLayout::split(Rect::new(0, 0, 80, 24));
        assert_eq!(layout.title.height, 1);
        assert_eq!(layout.menu.height, 1);
        assert_eq!(layout.typing.height, 1);
        assert_eq!(layout.composer.height, 3);
        assert_eq!(layout.status.height, 1);
        assert_eq!(layout.history.height, 24 - 7);
        assert_eq!(layout.status.y, 23);
    }

    #[test]
    fn status_labels_follow_state() {
        let (label, _) = StatusBar::describe(ConnectionStatus {
            state: ConnectionState::Connecting,
            retries: 3,
        });
        assert_eq!(label, "◌ Connecting (retry 3)");

        let (label, color) = StatusBar::describe(ConnectionStatus {
            state: ConnectionState::PermanentlyClosed,
            retries: 10,
        });
        assert_eq!(label, "✕ Connection closed");
        assert_eq!(color, Color::Red);
    }
}
