//! Transcript display component

use crate::events::{Message, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget},
};

/// Scroll position of the transcript, counted in lines from the bottom
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    scroll_offset: usize,
    show_timestamps: bool,
}

impl ConversationHistory {
    pub fn new(show_timestamps: bool) -> Self {
        Self {
            scroll_offset: 0,
            show_timestamps,
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn widget<'a>(&'a self, messages: &'a [Message]) -> HistoryWidget<'a> {
        HistoryWidget {
            history: self,
            messages,
        }
    }

    /// Lay out every message for the given inner width
    fn lines(&self, messages: &[Message], width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for message in messages {
            all_lines.extend(self.render_message(message, width));
            all_lines.push(Line::default());
        }
        all_lines
    }

    fn render_message(&self, message: &Message, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        let bubble_width = (width as usize * 4 / 5).max(1);

        let mut header = match message.role {
            Role::User => "You".to_string(),
            Role::Assistant => "🖥 AI Assistant".to_string(),
        };
        if self.show_timestamps {
            header.push_str(&message.received_at.format("  %H:%M:%S").to_string());
        }
        lines.push(self.align(
            message.role,
            vec![Span::styled(
                header,
                Style::default()
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )],
            width,
        ));

        for content_line in wrap_text(&message.content, bubble_width) {
            lines.push(self.align(
                message.role,
                vec![Span::styled(content_line, content_style(message.role))],
                width,
            ));
        }

        lines
    }

    /// User messages sit on the right, assistant messages on the left
    fn align(&self, role: Role, spans: Vec<Span<'static>>, width: u16) -> Line<'static> {
        if role == Role::Assistant {
            return Line::from(spans);
        }

        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let padding = (width as usize).saturating_sub(used);
        let mut padded = vec![Span::raw(" ".repeat(padding))];
        padded.extend(spans);
        Line::from(padded)
    }
}

fn content_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Black).bg(Color::Gray),
        Role::Assistant => Style::default().fg(Color::Black).bg(Color::White),
    }
}

/// Wrap text to fit within the given width, keeping explicit line breaks
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut current_line));
                current_len = 0;
            }

            // Hard-split words longer than a whole line
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > width {
                let rest = chars.split_off(width);
                lines.push(chars.into_iter().collect());
                chars = rest;
            }

            if current_len > 0 {
                current_line.push(' ');
                current_len += 1;
            }
            current_len += chars.len();
            current_line.extend(chars);
        }

        lines.push(current_line);
    }

    lines
}

pub struct HistoryWidget<'a> {
    history: &'a ConversationHistory,
    messages: &'a [Message],
}

impl Widget for HistoryWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Black).bg(Color::White));
        let inner_area = block.inner(area);
        block.render(area, buf);
        if inner_area.is_empty() {
            return;
        }

        // Leave a column for the scrollbar
        let text_width = inner_area.width.saturating_sub(1);
        let all_lines = self.history.lines(self.messages, text_width);

        let height = inner_area.height as usize;
        let total = all_lines.len();
        let max_offset = total.saturating_sub(height);
        let offset = self.history.scroll_offset.min(max_offset);
        let start = total.saturating_sub(height + offset);
        let end = (start + height).min(total);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, text_width);
        }

        if total > height {
            let mut scroll_state = ScrollbarState::new(max_offset).position(max_offset - offset);
            Scrollbar::default()
                .orientation(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"))
                .render(inner_area, buf, &mut scroll_state);
        }
    }
}
