use crate::ui::conversation::commands::{command_entries, parse_slash_command, CommandEntry, ParsedCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use std::cell::{Cell, RefCell};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Enter on non-blank text. The buffer is kept until the caller clears it.
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// State for the text area within the composer
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    /// Byte offset, always on a char boundary
    pub cursor_position: usize,
}

/// Single input box at the bottom of the window
pub struct ConversationComposer {
    state: RefCell<TextAreaState>,
    placeholder: String,
    has_focus: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: RefCell<Vec<CommandEntry>>,
    show_command_palette: Cell<bool>,
    selected_command: Cell<Option<usize>>,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            state: RefCell::new(TextAreaState::default()),
            placeholder: placeholder.into(),
            has_focus: true,
            command_entries: command_entries(),
            filtered_commands: RefCell::new(Vec::new()),
            show_command_palette: Cell::new(false),
            selected_command: Cell::new(None),
        }
    }

    /// Handle key input
    pub fn handle_key(&self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        let mut state = self.state.borrow_mut();

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    Self::insert_str(&mut state, "\n");
                } else if self.show_command_palette.get() && self.apply_selected_command(&mut state) {
                    return ComposerResult::None;
                } else if !state.content.trim().is_empty() {
                    let content = state.content.clone();
                    if let Some(command) = parse_slash_command(&content) {
                        state.content.clear();
                        state.cursor_position = 0;
                        return ComposerResult::Command(command);
                    }
                    return ComposerResult::Submitted(content);
                }
            }
            KeyCode::Up if self.show_command_palette.get() => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette.get() => self.move_command_selection(1),
            KeyCode::Esc if self.show_command_palette.get() => self.close_command_palette(),
            KeyCode::Tab if self.show_command_palette.get() => {
                self.apply_selected_command(&mut state);
            }
            KeyCode::Char(c) => {
                let mut buf = [0u8; 4];
                Self::insert_str(&mut state, c.encode_utf8(&mut buf));
                self.sync_command_palette(&state);
            }
            KeyCode::Backspace => {
                if let Some(prev) = Self::prev_boundary(&state) {
                    let end = state.cursor_position;
                    state.content.replace_range(prev..end, "");
                    state.cursor_position = prev;
                    self.sync_command_palette(&state);
                }
            }
            KeyCode::Delete => {
                if let Some(next) = Self::next_boundary(&state) {
                    let start = state.cursor_position;
                    state.content.replace_range(start..next, "");
                    self.sync_command_palette(&state);
                }
            }
            KeyCode::Left => {
                if let Some(prev) = Self::prev_boundary(&state) {
                    state.cursor_position = prev;
                }
            }
            KeyCode::Right => {
                if let Some(next) = Self::next_boundary(&state) {
                    state.cursor_position = next;
                }
            }
            KeyCode::Home => {
                state.cursor_position = 0;
            }
            KeyCode::End => {
                state.cursor_position = state.content.len();
            }
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor
    pub fn paste(&self, text: &str) {
        let mut state = self.state.borrow_mut();
        Self::insert_str(&mut state, &text.replace('\r', ""));
        self.sync_command_palette(&state);
    }

    fn insert_str(state: &mut TextAreaState, text: &str) {
        let at = state.cursor_position;
        state.content.insert_str(at, text);
        state.cursor_position += text.len();
    }

    fn prev_boundary(state: &TextAreaState) -> Option<usize> {
        state.content[..state.cursor_position]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }

    fn next_boundary(state: &TextAreaState) -> Option<usize> {
        state.content[state.cursor_position..]
            .chars()
            .next()
            .map(|c| state.cursor_position + c.len_utf8())
    }

    /// Open, refresh or close the palette to match the current buffer
    fn sync_command_palette(&self, state: &TextAreaState) {
        let is_command_prefix = state.content.starts_with('/')
            && !state.content.chars().any(char::is_whitespace);

        if !is_command_prefix {
            self.close_command_palette();
        } else if self.show_command_palette.get() {
            self.refresh_command_palette(state);
        } else {
            self.show_command_palette.set(true);
            self.selected_command.set(Some(0));
            self.refresh_command_palette(state);
        }
    }

    fn close_command_palette(&self) {
        self.show_command_palette.set(false);
        self.filtered_commands.borrow_mut().clear();
        self.selected_command.set(None);
    }

    fn refresh_command_palette(&self, state: &TextAreaState) {
        let query = state.content.trim_start_matches('/').to_lowercase();
        let mut filtered = self.filtered_commands.borrow_mut();
        filtered.clear();
        filtered.extend(
            self.command_entries
                .iter()
                .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
                .copied(),
        );

        if filtered.is_empty() {
            self.selected_command.set(None);
        } else {
            let index = self.selected_command.get().unwrap_or(0);
            self.selected_command.set(Some(index.min(filtered.len() - 1)));
        }
    }

    fn move_command_selection(&self, delta: isize) {
        let filtered = self.filtered_commands.borrow();
        if filtered.is_empty() {
            self.selected_command.set(None);
            return;
        }

        let len = filtered.len() as isize;
        let current = self.selected_command.get().unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len);
        self.selected_command.set(Some(next as usize));
    }

    fn apply_selected_command(&self, state: &mut TextAreaState) -> bool {
        let entry = {
            let filtered = self.filtered_commands.borrow();
            match self.selected_command.get().and_then(|i| filtered.get(i)) {
                Some(entry) => *entry,
                None => return false,
            }
        };

        let completion = format!("/{}", entry.keyword);
        self.close_command_palette();
        if state.content == completion {
            return false;
        }

        state.content = completion;
        state.cursor_position = state.content.len();
        true
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    #[cfg(test)]
    pub fn content(&self) -> String {
        self.state.borrow().content.clone()
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.content.clear();
        state.cursor_position = 0;
        drop(state);
        self.close_command_palette();
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = self.state.borrow();

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Message")
            .style(if self.has_focus {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray).bg(Color::White)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);
        if inner_area.is_empty() {
            return;
        }

        if state.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = state.content.clone();
            if self.has_focus {
                content.insert(state.cursor_position.min(content.len()), '▌');
            }

            // Keep the line holding the cursor visible
            let lines: Vec<&str> = content.split('\n').collect();
            let height = inner_area.height as usize;
            let start = lines.len().saturating_sub(height);
            for (i, line_text) in lines[start..].iter().enumerate() {
                let line = Line::from(vec![Span::raw(*line_text)]);
                buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
            }
        }

        if self.show_command_palette.get() {
            let filtered = self.filtered_commands.borrow();
            let palette_height = (filtered.len().min(5) + 2) as u16;
            let palette_area = Rect {
                x: inner_area.x,
                y: area.y.saturating_sub(palette_height),
                width: inner_area.width,
                height: palette_height.min(area.y),
            };
            if palette_area.height < 3 {
                return;
            }

            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Black).bg(Color::Gray));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            let selected = self.selected_command.get();
            for (index, entry) in filtered.iter().enumerate().take(inner.height as usize) {
                let style = if selected == Some(index) {
                    Style::default()
                        .fg(Color::White)
                        .bg(Color::Blue)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Black)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled("  ", Style::default()),
                    Span::styled(entry.description, Style::default().fg(Color::DarkGray)),
                ]);
                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}
