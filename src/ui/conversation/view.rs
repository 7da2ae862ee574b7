use crate::config::Config;
use crate::connection::ConnectionStatus;
use crate::events::{AppEvent, ConnectionEvent, ConnectionState, TuiEvent};
use crate::store::{ConversationStore, Outbound, SubmitOutcome};
use crate::ui::conversation::{
    get_help_text, parse_slash_command, ComposerResult, ConversationComposer,
    ConversationHistory, ParsedCommand, SlashCommand, TypingIndicator,
};
use crate::ui::window::{MenuBar, StatusBar, TitleBar, WindowLayout};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

const SCROLL_STEP: usize = 5;

/// Actions that can be requested by the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    None,
    Exit,
}

/// The chat window: owns the transcript store and every widget in it
pub struct ConversationView<O> {
    store: ConversationStore<O>,
    history: ConversationHistory,
    composer: ConversationComposer,
    typing: TypingIndicator,
    connection: ConnectionStatus,
    endpoint: String,
    title: String,
    notice: Option<String>,
}

impl<O: Outbound> ConversationView<O> {
    pub fn new(
        config: &Config,
        endpoint: impl Into<String>,
        outbound: O,
        connection: ConnectionStatus,
    ) -> Self {
        Self {
            store: ConversationStore::new(&config.greeting, outbound),
            history: ConversationHistory::new(config.ui.show_timestamps),
            composer: ConversationComposer::new("Type a message and press Enter..."),
            typing: TypingIndicator::new(),
            connection,
            endpoint: endpoint.into(),
            title: config.ui.title.clone(),
            notice: None,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> ViewAction {
        match event {
            AppEvent::Tui(TuiEvent::Key(key)) => return self.handle_key(key),
            AppEvent::Tui(TuiEvent::Paste(text)) => self.composer.paste(&text),
            AppEvent::Tui(TuiEvent::Resize) => {}
            AppEvent::Connection(event) => self.on_connection_event(event),
            AppEvent::Tick => {
                if self.store.is_pending() {
                    self.typing.tick();
                }
            }
        }
        ViewAction::None
    }

    fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return ViewAction::Exit;
        }

        match key.code {
            KeyCode::PageUp => {
                self.history.scroll_up(SCROLL_STEP);
                return ViewAction::None;
            }
            KeyCode::PageDown => {
                self.history.scroll_down(SCROLL_STEP);
                return ViewAction::None;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(text) => {
                self.submit(&text);
                ViewAction::None
            }
            ComposerResult::Command(command) => self.run_command(command),
            ComposerResult::None => ViewAction::None,
        }
    }

    fn submit(&mut self, text: &str) {
        let outcome = self.store.submit(text);
        match &outcome {
            SubmitOutcome::Sent => self.notice = None,
            SubmitOutcome::Undelivered { reason } => {
                self.notice = Some(format!("Message not delivered: {}", reason));
            }
            SubmitOutcome::Busy => {
                self.notice = Some("Still waiting for the last reply".to_string());
            }
            SubmitOutcome::Empty => {}
        }

        if outcome.accepted() {
            self.composer.clear();
            self.history.scroll_to_bottom();
        }
    }

    fn on_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::StateChanged { state, retries } => {
                self.connection = ConnectionStatus { state, retries };
                self.store.on_connection_state(state);
                self.composer
                    .set_focus(state != ConnectionState::PermanentlyClosed);
                if state == ConnectionState::PermanentlyClosed {
                    self.notice = Some("Gave up reconnecting; restart to try again".to_string());
                }
            }
            ConnectionEvent::Reply(message) => {
                self.store.on_reply(message);
                self.history.scroll_to_bottom();
            }
        }
    }

    fn run_command(&mut self, command: ParsedCommand) -> ViewAction {
        match (command.command, command.argument) {
            (SlashCommand::Help, None) => self.notice = Some(get_help_text()),
            (SlashCommand::Help, Some(topic)) => {
                self.notice = Some(match parse_slash_command(&format!("/{}", topic)) {
                    Some(parsed) => format!(
                        "/{}: {}",
                        parsed.command.command(),
                        parsed.command.description()
                    ),
                    None => format!("Unknown command '{}'", topic),
                });
            }
            (other, Some(_)) => {
                self.notice = Some(format!("/{} takes no arguments", other.command()));
            }
            (SlashCommand::Quit, None) => return ViewAction::Exit,
            (SlashCommand::Status, None) => {
                let (label, _) = StatusBar::describe(self.connection);
                self.notice = Some(format!(
                    "{} to {} ({} messages, {})",
                    label.trim_start_matches(|c: char| !c.is_alphabetic()),
                    self.endpoint,
                    self.store.transcript().len(),
                    if self.store.is_pending() {
                        "awaiting reply"
                    } else {
                        "idle"
                    }
                ));
            }
        }
        ViewAction::None
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let layout = WindowLayout::split(area);

        TitleBar { title: &self.title }.render(layout.title, buf);
        MenuBar.render(layout.menu, buf);
        self.history
            .widget(self.store.transcript())
            .render(layout.history, buf);
        if self.store.is_pending() {
            self.typing.render(layout.typing, buf);
        }
        self.composer.render(layout.composer, buf);
        StatusBar {
            status: self.connection,
            endpoint: &self.endpoint,
            notice: self.notice.as_deref(),
        }
        .render(layout.status, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConnectionError, ConnectionResult};
    use crate::events::{Message, Role};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Outbound that mirrors the connection's online check
    #[derive(Clone, Default)]
    struct FakeConnection {
        online: Rc<Cell<bool>>,
        sent: Rc<RefCell<Vec<String>>>,
    }

    impl Outbound for FakeConnection {
        fn send(&self, message: &Message) -> ConnectionResult<()> {
            if !self.online.get() {
                return Err(ConnectionError::NotOnline(ConnectionState::Offline));
            }
            self.sent.borrow_mut().push(message.content.clone());
            Ok(())
        }
    }

    fn chat_view() -> (ConversationView<FakeConnection>, FakeConnection) {
        let connection = FakeConnection::default();
        connection.online.set(true);
        let view = ConversationView::new(
            &Config::default(),
            "ws://test.invalid/",
            connection.clone(),
            ConnectionStatus {
                state: ConnectionState::Online,
                retries: 0,
            },
        );
        (view, connection)
    }

    fn key(view: &mut ConversationView<FakeConnection>, code: KeyCode) -> ViewAction {
        view.handle_event(AppEvent::Tui(TuiEvent::Key(KeyEvent::new(
            code,
            KeyModifiers::NONE,
        ))))
    }

    fn type_line(view: &mut ConversationView<FakeConnection>, text: &str) -> ViewAction {
        for c in text.chars() {
            key(view, KeyCode::Char(c));
        }
        key(view, KeyCode::Enter)
    }

    #[test]
    fn starts_with_greeting() {
        let (view, _) = chat_view();
        assert_eq!(view.store.transcript().len(), 1);
        assert_eq!(view.store.transcript()[0].role, Role::Assistant);
        assert_eq!(view.store.transcript()[0].content, Config::default().greeting);
    }

    #[test]
    fn enter_sends_and_reply_clears_pending() {
        let (mut view, connection) = chat_view();

        type_line(&mut view, "Hello");
        assert!(view.store.is_pending());
        assert_eq!(connection.sent.borrow().as_slice(), ["Hello".to_string()]);

        view.handle_event(AppEvent::Connection(ConnectionEvent::Reply(
            Message::assistant("Hi there"),
        )));
        assert!(!view.store.is_pending());
        let last = view.store.transcript().last().unwrap();
        assert_eq!((last.role, last.content.as_str()), (Role::Assistant, "Hi there"));
    }

    #[test]
    fn input_is_kept_while_waiting_for_reply() {
        let (mut view, connection) = chat_view();
        type_line(&mut view, "first");
        type_line(&mut view, "second");

        assert_eq!(view.store.transcript().len(), 2);
        assert_eq!(connection.sent.borrow().len(), 1);
        assert_eq!(view.composer.content(), "second");
        assert!(view.notice.as_deref().is_some());
    }

    #[test]
    fn offline_send_is_reported_not_queued() {
        let (mut view, connection) = chat_view();
        connection.online.set(false);

        type_line(&mut view, "Hello");

        assert!(connection.sent.borrow().is_empty());
        assert!(view.notice.as_deref().unwrap().contains("not delivered"));
        assert_eq!(view.composer.content(), "");
    }

    #[test]
    fn permanent_closure_updates_status_and_unblocks_input() {
        let (mut view, _) = chat_view();
        type_line(&mut view, "Hello");

        view.handle_event(AppEvent::Connection(ConnectionEvent::StateChanged {
            state: ConnectionState::PermanentlyClosed,
            retries: 10,
        }));

        assert!(!view.store.is_pending());
        assert_eq!(view.connection.state, ConnectionState::PermanentlyClosed);
        assert!(view.notice.as_deref().is_some());
    }

    #[test]
    fn quit_command_exits() {
        let (mut view, _) = chat_view();
        // Enter completes "/q" to "/quit" in the palette, the second runs it
        assert_eq!(type_line(&mut view, "/q"), ViewAction::None);
        assert_eq!(key(&mut view, KeyCode::Enter), ViewAction::Exit);
    }

    #[test]
    fn ctrl_c_exits() {
        let (mut view, _) = chat_view();
        let action = view.handle_event(AppEvent::Tui(TuiEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        ))));
        assert_eq!(action, ViewAction::Exit);
    }

    #[test]
    fn renders_window_without_panicking_on_small_terminals() {
        let (view, _) = chat_view();
        for (w, h) in [(80, 24), (20, 8), (4, 2)] {
            let area = Rect::new(0, 0, w, h);
            let mut buf = Buffer::empty(area);
            view.render(area, &mut buf);
        }
    }

    #[test]
    fn help_with_argument_describes_one_command() {
        let (mut view, _) = chat_view();
        assert_eq!(type_line(&mut view, "/help status"), ViewAction::None);
        assert_eq!(
            view.notice.as_deref(),
            Some("/status: show the connection state and endpoint")
        );

        type_line(&mut view, "/help nope");
        assert_eq!(view.notice.as_deref(), Some("Unknown command 'nope'"));
    }

    #[test]
    fn status_rejects_arguments() {
        let (mut view, _) = chat_view();
        assert_eq!(type_line(&mut view, "/status now"), ViewAction::None);
        assert_eq!(view.notice.as_deref(), Some("/status takes no arguments"));
        assert_eq!(view.store.transcript().len(), 1);
    }
}
