use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Internal application events for coordinating between components
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Terminal input or resize
    Tui(TuiEvent),

    /// Something happened on the live connection
    Connection(ConnectionEvent),

    /// Periodic redraw for the typing indicator animation
    Tick,
}

/// Terminal input the chat window reacts to
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Paste event
    Paste(String),

    /// Terminal resize; the next draw picks up the new size
    Resize,
}

/// Events emitted by the connection driver towards the UI
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Lifecycle transition, with the retry counter at the time of the change
    StateChanged { state: ConnectionState, retries: u32 },

    /// Decoded reply from the remote service
    Reply(Message),
}

/// Lifecycle state of the persistent connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectionState {
    Connecting,
    Online,
    Offline,
    #[strum(serialize = "Closed")]
    PermanentlyClosed,
}

impl ConnectionState {
    /// Whether the state machine will never leave this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::PermanentlyClosed)
    }
}

/// Role in conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Individual transcript entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip)]
    pub received_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            received_at: Utc::now(),
        }
    }
}
