//! Transcript and in-flight request state

use crate::error::ConnectionResult;
use crate::events::{ConnectionState, Message, Role};
use log::{debug, info};

/// Where submitted messages go
pub trait Outbound {
    fn send(&self, message: &Message) -> ConnectionResult<()>;
}

/// Result of a submit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, nothing happened
    Empty,
    /// A reply is still outstanding, nothing happened
    Busy,
    /// Appended and handed to the connection
    Sent,
    /// Appended, but the connection refused it
    Undelivered { reason: String },
}

impl SubmitOutcome {
    /// Whether the message entered the transcript (input should be cleared,
    /// view scrolled to latest)
    pub fn accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Sent | SubmitOutcome::Undelivered { .. })
    }
}

/// Ordered transcript plus the single outstanding-request flag
pub struct ConversationStore<O> {
    transcript: Vec<Message>,
    pending: bool,
    outbound: O,
}

impl<O: Outbound> ConversationStore<O> {
    pub fn new(greeting: &str, outbound: O) -> Self {
        Self {
            transcript: vec![Message::assistant(greeting)],
            pending: false,
            outbound,
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Append a user message and forward it, unless blank or a reply is
    /// still outstanding.
    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Empty;
        }
        if self.pending {
            debug!("[store] submit ignored, awaiting reply");
            return SubmitOutcome::Busy;
        }

        let message = Message::user(text);
        self.pending = true;
        let outcome = match self.outbound.send(&message) {
            Ok(()) => SubmitOutcome::Sent,
            Err(e) => SubmitOutcome::Undelivered {
                reason: e.to_string(),
            },
        };
        self.transcript.push(message);
        outcome
    }

    pub fn on_reply(&mut self, reply: Message) {
        self.transcript.push(Message {
            role: Role::Assistant,
            ..reply
        });
        self.pending = false;
    }

    /// Give-up policy: a permanently closed connection will never answer.
    pub fn on_connection_state(&mut self, state: ConnectionState) {
        if state.is_terminal() && self.pending {
            info!("[store] connection closed permanently, clearing pending reply");
            self.pending = false;
        }
    }
}
