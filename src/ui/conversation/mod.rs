//! Conversation UI components for the chat window

pub mod commands;
pub mod composer;
pub mod history;
pub mod typing;
pub mod view;

pub use commands::{get_help_text, parse_slash_command, ParsedCommand, SlashCommand};
pub use composer::{ComposerResult, ConversationComposer};
pub use history::ConversationHistory;
pub use typing::TypingIndicator;
pub use view::{ConversationView, ViewAction};
