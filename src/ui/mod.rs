pub mod conversation;
pub mod window;
