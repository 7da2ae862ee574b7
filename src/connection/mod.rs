//! Persistent connection to the remote assistant service

pub mod backoff;
pub mod manager;
pub mod transport;
pub mod wire;

pub use manager::{ConnectionHandle, ConnectionManager, ConnectionStatus};
pub use transport::WsConnector;
