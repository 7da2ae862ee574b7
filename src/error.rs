//! Error types for the connection layer

use crate::events::ConnectionState;

/// Failures raised by the transport and the connection manager
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The handshake with the endpoint did not complete
    #[error("failed to connect to {url}: {reason}")]
    Handshake { url: String, reason: String },

    /// An established link failed while reading or writing
    #[error("transport error: {0}")]
    Transport(String),

    /// A send was attempted while the connection was not usable
    #[error("not connected (state: {0})")]
    NotOnline(ConnectionState),

    /// The connection driver has already shut down
    #[error("connection driver has stopped")]
    DriverStopped,

    /// Outbound payload could not be encoded
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for ConnectionError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ConnectionError::Transport(err.to_string())
    }
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;
