//! JSON payloads exchanged with the remote service

use crate::error::ConnectionResult;
use crate::events::Message;
use serde::Deserialize;

/// Server → client payload. Fields other than `message` are ignored.
#[derive(Debug, Deserialize)]
struct InboundPayload {
    message: String,
}

/// Encode an outgoing message as `{"role":..,"content":..}`
pub fn encode_outbound(message: &Message) -> ConnectionResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decode a text frame into an assistant message
pub fn decode_inbound(text: &str) -> Result<Message, serde_json::Error> {
    let payload: InboundPayload = serde_json::from_str(text)?;
    Ok(Message::assistant(payload.message))
}
