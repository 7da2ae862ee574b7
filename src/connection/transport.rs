//! Transport seam between the connection driver and the socket library

use crate::error::{ConnectionError, ConnectionResult};
use futures::{SinkExt, StreamExt};
use log::debug;
use std::future::Future;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
};

/// A frame read from an established link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// Binary payload, reported by length only
    Binary(usize),
    Close,
}

/// An established, message-oriented link
pub trait Link: Send + 'static {
    fn send_text(&mut self, text: String) -> impl Future<Output = ConnectionResult<()>> + Send;

    /// Next application frame. `None` means the link is gone.
    fn next_frame(&mut self) -> impl Future<Output = Option<ConnectionResult<Frame>>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens links to an endpoint
pub trait Connector: Send + Sync + 'static {
    type Link: Link;

    fn connect(&self, url: &str) -> impl Future<Output = ConnectionResult<Self::Link>> + Send;
}

/// WebSocket connector backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

pub struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connector for WsConnector {
    type Link = WsLink;

    async fn connect(&self, url: &str) -> ConnectionResult<WsLink> {
        let (stream, response) =
            connect_async(url)
                .await
                .map_err(|e| ConnectionError::Handshake {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        debug!("[connection] handshake with {} -> {}", url, response.status());
        Ok(WsLink { stream })
    }
}

impl Link for WsLink {
    async fn send_text(&mut self, text: String) -> ConnectionResult<()> {
        self.stream.send(WsMessage::Text(text)).await?;
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<ConnectionResult<Frame>> {
        loop {
            let frame = match self.stream.next().await? {
                Ok(WsMessage::Text(text)) => Frame::Text(text),
                Ok(WsMessage::Binary(bytes)) => Frame::Binary(bytes.len()),
                Ok(WsMessage::Close(_)) => Frame::Close,
                // Ping/pong is handled inside tungstenite.
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            };
            return Some(Ok(frame));
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("[connection] close handshake failed: {}", e);
        }
    }
}
