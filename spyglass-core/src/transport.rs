//! WebSocket transport.
//!
//! `WsTransport` wraps a split `tokio-tungstenite` stream in a background
//! reader task and a background writer task bridged by bounded channels.
//! The single writer task is the serialization point for outbound
//! messages: a message is fully encoded before it enters the channel, so
//! two requests can never interleave on the socket. The reader task
//! preserves arrival order.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::ClientError;

// ── WireMessage ──────────────────────────────────────────────────

/// One transport-level message: a structured text envelope or a raw
/// binary transfer frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Text(String),
    Binary(Bytes),
}

// ── Transport ────────────────────────────────────────────────────

/// A message-oriented, ordered, full-duplex channel to the daemon.
///
/// Production code uses [`WsTransport`]; tests script their own.
#[async_trait]
pub trait Transport {
    /// Queue one outbound message.
    async fn send(&mut self, message: WireMessage) -> Result<(), ClientError>;

    /// Next inbound message, in arrival order. `None` means the channel
    /// closed cleanly; an `Err` item is a transport failure.
    async fn next(&mut self) -> Option<Result<WireMessage, ClientError>>;

    /// Close the channel. Idempotent.
    async fn close(&mut self);
}

// ── WsTransport ──────────────────────────────────────────────────

/// WebSocket-backed [`Transport`].
#[derive(Debug)]
pub struct WsTransport {
    /// `None` after close: the writer task exits when the channel drops,
    /// closing the socket.
    outbound: Option<mpsc::Sender<WireMessage>>,
    inbound: mpsc::Receiver<Result<WireMessage, ClientError>>,
}

impl WsTransport {
    /// Open a WebSocket to `uri` and spawn the reader/writer tasks.
    pub async fn connect(uri: &str, capacity: usize) -> Result<Self, ClientError> {
        let (stream, _response) = connect_async(uri).await?;
        let (mut sink, mut source) = stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<WireMessage>(capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);

        // Writer task: client → daemon. Sole writer of the sink.
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let ws_message = match message {
                    WireMessage::Text(text) => Message::Text(text),
                    WireMessage::Binary(bytes) => Message::Binary(bytes.to_vec()),
                };
                if let Err(e) = sink.send(ws_message).await {
                    tracing::warn!(error = %e, "websocket write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Reader task: daemon → client, arrival order preserved.
        tokio::spawn(async move {
            while let Some(item) = source.next().await {
                let forward = match item {
                    Ok(Message::Text(text)) => Ok(WireMessage::Text(text)),
                    Ok(Message::Binary(bytes)) => Ok(WireMessage::Binary(Bytes::from(bytes))),
                    Ok(Message::Close(_)) => break,
                    // Ping/pong are answered by tungstenite itself.
                    Ok(_) => continue,
                    Err(e) => Err(ClientError::from(e)),
                };
                let failed = forward.is_err();
                if inbound_tx.send(forward).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(Self {
            outbound: Some(outbound_tx),
            inbound: inbound_rx,
        })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, message: WireMessage) -> Result<(), ClientError> {
        match &self.outbound {
            Some(tx) => tx
                .send(message)
                .await
                .map_err(|_| ClientError::ChannelClosed),
            None => Err(ClientError::ChannelClosed),
        }
    }

    async fn next(&mut self) -> Option<Result<WireMessage, ClientError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        // Dropping the sender ends the writer task, which closes the
        // socket on its way out.
        self.outbound.take();
    }
}

// ── URI helpers ──────────────────────────────────────────────────

/// Substitute the encrypted WebSocket scheme for the plain one.
///
/// URIs already encrypted (or using another scheme) pass through
/// unchanged.
pub fn secure_uri(uri: &str) -> String {
    match uri.strip_prefix("ws://") {
        Some(rest) => format!("wss://{rest}"),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_uri_substitutes_scheme() {
        assert_eq!(
            secure_uri("ws://127.0.0.1:8625/api/ws"),
            "wss://127.0.0.1:8625/api/ws"
        );
    }

    #[test]
    fn secure_uri_passes_through_other_schemes() {
        assert_eq!(secure_uri("wss://host/ws"), "wss://host/ws");
        assert_eq!(secure_uri("http://host/"), "http://host/");
    }

    #[tokio::test]
    async fn connect_refused_is_transport_error() {
        // Port 1 on localhost is never a WebSocket server.
        let err = WsTransport::connect("ws://127.0.0.1:1/ws", 4)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
