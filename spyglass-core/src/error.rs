//! Domain-specific error types for the spyglass client.
//!
//! All fallible operations return `Result<T, ClientError>`.
//! No panics on invalid input — every error is typed and recoverable.

use thiserror::Error;

/// The canonical error type for the spyglass client.
#[derive(Debug, Error)]
pub enum ClientError {
    // ── Transport Errors ─────────────────────────────────────────
    /// The WebSocket/IO layer reported an error.
    #[error("transport error: {0}")]
    Transport(String),

    /// An mpsc channel was closed unexpectedly (writer task gone).
    #[error("channel closed")]
    ChannelClosed,

    // ── Lifecycle Errors ─────────────────────────────────────────
    /// An operation was attempted in the wrong connection phase.
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),

    /// A send was attempted outside the `Connected` phase.
    #[error("not connected")]
    NotConnected,

    /// A listing or fetch was requested before any root was selected.
    #[error("no root selected")]
    NoRootSelected,

    // ── Protocol Errors ──────────────────────────────────────────
    /// The response carried a non-success status code. The raw code and
    /// body are preserved for diagnostics; the connection stays alive.
    #[error("{kind} failed with code {code}: {body}")]
    ProtocolStatus {
        kind: String,
        code: u32,
        body: String,
    },

    /// Recognized envelope, unrecognized declared response kind.
    /// Non-fatal: logged, connection unaffected.
    #[error("unknown response kind: {0}")]
    UnknownResponseKind(String),

    /// Binary data arrived with no transfer in progress.
    #[error("unexpected binary frame: no transfer in progress")]
    UnexpectedFrame,

    // ── Decoding Errors ──────────────────────────────────────────
    /// An inbound message could not be parsed.
    #[error("decode error: {0}")]
    Decode(String),

    /// A wire value did not map to any known enum variant.
    #[error("unknown {type_name} value: {value:?}")]
    UnknownVariant {
        type_name: &'static str,
        value: String,
    },
}

// ── Convenient From implementations ──────────────────────────────

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ClientError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ClientError::ChannelClosed
    }
}
