//! # spyglass-core
//!
//! Protocol client engine for browsing a sync daemon's remote filesystem
//! over one long-lived WebSocket channel.
//!
//! This crate contains:
//! - **Wire codec**: XML request encoding and response decoding into a
//!   closed [`Response`] variant set
//! - **Client**: [`Client`] — connection lifecycle, request dispatch,
//!   single-task inbound pump
//! - **Tree**: [`FolderTree`] — incremental, idempotent model of one
//!   root's folder hierarchy
//! - **Transfer**: [`TransferAssembler`] — frame-count-driven reassembly
//!   of announced binary payloads
//! - **Correlation**: [`RequestCorrelator`] — advisory pending-request
//!   ledger with timeout reporting
//! - **Events**: [`ClientEvent`] — the typed stream collaborators consume
//! - **Error**: [`ClientError`] — typed, `thiserror`-based error hierarchy

pub mod client;
pub mod config;
pub mod correlate;
pub mod error;
pub mod event;
pub mod session;
pub mod state;
pub mod transfer;
pub mod transport;
pub mod tree;
pub mod wire;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use client::Client;
pub use config::{ClientConfig, LoggingConfig, NetworkConfig};
pub use correlate::{PendingRequest, RequestCorrelator};
pub use error::ClientError;
pub use event::{ClientEvent, EventReceiver, EventSender, LinkStatus, event_channel};
pub use session::SessionContext;
pub use state::LinkPhase;
pub use transfer::{CompletedTransfer, TransferAssembler};
pub use transport::{Transport, WireMessage, WsTransport, secure_uri};
pub use tree::{FolderTree, NodeKind, ROOT_NODE_ID, TreeNode};
pub use wire::{
    FileAnnouncement, FileEntry, FileSelector, FileType, Request, RequestKind, Response,
    ResponseKind, SUCCESS_CODE, SyncStatus,
};
