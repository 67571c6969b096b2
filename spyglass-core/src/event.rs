//! Typed event stream emitted by the client.
//!
//! Collaborators (the tree/table renderer, the status display) subscribe
//! to one `ClientEvent` channel instead of wiring ad hoc handler slots.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::transfer::CompletedTransfer;
use crate::wire::{FileAnnouncement, FileEntry, RequestKind};

// ── LinkStatus ───────────────────────────────────────────────────

/// Connection status as surfaced to the viewer.
///
/// `Errored` is terminal for the attempt and equivalent to
/// `Disconnected` for reconnection purposes; the reason is kept for
/// display and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Connecting,
    Connected,
    Disconnected,
    Errored { reason: String },
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Connecting => write!(f, "Connecting ..."),
            LinkStatus::Connected => write!(f, "Connected"),
            LinkStatus::Disconnected => write!(f, "Disconnected"),
            LinkStatus::Errored { reason } => write!(f, "Not connected ({reason})"),
        }
    }
}

// ── ClientEvent ──────────────────────────────────────────────────

/// Everything the client reports upward.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Connection lifecycle changed.
    StatusChanged(LinkStatus),

    /// The daemon's watched roots.
    RootsListed(Vec<String>),

    /// One directory level was listed. Carries every entry (files,
    /// folders, symlinks) for the table collaborator; the folder tree is
    /// updated before this fires.
    DirectoryListed {
        prefix: String,
        entries: Vec<FileEntry>,
    },

    /// A file transfer was announced; binary frames follow.
    TransferStarted(FileAnnouncement),

    /// A file payload finished reassembling.
    TransferComplete(CompletedTransfer),

    /// All versions of one file history.
    FileHistoryListed { versions: Vec<FileEntry> },

    /// The root's sync-history timestamps, oldest first.
    VersionHeadersListed { dates: Vec<String> },

    /// Unsolicited sync-activity notification from the daemon.
    SyncActivity {
        action: String,
        subject: Option<String>,
    },

    /// The daemon restored a file version to disk.
    FileRestored { target: String },

    /// A response carried a non-success status code. The connection
    /// stays alive.
    ProtocolError {
        kind: String,
        code: u32,
        body: String,
    },

    /// A request passed its advisory deadline without a matching
    /// response. Reporting only — nothing is retried or torn down.
    RequestTimedOut {
        id: u64,
        kind: RequestKind,
        elapsed: Duration,
    },
}

/// Sender half of the client's event stream.
pub type EventSender = mpsc::UnboundedSender<ClientEvent>;

/// Receiver half of the client's event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<ClientEvent>;

/// Create an event channel pair for a client.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
