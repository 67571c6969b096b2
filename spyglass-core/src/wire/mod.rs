//! Wire codec for the daemon's browsing protocol.
//!
//! # Wire Protocol
//!
//! One persistent, full-duplex, message-oriented channel. Requests are
//! structured XML text, one root tag per kind; responses are either XML
//! text or raw binary frames belonging to a previously-announced file
//! transfer.
//!
//! ```text
//! Client ──[listWatchesRequest]─────────────► Daemon
//! Daemon ──[listWatchesResponse]────────────► Client   (watched roots)
//!
//! Client ──[getFileTreeRequest]─────────────► Daemon
//! Daemon ──[getFileTreeResponse]────────────► Client   (prefix + entries)
//!
//! Client ──[getFileRequest]─────────────────► Daemon
//! Daemon ──[getFileResponse]────────────────► Client   (announcement)
//! Daemon ──[binary frame]───────────────────► Client   (repeated,
//!                                                       `frames` times)
//!
//! Daemon ──[watchEventResponse]─────────────► Client   (unsolicited)
//! ```
//!
//! Every structured response declares a status `code`; 200 is the only
//! success code. Decoding happens exactly once, into [`Response`] — the
//! tag is never re-inspected downstream.

mod entry;
mod request;
mod response;
mod xml;

pub use entry::{FileEntry, FileType, SyncStatus};
pub use request::{FileSelector, Request, RequestKind};
pub use response::{FileAnnouncement, Response, ResponseKind, SUCCESS_CODE, decode};
