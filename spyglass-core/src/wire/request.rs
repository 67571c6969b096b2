//! Outbound protocol requests and their XML encoding.
//!
//! Each request kind maps to one well-known XML root tag. Encoding
//! reproduces the daemon's expected two-space-indented element layout;
//! text content is escaped.

use std::fmt;
use std::fmt::Write as _;

use crate::wire::response::ResponseKind;
use crate::wire::xml::escape_text;

// ── RequestKind ──────────────────────────────────────────────────

/// All request kinds understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// List the daemon's watched roots.
    ListWatches,
    /// List one directory level of a root (optionally as of a history date).
    FileTree,
    /// Fetch a file's payload (announced metadata + binary frames follow).
    File,
    /// Fetch all versions of one file history.
    FileHistory,
    /// Fetch the root's sync-history timestamps.
    DatabaseVersionHeaders,
    /// Restore a file version into the root on the daemon side.
    Restore,
}

impl RequestKind {
    /// The response kind that answers this request.
    ///
    /// The daemon does not echo request ids; correlation matches pending
    /// requests against this expectation instead.
    pub fn expected_response(&self) -> ResponseKind {
        match self {
            RequestKind::ListWatches => ResponseKind::ListWatches,
            RequestKind::FileTree => ResponseKind::FileTree,
            RequestKind::File => ResponseKind::File,
            RequestKind::FileHistory => ResponseKind::FileHistory,
            RequestKind::DatabaseVersionHeaders => ResponseKind::DatabaseVersionHeaders,
            RequestKind::Restore => ResponseKind::Restore,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            RequestKind::ListWatches => "listWatchesRequest",
            RequestKind::FileTree => "getFileTreeRequest",
            RequestKind::File => "getFileRequest",
            RequestKind::FileHistory => "getFileHistoryRequest",
            RequestKind::DatabaseVersionHeaders => "getDatabaseVersionHeadersRequest",
            RequestKind::Restore => "restoreRequest",
        };
        write!(f, "{tag}")
    }
}

// ── FileSelector ─────────────────────────────────────────────────

/// How a file fetch identifies its target: the live path within the
/// current listing, or a specific version of a file history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelector {
    Path(String),
    Version { file_history_id: String, version: u64 },
}

// ── Request ──────────────────────────────────────────────────────

/// An outbound request, parameters included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ListWatches,
    FileTree {
        root: String,
        prefix: String,
        /// History date to browse as-of; omitted from the wire when unset.
        date: Option<String>,
    },
    File {
        root: String,
        selector: FileSelector,
    },
    FileHistory {
        root: String,
        file_history_id: String,
    },
    DatabaseVersionHeaders {
        root: String,
    },
    Restore {
        root: String,
        file_history_id: String,
        version: u64,
    },
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::ListWatches => RequestKind::ListWatches,
            Request::FileTree { .. } => RequestKind::FileTree,
            Request::File { .. } => RequestKind::File,
            Request::FileHistory { .. } => RequestKind::FileHistory,
            Request::DatabaseVersionHeaders { .. } => RequestKind::DatabaseVersionHeaders,
            Request::Restore { .. } => RequestKind::Restore,
        }
    }

    /// Encode as the daemon's XML request format, stamped with `id`.
    pub fn encode(&self, id: u64) -> String {
        let tag = self.kind().to_string();
        let mut msg = String::new();
        let _ = write!(msg, "<{tag}>\n  <id>{id}</id>\n");
        match self {
            Request::ListWatches => {}
            Request::FileTree { root, prefix, date } => {
                push_element(&mut msg, "root", root);
                push_element(&mut msg, "prefix", prefix);
                if let Some(date) = date {
                    push_element(&mut msg, "date", date);
                }
            }
            Request::File { root, selector } => {
                push_element(&mut msg, "root", root);
                match selector {
                    FileSelector::Path(path) => push_element(&mut msg, "file", path),
                    FileSelector::Version {
                        file_history_id,
                        version,
                    } => {
                        push_element(&mut msg, "fileHistoryId", file_history_id);
                        push_element(&mut msg, "version", &version.to_string());
                    }
                }
            }
            Request::FileHistory {
                root,
                file_history_id,
            } => {
                push_element(&mut msg, "root", root);
                push_element(&mut msg, "fileHistoryId", file_history_id);
            }
            Request::DatabaseVersionHeaders { root } => {
                push_element(&mut msg, "root", root);
            }
            Request::Restore {
                root,
                file_history_id,
                version,
            } => {
                push_element(&mut msg, "root", root);
                push_element(&mut msg, "fileHistoryId", file_history_id);
                push_element(&mut msg, "version", &version.to_string());
            }
        }
        let _ = write!(msg, "</{tag}>");
        msg
    }
}

fn push_element(msg: &mut String, name: &str, value: &str) {
    let _ = writeln!(msg, "  <{name}>{}</{name}>", escape_text(value));
}
