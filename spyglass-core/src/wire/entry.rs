//! Directory-listing entry records.
//!
//! A [`FileEntry`] is an immutable snapshot of one file-version record as
//! reported by the daemon. Many entries may share a `file_history_id`
//! (version history) or a `path` (the live directory listing).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::wire::xml::XmlElement;

// ── FileType ─────────────────────────────────────────────────────

/// Classification of one listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    /// A regular file.
    File,
    /// A directory.
    Folder,
    /// A symbolic link.
    Symlink,
}

impl TryFrom<&str> for FileType {
    type Error = ClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase().as_str() {
            "FILE" => Ok(FileType::File),
            "FOLDER" => Ok(FileType::Folder),
            "SYMLINK" => Ok(FileType::Symlink),
            _ => Err(ClientError::UnknownVariant {
                type_name: "FileType",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::File => write!(f, "FILE"),
            FileType::Folder => write!(f, "FOLDER"),
            FileType::Symlink => write!(f, "SYMLINK"),
        }
    }
}

// ── SyncStatus ───────────────────────────────────────────────────

/// Sync state of one file version as reported by the daemon.
///
/// Values the daemon may grow are mapped to [`SyncStatus::Unknown`]
/// instead of failing the whole listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncStatus {
    New,
    Changed,
    Renamed,
    Deleted,
    Unknown,
}

impl SyncStatus {
    fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "NEW" => SyncStatus::New,
            "CHANGED" => SyncStatus::Changed,
            "RENAMED" => SyncStatus::Renamed,
            "DELETED" => SyncStatus::Deleted,
            other => {
                tracing::warn!(status = other, "unrecognized sync status");
                SyncStatus::Unknown
            }
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStatus::New => "NEW",
            SyncStatus::Changed => "CHANGED",
            SyncStatus::Renamed => "RENAMED",
            SyncStatus::Deleted => "DELETED",
            SyncStatus::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

// ── FileEntry ────────────────────────────────────────────────────

/// One file-version record from a directory listing or history query.
///
/// Timestamp fields carry the daemon's formatted strings verbatim; the
/// client displays them and echoes the history axis back unparsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub file_history_id: String,
    pub version: u64,
    pub path: String,
    pub file_type: FileType,
    pub status: SyncStatus,
    pub size: u64,
    pub last_modified: String,
    pub checksum: String,
    pub updated: String,
    pub posix_permissions: String,
    pub dos_attributes: String,
}

impl FileEntry {
    /// Decode one `<file>` element.
    ///
    /// `path` and `type` are required; everything else defaults when the
    /// daemon omits it (e.g. `dosAttributes` on a POSIX daemon).
    pub(crate) fn from_element(element: &XmlElement) -> Result<Self, ClientError> {
        let path = element.require_text("path")?.to_string();
        let file_type = FileType::try_from(element.require_text("type")?)?;

        Ok(Self {
            file_history_id: text_field(element, "fileHistoryId"),
            version: number_field(element, "version")?,
            path,
            file_type,
            status: SyncStatus::parse(&text_field(element, "status")),
            size: number_field(element, "size")?,
            last_modified: text_field(element, "lastModified"),
            checksum: text_field(element, "checksum"),
            updated: text_field(element, "updated"),
            posix_permissions: text_field(element, "posixPermissions"),
            dos_attributes: text_field(element, "dosAttributes"),
        })
    }

    /// Whether this entry materializes as a tree node.
    pub fn is_folder(&self) -> bool {
        self.file_type == FileType::Folder
    }
}

fn text_field(element: &XmlElement, name: &str) -> String {
    element.child_text(name).unwrap_or_default().to_string()
}

fn number_field(element: &XmlElement, name: &str) -> Result<u64, ClientError> {
    match element.child_text(name) {
        None => Ok(0),
        Some("") => Ok(0),
        Some(text) => text
            .parse()
            .map_err(|_| ClientError::Decode(format!("invalid {name}: {text:?}"))),
    }
}
