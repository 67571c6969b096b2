//! Inbound protocol responses and their XML decoding.
//!
//! Every structured message decodes into exactly one [`Response`] variant
//! here; handlers never re-inspect tags. The status code is checked once:
//! anything but 200 becomes [`ClientError::ProtocolStatus`] and is never
//! dispatched.

use std::fmt;

use crate::error::ClientError;
use crate::wire::entry::FileEntry;
use crate::wire::xml::{XmlElement, parse_document};

/// The canonical success status code.
pub const SUCCESS_CODE: u32 = 200;

// ── ResponseKind ─────────────────────────────────────────────────

/// All response kinds understood by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    ListWatches,
    FileTree,
    File,
    FileHistory,
    DatabaseVersionHeaders,
    /// Unsolicited sync-activity notification; answers no request.
    WatchEvent,
    Restore,
}

impl ResponseKind {
    /// Match a root tag, case-insensitively (the daemon emits camelCase).
    fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "listwatchesresponse" => Some(ResponseKind::ListWatches),
            "getfiletreeresponse" => Some(ResponseKind::FileTree),
            "getfileresponse" => Some(ResponseKind::File),
            "getfilehistoryresponse" => Some(ResponseKind::FileHistory),
            "getdatabaseversionheadersresponse" => Some(ResponseKind::DatabaseVersionHeaders),
            "watcheventresponse" => Some(ResponseKind::WatchEvent),
            "restoreresponse" => Some(ResponseKind::Restore),
            _ => None,
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ResponseKind::ListWatches => "listWatchesResponse",
            ResponseKind::FileTree => "getFileTreeResponse",
            ResponseKind::File => "getFileResponse",
            ResponseKind::FileHistory => "getFileHistoryResponse",
            ResponseKind::DatabaseVersionHeaders => "getDatabaseVersionHeadersResponse",
            ResponseKind::WatchEvent => "watchEventResponse",
            ResponseKind::Restore => "restoreResponse",
        };
        write!(f, "{tag}")
    }
}

// ── FileAnnouncement ─────────────────────────────────────────────

/// Metadata announcing an imminent binary transfer: the raw frames that
/// follow on the channel belong to this file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAnnouncement {
    pub name: String,
    pub mime_type: String,
    /// Declared payload size. Informational only — completion is driven
    /// by the frame count.
    pub total_length: u64,
    pub frames_expected: u64,
}

// ── Response ─────────────────────────────────────────────────────

/// A decoded, success-status response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    ListWatches {
        watches: Vec<String>,
    },
    FileTree {
        root: String,
        prefix: String,
        files: Vec<FileEntry>,
    },
    File(FileAnnouncement),
    FileHistory {
        root: String,
        files: Vec<FileEntry>,
    },
    DatabaseVersionHeaders {
        root: String,
        /// Ascending, oldest first.
        dates: Vec<String>,
    },
    WatchEvent {
        root: String,
        action: String,
        subject: Option<String>,
    },
    Restore {
        target_file: String,
    },
}

impl Response {
    pub fn kind(&self) -> ResponseKind {
        match self {
            Response::ListWatches { .. } => ResponseKind::ListWatches,
            Response::FileTree { .. } => ResponseKind::FileTree,
            Response::File(_) => ResponseKind::File,
            Response::FileHistory { .. } => ResponseKind::FileHistory,
            Response::DatabaseVersionHeaders { .. } => ResponseKind::DatabaseVersionHeaders,
            Response::WatchEvent { .. } => ResponseKind::WatchEvent,
            Response::Restore { .. } => ResponseKind::Restore,
        }
    }
}

// ── Decoding ─────────────────────────────────────────────────────

/// Decode one structured message.
///
/// A missing or non-numeric `code` is treated like a non-success code
/// (surfaced with code 0), matching the daemon contract that every
/// response declares its status first.
pub fn decode(xml: &str) -> Result<Response, ClientError> {
    let doc = parse_document(xml)?;

    let code = doc
        .child_text("code")
        .and_then(|text| text.parse::<u32>().ok());
    if code != Some(SUCCESS_CODE) {
        let body = doc
            .child_text("message")
            .map(str::to_string)
            .unwrap_or_else(|| xml.to_string());
        return Err(ClientError::ProtocolStatus {
            kind: doc.name.clone(),
            code: code.unwrap_or(0),
            body,
        });
    }

    let kind = ResponseKind::from_tag(&doc.name)
        .ok_or_else(|| ClientError::UnknownResponseKind(doc.name.clone()))?;

    match kind {
        ResponseKind::ListWatches => Ok(Response::ListWatches {
            watches: doc
                .child("watches")
                .map(|w| w.children_named("watch").map(|c| c.text.clone()).collect())
                .unwrap_or_default(),
        }),
        ResponseKind::FileTree => Ok(Response::FileTree {
            root: optional_text(&doc, "root"),
            prefix: optional_text(&doc, "prefix"),
            files: decode_files(&doc)?,
        }),
        ResponseKind::File => Ok(Response::File(FileAnnouncement {
            name: doc.require_text("name")?.to_string(),
            mime_type: optional_text(&doc, "mimeType"),
            total_length: require_number(&doc, "length")?,
            frames_expected: require_number(&doc, "frames")?,
        })),
        ResponseKind::FileHistory => Ok(Response::FileHistory {
            root: optional_text(&doc, "root"),
            files: decode_files(&doc)?,
        }),
        ResponseKind::DatabaseVersionHeaders => Ok(Response::DatabaseVersionHeaders {
            root: optional_text(&doc, "root"),
            dates: doc.descendant_texts("date"),
        }),
        ResponseKind::WatchEvent => Ok(Response::WatchEvent {
            root: optional_text(&doc, "root"),
            action: doc.require_text("action")?.to_string(),
            subject: doc.child_text("subject").map(str::to_string),
        }),
        ResponseKind::Restore => Ok(Response::Restore {
            target_file: doc.require_text("targetFile")?.to_string(),
        }),
    }
}

fn decode_files(doc: &XmlElement) -> Result<Vec<FileEntry>, ClientError> {
    match doc.child("files") {
        None => Ok(Vec::new()),
        Some(files) => files
            .children_named("file")
            .map(FileEntry::from_element)
            .collect(),
    }
}

fn optional_text(doc: &XmlElement, name: &str) -> String {
    doc.child_text(name).unwrap_or_default().to_string()
}

fn require_number(doc: &XmlElement, name: &str) -> Result<u64, ClientError> {
    let text = doc.require_text(name)?;
    text.parse()
        .map_err(|_| ClientError::Decode(format!("invalid {name}: {text:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::entry::FileType;

    #[test]
    fn decodes_list_watches() {
        let xml = "<listWatchesResponse>\n  <code>200</code>\n  <watches>\n    <watch>/a</watch>\n    <watch>/b</watch>\n  </watches>\n</listWatchesResponse>";
        match decode(xml).unwrap() {
            Response::ListWatches { watches } => assert_eq!(watches, vec!["/a", "/b"]),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn decodes_file_tree() {
        let xml = "<getFileTreeResponse><code>200</code><root>/a</root><prefix>docs/</prefix>\
                   <files><file><path>notes</path><type>FOLDER</type></file>\
                   <file><path>readme.txt</path><type>FILE</type></file></files>\
                   </getFileTreeResponse>";
        match decode(xml).unwrap() {
            Response::FileTree {
                prefix, files, ..
            } => {
                assert_eq!(prefix, "docs/");
                assert_eq!(files.len(), 2);
                assert_eq!(files[0].file_type, FileType::Folder);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn decodes_file_announcement() {
        let xml = "<getFileResponse><code>200</code><name>a.txt</name><length>15</length>\
                   <mimeType>text/plain</mimeType><frames>2</frames></getFileResponse>";
        match decode(xml).unwrap() {
            Response::File(announcement) => {
                assert_eq!(announcement.name, "a.txt");
                assert_eq!(announcement.total_length, 15);
                assert_eq!(announcement.frames_expected, 2);
                assert_eq!(announcement.mime_type, "text/plain");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn decodes_version_headers_at_depth() {
        // The daemon nests dates inside header elements; collect them all.
        let xml = "<getDatabaseVersionHeadersResponse><code>200</code><root>/a</root>\
                   <headers><header><date>d1</date></header><header><date>d2</date></header></headers>\
                   </getDatabaseVersionHeadersResponse>";
        match decode(xml).unwrap() {
            Response::DatabaseVersionHeaders { dates, .. } => {
                assert_eq!(dates, vec!["d1", "d2"]);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn decodes_watch_event() {
        let xml = "<watchEventResponse><code>200</code><root>/a</root>\
                   <action>UPLOAD_FILE</action><subject>x.txt</subject></watchEventResponse>";
        match decode(xml).unwrap() {
            Response::WatchEvent {
                action, subject, ..
            } => {
                assert_eq!(action, "UPLOAD_FILE");
                assert_eq!(subject.as_deref(), Some("x.txt"));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn non_success_code_is_protocol_status() {
        let xml = "<badRequestResponse><code>400</code><message>Cannot reassemble file.</message></badRequestResponse>";
        match decode(xml).unwrap_err() {
            ClientError::ProtocolStatus { kind, code, body } => {
                assert_eq!(kind, "badRequestResponse");
                assert_eq!(code, 400);
                assert_eq!(body, "Cannot reassemble file.");
            }
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn missing_code_is_protocol_status_zero() {
        let xml = "<getFileTreeResponse><prefix>x/</prefix></getFileTreeResponse>";
        match decode(xml).unwrap_err() {
            ClientError::ProtocolStatus { code, .. } => assert_eq!(code, 0),
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_with_success_code() {
        let xml = "<mysteryResponse><code>200</code></mysteryResponse>";
        match decode(xml).unwrap_err() {
            ClientError::UnknownResponseKind(tag) => assert_eq!(tag, "mysteryResponse"),
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn tag_matching_is_case_insensitive() {
        let xml = "<GETFILETREERESPONSE><code>200</code><prefix></prefix></GETFILETREERESPONSE>";
        assert!(matches!(
            decode(xml).unwrap(),
            Response::FileTree { .. }
        ));
    }

    #[test]
    fn malformed_xml_is_decode_error() {
        assert!(matches!(
            decode("not xml at all"),
            Err(ClientError::Decode(_))
        ));
    }

    #[test]
    fn kind_display_matches_wire_tags() {
        assert_eq!(
            ResponseKind::DatabaseVersionHeaders.to_string(),
            "getDatabaseVersionHeadersResponse"
        );
        assert_eq!(
            ResponseKind::from_tag("getFileResponse"),
            Some(ResponseKind::File)
        );
    }
}
