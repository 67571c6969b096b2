//! Binary transfer reassembly.
//!
//! A `getFileResponse` announces a payload; the raw frames that follow on
//! the channel are appended in arrival order until the announced frame
//! count is reached. The channel is ordered and the protocol never
//! interleaves two transfers, so at most one session exists at a time and
//! no resequencing is performed.

use bytes::{Bytes, BytesMut};

use crate::error::ClientError;
use crate::wire::FileAnnouncement;

// ── CompletedTransfer ────────────────────────────────────────────

/// A fully reassembled payload.
///
/// `declared_length` is the announcement's size claim; completion is
/// driven by the frame count alone and the payload length is not checked
/// against it. Callers may compare the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTransfer {
    pub name: String,
    pub mime_type: String,
    pub declared_length: u64,
    pub payload: Bytes,
}

// ── TransferAssembler ────────────────────────────────────────────

#[derive(Debug)]
struct TransferSession {
    announcement: FileAnnouncement,
    frames: Vec<Bytes>,
}

impl TransferSession {
    fn into_completed(self) -> CompletedTransfer {
        let total: usize = self.frames.iter().map(Bytes::len).sum();
        let mut payload = BytesMut::with_capacity(total);
        for frame in &self.frames {
            payload.extend_from_slice(frame);
        }
        CompletedTransfer {
            name: self.announcement.name,
            mime_type: self.announcement.mime_type,
            declared_length: self.announcement.total_length,
            payload: payload.freeze(),
        }
    }
}

/// Reassembles one announced file payload from its binary frames.
#[derive(Debug, Default)]
pub struct TransferAssembler {
    session: Option<TransferSession>,
}

impl TransferAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transfer is currently in progress.
    pub fn in_progress(&self) -> bool {
        self.session.is_some()
    }

    /// Start a new session from an announcement.
    ///
    /// The protocol carries no transfer identifiers, so an in-progress
    /// session is discarded: last announcement wins. A zero-frame
    /// announcement has nothing to wait for and completes immediately.
    pub fn begin(&mut self, announcement: FileAnnouncement) -> Option<CompletedTransfer> {
        if let Some(stale) = self.session.take() {
            tracing::warn!(
                name = %stale.announcement.name,
                frames = stale.frames.len(),
                "discarding in-progress transfer; new announcement received"
            );
        }

        if announcement.frames_expected == 0 {
            return Some(
                TransferSession {
                    announcement,
                    frames: Vec::new(),
                }
                .into_completed(),
            );
        }

        self.session = Some(TransferSession {
            announcement,
            frames: Vec::new(),
        });
        None
    }

    /// Append one binary frame in arrival order.
    ///
    /// Returns the completed transfer when the announced frame count is
    /// reached; `UnexpectedFrame` if no transfer is in progress (state is
    /// left unchanged).
    pub fn append_frame(&mut self, frame: Bytes) -> Result<Option<CompletedTransfer>, ClientError> {
        let session = self.session.as_mut().ok_or(ClientError::UnexpectedFrame)?;
        session.frames.push(frame);

        if (session.frames.len() as u64) < session.announcement.frames_expected {
            return Ok(None);
        }
        Ok(self.session.take().map(TransferSession::into_completed))
    }

    /// Hard-abort any in-progress session without completion notification.
    pub fn abort(&mut self) {
        if let Some(stale) = self.session.take() {
            tracing::debug!(name = %stale.announcement.name, "transfer aborted");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn announce(name: &str, length: u64, frames: u64) -> FileAnnouncement {
        FileAnnouncement {
            name: name.to_string(),
            mime_type: "text/plain".to_string(),
            total_length: length,
            frames_expected: frames,
        }
    }

    #[test]
    fn two_frames_complete() {
        let mut assembler = TransferAssembler::new();
        assert!(assembler.begin(announce("a.txt", 15, 2)).is_none());
        assert!(assembler.in_progress());

        let first = assembler.append_frame(Bytes::from(vec![1u8; 10])).unwrap();
        assert!(first.is_none());

        let done = assembler
            .append_frame(Bytes::from(vec![2u8; 5]))
            .unwrap()
            .expect("transfer should complete on the final frame");
        assert_eq!(done.name, "a.txt");
        assert_eq!(done.payload.len(), 15);
        assert_eq!(&done.payload[..10], &[1u8; 10][..]);
        assert_eq!(&done.payload[10..], &[2u8; 5][..]);
        assert!(!assembler.in_progress());
    }

    #[test]
    fn frame_without_session_is_rejected() {
        let mut assembler = TransferAssembler::new();
        let err = assembler
            .append_frame(Bytes::from_static(b"stray"))
            .unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedFrame));
        assert!(!assembler.in_progress());
    }

    #[test]
    fn frame_after_completion_is_rejected() {
        let mut assembler = TransferAssembler::new();
        assembler.begin(announce("a", 3, 1));
        assembler
            .append_frame(Bytes::from_static(b"abc"))
            .unwrap()
            .expect("complete");
        assert!(
            assembler
                .append_frame(Bytes::from_static(b"extra"))
                .is_err()
        );
    }

    #[test]
    fn zero_frames_complete_immediately() {
        let mut assembler = TransferAssembler::new();
        let done = assembler
            .begin(announce("empty.txt", 0, 0))
            .expect("zero-frame transfer completes on announcement");
        assert_eq!(done.payload.len(), 0);
        assert!(!assembler.in_progress());
    }

    #[test]
    fn new_announcement_discards_stale_session() {
        let mut assembler = TransferAssembler::new();
        assembler.begin(announce("old.bin", 100, 3));
        assembler
            .append_frame(Bytes::from_static(b"stale-frame"))
            .unwrap();

        // Last announcement wins; the stale frames must not leak in.
        assembler.begin(announce("new.txt", 5, 1));
        let done = assembler
            .append_frame(Bytes::from_static(b"fresh"))
            .unwrap()
            .expect("complete");
        assert_eq!(done.name, "new.txt");
        assert_eq!(&done.payload[..], b"fresh");
    }

    #[test]
    fn length_mismatch_still_completes() {
        // The declared length is informational; the frame count decides.
        let mut assembler = TransferAssembler::new();
        assembler.begin(announce("short.bin", 1000, 1));
        let done = assembler
            .append_frame(Bytes::from_static(b"tiny"))
            .unwrap()
            .expect("complete");
        assert_eq!(done.declared_length, 1000);
        assert_eq!(done.payload.len(), 4);
    }

    #[test]
    fn abort_clears_session() {
        let mut assembler = TransferAssembler::new();
        assembler.begin(announce("a", 10, 2));
        assembler.append_frame(Bytes::from_static(b"12345")).unwrap();
        assembler.abort();
        assert!(!assembler.in_progress());
        assert!(assembler.append_frame(Bytes::from_static(b"6")).is_err());
    }
}
