//! Advisory request/response correlation.
//!
//! The daemon dispatches responses by declared kind and does not echo the
//! originating request id, so correlation cannot route a response to a
//! specific caller. This ledger exists to detect requests that never
//! receive a matching response (timeout reporting). When several requests
//! of the same kind are pending, a response resolves the newest (LIFO) —
//! the protocol offers no way to disambiguate further.

use std::time::{Duration, Instant};

use crate::wire::{RequestKind, ResponseKind};

// ── PendingRequest ───────────────────────────────────────────────

/// One in-flight request that may expire after a deadline.
#[derive(Debug)]
pub struct PendingRequest {
    pub id: u64,
    pub kind: RequestKind,
    sent_at: Instant,
    /// Optional deadline; `None` means no timeout.
    deadline: Option<Duration>,
}

impl PendingRequest {
    /// Returns `true` if this request has exceeded its deadline.
    pub fn is_expired(&self) -> bool {
        match self.deadline {
            Some(d) => self.sent_at.elapsed() > d,
            None => false,
        }
    }

    /// How long this request has been in-flight.
    pub fn elapsed(&self) -> Duration {
        self.sent_at.elapsed()
    }
}

// ── RequestCorrelator ────────────────────────────────────────────

/// Tracks outstanding requests, resolved by expected response kind.
#[derive(Debug, Default)]
pub struct RequestCorrelator {
    /// In insertion order; ids are monotonic, so the last match is the
    /// newest.
    pending: Vec<PendingRequest>,

    /// Default deadline applied to requests when none is specified.
    default_deadline: Option<Duration>,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default deadline applied to all new requests.
    pub fn set_default_deadline(&mut self, deadline: Duration) {
        self.default_deadline = Some(deadline);
    }

    /// Clear the default deadline (requests will not expire by default).
    pub fn clear_default_deadline(&mut self) {
        self.default_deadline = None;
    }

    /// Track a request with the default deadline.
    pub fn track(&mut self, id: u64, kind: RequestKind) {
        self.track_with_deadline(id, kind, self.default_deadline);
    }

    /// Track a request with an explicit deadline.
    pub fn track_with_deadline(
        &mut self,
        id: u64,
        kind: RequestKind,
        deadline: Option<Duration>,
    ) {
        self.pending.push(PendingRequest {
            id,
            kind,
            sent_at: Instant::now(),
            deadline,
        });
    }

    /// Resolve the newest pending request expecting this response kind.
    ///
    /// Returns `None` for unsolicited kinds or when nothing matches —
    /// which is fine: correlation is advisory, the response is dispatched
    /// either way.
    pub fn resolve(&mut self, kind: ResponseKind) -> Option<PendingRequest> {
        let idx = self
            .pending
            .iter()
            .rposition(|r| r.kind.expected_response() == kind)?;
        Some(self.pending.remove(idx))
    }

    /// Drop a tracked request by id (e.g. the send itself failed).
    pub fn abandon(&mut self, id: u64) -> Option<PendingRequest> {
        let idx = self.pending.iter().position(|r| r.id == id)?;
        Some(self.pending.remove(idx))
    }

    /// Remove and return all expired requests.
    pub fn drain_expired(&mut self) -> Vec<PendingRequest> {
        let mut expired = Vec::new();
        let mut idx = 0;
        while idx < self.pending.len() {
            if self.pending[idx].is_expired() {
                expired.push(self.pending.remove(idx));
            } else {
                idx += 1;
            }
        }
        expired
    }

    /// Discard every pending request (disconnect is a hard abort).
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of in-flight requests.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a specific request is pending.
    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.iter().any(|r| r.id == id)
    }
}

// ── Tests ────────────────────────────────────────────────────────
