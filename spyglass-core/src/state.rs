//! Connection lifecycle state machine.
//!
//! Provides a `LinkPhase` enum that models the full lifecycle of the
//! daemon connection, with validated transitions that return `Result`
//! instead of panicking.

use std::time::Instant;

use crate::error::ClientError;

// ── LinkPhase ────────────────────────────────────────────────────

/// The current phase of the daemon connection.
///
/// ```text
///  Disconnected ──► Connecting ──► Connected
///       ▲               │              │
///       │               ▼              ▼
///       └─────────── Closing ◄─────────┘
/// ```
///
/// A transport error from `Connecting` or `Connected` is a forced jump to
/// `Disconnected` ([`force_disconnect`](Self::force_disconnect)); the
/// errored condition is carried by the status event, not the phase, and
/// behaves exactly like `Disconnected` for reconnection purposes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkPhase {
    /// No active connection. Initial / terminal state.
    #[default]
    Disconnected,

    /// Transport connection initiated but not yet open.
    Connecting,

    /// Channel is open; ready for requests and responses.
    Connected {
        /// When the connection entered the `Connected` state.
        since: Instant,
    },

    /// Shutdown in progress (transport being closed).
    Closing,
}

impl std::fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

impl LinkPhase {
    /// Returns `true` when the channel is open and ready for traffic.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Returns `true` when the connection is in its terminal/idle state.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the connection has been in the `Connected` state.
    ///
    /// Returns `None` for any other phase.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Disconnected`. Fails fast when a connection attempt
    /// is already underway or established.
    pub fn begin_connect(&mut self) -> Result<(), ClientError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(ClientError::InvalidTransition(
                "cannot connect: not in Disconnected state",
            )),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `Connecting`.
    pub fn open(&mut self) -> Result<(), ClientError> {
        match self {
            Self::Connecting => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(ClientError::InvalidTransition(
                "cannot open: not in Connecting state",
            )),
        }
    }

    /// Transition to `Closing`.
    ///
    /// Valid from: `Connecting`, `Connected`.
    pub fn begin_close(&mut self) -> Result<(), ClientError> {
        match self {
            Self::Connecting | Self::Connected { .. } => {
                *self = Self::Closing;
                Ok(())
            }
            _ => Err(ClientError::InvalidTransition(
                "cannot close: not in Connecting or Connected state",
            )),
        }
    }

    /// Transition to `Disconnected`.
    ///
    /// Valid from: `Closing`.
    pub fn finish_close(&mut self) -> Result<(), ClientError> {
        match self {
            Self::Closing => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(ClientError::InvalidTransition(
                "cannot finish close: not in Closing state",
            )),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    ///
    /// Use this for transport failures mid-stream.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────
