//! Client configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Daemon WebSocket endpoint URI.
    pub endpoint: String,
    /// Substitute the encrypted scheme (`ws://` → `wss://`) on connect.
    pub secure: bool,
    /// Advisory per-request timeout in milliseconds. Expired requests are
    /// reported, never retried or disconnected.
    pub request_timeout_ms: u64,
    /// Cadence of the timeout sweep in milliseconds.
    pub timeout_sweep_ms: u64,
    /// Capacity of the transport's reader/writer channels.
    pub channel_capacity: usize,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8625/api/ws".into(),
            secure: false,
            request_timeout_ms: 30_000,
            timeout_sweep_ms: 1_000,
            channel_capacity: 64,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let cfg = Self::default();
        let text = toml::to_string_pretty(&cfg).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// The advisory request deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.network.request_timeout_ms)
    }

    /// The timeout sweep cadence.
    pub fn timeout_sweep(&self) -> Duration {
        Duration::from_millis(self.network.timeout_sweep_ms)
    }
}

// ── Tests ────────────────────────────────────────────────────────
