//! Settings sections.
//!
//! Every struct uses `#[serde(default)]` so a partial user file only needs
//! the keys it overrides.

use std::path::PathBuf;

use autocally_core::constants::{
    DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_RECONNECTION_ATTEMPTS, DEFAULT_RECONNECTION_DELAY_MS,
    DEFAULT_ROUND_TRIP_TIMEOUT_MS, SOCKET_PATH,
};
use serde::{Deserialize, Serialize};

use crate::loader::settings_dir;

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Backend endpoint and HTTP behaviour.
    pub backend: BackendSettings,
    /// Real-time channel lifecycle.
    pub realtime: RealtimeSettings,
    /// Durable key-value storage.
    pub storage: StorageSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Backend endpoint and HTTP behaviour.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSettings {
    /// Backend origin. A bare host is treated as `https://<host>`.
    pub url: String,
    /// Accept self-signed certificates on REST calls.
    pub accept_invalid_certs: bool,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "https://localhost:5001".to_string(),
            accept_invalid_certs: false,
            request_timeout_ms: 30_000,
        }
    }
}

impl BackendSettings {
    /// Backend origin with an explicit scheme and no trailing slash.
    pub fn origin(&self) -> String {
        let trimmed = self.url.trim().trim_end_matches('/');
        if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        }
    }
}

/// Real-time channel lifecycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealtimeSettings {
    /// Socket.IO endpoint path.
    pub path: String,
    /// Reconnection attempts before the channel is marked failed.
    pub reconnection_attempts: u32,
    /// Fixed delay between reconnection attempts.
    pub reconnection_delay_ms: u64,
    /// Bound on a single connect handshake.
    pub handshake_timeout_ms: u64,
    /// Default bound for the round-trip diagnostic.
    pub round_trip_timeout_ms: u64,
    /// Capacity of the connection event broadcast.
    pub event_buffer: usize,
    /// Open the channel for a session restored from storage.
    pub reconnect_on_restore: bool,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            path: SOCKET_PATH.to_string(),
            reconnection_attempts: DEFAULT_RECONNECTION_ATTEMPTS,
            reconnection_delay_ms: DEFAULT_RECONNECTION_DELAY_MS,
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
            round_trip_timeout_ms: DEFAULT_ROUND_TRIP_TIMEOUT_MS,
            event_buffer: 256,
            reconnect_on_restore: false,
        }
    }
}

/// Durable key-value storage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Storage file. Defaults to `~/.autocally/storage.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl StorageSettings {
    /// Resolved storage file path.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(p) => PathBuf::from(p),
            None => settings_dir().join("storage.json"),
        }
    }
}

/// Log output.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
