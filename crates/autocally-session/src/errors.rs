//! Session and storage error types.

use autocally_core::ConnectionError;

/// Errors from the durable key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Persisting or clearing credentials failed. In-memory state is unchanged.
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The session was committed but the real-time channel did not open.
    #[error("real-time channel failed: {0}")]
    Channel(#[from] ConnectionError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
