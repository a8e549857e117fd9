//! Real-time connection error taxonomy.
//!
//! [`ConnectionError`] is the single error type surfaced by the connection
//! manager and the session store's channel seam. Its [`ErrorKind`] decides
//! whether the reconnection policy may absorb it:
//!
//! | Kind | Retried | Typical cause |
//! |---|---|---|
//! | `Auth` | no | bearer token rejected on upgrade or by `connect_error` |
//! | `Tls` | no | certificate validation failed |
//! | `Transport` | yes | refused, reset, or dropped connection |
//! | `Timeout` | yes (inside the reconnection window) | handshake or probe deadline |
//! | `Protocol` | no | unexpected or malformed payload |
//! | `Cancelled` | no | superseded by a newer connect or disconnect |

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a [`ConnectionError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid or expired credentials.
    Auth,
    /// Certificate or TLS negotiation failure.
    Tls,
    /// Transient network failure.
    Transport,
    /// Operation exceeded its deadline.
    Timeout,
    /// Unexpected payload from the peer.
    Protocol,
    /// Operation invalidated by a newer lifecycle call.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Auth => "auth",
            Self::Tls => "tls",
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::Protocol => "protocol",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Errors from the real-time channel.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// The backend rejected the credentials.
    #[error("authentication rejected: {message}")]
    Auth {
        /// Rejection reason reported by the peer.
        message: String,
    },

    /// TLS negotiation or certificate validation failed.
    #[error("TLS error: {message}")]
    Tls {
        /// Underlying TLS failure.
        message: String,
    },

    /// Network-level failure (refused, reset, closed).
    #[error("transport error: {message}")]
    Transport {
        /// Underlying transport failure.
        message: String,
    },

    /// Operation did not complete in time.
    #[error("timed out after {timeout_ms}ms: {context}")]
    Timeout {
        /// How long we waited.
        timeout_ms: u64,
        /// What we were waiting for.
        context: String,
    },

    /// The peer sent something we could not interpret.
    #[error("protocol error: {message}")]
    Protocol {
        /// What was wrong with the payload.
        message: String,
    },

    /// No channel is open.
    #[error("not connected")]
    NotConnected,

    /// A newer `connect` or `disconnect` invalidated this operation.
    #[error("operation cancelled by a newer connection request")]
    Cancelled,
}

impl ConnectionError {
    /// Shorthand for [`ConnectionError::Transport`].
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Shorthand for [`ConnectionError::Protocol`].
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Shorthand for [`ConnectionError::Auth`].
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Shorthand for [`ConnectionError::Timeout`].
    pub fn timeout(timeout_ms: u64, context: impl Into<String>) -> Self {
        Self::Timeout {
            timeout_ms,
            context: context.into(),
        }
    }

    /// Classification used by the reconnection policy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Tls { .. } => ErrorKind::Tls,
            Self::Transport { .. } | Self::NotConnected => ErrorKind::Transport,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether the reconnection policy may retry after this error.
    ///
    /// Retrying with a rejected token or an untrusted certificate cannot
    /// succeed, so only transient kinds qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Timeout)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
