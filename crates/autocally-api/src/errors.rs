//! Backend call errors.

use thiserror::Error;

/// Errors from a backend call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the bearer token (HTTP 401).
    #[error("unauthorized: {body}")]
    Unauthorized {
        /// Response body, usually `{"error": "Unauthorized"}`.
        body: String,
    },

    /// Any other non-2xx response.
    #[error("backend returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend URL or endpoint path is not a valid URL.
    #[error("invalid URL: {0}")]
    Url(String),
}

impl ApiError {
    /// Whether the session's token was rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// HTTP status, when the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Json(_) | Self::Url(_) => None,
        }
    }

    pub(crate) fn from_status(status: u16, body: String) -> Self {
        if status == 401 {
            Self::Unauthorized { body }
        } else {
            Self::Status { status, body }
        }
    }
}

/// Result alias for backend calls.
pub type Result<T> = std::result::Result<T, ApiError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
