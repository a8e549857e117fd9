//! Seams between the session store and its collaborators.
//!
//! The session store owns credentials but not the transport. It drives the
//! real-time channel through [`ChannelControl`] and hands the current token
//! to the HTTP layer through [`TokenSource`]. Both are object-safe so the
//! store can hold `Arc<dyn ...>` and tests can substitute recorders.

use async_trait::async_trait;

use crate::errors::ConnectionError;

/// Lifecycle control over the authenticated real-time channel.
#[async_trait]
pub trait ChannelControl: Send + Sync {
    /// Open a fresh channel authenticated with `token`.
    ///
    /// Any existing channel must be torn down first.
    async fn open(&self, token: &str) -> Result<(), ConnectionError>;

    /// Tear down the channel. Safe to call when nothing is open.
    async fn close(&self);
}

/// Supplies the bearer token for each backend request.
pub trait TokenSource: Send + Sync {
    /// Current token, or `None` when unauthenticated.
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, for callers that manage credentials themselves.
#[derive(Clone, Debug, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    /// Wrap a known token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// No token; requests go out without an `Authorization` header.
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
