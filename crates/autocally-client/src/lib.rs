//! # autocally-client
//!
//! Explicit application context for the Autocally client. [`AppContext`]
//! owns the settings, storage, session store, connection manager, API client
//! and router, and wires the session store to the other two:
//!
//! - login commits the session and opens the authenticated channel
//! - every backend call reads the bearer token from the session
//! - navigation is checked against the session's authenticated flag
//!
//! [`AppContext::bootstrap`] restores persisted credentials (optionally
//! validating them first) and [`AppContext::debug_connection`] runs
//! end-to-end channel diagnostics.

#![deny(unsafe_code)]

pub mod context;
pub mod diagnostics;
pub mod errors;

pub use context::{AppContext, RestoreOutcome};
pub use diagnostics::{ConnectionReport, StepOutcome};
pub use errors::{ClientError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let err = ClientError::NotAuthenticated;
        assert_eq!(err.to_string(), "not logged in");
        assert!(StepOutcome::Ok(true).is_ok());
        assert!(!StepOutcome::<()>::Skipped.is_ok());
        assert_eq!(
            serde_json::to_value(RestoreOutcome::Anonymous).unwrap()["outcome"],
            "anonymous"
        );
    }
}
