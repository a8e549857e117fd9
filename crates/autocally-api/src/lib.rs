//! # autocally-api
//!
//! Stateless wrappers over the backend REST API. One shared
//! [`ApiClient`] reads the bearer token from a
//! [`TokenSource`](autocally_core::TokenSource) on every call; endpoint
//! groups hang off it as borrowed views:
//!
//! - [`Security`]: login, signup, logout, health, ping
//! - [`Assistants`]: assistant CRUD, prompt, voices, streaming chat
//! - [`PhoneNumbers`]: Twilio number import and management
//! - [`KnowledgeBases`]: collections, files (multipart upload, download), processing tasks
//! - [`TestCalls`]: browser test calls

#![deny(unsafe_code)]

pub mod client;
pub mod endpoints;
pub mod errors;
pub mod types;

pub use client::ApiClient;
pub use endpoints::{Assistants, KnowledgeBases, PhoneNumbers, Security, TestCalls};
pub use errors::{ApiError, Result};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use autocally_core::StaticToken;
    use autocally_settings::BackendSettings;

    #[test]
    fn re_exports_work() {
        let client =
            ApiClient::new(&BackendSettings::default(), Arc::new(StaticToken::anonymous())).unwrap();
        assert_eq!(client.base_url(), "https://localhost:5001/api");
        let _security: Security<'_> = client.security();
        assert!(ApiError::Url("x".into()).status().is_none());
    }
}
