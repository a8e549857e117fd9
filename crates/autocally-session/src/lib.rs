//! # autocally-session
//!
//! The client's record of the current authenticated user.
//!
//! - [`SessionStore`]: token and username with the `authenticated` flag
//!   derived from the token, persisted through a [`KeyValueStore`]. Login
//!   and logout drive the real-time channel through
//!   [`ChannelControl`](autocally_core::ChannelControl).
//! - [`FileStore`] / [`MemoryStore`]: durable and in-process storage.

#![deny(unsafe_code)]

pub mod errors;
pub mod storage;
pub mod store;

pub use errors::{SessionError, StorageError};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{Session, SessionStore};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let session = Session::anonymous();
        assert!(!session.is_authenticated());
        let store = MemoryStore::new();
        assert!(store.get("token").unwrap().is_none());
    }
}
