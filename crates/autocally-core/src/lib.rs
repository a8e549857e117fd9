//! # autocally-core
//!
//! Shared vocabulary for the Autocally client crates:
//!
//! - **Errors**: [`ConnectionError`] and its [`ErrorKind`] classification,
//!   used to decide whether a real-time failure is retried
//! - **Seams**: [`ChannelControl`] (session store → connection manager) and
//!   [`TokenSource`] (session store → backend call wrappers)
//! - **Constants**: storage keys, Socket.IO event names, lifecycle defaults
//! - **Logging**: `tracing` subscriber setup and log capture for tests

#![deny(unsafe_code)]

pub mod channel;
pub mod constants;
pub mod errors;
pub mod logging;

pub use channel::{ChannelControl, StaticToken, TokenSource};
pub use errors::{ConnectionError, ErrorKind};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
