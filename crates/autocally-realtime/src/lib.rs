//! # autocally-realtime
//!
//! The authenticated Socket.IO channel between the client and the backend.
//!
//! - [`ConnectionManager`]: the one channel per client. `connect` replaces any
//!   existing channel; stale drivers are fenced off by a generation counter.
//! - [`state`]: the lifecycle as a pure transition table.
//! - [`protocol`]: Engine.IO v4 / Socket.IO v5 text frames.
//! - [`Transport`] / [`Channel`]: the seam between lifecycle and wire, with
//!   [`WebSocketTransport`] as the production implementation.

#![deny(unsafe_code)]

pub mod events;
pub mod manager;
pub mod protocol;
pub mod socketio;
pub mod state;
pub mod transport;

pub use events::ConnectionEvent;
pub use manager::{ConnectionManager, HealthSnapshot, RealtimeConfig};
pub use protocol::{Packet, socket_url};
pub use socketio::WebSocketTransport;
pub use state::{ConnectionState, Trigger, transition};
pub use transport::{Channel, ConnectParams, ConnectRequest, Transport};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
