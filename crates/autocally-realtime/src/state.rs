//! Connection state machine.
//!
//! [`transition`] is the complete table; every pair it does not list is
//! invalid and yields `None`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the real-time channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No channel and no attempt in flight.
    #[default]
    Disconnected,
    /// First handshake in flight.
    Connecting,
    /// Handshake complete; events flow.
    Connected,
    /// Waiting for or running a reconnection attempt.
    Reconnecting,
    /// Gave up. Only an explicit connect leaves this state.
    Failed,
}

impl ConnectionState {
    /// All states, for exhaustive checks.
    pub const ALL: [Self; 5] = [
        Self::Disconnected,
        Self::Connecting,
        Self::Connected,
        Self::Reconnecting,
        Self::Failed,
    ];

    /// Name used in logs and health output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input that may move the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// An explicit connect was issued.
    ConnectRequested,
    /// The Socket.IO handshake completed.
    HandshakeSucceeded,
    /// A connect attempt failed with a retryable error.
    TransientFailure,
    /// An established channel dropped.
    TransportLost,
    /// The reconnection ceiling was reached.
    RetriesExhausted,
    /// The server refused the connection (auth, TLS or protocol).
    Rejected,
    /// Explicit disconnect, or replacement by a newer connect.
    Teardown,
}

impl Trigger {
    /// All triggers, for exhaustive checks.
    pub const ALL: [Self; 7] = [
        Self::ConnectRequested,
        Self::HandshakeSucceeded,
        Self::TransientFailure,
        Self::TransportLost,
        Self::RetriesExhausted,
        Self::Rejected,
        Self::Teardown,
    ];
}

/// Next state for `(from, trigger)`, or `None` if the pair is invalid.
pub fn transition(from: ConnectionState, trigger: Trigger) -> Option<ConnectionState> {
    use ConnectionState::{Connected, Connecting, Disconnected, Failed, Reconnecting};

    match (from, trigger) {
        (_, Trigger::Teardown) => Some(Disconnected),
        (Disconnected, Trigger::ConnectRequested) => Some(Connecting),
        (Connecting | Reconnecting, Trigger::HandshakeSucceeded) => Some(Connected),
        (Connecting | Reconnecting, Trigger::TransientFailure) | (Connected, Trigger::TransportLost) => {
            Some(Reconnecting)
        }
        (Connecting | Reconnecting, Trigger::RetriesExhausted | Trigger::Rejected) => Some(Failed),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
