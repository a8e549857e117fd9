//! Observer events published by the connection manager.

use autocally_core::ErrorKind;
use serde::Serialize;
use serde_json::Value;

use crate::state::ConnectionState;

/// Something observable happened on the real-time channel.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionEvent {
    /// The state machine moved.
    StateChanged {
        /// Previous state.
        from: ConnectionState,
        /// New state.
        to: ConnectionState,
        /// Generation that caused the move.
        generation: u64,
    },
    /// Handshake finished; the server assigned a socket id.
    Connected {
        /// Socket.IO socket id.
        socket_id: String,
    },
    /// An established channel was lost.
    Disconnected {
        /// Why the link went away.
        reason: String,
    },
    /// A reconnection attempt is scheduled.
    ReconnectAttempt {
        /// 1-based attempt number.
        attempt: u32,
        /// Configured ceiling.
        max_attempts: u32,
    },
    /// Reconnection gave up.
    ReconnectFailed {
        /// Attempts made.
        attempts: u32,
    },
    /// A named event pushed by the server.
    Server {
        /// Event name, e.g. `connection_established` or `call_ended`.
        name: String,
        /// Event payload.
        data: Value,
    },
    /// A connect attempt or the established channel reported an error.
    Error {
        /// Error classification.
        kind: ErrorKind,
        /// Human-readable description.
        message: String,
    },
}

impl ConnectionEvent {
    /// Name of a server event, if this is one.
    pub fn server_event_name(&self) -> Option<&str> {
        match self {
            Self::Server { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = ConnectionEvent::ReconnectAttempt {
            attempt: 2,
            max_attempts: 5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "reconnect_attempt");
        assert_eq!(json["attempt"], 2);
    }

    #[test]
    fn server_event_name() {
        let event = ConnectionEvent::Server {
            name: "call_ended".into(),
            data: Value::Null,
        };
        assert_eq!(event.server_event_name(), Some("call_ended"));
        assert_eq!(
            ConnectionEvent::Connected {
                socket_id: "s".into()
            }
            .server_event_name(),
            None
        );
    }
}
