//! Socket.IO v5 over Engine.IO v4 text framing.
//!
//! Only the packet kinds exchanged on a WebSocket-only, default-namespace
//! connection are modelled. Each WebSocket text frame carries exactly one
//! packet:
//!
//! | Frame | Packet |
//! |---|---|
//! | `0{"sid":..,"pingInterval":..,"pingTimeout":..}` | [`Packet::Open`] |
//! | `1` | [`Packet::Close`] |
//! | `2` / `3` | [`Packet::Ping`] / [`Packet::Pong`] |
//! | `6` | [`Packet::Noop`] |
//! | `40` / `40{"sid":..}` | [`Packet::Connect`] |
//! | `41` | [`Packet::Disconnect`] |
//! | `42["name",data]` | [`Packet::Event`] |
//! | `44{"message":..}` | [`Packet::ConnectError`] |

use std::collections::BTreeMap;
use std::time::Duration;

use autocally_core::ConnectionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::transport::ConnectParams;

/// Engine.IO protocol revision spoken by this client.
pub const ENGINE_IO_VERSION: u8 = 4;

/// Transport name reported in health snapshots.
pub const TRANSPORT_NAME: &str = "websocket";

/// Server parameters from the Engine.IO open packet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPayload {
    /// Engine.IO session id.
    pub sid: String,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    /// Offered transport upgrades (always empty on a WebSocket-only link).
    #[serde(default)]
    pub upgrades: Vec<String>,
}

impl OpenPayload {
    /// Longest silence tolerated before the link is considered dead.
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// A decoded packet.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    /// Engine.IO open.
    Open(OpenPayload),
    /// Engine.IO close.
    Close,
    /// Engine.IO ping.
    Ping,
    /// Engine.IO pong.
    Pong,
    /// Engine.IO no-op.
    Noop,
    /// Socket.IO connect. `sid` is set on the server acknowledgement.
    Connect {
        /// Socket id assigned by the server.
        sid: Option<String>,
    },
    /// Socket.IO disconnect.
    Disconnect,
    /// Socket.IO event.
    Event {
        /// Event name.
        name: String,
        /// First argument, or an array when several were sent.
        data: Value,
    },
    /// Socket.IO connect refusal.
    ConnectError {
        /// Reason given by the server.
        message: String,
    },
}

impl Packet {
    /// Shorthand for an outgoing event.
    pub fn event(name: impl Into<String>, data: Value) -> Self {
        Self::Event {
            name: name.into(),
            data,
        }
    }
}

/// Encode a packet as a WebSocket text frame.
pub fn encode(packet: &Packet) -> String {
    match packet {
        Packet::Open(open) => format!("0{}", serde_json::to_string(open).unwrap_or_default()),
        Packet::Close => "1".into(),
        Packet::Ping => "2".into(),
        Packet::Pong => "3".into(),
        Packet::Noop => "6".into(),
        Packet::Connect { sid: None } => "40".into(),
        Packet::Connect { sid: Some(sid) } => {
            format!("40{}", serde_json::json!({ "sid": sid }))
        }
        Packet::Disconnect => "41".into(),
        Packet::Event { name, data } => {
            let args = if data.is_null() {
                serde_json::json!([name])
            } else {
                serde_json::json!([name, data])
            };
            format!("42{args}")
        }
        Packet::ConnectError { message } => {
            format!("44{}", serde_json::json!({ "message": message }))
        }
    }
}

/// Decode one WebSocket text frame.
pub fn decode(frame: &str) -> Result<Packet, ConnectionError> {
    let mut chars = frame.chars();
    let Some(engine) = chars.next() else {
        return Err(ConnectionError::protocol("empty frame"));
    };
    let rest = chars.as_str();

    match engine {
        '0' => serde_json::from_str::<OpenPayload>(rest)
            .map(Packet::Open)
            .map_err(|e| ConnectionError::protocol(format!("bad open payload: {e}"))),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '6' => Ok(Packet::Noop),
        '4' => decode_socket(rest),
        other => Err(ConnectionError::protocol(format!(
            "unknown engine packet type '{other}'"
        ))),
    }
}

fn decode_socket(frame: &str) -> Result<Packet, ConnectionError> {
    let mut chars = frame.chars();
    let Some(kind) = chars.next() else {
        return Err(ConnectionError::protocol("empty socket packet"));
    };
    let body = strip_namespace(chars.as_str());

    match kind {
        '0' => {
            let sid = if body.is_empty() {
                None
            } else {
                let value: Value = parse_json(body)?;
                value.get("sid").and_then(Value::as_str).map(str::to_string)
            };
            Ok(Packet::Connect { sid })
        }
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(strip_ack_id(body)),
        '4' => {
            let value: Value = if body.is_empty() {
                Value::Null
            } else {
                parse_json(body)?
            };
            let message = match &value {
                Value::String(s) => s.clone(),
                Value::Object(map) => map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("connection refused")
                    .to_string(),
                _ => "connection refused".to_string(),
            };
            Ok(Packet::ConnectError { message })
        }
        other => Err(ConnectionError::protocol(format!(
            "unsupported socket packet type '{other}'"
        ))),
    }
}

fn decode_event(body: &str) -> Result<Packet, ConnectionError> {
    let Value::Array(mut args) = parse_json(body)? else {
        return Err(ConnectionError::protocol("event payload is not an array"));
    };
    if args.is_empty() {
        return Err(ConnectionError::protocol("event payload has no name"));
    }
    let Value::String(name) = args.remove(0) else {
        return Err(ConnectionError::protocol("event name is not a string"));
    };
    let data = match args.len() {
        0 => Value::Null,
        1 => args.remove(0),
        _ => Value::Array(args),
    };
    Ok(Packet::Event { name, data })
}

/// Drop a `/namespace,` prefix. Only the default namespace is used.
fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        body.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        body
    }
}

fn strip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn parse_json(body: &str) -> Result<Value, ConnectionError> {
    serde_json::from_str(body).map_err(|e| ConnectionError::protocol(format!("bad JSON: {e}")))
}

/// Build the WebSocket URL for a Socket.IO endpoint.
///
/// `https` maps to `wss` and `http` to `ws`. The Engine.IO query is always
/// present; connect params follow when set.
pub fn socket_url(origin: &str, path: &str, params: &ConnectParams) -> Result<Url, ConnectionError> {
    let mut url = Url::parse(origin)
        .map_err(|e| ConnectionError::protocol(format!("invalid backend url '{origin}': {e}")))?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(ConnectionError::protocol(format!(
                "unsupported backend scheme '{other}'"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| ConnectionError::protocol(format!("cannot use scheme '{scheme}'")))?;

    url.set_path(&format!("{}/", path.trim_end_matches('/')));
    let query: BTreeMap<String, String> = params.to_query();
    {
        let mut pairs = url.query_pairs_mut();
        let _ = pairs
            .clear()
            .append_pair("EIO", &ENGINE_IO_VERSION.to_string())
            .append_pair("transport", TRANSPORT_NAME);
        for (key, value) in &query {
            let _ = pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
