//! Transport seam.
//!
//! A [`Transport`] performs the full Socket.IO handshake and returns an
//! established [`Channel`]. The connection manager owns timing, retries and
//! state; transports only move packets.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use autocally_core::ConnectionError;
use autocally_core::constants::{QUERY_CALL_ID, QUERY_PHONE_NUMBER_ID};
use serde::Serialize;
use url::Url;

use crate::protocol::Packet;

/// Optional query parameters identifying the active call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConnectParams {
    call_id: Option<String>,
    phone_number_id: Option<String>,
}

impl ConnectParams {
    /// No parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the call id. Strings and integers are accepted; empty values are
    /// dropped, `0` is kept.
    #[must_use]
    pub fn with_call_id(mut self, id: impl Display) -> Self {
        self.call_id = non_empty(id);
        self
    }

    /// Set the phone number id. Strings and integers are accepted; empty values are dropped.
    #[must_use]
    pub fn with_phone_number_id(mut self, id: impl Display) -> Self {
        self.phone_number_id = non_empty(id);
        self
    }

    /// Call id, if set.
    pub fn call_id(&self) -> Option<&str> {
        self.call_id.as_deref()
    }

    /// Phone number id, if set.
    pub fn phone_number_id(&self) -> Option<&str> {
        self.phone_number_id.as_deref()
    }

    /// Rendered query pairs.
    pub fn to_query(&self) -> BTreeMap<String, String> {
        let mut query = BTreeMap::new();
        if let Some(id) = &self.call_id {
            let _ = query.insert(QUERY_CALL_ID.to_string(), id.clone());
        }
        if let Some(id) = &self.phone_number_id {
            let _ = query.insert(QUERY_PHONE_NUMBER_ID.to_string(), id.clone());
        }
        query
    }
}

fn non_empty(value: impl Display) -> Option<String> {
    let rendered = value.to_string();
    let trimmed = rendered.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Everything a transport needs to open one channel.
#[derive(Clone, Debug)]
pub struct ConnectRequest {
    /// Full WebSocket URL including the Engine.IO query.
    pub url: Url,
    /// `Authorization` header value (`Bearer <token>`), if any.
    pub auth_header: Option<String>,
}

/// An established Socket.IO channel.
#[async_trait]
pub trait Channel: Send {
    /// Socket id assigned by the server.
    fn socket_id(&self) -> &str;

    /// Longest silence tolerated before the link is considered dead.
    fn liveness_window(&self) -> Duration;

    /// Send one packet.
    async fn send(&mut self, packet: Packet) -> Result<(), ConnectionError>;

    /// Receive the next packet. Must be cancel-safe.
    async fn recv(&mut self) -> Result<Packet, ConnectionError>;

    /// Close the link. Best effort.
    async fn close(&mut self);
}

/// Opens channels.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect and complete the Socket.IO handshake.
    async fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn Channel>, ConnectionError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
