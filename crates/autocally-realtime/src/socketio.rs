//! WebSocket transport speaking Socket.IO over `tokio-tungstenite`.

use std::time::Duration;

use async_trait::async_trait;
use autocally_core::ConnectionError;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use crate::protocol::{Packet, decode, encode};
use crate::transport::{Channel, ConnectRequest, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Opens Socket.IO channels over a WebSocket.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// New transport.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn Channel>, ConnectionError> {
        let mut ws_request = request
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| classify_ws_error(&e))?;

        if let Some(header) = &request.auth_header {
            let value = HeaderValue::from_str(header)
                .map_err(|e| ConnectionError::protocol(format!("invalid auth header: {e}")))?;
            let _ = ws_request.headers_mut().insert(AUTHORIZATION, value);
        }

        debug!(
            url = %request.url,
            authenticated = request.auth_header.is_some(),
            "opening websocket"
        );
        let (ws, _response) = connect_async(ws_request)
            .await
            .map_err(|e| classify_ws_error(&e))?;

        let channel = SocketIoChannel::handshake(ws).await?;
        Ok(Box::new(channel))
    }
}

/// Established Socket.IO session on the default namespace.
pub struct SocketIoChannel {
    ws: WsStream,
    socket_id: String,
    liveness_window: Duration,
}

impl SocketIoChannel {
    /// Engine.IO open, then Socket.IO connect on the default namespace.
    async fn handshake(ws: WsStream) -> Result<Self, ConnectionError> {
        let mut channel = Self {
            ws,
            socket_id: String::new(),
            liveness_window: Duration::ZERO,
        };

        let open = match channel.recv().await? {
            Packet::Open(open) => open,
            other => {
                return Err(ConnectionError::protocol(format!(
                    "expected engine open packet, got {other:?}"
                )));
            }
        };
        channel.liveness_window = open.liveness_window();
        trace!(engine_sid = %open.sid, ping_interval = open.ping_interval, "engine open");

        channel.send(Packet::Connect { sid: None }).await?;

        loop {
            match channel.recv().await? {
                Packet::Connect { sid } => {
                    channel.socket_id = sid.unwrap_or(open.sid);
                    return Ok(channel);
                }
                Packet::ConnectError { message } => return Err(ConnectionError::auth(message)),
                Packet::Ping => channel.send(Packet::Pong).await?,
                Packet::Pong | Packet::Noop => {}
                Packet::Close | Packet::Disconnect => {
                    return Err(ConnectionError::transport("closed during handshake"));
                }
                other => {
                    return Err(ConnectionError::protocol(format!(
                        "unexpected packet during handshake: {other:?}"
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl Channel for SocketIoChannel {
    fn socket_id(&self) -> &str {
        &self.socket_id
    }

    fn liveness_window(&self) -> Duration {
        self.liveness_window
    }

    async fn send(&mut self, packet: Packet) -> Result<(), ConnectionError> {
        self.ws
            .send(Message::Text(encode(&packet).into()))
            .await
            .map_err(|e| classify_ws_error(&e))
    }

    async fn recv(&mut self) -> Result<Packet, ConnectionError> {
        loop {
            let Some(message) = self.ws.next().await else {
                return Err(ConnectionError::transport("websocket closed"));
            };
            match message.map_err(|e| classify_ws_error(&e))? {
                Message::Text(text) => return decode(text.as_str()),
                Message::Close(frame) => {
                    debug!(?frame, "websocket close frame");
                    return Ok(Packet::Close);
                }
                Message::Binary(data) => {
                    debug!(len = data.len(), "ignoring binary frame");
                }
                // WebSocket-level ping/pong is answered by tungstenite.
                _ => {}
            }
        }
    }

    async fn close(&mut self) {
        let ws = &mut self.ws;
        let _ = tokio::time::timeout(CLOSE_TIMEOUT, async {
            let _ = ws.send(Message::Text(encode(&Packet::Disconnect).into())).await;
            let _ = ws.close(None).await;
        })
        .await;
    }
}

/// Map a WebSocket failure onto the connection error taxonomy.
pub fn classify_ws_error(err: &WsError) -> ConnectionError {
    match err {
        WsError::Http(response) => {
            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                ConnectionError::auth(format!("upgrade rejected with HTTP {status}"))
            } else {
                ConnectionError::transport(format!("upgrade failed with HTTP {status}"))
            }
        }
        WsError::Tls(e) => ConnectionError::Tls {
            message: e.to_string(),
        },
        // rustls reports certificate failures as InvalidData I/O errors.
        WsError::Io(e) if e.kind() == std::io::ErrorKind::InvalidData => ConnectionError::Tls {
            message: e.to_string(),
        },
        WsError::Url(e) => ConnectionError::protocol(format!("invalid socket url: {e}")),
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            ConnectionError::transport("connection reset without closing handshake")
        }
        WsError::Protocol(e) => ConnectionError::protocol(e.to_string()),
        other => ConnectionError::transport(other.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
