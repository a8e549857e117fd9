//! Real-time connection manager.
//!
//! One [`ConnectionManager`] owns the channel for the whole client. Each
//! `connect` starts a new *generation*: the previous driver task is
//! cancelled and awaited, the generation counter is bumped, and a fresh
//! driver is spawned. Drivers tag every state mutation with their generation
//! and the mutation is dropped if a newer `connect`/`disconnect` has run.
//!
//! Reconnection policy: a retryable failure (transport error or handshake
//! timeout) on the first attempt, or loss of an established channel, moves
//! to `Reconnecting`. Up to `reconnection_attempts` further attempts follow,
//! spaced by `reconnection_delay`. The counter resets on every successful
//! handshake. Non-retryable errors (auth, TLS, protocol) go straight to
//! `Failed`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autocally_core::constants::{
    DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_RECONNECTION_ATTEMPTS, DEFAULT_RECONNECTION_DELAY_MS,
    DEFAULT_ROUND_TRIP_TIMEOUT_MS, EVENT_CONNECTION_CHECK, EVENT_CONNECTION_CHECK_RESPONSE,
    SOCKET_PATH,
};
use autocally_core::{ChannelControl, ConnectionError};
use autocally_settings::ClientSettings;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::events::ConnectionEvent;
use crate::protocol::{ENGINE_IO_VERSION, Packet, TRANSPORT_NAME, socket_url};
use crate::socketio::WebSocketTransport;
use crate::state::{ConnectionState, Trigger, transition};
use crate::transport::{Channel, ConnectParams, ConnectRequest, Transport};

const OUTBOUND_BUFFER: usize = 64;

/// Connection manager configuration.
#[derive(Clone, Debug)]
pub struct RealtimeConfig {
    /// Backend origin (`https://host:port`).
    pub origin: String,
    /// Socket.IO path.
    pub path: String,
    /// Reconnection attempts after the first failure or a lost channel.
    pub reconnection_attempts: u32,
    /// Fixed delay before each reconnection attempt.
    pub reconnection_delay: Duration,
    /// Bound on a single handshake.
    pub handshake_timeout: Duration,
    /// Default bound for [`ConnectionManager::round_trip_test`].
    pub round_trip_timeout: Duration,
    /// Observer broadcast capacity.
    pub event_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            origin: "https://localhost:5001".into(),
            path: SOCKET_PATH.into(),
            reconnection_attempts: DEFAULT_RECONNECTION_ATTEMPTS,
            reconnection_delay: Duration::from_millis(DEFAULT_RECONNECTION_DELAY_MS),
            handshake_timeout: Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS),
            round_trip_timeout: Duration::from_millis(DEFAULT_ROUND_TRIP_TIMEOUT_MS),
            event_buffer: 256,
        }
    }
}

impl RealtimeConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &ClientSettings) -> Self {
        let rt = &settings.realtime;
        Self {
            origin: settings.backend.origin(),
            path: rt.path.clone(),
            reconnection_attempts: rt.reconnection_attempts,
            reconnection_delay: Duration::from_millis(rt.reconnection_delay_ms),
            handshake_timeout: Duration::from_millis(rt.handshake_timeout_ms),
            round_trip_timeout: Duration::from_millis(rt.round_trip_timeout_ms),
            event_buffer: rt.event_buffer.max(1),
        }
    }
}

/// Point-in-time view of the channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    /// Current state.
    pub state: ConnectionState,
    /// `state == Connected`.
    pub connected: bool,
    /// Socket id while connected.
    pub socket_id: Option<String>,
    /// Transport name (always `websocket`).
    pub transport: &'static str,
    /// Engine.IO protocol revision.
    pub protocol: u8,
    /// Reconnection attempt in progress, 0 when none.
    pub reconnect_attempt: u32,
    /// Configured reconnection ceiling.
    pub max_reconnect_attempts: u32,
    /// Current generation.
    pub generation: u64,
    /// Whether a bearer header is configured.
    pub auth_configured: bool,
    /// Active query parameters.
    pub query: BTreeMap<String, String>,
    /// Most recent error since the last successful handshake.
    pub last_error: Option<String>,
}

struct Outbound {
    name: String,
    data: Value,
    reply: oneshot::Sender<Result<(), ConnectionError>>,
}

#[derive(Default)]
struct Shared {
    state: ConnectionState,
    socket_id: Option<String>,
    auth_header: Option<String>,
    query: BTreeMap<String, String>,
    reconnect_attempt: u32,
    generation: u64,
    outbound: Option<mpsc::Sender<Outbound>>,
    last_error: Option<ConnectionError>,
}

struct Inner {
    config: RealtimeConfig,
    transport: Arc<dyn Transport>,
    shared: Mutex<Shared>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl Inner {
    fn publish(&self, event: ConnectionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Apply `trigger` on behalf of `generation`. Returns `false` when the
    /// generation is stale or the pair is not in the transition table.
    fn apply<F>(&self, generation: u64, trigger: Trigger, mutate: F) -> bool
    where
        F: FnOnce(&mut Shared),
    {
        let (from, to) = {
            let mut shared = self.shared.lock();
            if shared.generation != generation {
                debug!(
                    generation,
                    current = shared.generation,
                    ?trigger,
                    "dropping stale transition"
                );
                return false;
            }
            let from = shared.state;
            let Some(to) = transition(from, trigger) else {
                warn!(state = %from, ?trigger, generation, "invalid transition ignored");
                return false;
            };
            shared.state = to;
            mutate(&mut *shared);
            (from, to)
        };

        info!(from = %from, to = %to, ?trigger, generation, "connection state changed");
        self.publish(ConnectionEvent::StateChanged {
            from,
            to,
            generation,
        });
        true
    }

    /// Mutate without a state change, if `generation` is still current.
    fn update<F>(&self, generation: u64, mutate: F) -> bool
    where
        F: FnOnce(&mut Shared),
    {
        let mut shared = self.shared.lock();
        if shared.generation != generation {
            return false;
        }
        mutate(&mut *shared);
        true
    }
}

struct DriverHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Owns the authenticated real-time channel.
pub struct ConnectionManager {
    inner: Arc<Inner>,
    /// Lifecycle lock: serialises connect/disconnect and holds the live driver.
    driver: tokio::sync::Mutex<Option<DriverHandle>>,
}

impl ConnectionManager {
    /// Manager over an arbitrary transport.
    pub fn new(config: RealtimeConfig, transport: Arc<dyn Transport>) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                shared: Mutex::new(Shared::default()),
                events,
            }),
            driver: tokio::sync::Mutex::new(None),
        }
    }

    /// Manager over the WebSocket transport.
    pub fn with_websocket(config: RealtimeConfig) -> Self {
        Self::new(config, Arc::new(WebSocketTransport::new()))
    }

    /// Configuration in use.
    pub fn config(&self) -> &RealtimeConfig {
        &self.inner.config
    }

    /// Observe state changes, reconnect attempts, server events and errors.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events.subscribe()
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.lock().state
    }

    /// Whether the channel is connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Open a fresh channel, replacing any existing one.
    ///
    /// Resolves once the channel is `Connected`, or with the terminal error
    /// once it is `Failed`. A newer `connect` or `disconnect` resolves this
    /// call with [`ConnectionError::Cancelled`].
    pub async fn connect(
        &self,
        token: Option<&str>,
        params: ConnectParams,
    ) -> Result<(), ConnectionError> {
        self.connect_bounded(token, params, self.inner.config.handshake_timeout)
            .await
    }

    async fn connect_bounded(
        &self,
        token: Option<&str>,
        params: ConnectParams,
        handshake_timeout: Duration,
    ) -> Result<(), ConnectionError> {
        let url = socket_url(&self.inner.config.origin, &self.inner.config.path, &params)?;
        let auth_header = token.map(|t| format!("Bearer {t}"));
        let request = ConnectRequest {
            url,
            auth_header: auth_header.clone(),
        };

        let ready_rx = {
            let mut slot = self.driver.lock().await;
            self.teardown(&mut slot).await;

            let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
            let (ready_tx, ready_rx) = oneshot::channel();
            let generation = {
                let mut shared = self.inner.shared.lock();
                shared.generation += 1;
                shared.auth_header = auth_header;
                shared.query = params.to_query();
                shared.reconnect_attempt = 0;
                shared.last_error = None;
                shared.outbound = Some(outbound_tx);
                shared.generation
            };
            if !self.inner.apply(generation, Trigger::ConnectRequested, |_| {}) {
                return Err(ConnectionError::Cancelled);
            }

            info!(
                generation,
                url = %request.url,
                authenticated = request.auth_header.is_some(),
                "connecting"
            );
            let cancel = CancellationToken::new();
            let driver = Driver {
                inner: Arc::clone(&self.inner),
                generation,
                request,
                handshake_timeout,
                cancel: cancel.clone(),
                outbound_rx,
                ready: Some(ready_tx),
                last_error: None,
            };
            let join = tokio::spawn(driver.run());
            *slot = Some(DriverHandle { cancel, join });
            ready_rx
        };

        ready_rx.await.unwrap_or(Err(ConnectionError::Cancelled))
    }

    /// Tear the channel down. Safe to call when already disconnected.
    pub async fn disconnect(&self) {
        let mut slot = self.driver.lock().await;
        self.teardown(&mut slot).await;
        let mut shared = self.inner.shared.lock();
        shared.auth_header = None;
        shared.query.clear();
        shared.last_error = None;
    }

    async fn teardown(&self, slot: &mut Option<DriverHandle>) {
        let change = {
            let mut shared = self.inner.shared.lock();
            shared.generation += 1;
            shared.outbound = None;
            shared.socket_id = None;
            shared.reconnect_attempt = 0;
            let from = shared.state;
            let to = transition(from, Trigger::Teardown).unwrap_or_default();
            shared.state = to;
            (from != to).then_some((from, to, shared.generation))
        };

        if let Some(handle) = slot.take() {
            handle.cancel.cancel();
            if let Err(e) = handle.join.await {
                warn!(error = %e, "channel driver ended abnormally");
            }
        }

        if let Some((from, to, generation)) = change {
            info!(from = %from, to = %to, generation, "channel torn down");
            self.inner.publish(ConnectionEvent::StateChanged {
                from,
                to,
                generation,
            });
        }
    }

    /// Non-blocking snapshot of the channel.
    pub fn health_check(&self) -> HealthSnapshot {
        let shared = self.inner.shared.lock();
        HealthSnapshot {
            state: shared.state,
            connected: shared.state == ConnectionState::Connected,
            socket_id: shared.socket_id.clone(),
            transport: TRANSPORT_NAME,
            protocol: ENGINE_IO_VERSION,
            reconnect_attempt: shared.reconnect_attempt,
            max_reconnect_attempts: self.inner.config.reconnection_attempts,
            generation: shared.generation,
            auth_configured: shared.auth_header.is_some(),
            query: shared.query.clone(),
            last_error: shared.last_error.as_ref().map(ToString::to_string),
        }
    }

    /// Send a named event on the open channel.
    pub async fn emit(&self, event: &str, data: Value) -> Result<(), ConnectionError> {
        let sender = {
            let shared = self.inner.shared.lock();
            if shared.state != ConnectionState::Connected {
                return Err(ConnectionError::NotConnected);
            }
            shared.outbound.clone().ok_or(ConnectionError::NotConnected)?
        };

        let (reply, reply_rx) = oneshot::channel();
        sender
            .send(Outbound {
                name: event.to_string(),
                data,
                reply,
            })
            .await
            .map_err(|_| ConnectionError::NotConnected)?;
        reply_rx.await.unwrap_or(Err(ConnectionError::NotConnected))
    }

    /// Verify the channel end to end with a `connection_check` round trip.
    ///
    /// When not connected, first opens a diagnostic channel without
    /// credentials, bounded by the same timeout. If that channel does not
    /// come up it is torn down before the error is returned.
    pub async fn round_trip_test(&self, timeout: Option<Duration>) -> Result<bool, ConnectionError> {
        let timeout = timeout.unwrap_or(self.inner.config.round_trip_timeout);
        let timeout_ms = millis(timeout);

        if !self.is_connected() {
            info!(timeout_ms, "channel not connected, opening diagnostic connection");
            let opened = tokio::time::timeout(
                timeout,
                self.connect_bounded(None, ConnectParams::new(), timeout),
            )
            .await
            .unwrap_or_else(|_| Err(ConnectionError::timeout(timeout_ms, "diagnostic connect")));
            match opened {
                Ok(()) => {}
                // A newer connect or disconnect owns the channel now.
                Err(ConnectionError::Cancelled) => return Err(ConnectionError::Cancelled),
                Err(e) => {
                    warn!(error = %e, "diagnostic connection failed, tearing it down");
                    self.disconnect().await;
                    return Err(e);
                }
            }
        }

        let mut events = self.subscribe();
        self.emit(
            EVENT_CONNECTION_CHECK,
            json!({
                "timestamp": chrono::Utc::now().timestamp_millis(),
                "message": "Connection test",
            }),
        )
        .await?;

        let reply = async {
            loop {
                match events.recv().await {
                    Ok(event) if event.server_event_name() == Some(EVENT_CONNECTION_CHECK_RESPONSE) => {
                        return Ok(true);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "round trip observer lagged");
                    }
                    Err(RecvError::Closed) => return Err(ConnectionError::NotConnected),
                }
            }
        };

        let result = tokio::time::timeout(timeout, reply)
            .await
            .map_err(|_| ConnectionError::timeout(timeout_ms, EVENT_CONNECTION_CHECK_RESPONSE))?;
        match &result {
            Ok(_) => info!("round trip test passed"),
            Err(e) => warn!(error = %e, "round trip test failed"),
        }
        result
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.driver.get_mut().as_ref() {
            handle.cancel.cancel();
        }
    }
}

#[async_trait]
impl ChannelControl for ConnectionManager {
    async fn open(&self, token: &str) -> Result<(), ConnectionError> {
        self.connect(Some(token), ConnectParams::new()).await
    }

    async fn close(&self) {
        self.disconnect().await;
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ─── Driver ──────────────────────────────────────────────────────────────────

enum Exit {
    Cancelled,
    Lost(ConnectionError),
}

enum Step {
    Outbound(Option<Outbound>),
    Inbound(Result<Result<Packet, ConnectionError>, tokio::time::error::Elapsed>),
}

/// Task owning one generation of the channel.
struct Driver {
    inner: Arc<Inner>,
    generation: u64,
    request: ConnectRequest,
    handshake_timeout: Duration,
    cancel: CancellationToken,
    outbound_rx: mpsc::Receiver<Outbound>,
    ready: Option<oneshot::Sender<Result<(), ConnectionError>>>,
    last_error: Option<ConnectionError>,
}

impl Driver {
    async fn run(mut self) {
        let max_attempts = self.inner.config.reconnection_attempts;
        let delay = self.inner.config.reconnection_delay;
        let mut attempt: u32 = 0;

        loop {
            let transport = Arc::clone(&self.inner.transport);
            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return,
                r = tokio::time::timeout(self.handshake_timeout, transport.connect(&self.request)) => r,
            };

            let keep_going = match outcome {
                Ok(Ok(channel)) => {
                    attempt = 0;
                    self.run_established(channel).await
                }
                Ok(Err(e)) => self.connect_failed(e),
                Err(_) => self.connect_failed(ConnectionError::timeout(
                    millis(self.handshake_timeout),
                    "socket.io handshake",
                )),
            };
            if !keep_going {
                return;
            }

            // Reconnecting from here on.
            attempt += 1;
            if attempt > max_attempts {
                self.give_up(attempt - 1);
                return;
            }
            if !self
                .inner
                .update(self.generation, |s| s.reconnect_attempt = attempt)
            {
                return;
            }
            info!(
                generation = self.generation,
                attempt,
                max_attempts,
                delay_ms = millis(delay),
                "scheduling reconnection"
            );
            self.inner.publish(ConnectionEvent::ReconnectAttempt {
                attempt,
                max_attempts,
            });

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn resolve(&mut self, result: Result<(), ConnectionError>) {
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(result);
        }
    }

    /// Returns `true` when a retry should be scheduled.
    fn connect_failed(&mut self, error: ConnectionError) -> bool {
        warn!(
            generation = self.generation,
            kind = %error.kind(),
            error = %error,
            "connect attempt failed"
        );
        self.inner.publish(ConnectionEvent::Error {
            kind: error.kind(),
            message: error.to_string(),
        });
        self.last_error = Some(error.clone());

        if error.is_retryable() {
            let recorded = error.clone();
            return self
                .inner
                .apply(self.generation, Trigger::TransientFailure, move |s| {
                    s.last_error = Some(recorded);
                });
        }

        let recorded = error.clone();
        if self
            .inner
            .apply(self.generation, Trigger::Rejected, move |s| {
                s.last_error = Some(recorded);
            })
        {
            error!(generation = self.generation, error = %error, "connection rejected");
            self.resolve(Err(error));
        }
        false
    }

    fn give_up(&mut self, attempts: u32) {
        let error = self
            .last_error
            .clone()
            .unwrap_or_else(|| ConnectionError::transport("reconnection attempts exhausted"));
        if self
            .inner
            .apply(self.generation, Trigger::RetriesExhausted, |_| {})
        {
            error!(generation = self.generation, attempts, error = %error, "reconnection failed");
            self.inner
                .publish(ConnectionEvent::ReconnectFailed { attempts });
            self.resolve(Err(error));
        }
    }

    /// Returns `true` when the channel was lost and a retry should follow.
    async fn run_established(&mut self, mut channel: Box<dyn Channel>) -> bool {
        let socket_id = channel.socket_id().to_string();
        let recorded = socket_id.clone();
        if !self
            .inner
            .apply(self.generation, Trigger::HandshakeSucceeded, move |s| {
                s.socket_id = Some(recorded);
                s.reconnect_attempt = 0;
                s.last_error = None;
            })
        {
            channel.close().await;
            return false;
        }
        self.last_error = None;
        self.inner.publish(ConnectionEvent::Connected {
            socket_id: socket_id.clone(),
        });
        self.resolve(Ok(()));

        let reason = match self.pump(channel.as_mut()).await {
            Exit::Cancelled => {
                channel.close().await;
                return false;
            }
            Exit::Lost(reason) => reason,
        };
        channel.close().await;
        self.drain_outbound();

        warn!(generation = self.generation, socket_id = %socket_id, error = %reason, "channel lost");
        self.inner.publish(ConnectionEvent::Disconnected {
            reason: reason.to_string(),
        });
        self.last_error = Some(reason.clone());
        self.inner
            .apply(self.generation, Trigger::TransportLost, move |s| {
                s.socket_id = None;
                s.last_error = Some(reason);
            })
    }

    async fn pump(&mut self, channel: &mut dyn Channel) -> Exit {
        let window = channel.liveness_window();
        let mut deadline = Instant::now() + window;

        loop {
            let step = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Exit::Cancelled,
                out = self.outbound_rx.recv() => Step::Outbound(out),
                received = tokio::time::timeout_at(deadline, channel.recv()) => Step::Inbound(received),
            };

            match step {
                Step::Outbound(None) => return Exit::Cancelled,
                Step::Outbound(Some(out)) => {
                    debug!(event = %out.name, "emitting");
                    let result = channel.send(Packet::event(out.name, out.data)).await;
                    let _ = out.reply.send(result.clone());
                    if let Err(e) = result {
                        return Exit::Lost(e);
                    }
                }
                Step::Inbound(Err(_)) => {
                    return Exit::Lost(ConnectionError::timeout(
                        millis(window),
                        "server heartbeat",
                    ));
                }
                Step::Inbound(Ok(Err(e))) if e.kind() == autocally_core::ErrorKind::Protocol => {
                    warn!(error = %e, "discarding malformed frame");
                    self.inner.publish(ConnectionEvent::Error {
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
                Step::Inbound(Ok(Err(e))) => return Exit::Lost(e),
                Step::Inbound(Ok(Ok(packet))) => {
                    deadline = Instant::now() + window;
                    match packet {
                        Packet::Ping => {
                            if let Err(e) = channel.send(Packet::Pong).await {
                                return Exit::Lost(e);
                            }
                        }
                        Packet::Close => {
                            return Exit::Lost(ConnectionError::transport(
                                "server closed the engine session",
                            ));
                        }
                        Packet::Disconnect => {
                            return Exit::Lost(ConnectionError::transport(
                                "server disconnected the socket",
                            ));
                        }
                        Packet::Event { name, data } => {
                            debug!(event = %name, "server event");
                            self.inner.publish(ConnectionEvent::Server { name, data });
                        }
                        Packet::ConnectError { message } => {
                            warn!(%message, "connect error on established channel");
                            self.inner.publish(ConnectionEvent::Error {
                                kind: autocally_core::ErrorKind::Auth,
                                message,
                            });
                        }
                        Packet::Open(_) | Packet::Connect { .. } | Packet::Pong | Packet::Noop => {}
                    }
                }
            }
        }
    }

    /// Fail emits queued while the channel was going down.
    fn drain_outbound(&mut self) {
        while let Ok(out) = self.outbound_rx.try_recv() {
            let _ = out.reply.send(Err(ConnectionError::NotConnected));
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
