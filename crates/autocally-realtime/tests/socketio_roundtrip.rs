//! End-to-end checks of the WebSocket transport against a local Socket.IO
//! speaking server.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use autocally_core::ConnectionError;
use autocally_realtime::{
    ConnectParams, ConnectionEvent, ConnectionManager, ConnectionState, RealtimeConfig,
};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

const OPEN: &str = r#"0{"sid":"engine-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

#[derive(Clone, Copy)]
enum Mode {
    Accept,
    RejectUpgrade,
    RejectNamespace,
}

#[derive(Debug, Default)]
struct Seen {
    auth_header: Option<String>,
    query: Option<String>,
    frames: Vec<String>,
}

struct TestServer {
    origin: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

async fn spawn_server(mode: Mode) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    let seen: Arc<Mutex<Vec<Seen>>> = Arc::default();

    let log = Arc::clone(&seen);
    let _server = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let log = Arc::clone(&log);
            let _conn = tokio::spawn(async move { serve(stream, mode, log).await });
        }
    });

    TestServer { origin, seen }
}

async fn serve(stream: tokio::net::TcpStream, mode: Mode, log: Arc<Mutex<Vec<Seen>>>) {
    let index = {
        let mut log = log.lock();
        log.push(Seen::default());
        log.len() - 1
    };

    let record = Arc::clone(&log);
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        {
            let mut log = record.lock();
            let entry = &mut log[index];
            entry.auth_header = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            entry.query = req.uri().query().map(str::to_string);
        }
        if matches!(mode, Mode::RejectUpgrade) {
            let mut rejection = ErrorResponse::new(Some("invalid token".into()));
            *rejection.status_mut() = StatusCode::UNAUTHORIZED;
            return Err(rejection);
        }
        Ok(resp)
    };

    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        return;
    };
    if ws.send(Message::Text(OPEN.into())).await.is_err() {
        return;
    }

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let frame = text.as_str().to_string();
        log.lock()[index].frames.push(frame.clone());

        let replies: Vec<String> = match (frame.as_str(), mode) {
            ("40", Mode::RejectNamespace) => {
                vec![r#"44{"message":"Invalid token"}"#.into()]
            }
            ("40", _) => vec![
                r#"40{"sid":"sock-abc"}"#.into(),
                r#"42["connection_established",{"status":"connected"}]"#.into(),
            ],
            (f, _) if f.starts_with(r#"42["connection_check""#) => {
                vec![r#"42["connection_check_response",{"status":"ok"}]"#.into()]
            }
            ("41", _) => break,
            _ => vec![],
        };
        for reply in replies {
            if ws.send(Message::Text(reply.into())).await.is_err() {
                return;
            }
        }
    }
}

fn manager_for(server: &TestServer) -> ConnectionManager {
    ConnectionManager::with_websocket(RealtimeConfig {
        origin: server.origin.clone(),
        reconnection_delay: Duration::from_millis(50),
        ..RealtimeConfig::default()
    })
}

async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), fut)
        .await
        .expect("test timed out")
}

#[tokio::test]
async fn authenticated_channel_end_to_end() {
    let server = spawn_server(Mode::Accept).await;
    let manager = manager_for(&server);
    let mut events = manager.subscribe();

    within(manager.connect(Some("tok-1"), ConnectParams::new().with_call_id(12)))
        .await
        .unwrap();

    let health = manager.health_check();
    assert_eq!(health.state, ConnectionState::Connected);
    assert_eq!(health.socket_id.as_deref(), Some("sock-abc"));

    let greeting = within(async {
        loop {
            if let Some("connection_established") = events.recv().await.unwrap().server_event_name() {
                return;
            }
        }
    });
    greeting.await;

    assert!(within(manager.round_trip_test(None)).await.unwrap());

    {
        let seen = server.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].auth_header.as_deref(), Some("Bearer tok-1"));
        let query = seen[0].query.as_deref().unwrap();
        assert!(query.contains("EIO=4"));
        assert!(query.contains("transport=websocket"));
        assert!(query.contains("call_id=12"));
    }

    within(manager.disconnect()).await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    // Give the server a moment to read the disconnect frame.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(server.seen.lock()[0].frames.iter().any(|f| f == "41"));
}

#[tokio::test]
async fn rejected_upgrade_fails_without_retry() {
    let server = spawn_server(Mode::RejectUpgrade).await;
    let manager = manager_for(&server);

    let err = within(manager.connect(Some("expired"), ConnectParams::new()))
        .await
        .unwrap_err();

    assert_matches!(err, ConnectionError::Auth { .. });
    assert_eq!(manager.state(), ConnectionState::Failed);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.seen.lock().len(), 1);
}

#[tokio::test]
async fn namespace_rejection_is_auth_failure() {
    let server = spawn_server(Mode::RejectNamespace).await;
    let manager = manager_for(&server);
    let mut events = manager.subscribe();

    let err = within(manager.connect(Some("tok"), ConnectParams::new()))
        .await
        .unwrap_err();

    assert_eq!(err, ConnectionError::auth("Invalid token"));
    assert_eq!(manager.state(), ConnectionState::Failed);

    let mut saw_error = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, ConnectionEvent::Error { .. }) {
            saw_error = true;
        }
    }
    assert!(saw_error);
}

#[tokio::test]
async fn unreachable_backend_exhausts_retries() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let manager = ConnectionManager::with_websocket(RealtimeConfig {
        origin,
        reconnection_attempts: 2,
        reconnection_delay: Duration::from_millis(10),
        ..RealtimeConfig::default()
    });
    let mut events = manager.subscribe();

    let err = within(manager.connect(Some("tok"), ConnectParams::new()))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(manager.state(), ConnectionState::Failed);
    let mut exhausted = None;
    while let Ok(event) = events.try_recv() {
        if let ConnectionEvent::ReconnectFailed { attempts } = event {
            exhausted = Some(attempts);
        }
    }
    assert_eq!(exhausted, Some(2));
}
