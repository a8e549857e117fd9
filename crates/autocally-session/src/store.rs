//! The session store.
//!
//! Holds `{token, username, authenticated}` with `authenticated` always equal
//! to `token.is_some()`. Storage is written before memory is touched, so a
//! failed write leaves the previous session fully intact.

use std::sync::Arc;

use autocally_core::constants::{STORAGE_KEY_TOKEN, STORAGE_KEY_USERNAME};
use autocally_core::{ChannelControl, ConnectionError, ErrorKind, TokenSource};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::errors::SessionError;
use crate::storage::KeyValueStore;

/// Snapshot of the current session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    token: Option<String>,
    username: Option<String>,
    authenticated: bool,
}

impl Session {
    /// No user.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build from stored values; `authenticated` follows the token.
    pub fn from_parts(token: Option<String>, username: Option<String>) -> Self {
        let authenticated = token.is_some();
        Self {
            token,
            username,
            authenticated,
        }
    }

    /// Bearer token, if logged in.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Display name of the logged-in user.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Whether a token is present.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Owns the session and couples it to storage and the real-time channel.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    channel: Arc<dyn ChannelControl>,
    state: RwLock<Session>,
    /// Serialises the storage and memory steps of login/logout. Never held
    /// while a handshake is awaited.
    op_lock: tokio::sync::Mutex<()>,
}

impl SessionStore {
    /// Create an anonymous store. Call [`restore`](Self::restore) to load
    /// persisted credentials.
    pub fn new(storage: Arc<dyn KeyValueStore>, channel: Arc<dyn ChannelControl>) -> Self {
        Self {
            storage,
            channel,
            state: RwLock::new(Session::anonymous()),
            op_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Load persisted credentials. Does not touch the real-time channel.
    pub fn restore(&self) -> Result<Session, SessionError> {
        let token = self.storage.get(STORAGE_KEY_TOKEN)?;
        let username = self.storage.get(STORAGE_KEY_USERNAME)?;
        let session = Session::from_parts(token, username);

        info!(
            authenticated = session.is_authenticated(),
            username = session.username().unwrap_or(""),
            "session restored"
        );
        *self.state.write() = session.clone();
        Ok(session)
    }

    /// Persist and commit new credentials, then open a fresh channel.
    ///
    /// On [`SessionError::Channel`] the session is already committed. It
    /// stays logged in through transient failures; an `Auth` rejection
    /// clears it again. A `logout` issued while the handshake is still
    /// running completes at once and this call resolves with
    /// `Channel(Cancelled)`.
    #[instrument(skip(self, token))]
    pub async fn login(&self, token: &str, username: &str) -> Result<(), SessionError> {
        {
            let _op = self.op_lock.lock().await;
            self.storage.set_many(&[
                (STORAGE_KEY_TOKEN, token),
                (STORAGE_KEY_USERNAME, username),
            ])?;
            *self.state.write() =
                Session::from_parts(Some(token.to_string()), Some(username.to_string()));
            info!("session committed");
        }

        match self.channel.open(token).await {
            // The handshake finished after a logout or another login took
            // over; the channel no longer matches the session.
            Ok(()) if !self.holds_token(token) => {
                warn!("session changed during handshake, closing stale channel");
                self.channel.close().await;
                Err(SessionError::Channel(ConnectionError::Cancelled))
            }
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::Auth => {
                warn!(error = %e, "real-time channel rejected the token, clearing session");
                self.invalidate(token).await?;
                Err(SessionError::Channel(e))
            }
            Err(e) => {
                warn!(error = %e, kind = %e.kind(), "logged in but real-time channel failed");
                Err(SessionError::Channel(e))
            }
        }
    }

    /// Clear persisted and in-memory credentials, then tear down the channel.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), SessionError> {
        let _op = self.op_lock.lock().await;
        self.clear().await
    }

    /// Log out because `token` was rejected, unless a newer login already
    /// replaced it.
    #[instrument(skip_all)]
    pub async fn invalidate(&self, token: &str) -> Result<(), SessionError> {
        let _op = self.op_lock.lock().await;
        if !self.holds_token(token) {
            return Ok(());
        }
        self.clear().await
    }

    /// Caller holds `op_lock`.
    async fn clear(&self) -> Result<(), SessionError> {
        self.storage
            .remove_many(&[STORAGE_KEY_TOKEN, STORAGE_KEY_USERNAME])?;
        *self.state.write() = Session::anonymous();
        info!("session cleared");

        self.channel.close().await;
        Ok(())
    }

    fn holds_token(&self, token: &str) -> bool {
        self.state.read().token.as_deref() == Some(token)
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.state.read().clone()
    }

    /// Current bearer token.
    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    /// Current username.
    pub fn username(&self) -> Option<String> {
        self.state.read().username.clone()
    }

    /// Whether a user is logged in.
    pub fn is_authenticated(&self) -> bool {
        self.state.read().authenticated
    }
}

impl TokenSource for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.token()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageError;
    use crate::storage::{FileStore, MemoryStore};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::Notify;
    use proptest::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum ChannelCall {
        Open(String),
        Close,
    }

    #[derive(Default)]
    struct RecordingChannel {
        calls: Mutex<Vec<ChannelCall>>,
        fail_with: Mutex<Option<ConnectionError>>,
    }

    impl RecordingChannel {
        fn calls(&self) -> Vec<ChannelCall> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ChannelControl for RecordingChannel {
        async fn open(&self, token: &str) -> Result<(), ConnectionError> {
            self.calls.lock().push(ChannelCall::Open(token.to_string()));
            match self.fail_with.lock().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        async fn close(&self) {
            self.calls.lock().push(ChannelCall::Close);
        }
    }

    /// Holds `open` until `close` (resolving `Cancelled`) or, with
    /// `succeed`, until released.
    #[derive(Default)]
    struct GatedChannel {
        calls: Mutex<Vec<ChannelCall>>,
        opened: Notify,
        closed: Notify,
        release: Notify,
        succeed: bool,
    }

    #[async_trait]
    impl ChannelControl for GatedChannel {
        async fn open(&self, token: &str) -> Result<(), ConnectionError> {
            let closed = self.closed.notified();
            self.calls.lock().push(ChannelCall::Open(token.to_string()));
            self.opened.notify_one();
            if self.succeed {
                self.release.notified().await;
                Ok(())
            } else {
                closed.await;
                Err(ConnectionError::Cancelled)
            }
        }

        async fn close(&self) {
            self.calls.lock().push(ChannelCall::Close);
            self.closed.notify_waiters();
        }
    }

    /// Reads succeed, writes fail.
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set_many(&self, _: &[(&str, &str)]) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn remove_many(&self, _: &[&str]) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    fn make_store() -> (SessionStore, Arc<MemoryStore>, Arc<RecordingChannel>) {
        let storage = Arc::new(MemoryStore::new());
        let channel = Arc::new(RecordingChannel::default());
        let store = SessionStore::new(storage.clone(), channel.clone());
        (store, storage, channel)
    }

    // ── restore ─────────────────────────────────────────────────────

    #[test]
    fn restore_with_token() {
        let storage = Arc::new(MemoryStore::with_entries(&[
            ("token", "t1"),
            ("username", "alex"),
        ]));
        let channel = Arc::new(RecordingChannel::default());
        let store = SessionStore::new(storage, channel.clone());

        let session = store.restore().unwrap();
        assert!(session.is_authenticated());
        assert_eq!(store.token().as_deref(), Some("t1"));
        assert_eq!(store.username().as_deref(), Some("alex"));
        assert!(channel.calls().is_empty());
    }

    #[test]
    fn restore_without_token_is_anonymous() {
        let storage = Arc::new(MemoryStore::with_entries(&[("username", "alex")]));
        let store = SessionStore::new(storage, Arc::new(RecordingChannel::default()));

        let session = store.restore().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.username(), Some("alex"));
    }

    #[test]
    fn restore_from_empty_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(FileStore::new(dir.path().join("storage.json")));
        let store = SessionStore::new(storage, Arc::new(RecordingChannel::default()));
        assert_eq!(store.restore().unwrap(), Session::anonymous());
    }

    // ── login ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn login_persists_commits_and_opens_channel() {
        let (store, storage, channel) = make_store();
        store.login("t1", "alex").await.unwrap();

        assert!(store.is_authenticated());
        assert_eq!(storage.get("token").unwrap().as_deref(), Some("t1"));
        assert_eq!(storage.get("username").unwrap().as_deref(), Some("alex"));
        assert_eq!(channel.calls(), vec![ChannelCall::Open("t1".into())]);
    }

    #[tokio::test]
    async fn second_login_opens_with_new_token() {
        let (store, _storage, channel) = make_store();
        store.login("t1", "alex").await.unwrap();
        store.login("t2", "sam").await.unwrap();

        assert_eq!(store.token().as_deref(), Some("t2"));
        assert_eq!(
            channel.calls(),
            vec![ChannelCall::Open("t1".into()), ChannelCall::Open("t2".into())]
        );
    }

    #[tokio::test]
    async fn login_storage_failure_leaves_state_untouched() {
        let channel = Arc::new(RecordingChannel::default());
        let store = SessionStore::new(Arc::new(ReadOnlyStore(MemoryStore::new())), channel.clone());

        let err = store.login("t1", "alex").await.unwrap_err();
        assert_matches!(err, SessionError::Storage(_));
        assert!(!store.is_authenticated());
        assert!(channel.calls().is_empty());
    }

    #[tokio::test]
    async fn login_channel_failure_keeps_session() {
        let (store, _storage, channel) = make_store();
        *channel.fail_with.lock() = Some(ConnectionError::transport("refused"));

        let err = store.login("t1", "alex").await.unwrap_err();
        assert_matches!(err, SessionError::Channel(ConnectionError::Transport { .. }));
        assert!(store.is_authenticated());
        assert_eq!(store.bearer_token().as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn login_auth_rejection_clears_session() {
        let (store, storage, channel) = make_store();
        *channel.fail_with.lock() = Some(ConnectionError::auth("Invalid token"));

        let err = store.login("expired", "alex").await.unwrap_err();
        assert_matches!(err, SessionError::Channel(ConnectionError::Auth { .. }));
        assert_eq!(store.session(), Session::anonymous());
        assert!(storage.get("token").unwrap().is_none());
        assert_eq!(
            channel.calls(),
            vec![ChannelCall::Open("expired".into()), ChannelCall::Close]
        );
    }

    #[tokio::test]
    async fn login_timeout_keeps_session() {
        let (store, _storage, channel) = make_store();
        *channel.fail_with.lock() = Some(ConnectionError::timeout(20_000, "socket.io handshake"));

        assert_matches!(
            store.login("t1", "alex").await,
            Err(SessionError::Channel(ConnectionError::Timeout { .. }))
        );
        assert!(store.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn logout_interrupts_pending_handshake() {
        let channel = Arc::new(GatedChannel::default());
        let storage = Arc::new(MemoryStore::new());
        let store = Arc::new(SessionStore::new(storage.clone(), channel.clone()));

        let login = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.login("t1", "alex").await })
        };
        channel.opened.notified().await;
        assert!(store.is_authenticated());

        let start = tokio::time::Instant::now();
        tokio::time::timeout(std::time::Duration::from_secs(1), store.logout())
            .await
            .expect("logout waited on the handshake")
            .unwrap();
        assert_eq!(start.elapsed(), std::time::Duration::ZERO);

        assert_matches!(
            login.await.unwrap(),
            Err(SessionError::Channel(ConnectionError::Cancelled))
        );
        assert_eq!(store.session(), Session::anonymous());
        assert!(storage.get("token").unwrap().is_none());
    }

    #[tokio::test]
    async fn handshake_finishing_after_logout_is_closed() {
        let channel = Arc::new(GatedChannel {
            succeed: true,
            ..GatedChannel::default()
        });
        let store = Arc::new(SessionStore::new(Arc::new(MemoryStore::new()), channel.clone()));

        let login = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.login("t1", "alex").await })
        };
        channel.opened.notified().await;
        store.logout().await.unwrap();
        channel.release.notify_one();

        assert_matches!(
            login.await.unwrap(),
            Err(SessionError::Channel(ConnectionError::Cancelled))
        );
        assert!(!store.is_authenticated());
        assert_eq!(
            channel.calls.lock().clone(),
            vec![
                ChannelCall::Open("t1".into()),
                ChannelCall::Close,
                ChannelCall::Close,
            ]
        );
    }

    // ── logout ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn logout_clears_everything_and_closes_channel() {
        let (store, storage, channel) = make_store();
        store.login("t1", "alex").await.unwrap();
        store.logout().await.unwrap();

        assert_eq!(store.session(), Session::anonymous());
        assert!(storage.get("token").unwrap().is_none());
        assert!(storage.get("username").unwrap().is_none());
        assert_eq!(channel.calls().last(), Some(&ChannelCall::Close));
    }

    #[tokio::test]
    async fn logout_when_anonymous_is_harmless() {
        let (store, _storage, channel) = make_store();
        store.logout().await.unwrap();
        assert!(!store.is_authenticated());
        assert_eq!(channel.calls(), vec![ChannelCall::Close]);
    }

    #[tokio::test]
    async fn logout_storage_failure_keeps_session() {
        let storage = Arc::new(ReadOnlyStore(MemoryStore::with_entries(&[
            ("token", "t1"),
            ("username", "alex"),
        ])));
        let channel = Arc::new(RecordingChannel::default());
        let store = SessionStore::new(storage, channel.clone());
        let _ = store.restore().unwrap();

        assert_matches!(store.logout().await, Err(SessionError::Storage(_)));
        assert!(store.is_authenticated());
        assert!(channel.calls().is_empty());
    }

    #[tokio::test]
    async fn session_survives_restart_through_file_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("storage.json");

        let first = SessionStore::new(
            Arc::new(FileStore::new(&path)),
            Arc::new(RecordingChannel::default()),
        );
        first.login("persisted", "alex").await.unwrap();

        let second = SessionStore::new(
            Arc::new(FileStore::new(&path)),
            Arc::new(RecordingChannel::default()),
        );
        let session = second.restore().unwrap();
        assert_eq!(session.token(), Some("persisted"));
        assert_eq!(session.username(), Some("alex"));
    }

    // ── invariant ───────────────────────────────────────────────────

    #[derive(Clone, Debug)]
    enum Op {
        Login(String, String),
        Logout,
        Restore,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            ("[a-f0-9]{1,32}", "[a-z]{1,12}").prop_map(|(t, u)| Op::Login(t, u)),
            Just(Op::Logout),
            Just(Op::Restore),
        ]
    }

    proptest! {
        #[test]
        fn authenticated_tracks_token(ops in proptest::collection::vec(op_strategy(), 1..24)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (store, _storage, _channel) = make_store();

            for op in ops {
                match op {
                    Op::Login(t, u) => rt.block_on(store.login(&t, &u)).unwrap(),
                    Op::Logout => rt.block_on(store.logout()).unwrap(),
                    Op::Restore => { let _ = store.restore().unwrap(); }
                }
                let session = store.session();
                prop_assert_eq!(session.is_authenticated(), session.token().is_some());
                let bearer = store.bearer_token();
                prop_assert_eq!(bearer.as_deref(), session.token());
            }
        }
    }
}
