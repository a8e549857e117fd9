//! The application context.
//!
//! [`AppContext`] owns every long-lived component and is passed explicitly
//! to whatever needs it. The session store and the API client share the
//! same view of the token through the [`TokenSource`] seam; the session
//! store drives the connection manager through [`ChannelControl`].

use std::fmt::Display;
use std::sync::Arc;

use autocally_api::ApiClient;
use autocally_core::{ChannelControl, ErrorKind, TokenSource};
use autocally_realtime::{ConnectParams, ConnectionManager, RealtimeConfig, Transport, WebSocketTransport};
use autocally_router::{Decision, Router};
use autocally_session::{FileStore, KeyValueStore, Session, SessionStore};
use autocally_settings::ClientSettings;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{ClientError, Result};

/// What [`AppContext::bootstrap`] did with persisted credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RestoreOutcome {
    /// Nothing persisted.
    Anonymous,
    /// Credentials loaded; the channel waits for an explicit connect.
    Restored,
    /// Token accepted by the backend and the channel opened.
    Validated,
    /// Backend rejected the token; the session was cleared.
    Rejected,
    /// Token could not be checked; the session was kept, the channel not opened.
    Unverified {
        /// Why validation failed.
        reason: String,
    },
}

/// Everything the client needs, wired together.
pub struct AppContext {
    settings: ClientSettings,
    storage: Arc<dyn KeyValueStore>,
    connection: Arc<ConnectionManager>,
    session: Arc<SessionStore>,
    api: ApiClient,
    router: Router,
}

impl AppContext {
    /// Production wiring: file storage and the WebSocket transport.
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let storage: Arc<dyn KeyValueStore> =
            Arc::new(FileStore::new(settings.storage.resolved_path()));
        Self::with_parts(settings, storage, Arc::new(WebSocketTransport::new()))
    }

    /// Load settings from disk and environment, install logging, then wire.
    pub fn load() -> Result<Self> {
        let settings = autocally_settings::load_settings()?;
        autocally_core::logging::init_subscriber(&settings.logging.level);
        Self::new(settings)
    }

    /// Wire over caller-supplied storage and transport.
    pub fn with_parts(
        settings: ClientSettings,
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let connection = Arc::new(ConnectionManager::new(
            RealtimeConfig::from_settings(&settings),
            transport,
        ));
        let channel: Arc<dyn ChannelControl> = connection.clone();
        let session = Arc::new(SessionStore::new(Arc::clone(&storage), channel));
        let tokens: Arc<dyn TokenSource> = session.clone();
        let api = ApiClient::new(&settings.backend, tokens)?;

        info!(backend = %api.base_url(), "client context ready");
        Ok(Self {
            settings,
            storage,
            connection,
            session,
            api,
            router: Router::default(),
        })
    }

    /// Loaded settings.
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Durable key-value storage.
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    /// The session store.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// The real-time connection manager.
    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Backend call wrappers.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Route table and guard.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Restore persisted credentials.
    ///
    /// With `realtime.reconnectOnRestore` enabled, a restored token is first
    /// checked against an authenticated endpoint: a 401 (or a channel that
    /// rejects the token) logs out, success opens the channel, anything else
    /// keeps the session offline.
    pub async fn bootstrap(&self) -> Result<RestoreOutcome> {
        let session = self.session.restore()?;
        let Some(token) = session.token().map(str::to_string) else {
            return Ok(RestoreOutcome::Anonymous);
        };
        if !self.settings.realtime.reconnect_on_restore {
            return Ok(RestoreOutcome::Restored);
        }

        match self.api.assistants().list().await {
            Ok(_) => {
                info!("restored token accepted, opening channel");
                match self.open_channel(&token, ConnectParams::new()).await {
                    Ok(()) => Ok(RestoreOutcome::Validated),
                    Err(ClientError::Connection(e)) if e.kind() == ErrorKind::Auth => {
                        Ok(RestoreOutcome::Rejected)
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) if e.is_unauthorized() => {
                warn!("restored token rejected, clearing session");
                self.session.logout().await?;
                Ok(RestoreOutcome::Rejected)
            }
            Err(e) => {
                warn!(error = %e, "could not validate restored token");
                Ok(RestoreOutcome::Unverified {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Log in against the backend, commit the session and open the channel.
    ///
    /// If the channel rejects the new token the session is cleared again.
    pub async fn login(&self, username_or_email: &str, password: &str) -> Result<Session> {
        let login = self.api.security().login(username_or_email, password).await?;
        self.session.login(&login.token, &login.user).await?;
        Ok(self.session.session())
    }

    /// Revoke the token server-side (best effort), then clear the session
    /// and tear the channel down.
    pub async fn logout(&self) -> Result<()> {
        if self.session.is_authenticated() {
            if let Err(e) = self.api.security().logout().await {
                warn!(error = %e, "server-side logout failed, clearing local session anyway");
            }
        }
        self.session.logout().await?;
        Ok(())
    }

    /// Reopen the channel scoped to a call and/or phone number.
    pub async fn connect_call(
        &self,
        call_id: Option<impl Display>,
        phone_number_id: Option<impl Display>,
    ) -> Result<()> {
        let token = self.session.token().ok_or(ClientError::NotAuthenticated)?;
        let mut params = ConnectParams::new();
        if let Some(id) = call_id {
            params = params.with_call_id(id);
        }
        if let Some(id) = phone_number_id {
            params = params.with_phone_number_id(id);
        }
        self.open_channel(&token, params).await
    }

    /// Connect with `token`; an auth rejection ends the session so the
    /// guard sends the user back to login.
    async fn open_channel(&self, token: &str, params: ConnectParams) -> Result<()> {
        match self.connection.connect(Some(token), params).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::Auth => {
                warn!(error = %e, "channel rejected the token, clearing session");
                self.session.invalidate(token).await?;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Evaluate a navigation against the current session.
    pub fn navigate(&self, path: &str) -> Decision {
        self.router.navigate(path, self.session.is_authenticated())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
