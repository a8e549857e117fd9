//! Shared HTTP client.
//!
//! Every call builds `<origin>/api<path>`, attaches `Authorization: Bearer`
//! from the [`TokenSource`] at send time, and maps non-2xx responses onto
//! [`ApiError`]. Nothing is retried or cached.

use std::sync::Arc;
use std::time::Duration;

use autocally_core::TokenSource;
use autocally_core::constants::API_PREFIX;
use autocally_settings::BackendSettings;
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::errors::{ApiError, Result};

/// Client for the backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base", &self.base).finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build from backend settings.
    pub fn new(settings: &BackendSettings, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let origin = settings.origin();
        let base = format!("{origin}{API_PREFIX}");
        let _ = Url::parse(&base).map_err(|e| ApiError::Url(format!("{base}: {e}")))?;

        if settings.accept_invalid_certs {
            warn!(%origin, "TLS certificate validation disabled for backend calls");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .user_agent(concat!("autocally-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, base, tokens })
    }

    /// `<origin>/api`.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Absolute URL for `path` (which starts with `/`).
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{path}", self.base);
        Url::parse(&raw).map_err(|e| ApiError::Url(format!("{raw}: {e}")))
    }

    /// Request with the current bearer token attached.
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        debug!(%method, path, "backend request");
        let builder = self.http.request(method, url);
        Ok(match self.tokens.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Send and fail on non-2xx.
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), url = %url, "backend call failed");
        Err(ApiError::from_status(status.as_u16(), body))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(self.request(Method::GET, path)?).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(self.request(Method::DELETE, path)?).await
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::POST, path)?.json(body)).await
    }

    pub(crate) async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::PUT, path)?.json(body)).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
