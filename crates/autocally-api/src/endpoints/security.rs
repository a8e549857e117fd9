//! `/security`: accounts, tokens and liveness.

use serde_json::json;

use crate::client::ApiClient;
use crate::errors::Result;
use crate::types::{
    CreateUserRequest, CreateUserResponse, HealthStatus, LoginRequest, LoginResponse,
    MessageResponse,
};

/// Security endpoints.
#[derive(Clone, Copy, Debug)]
pub struct Security<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    /// Security endpoints.
    pub fn security(&self) -> Security<'_> {
        Security { client: self }
    }
}

impl Security<'_> {
    /// Exchange credentials for a bearer token.
    pub async fn login(&self, username_or_email: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            username: username_or_email.to_string(),
            password: password.to_string(),
        };
        self.client.post("/security/login", &body).await
    }

    /// Register a new account.
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<CreateUserResponse> {
        self.client.post("/security/create_user", request).await
    }

    /// Revoke the current token server-side.
    pub async fn logout(&self) -> Result<MessageResponse> {
        self.client.post("/security/logout", &json!({})).await
    }

    /// Unauthenticated service health.
    pub async fn health(&self) -> Result<HealthStatus> {
        self.client.get("/security/health").await
    }

    /// Liveness ping.
    pub async fn ping(&self) -> Result<MessageResponse> {
        self.client.get("/security/ping").await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
