//! Connection diagnostics.
//!
//! [`AppContext::debug_connection`] walks the channel through a scripted
//! check and returns everything it saw: health before, backend reachability,
//! a fresh channel, a `connection_check` round trip, and health after.
//! Individual step failures are recorded in the report, not returned.

use autocally_api::HealthStatus;
use autocally_core::constants::{QUERY_CALL_ID, QUERY_PHONE_NUMBER_ID};
use autocally_realtime::{ConnectParams, HealthSnapshot};
use serde::Serialize;
use tracing::{info, warn};

use crate::context::AppContext;

/// Outcome of one diagnostic step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome<T> {
    /// The step succeeded.
    Ok(T),
    /// The step failed with this message.
    Failed(String),
    /// The step was not applicable.
    Skipped,
}

impl<T> StepOutcome<T> {
    /// Whether the step succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// Everything [`AppContext::debug_connection`] observed.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    /// Health before any action.
    pub initial_health: HealthSnapshot,
    /// `GET /api/security/health`.
    pub backend_health: StepOutcome<HealthStatus>,
    /// Fresh authenticated channel, skipped without a session.
    pub reconnect: StepOutcome<()>,
    /// `connection_check` round trip.
    pub round_trip: StepOutcome<bool>,
    /// Health after the checks.
    pub final_health: HealthSnapshot,
}

impl ConnectionReport {
    /// The channel answered a round trip.
    pub fn passed(&self) -> bool {
        matches!(self.round_trip, StepOutcome::Ok(true))
    }
}

impl AppContext {
    /// Diagnose the real-time channel end to end.
    pub async fn debug_connection(&self) -> ConnectionReport {
        let connection = self.connection();
        let initial_health = connection.health_check();
        info!(state = %initial_health.state, "connection diagnostics started");

        let backend_health = StepOutcome::from_result(self.api().security().health().await);
        if let StepOutcome::Failed(reason) = &backend_health {
            warn!(%reason, "backend health probe failed");
        }

        // Tear down and reopen with the same credentials and scope.
        let reconnect = match self.session().token() {
            Some(token) => {
                let params = params_from_query(&initial_health);
                StepOutcome::from_result(connection.connect(Some(&token), params).await)
            }
            None => {
                connection.disconnect().await;
                StepOutcome::Skipped
            }
        };

        // Without a session this opens the diagnostic, unauthenticated channel.
        let round_trip = StepOutcome::from_result(connection.round_trip_test(None).await);
        let final_health = connection.health_check();

        let report = ConnectionReport {
            initial_health,
            backend_health,
            reconnect,
            round_trip,
            final_health,
        };
        info!(
            passed = report.passed(),
            state = %report.final_health.state,
            "connection diagnostics finished"
        );
        report
    }
}

fn params_from_query(health: &HealthSnapshot) -> ConnectParams {
    let mut params = ConnectParams::new();
    if let Some(id) = health.query.get(QUERY_CALL_ID) {
        params = params.with_call_id(id);
    }
    if let Some(id) = health.query.get(QUERY_PHONE_NUMBER_ID) {
        params = params.with_phone_number_id(id);
    }
    params
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::tests::context_for;
    use autocally_realtime::ConnectionState;
    use autocally_session::MemoryStore;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn healthy_backend() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/security/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "message": "Backend service is running"
            })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn authenticated_diagnostics_reconnect_with_same_scope() {
        let server = healthy_backend().await;
        let storage = Arc::new(MemoryStore::with_entries(&[("token", "tok"), ("username", "ada")]));
        let (ctx, transport) = context_for(&server, storage, false);
        let _ = ctx.bootstrap().await.unwrap();
        ctx.connect_call(Some(31), None::<u32>).await.unwrap();
        let generation_before = ctx.connection().health_check().generation;

        let report = ctx.debug_connection().await;

        assert!(report.passed());
        assert_eq!(report.initial_health.state, ConnectionState::Connected);
        assert!(report.backend_health.is_ok());
        assert_eq!(report.reconnect, StepOutcome::Ok(()));
        assert!(report.final_health.connected);
        assert!(report.final_health.generation > generation_before);

        let requests = transport.requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].auth_header.as_deref(), Some("Bearer tok"));
        assert!(requests[1].url.query().unwrap_or_default().contains("call_id=31"));
    }

    #[tokio::test]
    async fn anonymous_diagnostics_use_unauthenticated_channel() {
        let server = healthy_backend().await;
        let (ctx, transport) = context_for(&server, Arc::new(MemoryStore::new()), false);

        let report = ctx.debug_connection().await;

        assert!(report.passed());
        assert_eq!(report.reconnect, StepOutcome::Skipped);
        assert_eq!(report.initial_health.state, ConnectionState::Disconnected);
        assert!(!report.final_health.auth_configured);
        assert!(transport.requests.lock()[0].auth_header.is_none());
    }

    #[tokio::test]
    async fn unreachable_backend_is_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/security/health"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let (ctx, _transport) = context_for(&server, Arc::new(MemoryStore::new()), false);

        let report = ctx.debug_connection().await;

        assert!(matches!(&report.backend_health, StepOutcome::Failed(m) if m.contains("502")));
        assert!(report.passed());
    }

    #[test]
    fn report_serializes_camel_case() {
        let outcome: StepOutcome<bool> = StepOutcome::Failed("timed out".into());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, json!({"result": "failed", "detail": "timed out"}));
    }
}
