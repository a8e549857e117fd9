//! Navigation guard.

use serde::Serialize;
use tracing::debug;

use crate::table::{RouteTable, normalize};

/// Where unauthenticated navigations are sent.
pub const LOGIN_PATH: &str = "/login";
/// Where authenticated visits to the login page are sent.
pub const HOME_PATH: &str = "/";

/// One navigation attempt, evaluated once and discarded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationIntent {
    /// Normalized target path.
    pub target_path: String,
    /// Target route requires a session.
    pub requires_auth: bool,
    /// Target route is public.
    pub is_public: bool,
}

/// Guard outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "to", rename_all = "snake_case")]
pub enum Decision {
    /// Proceed to the requested path.
    Allow,
    /// Navigate here instead.
    Redirect(String),
}

/// Decide a navigation. Pure; performs no I/O.
pub fn evaluate(intent: &NavigationIntent, authenticated: bool) -> Decision {
    if intent.requires_auth && !authenticated {
        Decision::Redirect(LOGIN_PATH.to_string())
    } else if intent.target_path == LOGIN_PATH && authenticated {
        Decision::Redirect(HOME_PATH.to_string())
    } else {
        Decision::Allow
    }
}

/// Route table plus guard.
#[derive(Clone, Debug, Default)]
pub struct Router {
    table: RouteTable,
}

impl Router {
    /// Router over a custom table.
    pub fn new(table: RouteTable) -> Self {
        Self { table }
    }

    /// The route table.
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Build the intent for `path`. Unknown paths carry no requirements.
    pub fn intent(&self, path: &str) -> NavigationIntent {
        let target_path = normalize(path);
        match self.table.resolve(&target_path) {
            Some(m) => NavigationIntent {
                requires_auth: m.route.requires_auth,
                is_public: m.route.public,
                target_path,
            },
            None => NavigationIntent {
                target_path,
                requires_auth: false,
                is_public: false,
            },
        }
    }

    /// Resolve and evaluate a navigation to `path`.
    pub fn navigate(&self, path: &str, authenticated: bool) -> Decision {
        let intent = self.intent(path);
        let decision = evaluate(&intent, authenticated);
        debug!(
            target_path = %intent.target_path,
            requires_auth = intent.requires_auth,
            authenticated,
            ?decision,
            "navigation evaluated"
        );
        decision
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
