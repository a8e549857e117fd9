//! Route table and path matching.
//!
//! Patterns are `/`-separated segments; a segment starting with `:` binds a
//! parameter. When several routes match, the one with a static segment at
//! the first position where they differ wins, so `/calls/new` beats
//! `/calls/:id` regardless of declaration order.

use std::collections::BTreeMap;

use serde::Serialize;

/// One navigable view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Route name.
    pub name: &'static str,
    /// Path pattern, e.g. `/knowledge-base/:id`.
    pub pattern: &'static str,
    /// Navigation requires an authenticated session.
    pub requires_auth: bool,
    /// Reachable without a session.
    pub public: bool,
}

impl Route {
    const fn protected(name: &'static str, pattern: &'static str) -> Self {
        Self {
            name,
            pattern,
            requires_auth: true,
            public: false,
        }
    }

    const fn public(name: &'static str, pattern: &'static str) -> Self {
        Self {
            name,
            pattern,
            requires_auth: false,
            public: true,
        }
    }

    const fn open(name: &'static str, pattern: &'static str) -> Self {
        Self {
            name,
            pattern,
            requires_auth: false,
            public: false,
        }
    }

    /// Match `path` against the pattern. Returns the bound parameters and
    /// the per-segment rank (`false` = static, `true` = parameter).
    fn match_path(&self, path: &[&str]) -> Option<(BTreeMap<String, String>, Vec<bool>)> {
        let pattern = segments(self.pattern);
        if pattern.len() != path.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        let mut rank = Vec::with_capacity(pattern.len());
        for (want, got) in pattern.iter().zip(path) {
            if let Some(name) = want.strip_prefix(':') {
                if got.is_empty() {
                    return None;
                }
                let _ = params.insert(name.to_string(), (*got).to_string());
                rank.push(true);
            } else if want == got {
                rank.push(false);
            } else {
                return None;
            }
        }
        Some((params, rank))
    }
}

/// A resolved navigation target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// The matched route.
    pub route: &'a Route,
    /// Bound `:param` values.
    pub params: BTreeMap<String, String>,
}

/// Static set of routes.
#[derive(Clone, Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl Default for RouteTable {
    /// The client's views.
    fn default() -> Self {
        Self::new(vec![
            Route::protected("home", "/"),
            Route::protected("assistant", "/assistant/:id"),
            Route::protected("phone-numbers", "/phone-numbers"),
            Route::public("login", "/login"),
            Route::protected("calls", "/calls"),
            Route::open("call-details", "/calls/:id"),
            Route::public("logout", "/logout"),
            Route::open("new-call", "/calls/new"),
            Route::protected("knowledge-base", "/knowledge-base"),
            Route::protected("knowledge-base-detail", "/knowledge-base/:id"),
            Route::protected("new-knowledge-base", "/knowledge-base/new"),
            Route::public("signup", "/signup"),
        ])
    }
}

impl RouteTable {
    /// Table over `routes`, in declaration order.
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// All routes.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Route by name.
    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Best match for `path`. Query string and fragment are ignored.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        let normalized = normalize(path);
        let parts = segments(&normalized);

        let mut best: Option<(RouteMatch<'_>, Vec<bool>)> = None;
        for route in &self.routes {
            let Some((params, rank)) = route.match_path(&parts) else {
                continue;
            };
            // Earlier declaration wins ties.
            if best.as_ref().is_none_or(|(_, best_rank)| rank < *best_rank) {
                best = Some((RouteMatch { route, params }, rank));
            }
        }
        best.map(|(m, _)| m)
    }
}

/// Strip query and fragment, collapse a trailing slash.
pub(crate) fn normalize(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim();
    let body = trimmed.trim_matches('/');
    format!("/{body}")
}

fn segments(path: &str) -> Vec<&str> {
    let body = path.trim_matches('/');
    if body.is_empty() {
        Vec::new()
    } else {
        body.split('/').collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
