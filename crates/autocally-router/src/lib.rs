//! # autocally-router
//!
//! Navigation for the client: a static [`RouteTable`] resolving paths to
//! routes, and the pure [`evaluate`] guard deciding whether a navigation is
//! allowed or redirected based on the session's authenticated flag.

#![deny(unsafe_code)]

pub mod guard;
pub mod table;

pub use guard::{Decision, HOME_PATH, LOGIN_PATH, NavigationIntent, Router, evaluate};
pub use table::{Route, RouteMatch, RouteTable};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
