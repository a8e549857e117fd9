//! # autocally-settings
//!
//! Layered configuration for the Autocally client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ClientSettings::default()`]
//! 2. **User file**: `~/.autocally/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `AUTOCALLY_*` overrides (highest priority)
//!
//! There is no global instance. The application context loads settings once
//! and hands the relevant sections to each component.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings,
    load_settings_from_path, settings_dir, settings_path,
};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = ClientSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_match_product_behaviour() {
        let settings = ClientSettings::default();
        assert_eq!(settings.realtime.path, "/socket.io");
        assert_eq!(settings.realtime.reconnection_attempts, 5);
        assert_eq!(settings.realtime.reconnection_delay_ms, 1_000);
        assert_eq!(settings.realtime.handshake_timeout_ms, 20_000);
        assert_eq!(settings.realtime.round_trip_timeout_ms, 5_000);
        assert!(!settings.realtime.reconnect_on_restore);
        assert_eq!(settings.logging.level, "info");
        assert!(settings.storage.path.is_none());
    }
}
