//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ClientSettings::default()`]
//! 2. If `~/.autocally/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `AUTOCALLY_*` environment variable overrides
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::ClientSettings;

/// Directory holding the settings and storage files (`~/.autocally`).
pub fn settings_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".autocally")
}

/// Resolve the path to the settings file (`~/.autocally/settings.json`).
pub fn settings_path() -> PathBuf {
    settings_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ClientSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid final value is
/// an error.
pub fn load_settings_from_path(path: &Path) -> Result<ClientSettings> {
    let mut settings = merge_file(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn merge_file(path: &Path) -> Result<ClientSettings> {
    let defaults = serde_json::to_value(ClientSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Reject settings the client cannot run with.
pub fn validate(settings: &ClientSettings) -> Result<()> {
    if settings.backend.url.trim().is_empty() {
        return Err(SettingsError::InvalidValue("backend.url is empty".into()));
    }
    if !settings.realtime.path.starts_with('/') {
        return Err(SettingsError::InvalidValue(format!(
            "realtime.path must start with '/': {}",
            settings.realtime.path
        )));
    }
    if settings.realtime.event_buffer == 0 {
        return Err(SettingsError::InvalidValue(
            "realtime.eventBuffer must be at least 1".into(),
        ));
    }
    if settings.realtime.handshake_timeout_ms == 0 || settings.realtime.round_trip_timeout_ms == 0
    {
        return Err(SettingsError::InvalidValue(
            "realtime timeouts must be non-zero".into(),
        ));
    }
    Ok(())
}

/// Apply `AUTOCALLY_*` process environment overrides.
pub fn apply_env_overrides(settings: &mut ClientSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Each variable has strict parsing rules:
/// - Integers must be valid and within the specified range
/// - Booleans accept: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`
/// - Invalid values are logged and ignored (fall back to file/default)
pub fn apply_overrides_from<F>(settings: &mut ClientSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Backend ─────────────────────────────────────────────────────
    if let Some(v) = env.string("AUTOCALLY_BACKEND_URL") {
        settings.backend.url = v;
    }
    if let Some(v) = env.bool("AUTOCALLY_ACCEPT_INVALID_CERTS") {
        settings.backend.accept_invalid_certs = v;
    }
    if let Some(v) = env.u64("AUTOCALLY_REQUEST_TIMEOUT_MS", 100, 600_000) {
        settings.backend.request_timeout_ms = v;
    }

    // ── Real-time ───────────────────────────────────────────────────
    if let Some(v) = env.u32("AUTOCALLY_RECONNECT_ATTEMPTS", 0, 100) {
        settings.realtime.reconnection_attempts = v;
    }
    if let Some(v) = env.u64("AUTOCALLY_RECONNECT_DELAY_MS", 0, 60_000) {
        settings.realtime.reconnection_delay_ms = v;
    }
    if let Some(v) = env.u64("AUTOCALLY_HANDSHAKE_TIMEOUT_MS", 100, 120_000) {
        settings.realtime.handshake_timeout_ms = v;
    }

    // ── Storage / logging ───────────────────────────────────────────
    if let Some(v) = env.string("AUTOCALLY_STORAGE_PATH") {
        settings.storage.path = Some(v);
    }
    if let Some(v) = env.string("AUTOCALLY_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u32(&self, name: &str, min: u32, max: u32) -> Option<u32> {
        let val = (self.lookup)(name)?;
        let result = parse_u32_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid u32 env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use assert_matches::assert_matches;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({
            "backend": {"url": "https://a", "requestTimeoutMs": 30000}
        });
        let source = serde_json::json!({"backend": {"url": "https://b"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["backend"]["url"], "https://b");
        assert_eq!(merged["backend"]["requestTimeoutMs"], 30000);
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replaces() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4]});
        assert_eq!(deep_merge(target, source)["items"], serde_json::json!([4]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        assert_eq!(deep_merge(target, source)["a"], 42);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = merge_file(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.realtime.reconnection_attempts, 5);
        assert_eq!(settings.backend.url, "https://localhost:5001");
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"backend": {"url": "https://10.0.0.2:6969"}, "realtime": {"reconnectOnRestore": true}}"#,
        )
        .unwrap();

        let settings = merge_file(&path).unwrap();
        assert_eq!(settings.backend.url, "https://10.0.0.2:6969");
        assert!(settings.realtime.reconnect_on_restore);
        assert_eq!(settings.realtime.reconnection_delay_ms, 1_000);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn load_rejects_zero_event_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"realtime": {"eventBuffer": 0}}"#).unwrap();

        assert_matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(msg)) if msg.contains("eventBuffer")
        );
    }

    // ── validate ────────────────────────────────────────────────────

    #[test]
    fn validate_defaults() {
        validate(&ClientSettings::default()).unwrap();
    }

    #[test]
    fn validate_rejects_relative_socket_path() {
        let mut settings = ClientSettings::default();
        settings.realtime.path = "socket.io".into();
        assert_matches!(validate(&settings), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn validate_rejects_blank_backend() {
        let mut settings = ClientSettings::default();
        settings.backend.url = "  ".into();
        assert_matches!(validate(&settings), Err(SettingsError::InvalidValue(_)));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn overrides_apply() {
        let mut settings = ClientSettings::default();
        apply_overrides_from(
            &mut settings,
            lookup(&[
                ("AUTOCALLY_BACKEND_URL", "https://backend.internal"),
                ("AUTOCALLY_ACCEPT_INVALID_CERTS", "yes"),
                ("AUTOCALLY_RECONNECT_ATTEMPTS", "3"),
                ("AUTOCALLY_RECONNECT_DELAY_MS", "250"),
                ("AUTOCALLY_HANDSHAKE_TIMEOUT_MS", "5000"),
                ("AUTOCALLY_STORAGE_PATH", "/tmp/kv.json"),
                ("AUTOCALLY_LOG_LEVEL", "debug"),
            ]),
        );
        assert_eq!(settings.backend.url, "https://backend.internal");
        assert!(settings.backend.accept_invalid_certs);
        assert_eq!(settings.realtime.reconnection_attempts, 3);
        assert_eq!(settings.realtime.reconnection_delay_ms, 250);
        assert_eq!(settings.realtime.handshake_timeout_ms, 5_000);
        assert_eq!(settings.storage.path.as_deref(), Some("/tmp/kv.json"));
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut settings = ClientSettings::default();
        apply_overrides_from(
            &mut settings,
            lookup(&[
                ("AUTOCALLY_ACCEPT_INVALID_CERTS", "maybe"),
                ("AUTOCALLY_RECONNECT_ATTEMPTS", "1000"),
                ("AUTOCALLY_REQUEST_TIMEOUT_MS", "abc"),
                ("AUTOCALLY_BACKEND_URL", ""),
            ]),
        );
        assert!(!settings.backend.accept_invalid_certs);
        assert_eq!(settings.realtime.reconnection_attempts, 5);
        assert_eq!(settings.backend.request_timeout_ms, 30_000);
        assert_eq!(settings.backend.url, "https://localhost:5001");
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in &["true", "1", "yes", "on", "TRUE", "On"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in &["false", "0", "no", "off", "FALSE"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn parse_u32_range_bounds() {
        assert_eq!(parse_u32_range("0", 0, 100), Some(0));
        assert_eq!(parse_u32_range("100", 0, 100), Some(100));
        assert_eq!(parse_u32_range("101", 0, 100), None);
        assert_eq!(parse_u32_range("-1", 0, 100), None);
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("5000", 100, 120_000), Some(5_000));
        assert_eq!(parse_u64_range("50", 100, 120_000), None);
        assert_eq!(parse_u64_range("abc", 100, 120_000), None);
    }
}
