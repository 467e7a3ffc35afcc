//! Configuration loading.
//!
//! [`load_settings_from_path`] layers three sources, later ones winning:
//! compiled defaults, the JSON file (merged with [`merge_over`]), and
//! `BREAKLINE_*` environment variables. A missing file is not an error;
//! a malformed one is.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::BreaklineSettings;

/// Directory holding breakline's files (`~/.breakline`).
pub fn config_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".breakline")
}

/// Path of the engine configuration file.
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Path of the host settings file that stores the policy.
pub fn policy_file_path(settings: &BreaklineSettings) -> PathBuf {
    settings
        .storage
        .policy_file
        .as_ref()
        .map_or_else(|| config_dir().join("extension_settings.json"), PathBuf::from)
}

/// Load configuration from the default path with env overrides.
pub fn load_settings() -> Result<BreaklineSettings> {
    load_settings_from_path(&settings_path())
}

/// Load configuration from `path` with env overrides.
pub fn load_settings_from_path(path: &Path) -> Result<BreaklineSettings> {
    let mut merged = serde_json::to_value(BreaklineSettings::default())?;
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(?path, "merging settings file over defaults");
            merge_over(&mut merged, serde_json::from_str(&content)?);
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            debug!(?path, "no settings file, using defaults");
        }
        Err(error) => return Err(error.into()),
    }

    let mut settings: BreaklineSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Merge `overlay` into `base` in place.
///
/// Objects merge key by key, recursively. Any other overlay value replaces
/// the base value wholesale, except `null`, which leaves the base untouched.
pub fn merge_over(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_over(slot, value),
                    None if value.is_null() => {}
                    None => {
                        let _ = base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply `BREAKLINE_*` environment overrides.
pub fn apply_env_overrides(settings: &mut BreaklineSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are logged and ignored, leaving the file/default value.
pub fn apply_overrides_from<F>(settings: &mut BreaklineSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let ranged = |name: &str, min: u64, max: u64| {
        let raw = lookup(name)?;
        let parsed = parse_u64_range(&raw, min, max);
        if parsed.is_none() {
            warn!(key = name, value = %raw, "invalid numeric env var, ignoring");
        }
        parsed
    };

    // ── Document ────────────────────────────────────────────────────
    if let Some(v) = string("BREAKLINE_SCOPE_SELECTORS") {
        settings.document.scope_selectors = vec![v];
    }
    if let Some(v) = string("BREAKLINE_EDIT_SELECTORS") {
        settings.document.edit_selectors = vec![v];
    }
    if let Some(v) = string("BREAKLINE_MARKER_TAG") {
        settings.document.marker_tag = v.trim().to_ascii_lowercase();
    }

    // ── Timing ──────────────────────────────────────────────────────
    if let Some(v) = ranged("BREAKLINE_DEBOUNCE_MS", 0, 60_000) {
        settings.timing.mutation_debounce_ms = v;
    }
    if let Some(v) = ranged("BREAKLINE_EDIT_SETTLE_MS", 0, 60_000) {
        settings.timing.edit_settle_ms = v;
    }

    // ── Init ────────────────────────────────────────────────────────
    if let Some(v) = ranged("BREAKLINE_INIT_MAX_ATTEMPTS", 1, 1_000) {
        settings.init.max_attempts = u32::try_from(v).unwrap_or(u32::MAX);
    }
    if let Some(v) = ranged("BREAKLINE_INIT_RETRY_MS", 10, 60_000) {
        settings.init.retry_interval_ms = v;
    }

    // ── Storage ─────────────────────────────────────────────────────
    if let Some(v) = string("BREAKLINE_POLICY_FILE") {
        settings.storage.policy_file = Some(v);
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::errors::SettingsError;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn merged(mut base: Value, overlay: Value) -> Value {
        merge_over(&mut base, overlay);
        base
    }

    // ── merge_over ──────────────────────────────────────────────────

    #[test]
    fn nested_timing_keys_merge_individually() {
        let out = merged(
            serde_json::json!({"timing": {"editSettleMs": 100, "signals": {"chatChangedMs": 500, "messageSentMs": 100}}}),
            serde_json::json!({"timing": {"signals": {"chatChangedMs": 900}}}),
        );
        assert_eq!(out["timing"]["editSettleMs"], 100);
        assert_eq!(out["timing"]["signals"]["chatChangedMs"], 900);
        assert_eq!(out["timing"]["signals"]["messageSentMs"], 100);
    }

    #[test]
    fn selector_lists_are_replaced_not_appended() {
        let out = merged(
            serde_json::json!({"scopeSelectors": [".mes_text", ".swipe_text"]}),
            serde_json::json!({"scopeSelectors": ["article"]}),
        );
        assert_eq!(out["scopeSelectors"], serde_json::json!(["article"]));
    }

    #[test]
    fn nulls_never_overwrite_or_insert() {
        let out = merged(
            serde_json::json!({"markerTag": "br"}),
            serde_json::json!({"markerTag": null, "extra": null}),
        );
        assert_eq!(out, serde_json::json!({"markerTag": "br"}));
    }

    #[test]
    fn scalar_overlay_replaces_object_and_vice_versa() {
        let out = merged(
            serde_json::json!({"storage": {"policyKey": "breakline"}, "version": "1"}),
            serde_json::json!({"storage": 7, "version": {"major": 2}}),
        );
        assert_eq!(out["storage"], 7);
        assert_eq!(out["version"]["major"], 2);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = load_settings_from_path(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(
            settings.document.scope_selectors,
            BreaklineSettings::default().document.scope_selectors
        );
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"timing": {"mutationDebounceMs": 50, "signals": {"chatChangedMs": 900}}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.timing.mutation_debounce_ms, 50);
        assert_eq!(settings.timing.signals.chat_changed_ms, 900);
        assert_eq!(settings.timing.edit_settle_ms, 100);
        assert_eq!(settings.timing.signals.message_received_ms, 100);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Json(_))
        ));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn overrides_apply_valid_values() {
        let mut settings = BreaklineSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("BREAKLINE_SCOPE_SELECTORS", ".mes_text, .swipe_text"),
                ("BREAKLINE_MARKER_TAG", " BR "),
                ("BREAKLINE_DEBOUNCE_MS", "750"),
                ("BREAKLINE_INIT_MAX_ATTEMPTS", "3"),
                ("BREAKLINE_POLICY_FILE", "/tmp/policy.json"),
            ]),
        );
        assert_eq!(
            settings.document.scope_selectors,
            vec![".mes_text, .swipe_text"]
        );
        assert_eq!(settings.document.marker_tag, "br");
        assert_eq!(settings.timing.mutation_debounce_ms, 750);
        assert_eq!(settings.init.max_attempts, 3);
        assert_eq!(
            settings.storage.policy_file.as_deref(),
            Some("/tmp/policy.json")
        );
    }

    #[test]
    fn overrides_ignore_invalid_values() {
        let mut settings = BreaklineSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("BREAKLINE_DEBOUNCE_MS", "soon"),
                ("BREAKLINE_INIT_MAX_ATTEMPTS", "0"),
                ("BREAKLINE_INIT_RETRY_MS", "5"),
                ("BREAKLINE_MARKER_TAG", "   "),
            ]),
        );
        assert_eq!(settings, BreaklineSettings::default());
    }

    #[test]
    fn policy_file_defaults_under_config_dir() {
        let settings = BreaklineSettings::default();
        assert!(policy_file_path(&settings).ends_with(".breakline/extension_settings.json"));
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in ["true", "1", "yes", "ON"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in ["false", "0", "no", "Off"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64_range("300", 0, 60_000), Some(300));
        assert_eq!(parse_u64_range("60001", 0, 60_000), None);
        assert_eq!(parse_u64_range("-1", 0, 60_000), None);
    }
}
