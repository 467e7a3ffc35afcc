//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` so the JSON files read
//! like host extension settings. Every type implements [`Default`] with the
//! production values and is `#[serde(default)]`, so partial JSON is fine.

mod policy;
mod timing;

pub use policy::*;
pub use timing::*;

use serde::{Deserialize, Serialize};

/// Root engine configuration.
///
/// Loaded from `~/.breakline/settings.json`, deep-merged over
/// [`BreaklineSettings::default`], then patched by `BREAKLINE_*` variables.
///
/// ```json
/// {
///   "document": { "scopeSelectors": [".mes_text", ".swipe_text"] },
///   "timing": { "mutationDebounceMs": 500 }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreaklineSettings {
    /// Settings schema version.
    pub version: String,
    /// How scopes, markers and edit sessions are recognised.
    pub document: DocumentSettings,
    /// Debounce and per-signal delays.
    pub timing: TimingSettings,
    /// Host readiness probing.
    pub init: InitSettings,
    /// Where the policy set is persisted.
    pub storage: StorageSettings,
}

impl Default for BreaklineSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            document: DocumentSettings::default(),
            timing: TimingSettings::default(),
            init: InitSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

/// Document recognition settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentSettings {
    /// Selectors identifying one message scope each.
    pub scope_selectors: Vec<String>,
    /// Tag name of marker elements.
    pub marker_tag: String,
    /// Selectors identifying an in-place edit control.
    pub edit_selectors: Vec<String>,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            scope_selectors: vec![".mes_text".to_string()],
            marker_tag: "br".to_string(),
            edit_selectors: vec![".edit_textarea".to_string()],
        }
    }
}

/// Host readiness retry settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitSettings {
    /// Probes before giving up.
    pub max_attempts: u32,
    /// Delay between probes.
    pub retry_interval_ms: u64,
}

impl Default for InitSettings {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            retry_interval_ms: 500,
        }
    }
}

/// Policy persistence settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Host settings file holding the policy; `None` uses
    /// `~/.breakline/extension_settings.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_file: Option<String>,
    /// Key of the policy object inside the host settings file.
    pub policy_key: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            policy_file: None,
            policy_key: "breakline".to_string(),
        }
    }
}
