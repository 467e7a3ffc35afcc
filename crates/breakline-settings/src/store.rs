//! Policy persistence.
//!
//! The policy lives under one key of a host-wide settings object, next to
//! other extensions' entries:
//!
//! ```json
//! { "breakline": { "hideLeading": true }, "someOtherExtension": { ... } }
//! ```
//!
//! Loading deep-merges the stored object over [`PolicySet::default`], so
//! switches added in later versions are backfilled without discarding
//! earlier choices. Saving rewrites only our key.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::loader::merge_over;
use crate::types::PolicySet;

/// Pre-rename keys and the switch each one maps to.
const LEGACY_KEYS: &[(&str, &str)] = &[
    ("hideAllBr", "hideAllGlobal"),
    ("hideChatBr", "hideAllInScope"),
];

/// Load/save contract for the policy set.
pub trait PolicyStore: Send + Sync {
    /// Read the persisted policy, default-merged.
    fn load(&self) -> Result<PolicySet>;

    /// Persist the policy.
    fn save(&self, policy: &PolicySet) -> Result<()>;
}

/// Load the policy, falling back to defaults when the store fails.
pub fn load_or_default(store: &dyn PolicyStore) -> PolicySet {
    match store.load() {
        Ok(policy) => policy,
        Err(error) => {
            warn!(%error, "failed to load policy, using defaults");
            PolicySet::default()
        }
    }
}

/// Rename legacy keys in a stored policy object. An explicit new key wins
/// over its legacy counterpart.
pub fn migrate_legacy_keys(stored: &mut Map<String, Value>) {
    for (legacy, current) in LEGACY_KEYS {
        if let Some(value) = stored.remove(*legacy) {
            if !stored.contains_key(*current) {
                debug!(legacy, current, "migrating legacy policy key");
                let _ = stored.insert((*current).to_string(), value);
            }
        }
    }
}

/// Merge a stored policy object over the defaults.
pub fn policy_from_stored(stored: Option<Value>) -> Result<PolicySet> {
    let mut merged = serde_json::to_value(PolicySet::default())?;
    match stored {
        Some(Value::Object(mut map)) => {
            migrate_legacy_keys(&mut map);
            merge_over(&mut merged, Value::Object(map));
        }
        Some(Value::Null) | None => {}
        Some(other) => {
            return Err(SettingsError::InvalidValue(format!(
                "stored policy is not an object: {other}"
            )));
        }
    }
    Ok(serde_json::from_value(merged)?)
}

/// Policy stored under `key` in a JSON file shared with the host.
#[derive(Debug)]
pub struct JsonFilePolicyStore {
    path: PathBuf,
    key: String,
    lock: Mutex<()>,
}

impl JsonFilePolicyStore {
    /// Store backed by `path`, using `key` inside the file's top-level object.
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_root(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(SettingsError::NotAnObject(self.path.clone())),
        }
    }
}

impl PolicyStore for JsonFilePolicyStore {
    fn load(&self) -> Result<PolicySet> {
        let _guard = self.lock.lock();
        let mut root = self.read_root()?;
        policy_from_stored(root.remove(&self.key))
    }

    fn save(&self, policy: &PolicySet) -> Result<()> {
        let _guard = self.lock.lock();
        let mut root = self.read_root()?;
        let _ = root.insert(self.key.clone(), serde_json::to_value(policy)?);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves a truncated host file.
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, serde_json::to_string_pretty(&Value::Object(root))?)?;
        std::fs::rename(&staging, &self.path)?;
        debug!(path = ?self.path, key = %self.key, "policy saved");
        Ok(())
    }
}

/// In-memory store holding the raw stored object.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    stored: Mutex<Option<Value>>,
}

impl MemoryPolicyStore {
    /// Empty store; loads yield defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a raw (possibly partial or legacy) object.
    pub fn with_stored(stored: Value) -> Self {
        Self {
            stored: Mutex::new(Some(stored)),
        }
    }

    /// Raw object currently stored.
    pub fn stored(&self) -> Option<Value> {
        self.stored.lock().clone()
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn load(&self) -> Result<PolicySet> {
        policy_from_stored(self.stored.lock().clone())
    }

    fn save(&self, policy: &PolicySet) -> Result<()> {
        *self.stored.lock() = Some(serde_json::to_value(policy)?);
        Ok(())
    }
}
