//! # breakline-settings
//!
//! Engine configuration and policy persistence.
//!
//! Configuration ([`BreaklineSettings`]) is loaded from three layers, in
//! priority order:
//! 1. **Compiled defaults**: [`BreaklineSettings::default()`]
//! 2. **User file**: `~/.breakline/settings.json` (merged over defaults)
//! 3. **Environment variables**: `BREAKLINE_*` overrides
//!
//! The policy ([`PolicySet`]) is persisted through a [`PolicyStore`]; the
//! file-backed store keeps it under one key of a host-wide settings file.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod store;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, merge_over, policy_file_path, settings_path};
pub use store::{JsonFilePolicyStore, MemoryPolicyStore, PolicyStore, load_or_default};
pub use types::*;
