//! Shared engine state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use breakline_core::{Document, SelectorList};
use breakline_settings::{BreaklineSettings, PolicySet};
use parking_lot::{Mutex, RwLock};

use crate::engine::RunReport;
use crate::errors::{EngineError, Result};

/// Counters kept across runs.
#[derive(Clone, Debug, Default)]
pub struct RunStats {
    /// Runs that completed.
    pub completed: u64,
    /// Triggers dropped because a run was in flight.
    pub skipped: u64,
    /// Report of the most recent completed run.
    pub last_report: Option<RunReport>,
}

/// Everything the engine components share: the document, the active
/// policy, configuration and the single-flight run guard.
///
/// Held in an `Arc` by the engine, scheduler, watcher, bridge and panel.
pub struct EngineContext {
    document: Arc<Mutex<Document>>,
    policy: RwLock<PolicySet>,
    settings: BreaklineSettings,
    scope_selectors: SelectorList,
    edit_selectors: SelectorList,
    running: AtomicBool,
    stats: Mutex<RunStats>,
}

impl EngineContext {
    /// Build a context, validating the configured selectors and marker tag.
    pub fn new(
        document: Arc<Mutex<Document>>,
        settings: BreaklineSettings,
        policy: PolicySet,
    ) -> Result<Self> {
        let scope_selectors = SelectorList::from_strings(&settings.document.scope_selectors)
            .map_err(|source| EngineError::Selector {
                kind: "scope",
                source,
            })?;
        let edit_selectors = SelectorList::from_strings(&settings.document.edit_selectors)
            .map_err(|source| EngineError::Selector {
                kind: "edit",
                source,
            })?;
        let tag = settings.document.marker_tag.trim();
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(EngineError::MarkerTag(settings.document.marker_tag.clone()));
        }

        Ok(Self {
            document,
            policy: RwLock::new(policy),
            settings,
            scope_selectors,
            edit_selectors,
            running: AtomicBool::new(false),
            stats: Mutex::new(RunStats::default()),
        })
    }

    /// Shared document handle.
    pub fn document(&self) -> &Arc<Mutex<Document>> {
        &self.document
    }

    /// Copy of the active policy.
    pub fn policy(&self) -> PolicySet {
        *self.policy.read()
    }

    /// Replace the active policy. Takes effect on the next run.
    pub fn set_policy(&self, policy: PolicySet) {
        *self.policy.write() = policy;
    }

    /// Update the active policy in place and return the new value.
    pub fn update_policy(&self, f: impl FnOnce(&mut PolicySet)) -> PolicySet {
        let mut policy = self.policy.write();
        f(&mut policy);
        *policy
    }

    /// Engine configuration.
    pub fn settings(&self) -> &BreaklineSettings {
        &self.settings
    }

    /// Parsed scope selectors.
    pub fn scope_selectors(&self) -> &SelectorList {
        &self.scope_selectors
    }

    /// Parsed edit-session selectors.
    pub fn edit_selectors(&self) -> &SelectorList {
        &self.edit_selectors
    }

    /// Lowercased marker tag.
    pub fn marker_tag(&self) -> String {
        self.settings.document.marker_tag.trim().to_ascii_lowercase()
    }

    /// Whether a run is in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Claim the run guard, or `None` when a run is already in flight.
    pub fn try_begin_run(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                running: &self.running,
            })
    }

    /// Snapshot of the run counters.
    pub fn stats(&self) -> RunStats {
        self.stats.lock().clone()
    }

    pub(crate) fn record_completed(&self, report: RunReport) {
        let mut stats = self.stats.lock();
        stats.completed += 1;
        stats.last_report = Some(report);
    }

    pub(crate) fn record_skipped(&self) {
        self.stats.lock().skipped += 1;
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("policy", &self.policy())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Held for the duration of a run; releases the guard on drop, including
/// on early returns and panics.
#[derive(Debug)]
pub struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
