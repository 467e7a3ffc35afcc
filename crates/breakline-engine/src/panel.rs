//! Headless settings panel.
//!
//! Holds the behaviour behind the host's checkbox panel: one toggle per
//! policy switch, a strategy selector and "apply now". Rendering is left to
//! the embedder; [`SettingsPanel::toggles`] gives it the current state.

use std::sync::Arc;

use breakline_settings::{ClassifierStrategy, PolicyField, PolicySet, PolicyStore};
use serde::Serialize;
use tracing::{info, warn};

use crate::engine::RunSource;
use crate::scheduler::Scheduler;

/// Severity of a user-facing notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something failed but the engine keeps working.
    Error,
}

/// Non-fatal message for the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notice {
    /// Error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Surfaces notices to the user (a toast, a status line, a log).
pub trait Notifier: Send + Sync {
    /// Show one notice.
    fn notify(&self, notice: Notice);
}

/// Notifier that writes notices to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!(message = %notice.message, "notice"),
            NoticeLevel::Error => warn!(message = %notice.message, "notice"),
        }
    }
}

/// Render state of one toggle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toggle {
    /// Persisted key.
    pub key: &'static str,
    /// Label shown next to the checkbox.
    pub label: &'static str,
    /// Whether the switch is on.
    pub enabled: bool,
}

/// Policy controls wired to persistence and scheduling.
pub struct SettingsPanel {
    scheduler: Arc<Scheduler>,
    store: Arc<dyn PolicyStore>,
    notifier: Arc<dyn Notifier>,
}

impl SettingsPanel {
    /// Panel updating the scheduler's engine context.
    pub fn new(
        scheduler: Arc<Scheduler>,
        store: Arc<dyn PolicyStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            scheduler,
            store,
            notifier,
        }
    }

    /// Flip one switch, persist, and schedule a run.
    pub fn toggle(&self, field: PolicyField, value: bool) -> PolicySet {
        let policy = self
            .scheduler
            .engine()
            .context()
            .update_policy(|p| p.set(field, value));
        info!(field = %field, value, "policy toggled");
        self.commit(&policy);
        policy
    }

    /// Switch the classifier strategy, persist, and schedule a run.
    pub fn set_strategy(&self, strategy: ClassifierStrategy) -> PolicySet {
        let policy = self
            .scheduler
            .engine()
            .context()
            .update_policy(|p| p.strategy = strategy);
        info!(strategy = %strategy, "strategy changed");
        self.commit(&policy);
        policy
    }

    /// Schedule an immediate run with the current policy.
    pub fn apply_now(&self) {
        self.scheduler
            .schedule(RunSource::Manual, std::time::Duration::ZERO, None);
    }

    /// Current state of every toggle, in panel order.
    pub fn toggles(&self) -> Vec<Toggle> {
        let policy = self.scheduler.engine().context().policy();
        PolicyField::ALL
            .into_iter()
            .map(|field| Toggle {
                key: field.key(),
                label: field.label(),
                enabled: policy.get(field),
            })
            .collect()
    }

    /// Active classifier strategy.
    pub fn strategy(&self) -> ClassifierStrategy {
        self.scheduler.engine().context().policy().strategy
    }

    fn commit(&self, policy: &PolicySet) {
        if let Err(error) = self.store.save(policy) {
            warn!(%error, "failed to persist policy");
            self.notifier
                .notify(Notice::error(format!("Settings could not be saved: {error}")));
        }
        let delay = self
            .scheduler
            .engine()
            .context()
            .settings()
            .timing
            .settings_change();
        self.scheduler.schedule(RunSource::Settings, delay, None);
    }
}

impl std::fmt::Debug for SettingsPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsPanel")
            .field("toggles", &self.toggles())
            .finish_non_exhaustive()
    }
}
