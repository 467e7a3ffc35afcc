//! The rule engine.
//!
//! One [`RuleEngine::run`] is one application run: claim the single-flight
//! guard, revert to canonical state, then classify and mark every marker of
//! each scope. Scope failures are logged and counted; they never abort the
//! rest of the run.

use std::fmt;
use std::sync::Arc;

use breakline_core::{Document, NodeId};
use breakline_settings::PolicySet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::{Classifier, Rule};
use crate::context::EngineContext;
use crate::errors::{EngineError, Result};
use crate::tracker::MarkerTracker;

/// What triggered a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunSource {
    /// First run after the host became ready.
    Init,
    /// New content observed by the mutation watcher.
    Mutation,
    /// An in-place edit session closed.
    EditExited,
    /// Host signal: the user sent a message.
    MessageSent,
    /// Host signal: a reply arrived.
    MessageReceived,
    /// Host signal: an alternative reply was selected.
    MessageSwiped,
    /// Host signal: a message was edited.
    MessageEdited,
    /// Host signal: a different conversation was opened.
    ChatChanged,
    /// Host signal: the host's settings changed.
    SettingsUpdated,
    /// A policy toggle changed.
    Settings,
    /// Explicit "apply now".
    Manual,
    /// One-shot command-line application.
    Cli,
}

impl RunSource {
    /// Source tag used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Mutation => "mutation",
            Self::EditExited => "editExited",
            Self::MessageSent => "messageSent",
            Self::MessageReceived => "messageReceived",
            Self::MessageSwiped => "messageSwiped",
            Self::MessageEdited => "messageEdited",
            Self::ChatChanged => "chatChanged",
            Self::SettingsUpdated => "settingsUpdated",
            Self::Settings => "settings",
            Self::Manual => "manual",
            Self::Cli => "cli",
        }
    }
}

impl fmt::Display for RunSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one completed run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Trigger.
    pub source: RunSource,
    /// Target scope, `None` for a full run.
    pub target: Option<NodeId>,
    /// Markers restored by the initial revert.
    pub reverted: usize,
    /// Scopes classified successfully.
    pub scopes_processed: usize,
    /// Scopes skipped because of an error.
    pub scopes_failed: usize,
    /// Markers hidden by this run.
    pub markers_hidden: usize,
    /// Markers decided visible by this run.
    pub markers_kept: usize,
    /// Whether `hideAllGlobal` short-circuited classification.
    pub global: bool,
}

impl RunReport {
    fn new(source: RunSource, target: Option<NodeId>) -> Self {
        Self {
            source,
            target,
            reverted: 0,
            scopes_processed: 0,
            scopes_failed: 0,
            markers_hidden: 0,
            markers_kept: 0,
            global: false,
        }
    }
}

/// Result of a run request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run finished.
    Completed(RunReport),
    /// Another run was in flight; this trigger was dropped.
    Skipped,
}

impl RunOutcome {
    /// Report of a completed run.
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped => None,
        }
    }
}

/// Applies the active policy to the document.
#[derive(Debug)]
pub struct RuleEngine {
    ctx: Arc<EngineContext>,
    tracker: MarkerTracker,
    classifier: Classifier,
}

impl RuleEngine {
    /// Engine over a shared context.
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        let tag = ctx.marker_tag();
        Self {
            tracker: MarkerTracker::new(tag.clone()),
            classifier: Classifier::new(tag),
            ctx,
        }
    }

    /// Shared context.
    pub fn context(&self) -> &Arc<EngineContext> {
        &self.ctx
    }

    /// Run over every scope (`target = None`) or only `target`.
    pub fn run(&self, source: RunSource, target: Option<NodeId>) -> RunOutcome {
        let Some(_guard) = self.ctx.try_begin_run() else {
            debug!(source = %source, "run already in flight, dropping trigger");
            self.ctx.record_skipped();
            return RunOutcome::Skipped;
        };

        let policy = self.ctx.policy();
        let report = {
            let mut doc = self.ctx.document().lock();
            self.apply(&mut doc, source, target, &policy)
        };

        info!(
            source = %source,
            target = ?target,
            scopes = report.scopes_processed,
            failed = report.scopes_failed,
            hidden = report.markers_hidden,
            "run completed"
        );
        self.ctx.record_completed(report.clone());
        RunOutcome::Completed(report)
    }

    /// Restore every processed marker of one scope.
    pub fn revert_scope(&self, scope: NodeId) -> Result<usize> {
        let mut doc = self.ctx.document().lock();
        let restored = self.tracker.revert_scope(&mut doc, scope)?;
        debug!(scope = %scope, restored, "scope reverted");
        Ok(restored)
    }

    /// Restore every processed marker of the document.
    pub fn revert_all(&self) -> usize {
        let mut doc = self.ctx.document().lock();
        let root = doc.root();
        match self.tracker.revert_scope(&mut doc, root) {
            Ok(restored) => restored,
            Err(error) => {
                warn!(%error, "document revert failed");
                0
            }
        }
    }

    fn apply(
        &self,
        doc: &mut Document,
        source: RunSource,
        target: Option<NodeId>,
        policy: &PolicySet,
    ) -> RunReport {
        let mut report = RunReport::new(source, target);
        let root = doc.root();

        if target.is_none() {
            match self.tracker.revert_scope(doc, root) {
                Ok(restored) => report.reverted = restored,
                Err(error) => warn!(%error, "document revert failed"),
            }
        }

        if policy.hide_all_global {
            report.global = true;
            for marker in self.classifier.markers(doc, root) {
                match self.tracker.snapshot_and_hide(doc, marker, Rule::GlobalHideAll) {
                    Ok(()) => report.markers_hidden += 1,
                    Err(error) => warn!(marker = %marker, %error, "failed to hide marker"),
                }
            }
            return report;
        }

        let scopes = match target {
            Some(scope) => vec![scope],
            None => doc.select(root, self.ctx.scope_selectors()),
        };
        for scope in scopes {
            match self.apply_scope(doc, scope, policy) {
                Ok((hidden, kept)) => {
                    report.scopes_processed += 1;
                    report.markers_hidden += hidden;
                    report.markers_kept += kept;
                }
                Err(error) => {
                    warn!(source = %source, scope = %scope, %error, "scope failed, continuing");
                    report.scopes_failed += 1;
                }
            }
        }
        report
    }

    fn apply_scope(
        &self,
        doc: &mut Document,
        scope: NodeId,
        policy: &PolicySet,
    ) -> Result<(usize, usize)> {
        if doc.element(scope).is_none() {
            return Err(EngineError::StaleScope(scope));
        }
        let _ = self.tracker.revert_scope(doc, scope)?;

        let (mut hidden, mut kept) = (0, 0);
        for (marker, verdict) in self.classifier.classify_scope(doc, scope, policy) {
            if verdict.hidden {
                self.tracker.snapshot_and_hide(doc, marker, verdict.rule)?;
                hidden += 1;
            } else {
                self.tracker.keep(doc, marker, verdict.rule)?;
                kept += 1;
            }
        }
        Ok((hidden, kept))
    }
}
