//! Structural mutation watcher.
//!
//! Turns batches of [`MutationRecord`]s into engine work:
//!
//! | change          | detected by                                   | action                          |
//! |-----------------|-----------------------------------------------|---------------------------------|
//! | edit entered    | added node is/contains an edit element        | revert that scope now           |
//! | edit exited     | removed node is/contains an edit element      | single-scope run after settle   |
//! | new content     | added node is/contains a scope, or the record | debounced full run              |
//! |                 | target lies inside a scope                    |                                 |
//!
//! A batch schedules at most one run: edit-exit beats new content, and an
//! edit entering suppresses the full run for that batch.

use std::sync::Arc;

use breakline_core::{Document, MutationRecord, NodeId, SelectorList};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::context::EngineContext;
use crate::engine::RunSource;
use crate::scheduler::Scheduler;

/// One batch of structural changes, as a mutation observer delivers it.
pub type MutationBatch = Vec<MutationRecord>;

/// Engine-relevant meaning of a mutation batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubtreeChange {
    /// An edit control appeared inside `scope`.
    EditEntered {
        /// Scope being edited.
        scope: NodeId,
    },
    /// An edit control left `scope`.
    EditExited {
        /// Scope that was edited.
        scope: NodeId,
    },
    /// Scope content was added or changed.
    NewContent,
}

/// Reacts to structural mutations of the document.
#[derive(Debug)]
pub struct MutationWatcher {
    ctx: Arc<EngineContext>,
    scheduler: Arc<Scheduler>,
}

impl MutationWatcher {
    /// Watcher scheduling through `scheduler`.
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            ctx: Arc::clone(scheduler.engine().context()),
            scheduler,
        }
    }

    /// Classify a batch without side effects.
    pub fn classify(&self, doc: &Document, batch: &[MutationRecord]) -> Vec<SubtreeChange> {
        let scopes = self.ctx.scope_selectors();
        let edits = self.ctx.edit_selectors();
        let within = |node: NodeId, list: &SelectorList| {
            list.matches(doc, node) || !doc.select(node, list).is_empty()
        };

        let mut changes = Vec::new();
        let mut exited = None;
        let mut new_content = false;

        for record in batch {
            for &added in &record.added {
                if within(added, edits) {
                    let scope = doc
                        .closest(added, edits)
                        .or_else(|| doc.select(added, edits).first().copied())
                        .and_then(|edit| doc.closest(edit, scopes));
                    if let Some(scope) = scope {
                        let change = SubtreeChange::EditEntered { scope };
                        if !changes.contains(&change) {
                            changes.push(change);
                        }
                    }
                } else if within(added, scopes) {
                    new_content = true;
                }
            }
            for &removed in &record.removed {
                if exited.is_none() && within(removed, edits) {
                    exited = doc.closest(record.target, scopes);
                }
            }
            if !new_content {
                new_content = doc.closest(record.target, scopes).is_some();
            }
        }

        let editing = !changes.is_empty();
        if let Some(scope) = exited {
            changes.push(SubtreeChange::EditExited { scope });
        } else if new_content && !editing {
            changes.push(SubtreeChange::NewContent);
        }
        changes
    }

    /// Classify a batch and act on it.
    pub fn handle_batch(&self, batch: &[MutationRecord]) -> Vec<SubtreeChange> {
        if batch.is_empty() {
            return Vec::new();
        }
        let changes = {
            let doc = self.ctx.document().lock();
            self.classify(&doc, batch)
        };

        let timing = &self.ctx.settings().timing;
        for change in &changes {
            match *change {
                SubtreeChange::EditEntered { scope } => {
                    match self.scheduler.engine().revert_scope(scope) {
                        Ok(restored) => debug!(scope = %scope, restored, "edit entered, scope reverted"),
                        Err(error) => warn!(scope = %scope, %error, "failed to revert edited scope"),
                    }
                }
                SubtreeChange::EditExited { scope } => {
                    self.scheduler
                        .schedule(RunSource::EditExited, timing.edit_settle(), Some(scope));
                }
                SubtreeChange::NewContent => {
                    self.scheduler
                        .schedule(RunSource::Mutation, timing.mutation_debounce(), None);
                }
            }
        }
        changes
    }

    /// Drain the mutations recorded by the document and handle them.
    pub fn observe(&self) -> Vec<SubtreeChange> {
        let batch = self.ctx.document().lock().take_mutations();
        self.handle_batch(&batch)
    }

    /// Consume batches until the channel closes or `cancel` fires.
    pub async fn run(&self, mut batches: mpsc::Receiver<MutationBatch>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("mutation watcher cancelled");
                    break;
                }
                batch = batches.recv() => match batch {
                    Some(batch) => {
                        let _ = self.handle_batch(&batch);
                    }
                    None => {
                        debug!("mutation channel closed");
                        break;
                    }
                },
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn start(
        self: Arc<Self>,
        batches: mpsc::Receiver<MutationBatch>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(batches, cancel).await })
    }
}
