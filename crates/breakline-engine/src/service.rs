//! Engine assembly and lifecycle.
//!
//! [`Breakline`] builds every component around one shared
//! [`EngineContext`]. [`Breakline::start`] waits for the host, applies the
//! policy once, then spawns the mutation watcher and the event bridge.
//! [`RunningService::shutdown`] stops both loops and reverts the document.

use std::sync::Arc;

use breakline_core::Document;
use breakline_settings::{BreaklineSettings, PolicyStore, load_or_default};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::bridge::{EventBridge, HostSignal};
use crate::context::EngineContext;
use crate::engine::{RuleEngine, RunOutcome, RunSource};
use crate::errors::Result;
use crate::init::{HostProbe, Initializer};
use crate::panel::{Notifier, SettingsPanel};
use crate::scheduler::Scheduler;
use crate::watcher::{MutationBatch, MutationWatcher};

/// Every engine component, wired together.
#[derive(Debug)]
pub struct Breakline {
    engine: Arc<RuleEngine>,
    scheduler: Arc<Scheduler>,
    watcher: Arc<MutationWatcher>,
    bridge: Arc<EventBridge>,
    panel: SettingsPanel,
}

impl Breakline {
    /// Assemble the engine over `document`, loading the policy from `store`.
    pub fn new(
        document: Arc<Mutex<Document>>,
        settings: BreaklineSettings,
        store: Arc<dyn PolicyStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let policy = load_or_default(store.as_ref());
        let ctx = Arc::new(EngineContext::new(document, settings, policy)?);
        let engine = Arc::new(RuleEngine::new(ctx));
        let scheduler = Arc::new(Scheduler::new(Arc::clone(&engine)));

        Ok(Self {
            watcher: Arc::new(MutationWatcher::new(Arc::clone(&scheduler))),
            bridge: Arc::new(EventBridge::new(Arc::clone(&scheduler), Arc::clone(&store))),
            panel: SettingsPanel::new(Arc::clone(&scheduler), store, notifier),
            engine,
            scheduler,
        })
    }

    /// Shared context.
    pub fn context(&self) -> &Arc<EngineContext> {
        self.engine.context()
    }

    /// Rule engine.
    pub fn engine(&self) -> &Arc<RuleEngine> {
        &self.engine
    }

    /// Run scheduler.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Mutation watcher.
    pub fn watcher(&self) -> &Arc<MutationWatcher> {
        &self.watcher
    }

    /// Host signal bridge.
    pub fn bridge(&self) -> &Arc<EventBridge> {
        &self.bridge
    }

    /// Settings panel controller.
    pub fn panel(&self) -> &SettingsPanel {
        &self.panel
    }

    /// Wait for the host, apply once, and start both event loops.
    ///
    /// Fails with [`EngineError::HostUnavailable`](crate::EngineError::HostUnavailable)
    /// when the probe never answers ready; nothing is spawned in that case.
    pub async fn start(
        self,
        probe: impl HostProbe + 'static,
        mutations: mpsc::Receiver<MutationBatch>,
        signals: broadcast::Receiver<HostSignal>,
    ) -> Result<RunningService> {
        let init = Initializer::from_settings(probe, &self.context().settings().init);
        let attempts = init.wait_ready().await?;

        let initial = self.engine.run(RunSource::Init, None);
        info!(attempts, initial = ?initial.report(), "engine attached");

        let cancel = CancellationToken::new();
        let tasks = vec![
            Arc::clone(&self.watcher).start(mutations, cancel.clone()),
            Arc::clone(&self.bridge).start(signals, cancel.clone()),
        ];
        Ok(RunningService {
            breakline: self,
            initial,
            cancel,
            tasks,
        })
    }
}

/// A started engine.
#[derive(Debug)]
pub struct RunningService {
    breakline: Breakline,
    initial: RunOutcome,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl RunningService {
    /// Components of the running engine.
    pub fn breakline(&self) -> &Breakline {
        &self.breakline
    }

    /// Outcome of the run made on attach.
    pub fn initial(&self) -> &RunOutcome {
        &self.initial
    }

    /// Stop both loops, drop any pending run, and restore every marker.
    ///
    /// Returns the number of markers restored.
    pub async fn shutdown(self) -> usize {
        self.cancel.cancel();
        let _ = self.breakline.scheduler.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
        let restored = self.breakline.engine.revert_all();
        info!(restored, "engine detached");
        restored
    }
}
