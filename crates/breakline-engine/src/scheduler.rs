//! Debounced, single-flight run scheduling.

use std::sync::Arc;
use std::time::Duration;

use breakline_core::NodeId;
use parking_lot::Mutex;
use tracing::debug;

use crate::engine::{RuleEngine, RunSource};
use crate::timer::DebounceTimer;

/// Pending run, tagged with the generation of the `schedule` call that armed
/// it. A timer only clears the slot it armed.
#[derive(Debug, Default)]
struct PendingSlot {
    generation: u64,
    run: Option<(RunSource, Option<NodeId>)>,
}

impl PendingSlot {
    fn arm(&mut self, source: RunSource, target: Option<NodeId>) -> (u64, Option<RunSource>) {
        self.generation += 1;
        let replaced = self.run.replace((source, target)).map(|(s, _)| s);
        (self.generation, replaced)
    }

    fn fire(&mut self, generation: u64) {
        if self.generation == generation {
            self.run = None;
        }
    }
}

/// Trailing-debounce front end of the [`RuleEngine`].
///
/// At most one run is pending. Each [`schedule`](Self::schedule) replaces
/// the pending one, so a burst of triggers produces one run carrying the
/// last trigger's source and target.
#[derive(Debug)]
pub struct Scheduler {
    engine: Arc<RuleEngine>,
    timer: DebounceTimer,
    pending: Arc<Mutex<PendingSlot>>,
}

impl Scheduler {
    /// Scheduler driving `engine`.
    pub fn new(engine: Arc<RuleEngine>) -> Self {
        Self {
            engine,
            timer: DebounceTimer::new(),
            pending: Arc::new(Mutex::new(PendingSlot::default())),
        }
    }

    /// Engine invoked when the timer fires.
    pub fn engine(&self) -> &Arc<RuleEngine> {
        &self.engine
    }

    /// Run after `delay`, replacing any pending run.
    pub fn schedule(&self, source: RunSource, delay: Duration, target: Option<NodeId>) {
        let (generation, replaced) = self.pending.lock().arm(source, target);
        debug!(
            source = %source,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            target = ?target,
            replaced = ?replaced,
            "run scheduled"
        );

        let engine = Arc::clone(&self.engine);
        let pending = Arc::clone(&self.pending);
        self.timer.schedule(delay, move || {
            pending.lock().fire(generation);
            let _ = engine.run(source, target);
        });
    }

    /// Drop the pending run. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        self.pending.lock().run = None;
        self.timer.cancel()
    }

    /// Whether a run is waiting for its delay.
    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// Source and target of the pending run.
    pub fn pending(&self) -> Option<(RunSource, Option<NodeId>)> {
        self.pending.lock().run
    }
}

#[cfg(test)]
mod tests {
    use breakline_core::Document;
    use breakline_settings::{BreaklineSettings, PolicySet};

    use super::*;
    use crate::context::EngineContext;

    fn scheduler() -> Scheduler {
        let doc = Document::from_html(r#"<div class="mes_text">A<br><br>B</div>"#);
        let ctx = EngineContext::new(
            Arc::new(Mutex::new(doc)),
            BreaklineSettings::default(),
            PolicySet {
                merge_consecutive: true,
                ..PolicySet::default()
            },
        )
        .unwrap();
        Scheduler::new(Arc::new(RuleEngine::new(Arc::new(ctx))))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_runs_once_with_last_source() {
        let scheduler = scheduler();
        scheduler.schedule(RunSource::Mutation, Duration::from_millis(300), None);
        scheduler.schedule(RunSource::MessageSent, Duration::from_millis(150), None);
        scheduler.schedule(RunSource::MessageReceived, Duration::from_millis(100), None);
        assert_eq!(
            scheduler.pending(),
            Some((RunSource::MessageReceived, None))
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        let stats = scheduler.engine().context().stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(
            stats.last_report.map(|r| r.source),
            Some(RunSource::MessageReceived)
        );
        assert!(!scheduler.is_pending());
        assert_eq!(scheduler.pending(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_run() {
        let scheduler = scheduler();
        scheduler.schedule(RunSource::Mutation, Duration::from_millis(300), None);
        assert!(scheduler.cancel());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(scheduler.engine().context().stats().completed, 0);
    }

    #[test]
    fn stale_timer_keeps_newer_pending_run() {
        let mut slot = PendingSlot::default();
        let (first, _) = slot.arm(RunSource::Mutation, None);
        let (second, replaced) = slot.arm(RunSource::MessageSent, None);
        assert_eq!(replaced, Some(RunSource::Mutation));

        // the first timer fires after the second schedule call
        slot.fire(first);
        assert_eq!(slot.run, Some((RunSource::MessageSent, None)));

        slot.fire(second);
        assert_eq!(slot.run, None);
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_after_a_fire_is_reported_pending() {
        let scheduler = scheduler();
        scheduler.schedule(RunSource::Mutation, Duration::from_millis(10), None);
        tokio::time::sleep(Duration::from_millis(20)).await;
        scheduler.schedule(RunSource::Settings, Duration::from_millis(50), None);
        assert_eq!(scheduler.pending(), Some((RunSource::Settings, None)));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(scheduler.pending(), None);
        assert_eq!(scheduler.engine().context().stats().completed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_runs_on_next_tick() {
        let scheduler = scheduler();
        scheduler.schedule(RunSource::Manual, Duration::ZERO, None);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(scheduler.engine().context().stats().completed, 1);
    }
}
