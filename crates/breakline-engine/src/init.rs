//! Host readiness.
//!
//! The engine cannot attach until the host has rendered its document and
//! exposed its signal bus. [`Initializer`] probes a [`HostProbe`] at a fixed
//! interval and gives up after a bounded number of attempts.

use std::time::Duration;

use breakline_settings::InitSettings;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::errors::{EngineError, Result};

/// Answers whether the host is ready for the engine to attach.
pub trait HostProbe: Send + Sync {
    /// Check readiness once.
    fn is_ready(&self) -> bool;
}

impl<F> HostProbe for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_ready(&self) -> bool {
        self()
    }
}

/// Readiness state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitState {
    /// Still probing; `attempts` probes made so far.
    Waiting {
        /// Probes made.
        attempts: u32,
    },
    /// The host answered ready.
    Ready {
        /// Probes it took.
        attempts: u32,
    },
    /// Gave up. Terminal.
    Failed {
        /// Probes made.
        attempts: u32,
    },
}

/// Bounded retry state machine around a [`HostProbe`].
pub struct Initializer {
    probe: Box<dyn HostProbe>,
    max_attempts: u32,
    interval: Duration,
    state: Mutex<InitState>,
}

impl Initializer {
    /// Initializer probing at most `max_attempts` times, `interval` apart.
    pub fn new(probe: impl HostProbe + 'static, max_attempts: u32, interval: Duration) -> Self {
        Self {
            probe: Box::new(probe),
            max_attempts: max_attempts.max(1),
            interval,
            state: Mutex::new(InitState::Waiting { attempts: 0 }),
        }
    }

    /// Initializer configured from [`InitSettings`].
    pub fn from_settings(probe: impl HostProbe + 'static, settings: &InitSettings) -> Self {
        Self::new(
            probe,
            settings.max_attempts,
            Duration::from_millis(settings.retry_interval_ms),
        )
    }

    /// Current state.
    pub fn state(&self) -> InitState {
        *self.state.lock()
    }

    /// Make one probe if still waiting, and return the new state.
    pub fn poll(&self) -> InitState {
        let mut state = self.state.lock();
        let InitState::Waiting { attempts } = *state else {
            return *state;
        };
        let attempts = attempts + 1;

        *state = if self.probe.is_ready() {
            info!(attempts, "host ready");
            InitState::Ready { attempts }
        } else if attempts >= self.max_attempts {
            error!(attempts, "host never became ready, giving up");
            InitState::Failed { attempts }
        } else {
            debug!(attempts, max = self.max_attempts, "host not ready, retrying");
            InitState::Waiting { attempts }
        };
        *state
    }

    /// Probe until ready or out of attempts.
    pub async fn wait_ready(&self) -> Result<u32> {
        loop {
            match self.poll() {
                InitState::Ready { attempts } => return Ok(attempts),
                InitState::Failed { attempts } => {
                    return Err(EngineError::HostUnavailable { attempts });
                }
                InitState::Waiting { .. } => tokio::time::sleep(self.interval).await,
            }
        }
    }
}

impl std::fmt::Debug for Initializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Initializer")
            .field("max_attempts", &self.max_attempts)
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert_matches::assert_matches;
    use breakline_core::logging::capture_logs;
    use tracing::Level;

    use super::*;

    fn ready_after(n: u32) -> (Arc<AtomicU32>, impl Fn() -> bool + Send + Sync + 'static) {
        let calls = Arc::new(AtomicU32::new(0));
        let probe = {
            let calls = Arc::clone(&calls);
            move || calls.fetch_add(1, Ordering::SeqCst) + 1 >= n
        };
        (calls, probe)
    }

    #[test]
    fn poll_walks_the_state_machine() {
        let (_, probe) = ready_after(2);
        let init = Initializer::new(probe, 5, Duration::from_millis(10));
        assert_eq!(init.state(), InitState::Waiting { attempts: 0 });
        assert_eq!(init.poll(), InitState::Waiting { attempts: 1 });
        assert_eq!(init.poll(), InitState::Ready { attempts: 2 });
        assert_eq!(init.poll(), InitState::Ready { attempts: 2 });
    }

    #[test]
    fn failed_is_terminal_and_logged() {
        let (logs, _guard) = capture_logs();
        let (calls, probe) = ready_after(u32::MAX);
        let init = Initializer::new(probe, 3, Duration::from_millis(10));
        for _ in 0..3 {
            let _ = init.poll();
        }
        assert_eq!(init.state(), InitState::Failed { attempts: 3 });
        assert_eq!(init.poll(), InitState::Failed { attempts: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(logs.has_event(Level::ERROR, "never became ready"));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_ready_retries_at_interval() {
        let (calls, probe) = ready_after(4);
        let init = Initializer::new(probe, 20, Duration::from_millis(500));
        let started = tokio::time::Instant::now();
        assert_eq!(init.wait_ready().await.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(2000), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_ready_fails_after_max_attempts() {
        let init = Initializer::from_settings(|| false, &InitSettings::default());
        assert_matches!(
            init.wait_ready().await,
            Err(EngineError::HostUnavailable { attempts: 20 })
        );
        assert_eq!(init.state(), InitState::Failed { attempts: 20 });
    }
}
