//! Host lifecycle signal bridge.
//!
//! Subscribes to the host's signal broadcast and schedules runs with a
//! per-signal delay. Conversation switches and host settings changes reload
//! the policy from the store before scheduling.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use breakline_core::NodeId;
use breakline_settings::{PolicyStore, SignalDelays, load_or_default};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::RunSource;
use crate::scheduler::Scheduler;

/// Lifecycle signals emitted by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalKind {
    /// The user sent a message.
    MessageSent,
    /// A reply was rendered.
    MessageReceived,
    /// An alternative reply was selected.
    MessageSwiped,
    /// A message was edited in place.
    MessageEdited,
    /// A different conversation was opened.
    ChatChanged,
    /// The host's settings were saved.
    SettingsUpdated,
}

impl SignalKind {
    /// Every signal kind.
    pub const ALL: [Self; 6] = [
        Self::MessageSent,
        Self::MessageReceived,
        Self::MessageSwiped,
        Self::MessageEdited,
        Self::ChatChanged,
        Self::SettingsUpdated,
    ];

    /// Signal name as the host emits it.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MessageSent => "messageSent",
            Self::MessageReceived => "messageReceived",
            Self::MessageSwiped => "messageSwiped",
            Self::MessageEdited => "messageEdited",
            Self::ChatChanged => "chatChanged",
            Self::SettingsUpdated => "settingsUpdated",
        }
    }

    /// Configured delay before the run this signal triggers.
    pub fn delay(self, delays: &SignalDelays) -> Duration {
        let ms = match self {
            Self::MessageSent => delays.message_sent_ms,
            Self::MessageReceived => delays.message_received_ms,
            Self::MessageSwiped => delays.message_swiped_ms,
            Self::MessageEdited => delays.message_edited_ms,
            Self::ChatChanged => delays.chat_changed_ms,
            Self::SettingsUpdated => delays.settings_updated_ms,
        };
        Duration::from_millis(ms)
    }

    /// Whether the policy is reloaded from the store first.
    pub fn reloads_policy(self) -> bool {
        matches!(self, Self::ChatChanged | Self::SettingsUpdated)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SignalKind> for RunSource {
    fn from(kind: SignalKind) -> Self {
        match kind {
            SignalKind::MessageSent => Self::MessageSent,
            SignalKind::MessageReceived => Self::MessageReceived,
            SignalKind::MessageSwiped => Self::MessageSwiped,
            SignalKind::MessageEdited => Self::MessageEdited,
            SignalKind::ChatChanged => Self::ChatChanged,
            SignalKind::SettingsUpdated => Self::SettingsUpdated,
        }
    }
}

/// One host signal. A `scope` restricts the resulting run to that scope when
/// the node matches the configured scope selectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSignal {
    /// What happened.
    pub kind: SignalKind,
    /// Scope the signal concerns, if the host named one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<NodeId>,
}

impl HostSignal {
    /// Signal concerning the whole document.
    pub const fn new(kind: SignalKind) -> Self {
        Self { kind, scope: None }
    }

    /// Signal concerning one scope.
    pub const fn scoped(kind: SignalKind, scope: NodeId) -> Self {
        Self {
            kind,
            scope: Some(scope),
        }
    }
}

/// Forwards host signals to the scheduler.
pub struct EventBridge {
    scheduler: Arc<Scheduler>,
    store: Arc<dyn PolicyStore>,
}

impl EventBridge {
    /// Bridge scheduling through `scheduler`, reloading policy from `store`.
    pub fn new(scheduler: Arc<Scheduler>, store: Arc<dyn PolicyStore>) -> Self {
        Self { scheduler, store }
    }

    /// React to one signal.
    pub fn handle(&self, signal: HostSignal) {
        let ctx = self.scheduler.engine().context();
        if signal.kind.reloads_policy() {
            let policy = load_or_default(self.store.as_ref());
            debug!(signal = %signal.kind, ?policy, "policy reloaded");
            ctx.set_policy(policy);
        }
        let target = signal.scope.filter(|&scope| {
            let is_scope = ctx.scope_selectors().matches(&ctx.document().lock(), scope);
            if !is_scope {
                warn!(
                    signal = %signal.kind,
                    node = %scope,
                    "signal names a non-scope node, running in full"
                );
            }
            is_scope
        });
        let delay = signal.kind.delay(&ctx.settings().timing.signals);
        self.scheduler
            .schedule(RunSource::from(signal.kind), delay, target);
    }

    /// Spawn a task consuming `rx` until the channel closes or `cancel` fires.
    pub fn start(
        self: Arc<Self>,
        mut rx: broadcast::Receiver<HostSignal>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    () = cancel.cancelled() => break,
                    received = rx.recv() => received,
                };
                match received {
                    Ok(signal) => self.handle(signal),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event bridge lagged, dropped signals");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("event bridge channel closed");
                        break;
                    }
                }
            }
        })
    }
}

impl fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBridge").finish_non_exhaustive()
    }
}
