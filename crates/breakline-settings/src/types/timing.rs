//! Scheduling delays.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delays between a trigger and the engine run it schedules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimingSettings {
    /// Trailing debounce for structural mutations.
    pub mutation_debounce_ms: u64,
    /// Settle delay after an edit control disappears.
    pub edit_settle_ms: u64,
    /// Delay after a settings toggle changes.
    pub settings_change_ms: u64,
    /// Per-signal delays for host lifecycle events.
    pub signals: SignalDelays,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            mutation_debounce_ms: 300,
            edit_settle_ms: 100,
            settings_change_ms: 10,
            signals: SignalDelays::default(),
        }
    }
}

impl TimingSettings {
    /// [`Self::mutation_debounce_ms`] as a duration.
    pub fn mutation_debounce(&self) -> Duration {
        Duration::from_millis(self.mutation_debounce_ms)
    }

    /// [`Self::edit_settle_ms`] as a duration.
    pub fn edit_settle(&self) -> Duration {
        Duration::from_millis(self.edit_settle_ms)
    }

    /// [`Self::settings_change_ms`] as a duration.
    pub fn settings_change(&self) -> Duration {
        Duration::from_millis(self.settings_change_ms)
    }
}

/// Delay per host lifecycle signal, long enough for host-side rendering
/// to finish before the engine reads the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignalDelays {
    /// A user message was sent.
    pub message_sent_ms: u64,
    /// A model message was received.
    pub message_received_ms: u64,
    /// A message was swiped or regenerated.
    pub message_swiped_ms: u64,
    /// A message edit was committed.
    pub message_edited_ms: u64,
    /// The active chat changed.
    pub chat_changed_ms: u64,
    /// Host settings were saved.
    pub settings_updated_ms: u64,
}

impl Default for SignalDelays {
    fn default() -> Self {
        Self {
            message_sent_ms: 150,
            message_received_ms: 100,
            message_swiped_ms: 200,
            message_edited_ms: 150,
            chat_changed_ms: 500,
            settings_updated_ms: 50,
        }
    }
}
