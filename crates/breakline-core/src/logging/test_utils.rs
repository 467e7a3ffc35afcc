//! Event capture for tests.
//!
//! [`capture_logs`] installs a thread-local subscriber that records every
//! event into a [`CapturedLogs`] buffer. Field values are rendered the way
//! the compact formatter prints them, so `%x` and `?x` fields compare as
//! plain strings.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// One recorded event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedEvent {
    /// Severity.
    pub level: Level,
    /// Emitting module path.
    pub target: String,
    /// The event's message, empty when it had none.
    pub message: String,
    /// Remaining fields by name.
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    /// Rendered value of field `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Cloneable handle on the capture buffer.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// Everything recorded so far, oldest first.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.buffer().clone()
    }

    /// Events at exactly `level`.
    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.buffer()
            .iter()
            .filter(|event| event.level == level)
            .cloned()
            .collect()
    }

    /// Whether some event at `level` has a message containing `text`.
    pub fn has_event(&self, level: Level, text: &str) -> bool {
        self.buffer()
            .iter()
            .any(|event| event.level == level && event.message.contains(text))
    }

    /// Number of events at `level`.
    pub fn count_at_level(&self, level: Level) -> usize {
        self.at_level(level).len()
    }

    /// First event whose message contains `text`.
    pub fn find(&self, text: &str) -> Option<CapturedEvent> {
        self.buffer()
            .iter()
            .find(|event| event.message.contains(text))
            .cloned()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.buffer().clear();
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<CapturedEvent>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CapturedLogs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedLogs")
            .field("events", &self.buffer().len())
            .finish()
    }
}

#[derive(Default)]
struct Fields {
    message: Option<String>,
    rest: BTreeMap<String, String>,
}

impl Fields {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            let _ = self.rest.insert(field.name().to_owned(), value);
        }
    }
}

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

struct Recorder(CapturedLogs);

impl<S: Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);

        let meta = event.metadata();
        self.0.buffer().push(CapturedEvent {
            level: *meta.level(),
            target: meta.target().to_owned(),
            message: fields.message.unwrap_or_default(),
            fields: fields.rest,
        });
    }
}

/// Record every event emitted on this thread until the guard drops.
///
/// Tokio tests must stay on the current-thread runtime (the default) for
/// spawned tasks to log into the same buffer.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let guard = tracing_subscriber::registry()
        .with(Recorder(logs.clone()))
        .set_default();
    (logs, guard)
}
