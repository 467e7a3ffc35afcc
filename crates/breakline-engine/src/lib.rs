//! # breakline-engine
//!
//! Decides which line-break markers of a live document are hidden, and keeps
//! that decision current as the document changes.
//!
//! - [`classifier`]: pure per-scope verdicts from the active policy
//! - [`tracker`]: reversible writes of marker visibility
//! - [`engine`]: single-flight application runs over all scopes
//! - [`scheduler`] / [`timer`]: trailing-debounce run scheduling
//! - [`watcher`]: structural mutation batches to engine work
//! - [`bridge`]: host lifecycle signals to engine work
//! - [`panel`]: toggle / persist / apply controller
//! - [`init`]: bounded host-readiness probing
//! - [`service`]: assembly and lifecycle of all of the above

#![deny(unsafe_code)]

pub mod bridge;
pub mod classifier;
pub mod context;
pub mod engine;
pub mod errors;
pub mod init;
pub mod panel;
pub mod scheduler;
pub mod service;
pub mod timer;
pub mod tracker;
pub mod watcher;

pub use bridge::{EventBridge, HostSignal, SignalKind};
pub use classifier::{Classifier, Rule, Verdict};
pub use context::{EngineContext, RunGuard, RunStats};
pub use engine::{RuleEngine, RunOutcome, RunReport, RunSource};
pub use errors::{EngineError, Result};
pub use init::{HostProbe, InitState, Initializer};
pub use panel::{LogNotifier, Notice, NoticeLevel, Notifier, SettingsPanel, Toggle};
pub use scheduler::Scheduler;
pub use service::{Breakline, RunningService};
pub use timer::DebounceTimer;
pub use tracker::MarkerTracker;
pub use watcher::{MutationBatch, MutationWatcher, SubtreeChange};
