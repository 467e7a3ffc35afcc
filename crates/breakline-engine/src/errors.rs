//! Engine error types.

use breakline_core::NodeId;
use breakline_core::errors::{DomError, SelectorError};
use breakline_settings::SettingsError;
use thiserror::Error;

/// Errors raised by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A document operation failed (stale or detached node).
    #[error(transparent)]
    Dom(#[from] DomError),

    /// A configured selector could not be parsed.
    #[error("invalid {kind} selector: {source}")]
    Selector {
        /// Which configured selector list was rejected.
        kind: &'static str,
        /// Parse failure.
        #[source]
        source: SelectorError,
    },

    /// The configured marker tag is empty or not a tag name.
    #[error("invalid marker tag: {0:?}")]
    MarkerTag(String),

    /// Reading or writing settings failed.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// A scope node is no longer part of the document.
    #[error("scope {0} is not attached to the document")]
    StaleScope(NodeId),

    /// The host never became ready.
    #[error("host not ready after {attempts} attempts")]
    HostUnavailable {
        /// Probes made before giving up.
        attempts: u32,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
