//! Marker state tracking.
//!
//! The tracker owns every write the engine makes to the document. All state
//! lives on the marker element itself:
//!
//! - [`PROCESSED_ATTR`]: set once the engine has decided the marker
//! - [`ORIGINAL_DISPLAY_ATTR`]: inline display before hiding (`""` = unset)
//! - [`RULE_ATTR`]: tag of the deciding rule
//!
//! so a later run (or a different process reading serialized output) can
//! always put the marker back exactly as the host left it.

use breakline_core::{Document, NodeId};
use tracing::trace;

use crate::classifier::Rule;
use crate::errors::{EngineError, Result};

/// Set on every marker the engine has touched.
pub const PROCESSED_ATTR: &str = "data-br-processed";
/// Snapshot of the inline display taken before hiding.
pub const ORIGINAL_DISPLAY_ATTR: &str = "data-br-original-display";
/// Rule that last decided the marker.
pub const RULE_ATTR: &str = "data-br-rule";

const HIDDEN: &str = "none";

/// Applies and reverts marker visibility.
#[derive(Clone, Debug)]
pub struct MarkerTracker {
    marker_tag: String,
}

impl MarkerTracker {
    /// Tracker for markers with the given tag name.
    pub fn new(marker_tag: impl Into<String>) -> Self {
        Self {
            marker_tag: marker_tag.into().to_ascii_lowercase(),
        }
    }

    /// Whether the engine has touched this marker since its last restore.
    pub fn is_processed(doc: &Document, marker: NodeId) -> bool {
        doc.attr(marker, PROCESSED_ATTR).is_some()
    }

    /// Rule recorded on a processed marker.
    pub fn rule_of(doc: &Document, marker: NodeId) -> Option<Rule> {
        doc.attr(marker, RULE_ATTR)?.parse().ok()
    }

    /// Hide a marker, snapshotting its display first.
    ///
    /// The snapshot is only taken when none exists yet, so hiding twice in
    /// one cycle keeps the host's original value.
    pub fn snapshot_and_hide(&self, doc: &mut Document, marker: NodeId, rule: Rule) -> Result<()> {
        if doc.attr(marker, ORIGINAL_DISPLAY_ATTR).is_none() {
            let original = doc.display(marker).unwrap_or_default().to_owned();
            doc.set_attr(marker, ORIGINAL_DISPLAY_ATTR, &original)?;
        }
        doc.set_display(marker, Some(HIDDEN))?;
        Self::stamp(doc, marker, rule)?;
        trace!(marker = %marker, rule = %rule, "marker hidden");
        Ok(())
    }

    /// Mark a marker as decided-visible, undoing any hide from this cycle.
    pub fn keep(&self, doc: &mut Document, marker: NodeId, rule: Rule) -> Result<()> {
        if let Some(original) = doc.remove_attr(marker, ORIGINAL_DISPLAY_ATTR)? {
            doc.set_display(marker, non_empty(&original))?;
        }
        Self::stamp(doc, marker, rule)
    }

    /// Put a marker back to its pre-engine state and clear all tracking.
    ///
    /// Returns `false` when the marker was not processed.
    pub fn restore(&self, doc: &mut Document, marker: NodeId) -> Result<bool> {
        if !Self::is_processed(doc, marker) {
            return Ok(false);
        }
        match doc.remove_attr(marker, ORIGINAL_DISPLAY_ATTR)? {
            Some(original) => doc.set_display(marker, non_empty(&original))?,
            None if doc.is_hidden(marker) => doc.set_display(marker, None)?,
            None => {}
        }
        let _ = doc.remove_attr(marker, PROCESSED_ATTR)?;
        let _ = doc.remove_attr(marker, RULE_ATTR)?;
        Ok(true)
    }

    /// Restore every processed marker under `scope`; returns how many.
    pub fn revert_scope(&self, doc: &mut Document, scope: NodeId) -> Result<usize> {
        if !doc.is_attached(scope) {
            return Err(EngineError::StaleScope(scope));
        }
        let mut restored = 0;
        for marker in doc.elements_by_tag(scope, &self.marker_tag) {
            if self.restore(doc, marker)? {
                restored += 1;
            }
        }
        Ok(restored)
    }

    fn stamp(doc: &mut Document, marker: NodeId, rule: Rule) -> Result<()> {
        doc.set_attr(marker, PROCESSED_ATTR, "1")?;
        doc.set_attr(marker, RULE_ATTR, rule.as_str())?;
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}
