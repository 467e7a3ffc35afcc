//! The persisted policy set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SettingsError;

/// How markers are classified once neither hide-all switch applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassifierStrategy {
    /// Leading, merge-consecutive and smart-external rules, in that order.
    #[default]
    Layered,
    /// Keep a marker only when both significant neighbours are textual.
    TextNeighbors,
}

impl ClassifierStrategy {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Layered => "layered",
            Self::TextNeighbors => "textNeighbors",
        }
    }
}

impl fmt::Display for ClassifierStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierStrategy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "layered" => Ok(Self::Layered),
            "textNeighbors" | "text-neighbors" => Ok(Self::TextNeighbors),
            other => Err(SettingsError::InvalidValue(format!(
                "unknown classifier strategy {other:?}"
            ))),
        }
    }
}

/// Switches controlling which hiding rules are active.
///
/// `hide_all_global` dominates everything; `hide_all_in_scope` dominates the
/// remaining switches within a scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicySet {
    /// Hide every marker in the document.
    pub hide_all_global: bool,
    /// Hide every marker inside message scopes.
    pub hide_all_in_scope: bool,
    /// Hide markers that precede any text in their scope.
    pub hide_leading: bool,
    /// Collapse runs of consecutive markers to one.
    pub merge_consecutive: bool,
    /// Experimental: hide markers not wrapped by a block element.
    pub smart_external: bool,
    /// Classification strategy.
    pub strategy: ClassifierStrategy,
}

impl PolicySet {
    /// Read one switch.
    pub fn get(&self, field: PolicyField) -> bool {
        match field {
            PolicyField::HideAllGlobal => self.hide_all_global,
            PolicyField::HideAllInScope => self.hide_all_in_scope,
            PolicyField::HideLeading => self.hide_leading,
            PolicyField::MergeConsecutive => self.merge_consecutive,
            PolicyField::SmartExternal => self.smart_external,
        }
    }

    /// Write one switch.
    pub fn set(&mut self, field: PolicyField, value: bool) {
        let slot = match field {
            PolicyField::HideAllGlobal => &mut self.hide_all_global,
            PolicyField::HideAllInScope => &mut self.hide_all_in_scope,
            PolicyField::HideLeading => &mut self.hide_leading,
            PolicyField::MergeConsecutive => &mut self.merge_consecutive,
            PolicyField::SmartExternal => &mut self.smart_external,
        };
        *slot = value;
    }

    /// Whether any switch is on.
    pub fn any_enabled(&self) -> bool {
        PolicyField::ALL.iter().any(|&f| self.get(f))
    }
}

/// Names of the boolean switches of a [`PolicySet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyField {
    /// `hideAllGlobal`
    HideAllGlobal,
    /// `hideAllInScope`
    HideAllInScope,
    /// `hideLeading`
    HideLeading,
    /// `mergeConsecutive`
    MergeConsecutive,
    /// `smartExternal`
    SmartExternal,
}

impl PolicyField {
    /// Every field, in settings-panel order.
    pub const ALL: [Self; 5] = [
        Self::HideAllGlobal,
        Self::HideAllInScope,
        Self::HideLeading,
        Self::MergeConsecutive,
        Self::SmartExternal,
    ];

    /// JSON key of the field.
    pub fn key(self) -> &'static str {
        match self {
            Self::HideAllGlobal => "hideAllGlobal",
            Self::HideAllInScope => "hideAllInScope",
            Self::HideLeading => "hideLeading",
            Self::MergeConsecutive => "mergeConsecutive",
            Self::SmartExternal => "smartExternal",
        }
    }

    /// Human-readable toggle label.
    pub fn label(self) -> &'static str {
        match self {
            Self::HideAllGlobal => "Hide all line breaks on the page",
            Self::HideAllInScope => "Hide all line breaks in chat messages",
            Self::HideLeading => "Hide leading line breaks",
            Self::MergeConsecutive => "Merge consecutive line breaks",
            Self::SmartExternal => "Hide line breaks outside block elements (experimental)",
        }
    }
}

impl fmt::Display for PolicyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PolicyField {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.key() == s || f.key().eq_ignore_ascii_case(&s.replace('-', "")))
            .ok_or_else(|| SettingsError::InvalidValue(format!("unknown policy field {s:?}")))
    }
}
