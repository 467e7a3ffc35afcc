//! Marker classification.
//!
//! Pure decision logic: given the markers of one scope and the active
//! [`PolicySet`], decide which markers are hidden and which rule decided.
//! Nothing here mutates the document.
//!
//! Two strategies exist (see [`ClassifierStrategy`]):
//!
//! - **layered**: leading, merge-consecutive and smart-external rules applied
//!   in that order, each able to hide only a still-visible marker;
//! - **text neighbours**: keep a marker only when both its significant
//!   siblings are textual.
//!
//! Both strategies are dominated by the two hide-all switches.

mod layered;
mod neighbors;
mod nodes;

pub use nodes::{BLOCK_CONTEXT_TAGS, Significance, TEXTUAL_TAGS, is_block_context, significance};

use std::fmt;
use std::str::FromStr;

use breakline_core::{Document, NodeId};
use breakline_settings::{ClassifierStrategy, PolicySet};
use serde::{Deserialize, Serialize};

/// Rule responsible for a marker's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    /// `hideAllGlobal` hid every marker of the document.
    GlobalHideAll,
    /// `hideAllInScope` hid every marker of the scope.
    ScopeHideAll,
    /// Reached before any text in the scope.
    Leading,
    /// Follows another marker with only whitespace between them.
    MergeConsecutive,
    /// Not inside any block-context wrapper below the scope.
    SmartExternalNaked,
    /// Inside a block-context wrapper; kept even if an earlier rule hid it.
    SmartExternalWrapped,
    /// No rule applied.
    Kept,
    /// Hidden by the text-neighbours strategy.
    TextNeighbors,
}

impl Rule {
    /// Every rule tag.
    pub const ALL: [Self; 8] = [
        Self::GlobalHideAll,
        Self::ScopeHideAll,
        Self::Leading,
        Self::MergeConsecutive,
        Self::SmartExternalNaked,
        Self::SmartExternalWrapped,
        Self::Kept,
        Self::TextNeighbors,
    ];

    /// Tag stored in the marker's rule attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GlobalHideAll => "globalHideAll",
            Self::ScopeHideAll => "scopeHideAll",
            Self::Leading => "leading",
            Self::MergeConsecutive => "mergeConsecutive",
            Self::SmartExternalNaked => "smartExternalNaked",
            Self::SmartExternalWrapped => "smartExternalWrapped",
            Self::Kept => "kept",
            Self::TextNeighbors => "textNeighbors",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rule| rule.as_str() == s)
            .ok_or_else(|| format!("unknown rule tag: {s}"))
    }
}

/// Decision for one marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the marker should be hidden.
    pub hidden: bool,
    /// Rule that decided.
    pub rule: Rule,
}

impl Verdict {
    /// Hidden by `rule`.
    pub const fn hide(rule: Rule) -> Self {
        Self { hidden: true, rule }
    }

    /// Visible, decided by `rule`.
    pub const fn keep(rule: Rule) -> Self {
        Self {
            hidden: false,
            rule,
        }
    }
}

/// Classifies the markers of a scope.
#[derive(Clone, Debug)]
pub struct Classifier {
    marker_tag: String,
}

impl Classifier {
    /// Classifier for markers with the given tag name.
    pub fn new(marker_tag: impl Into<String>) -> Self {
        Self {
            marker_tag: marker_tag.into().to_ascii_lowercase(),
        }
    }

    /// Marker tag name.
    pub fn marker_tag(&self) -> &str {
        &self.marker_tag
    }

    /// Markers of `scope` in document order.
    pub fn markers(&self, doc: &Document, scope: NodeId) -> Vec<NodeId> {
        doc.elements_by_tag(scope, &self.marker_tag)
    }

    /// Verdict for every marker of `scope`, in document order.
    pub fn classify_scope(
        &self,
        doc: &Document,
        scope: NodeId,
        policy: &PolicySet,
    ) -> Vec<(NodeId, Verdict)> {
        let markers = self.markers(doc, scope);
        let dominant = if policy.hide_all_global {
            Some(Rule::GlobalHideAll)
        } else if policy.hide_all_in_scope {
            Some(Rule::ScopeHideAll)
        } else {
            None
        };
        if let Some(rule) = dominant {
            return markers.into_iter().map(|m| (m, Verdict::hide(rule))).collect();
        }

        let verdicts = match policy.strategy {
            ClassifierStrategy::Layered => {
                layered::classify(doc, scope, &markers, policy, &self.marker_tag)
            }
            ClassifierStrategy::TextNeighbors => {
                neighbors::classify(doc, &markers, &self.marker_tag)
            }
        };
        markers.into_iter().zip(verdicts).collect()
    }

    /// Verdict for one marker of `scope`.
    ///
    /// Returns `None` when `marker` is not a marker inside `scope`, unless
    /// `hideAllGlobal` is set, which ignores the scope entirely.
    pub fn classify(
        &self,
        doc: &Document,
        marker: NodeId,
        scope: NodeId,
        policy: &PolicySet,
    ) -> Option<Verdict> {
        if policy.hide_all_global {
            return doc
                .is_tag(marker, &self.marker_tag)
                .then_some(Verdict::hide(Rule::GlobalHideAll));
        }
        self.classify_scope(doc, scope, policy)
            .into_iter()
            .find(|(m, _)| *m == marker)
            .map(|(_, verdict)| verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope_of(html: &str) -> (Document, NodeId) {
        let doc = Document::from_html(&format!("<div class=\"mes_text\">{html}</div>"));
        let scope = doc.children(doc.root())[0];
        (doc, scope)
    }

    fn hidden_rules(html: &str, policy: &PolicySet) -> Vec<Option<Rule>> {
        let (doc, scope) = scope_of(html);
        Classifier::new("br")
            .classify_scope(&doc, scope, policy)
            .into_iter()
            .map(|(_, v)| v.hidden.then_some(v.rule))
            .collect()
    }

    #[test]
    fn rule_tags_round_trip_through_from_str() {
        for rule in Rule::ALL {
            assert_eq!(rule.as_str().parse::<Rule>().unwrap(), rule);
        }
        assert!("nope".parse::<Rule>().is_err());
    }

    #[test]
    fn rule_serializes_camel_case() {
        let json = serde_json::to_string(&Rule::SmartExternalNaked).unwrap();
        assert_eq!(json, "\"smartExternalNaked\"");
    }

    #[test]
    fn default_policy_keeps_everything() {
        let rules = hidden_rules("<br>A<br><br>B<br>", &PolicySet::default());
        assert_eq!(rules, vec![None; 4]);
    }

    #[test]
    fn scope_hide_all_dominates_other_switches() {
        let policy = PolicySet {
            hide_all_in_scope: true,
            smart_external: true,
            ..PolicySet::default()
        };
        let rules = hidden_rules("<p>A<br>B</p>C<br>D", &policy);
        assert_eq!(rules, vec![Some(Rule::ScopeHideAll); 2]);
    }

    #[test]
    fn global_hide_all_dominates_scope_hide_all() {
        let policy = PolicySet {
            hide_all_global: true,
            hide_all_in_scope: true,
            ..PolicySet::default()
        };
        let rules = hidden_rules("A<br>B", &policy);
        assert_eq!(rules, vec![Some(Rule::GlobalHideAll)]);
    }

    #[test]
    fn global_hide_all_ignores_scope_for_single_marker() {
        let doc = Document::from_html("<br><div class=\"mes_text\">A</div>");
        let marker = doc.children(doc.root())[0];
        let scope = doc.children(doc.root())[1];
        let policy = PolicySet {
            hide_all_global: true,
            ..PolicySet::default()
        };
        let classifier = Classifier::new("br");
        assert_eq!(
            classifier.classify(&doc, marker, scope, &policy),
            Some(Verdict::hide(Rule::GlobalHideAll))
        );
        assert_eq!(
            classifier.classify(&doc, marker, scope, &PolicySet::default()),
            None
        );
    }

    #[test]
    fn classify_single_marker_matches_scope_wide_verdict() {
        let (doc, scope) = scope_of("A<br><br>B");
        let policy = PolicySet {
            merge_consecutive: true,
            ..PolicySet::default()
        };
        let classifier = Classifier::new("BR");
        let markers = classifier.markers(&doc, scope);
        assert_eq!(
            classifier.classify(&doc, markers[1], scope, &policy),
            Some(Verdict::hide(Rule::MergeConsecutive))
        );
        assert_eq!(
            classifier.classify(&doc, markers[0], scope, &policy),
            Some(Verdict::keep(Rule::Kept))
        );
    }

    #[test]
    fn strategy_switch_selects_text_neighbors() {
        let policy = PolicySet {
            strategy: ClassifierStrategy::TextNeighbors,
            ..PolicySet::default()
        };
        let rules = hidden_rules("<br>A<br>B", &policy);
        assert_eq!(rules, vec![Some(Rule::TextNeighbors), None]);
    }
}
