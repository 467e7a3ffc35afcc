//! Text-neighbours strategy.
//!
//! A marker stays visible only when both its nearest significant siblings
//! are textual. Whitespace and markers already hidden earlier in the pass are
//! looked through, so a run of markers between two text runs collapses to
//! its last member.
//!
//! This is a variant of the strict rule, under which every marker counts as
//! a non-textual neighbour and `A<br><br>B` loses both breaks. Here it keeps
//! the second one.

use std::collections::HashSet;

use breakline_core::{Document, NodeId};

use super::nodes::{Significance, significance};
use super::{Rule, Verdict};

pub(super) fn classify(doc: &Document, markers: &[NodeId], marker_tag: &str) -> Vec<Verdict> {
    let mut hidden: HashSet<NodeId> = HashSet::new();
    let mut verdicts = Vec::with_capacity(markers.len());

    for &marker in markers {
        let before = neighbor(doc, marker, marker_tag, &hidden, Document::previous_sibling);
        let after = neighbor(doc, marker, marker_tag, &hidden, Document::next_sibling);
        let textual = |n: Option<NodeId>| {
            n.is_some_and(|n| significance(doc, n, marker_tag) == Significance::Textual)
        };

        if textual(before) && textual(after) {
            verdicts.push(Verdict::keep(Rule::Kept));
        } else {
            let _ = hidden.insert(marker);
            verdicts.push(Verdict::hide(Rule::TextNeighbors));
        }
    }
    verdicts
}

fn neighbor(
    doc: &Document,
    from: NodeId,
    marker_tag: &str,
    hidden: &HashSet<NodeId>,
    step: fn(&Document, NodeId) -> Option<NodeId>,
) -> Option<NodeId> {
    let mut cursor = step(doc, from);
    while let Some(node) = cursor {
        let skip = match significance(doc, node, marker_tag) {
            Significance::Skip => true,
            Significance::Marker => hidden.contains(&node),
            Significance::Textual | Significance::Wrapper => false,
        };
        if !skip {
            return Some(node);
        }
        cursor = step(doc, node);
    }
    None
}
