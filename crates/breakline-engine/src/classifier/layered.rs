//! Layered strategy: leading, merge-consecutive, smart-external.

use std::collections::HashMap;

use breakline_core::{Document, NodeId};
use breakline_settings::PolicySet;

use super::nodes::{Significance, is_block_context, significance};
use super::{Rule, Verdict};

/// Verdicts for `markers` (the markers of `scope`, in document order).
pub(super) fn classify(
    doc: &Document,
    scope: NodeId,
    markers: &[NodeId],
    policy: &PolicySet,
    marker_tag: &str,
) -> Vec<Verdict> {
    let mut verdicts = vec![Verdict::keep(Rule::Kept); markers.len()];
    let index: HashMap<NodeId, usize> = markers.iter().enumerate().map(|(i, &m)| (m, i)).collect();

    if policy.hide_leading {
        apply_leading(doc, scope, &index, &mut verdicts, marker_tag);
    }
    if policy.merge_consecutive {
        apply_merge(doc, markers, &index, &mut verdicts, marker_tag);
    }
    if policy.smart_external {
        apply_smart_external(doc, scope, markers, &mut verdicts);
    }
    verdicts
}

/// Hide every marker reached before the first textual node of the scope.
fn apply_leading(
    doc: &Document,
    scope: NodeId,
    index: &HashMap<NodeId, usize>,
    verdicts: &mut [Verdict],
    marker_tag: &str,
) {
    for node in doc.descendants(scope) {
        match significance(doc, node, marker_tag) {
            Significance::Textual => break,
            Significance::Marker => {
                if let Some(&i) = index.get(&node) {
                    verdicts[i] = Verdict::hide(Rule::Leading);
                }
            }
            // descendants() is preorder, so wrappers are descended into next
            Significance::Skip | Significance::Wrapper => {}
        }
    }
}

/// From every visible anchor, hide the markers that directly follow it.
fn apply_merge(
    doc: &Document,
    markers: &[NodeId],
    index: &HashMap<NodeId, usize>,
    verdicts: &mut [Verdict],
    marker_tag: &str,
) {
    for (i, &anchor) in markers.iter().enumerate() {
        if verdicts[i].hidden {
            continue;
        }
        let mut cursor = anchor;
        while let Some(next) = next_significant_sibling(doc, cursor, marker_tag) {
            if significance(doc, next, marker_tag) != Significance::Marker {
                break;
            }
            if let Some(&j) = index.get(&next) {
                if !verdicts[j].hidden {
                    verdicts[j] = Verdict::hide(Rule::MergeConsecutive);
                }
            }
            cursor = next;
        }
    }
}

/// Keep wrapped markers, hide naked ones.
fn apply_smart_external(
    doc: &Document,
    scope: NodeId,
    markers: &[NodeId],
    verdicts: &mut [Verdict],
) {
    for (i, &marker) in markers.iter().enumerate() {
        let wrapped = doc
            .ancestors(marker)
            .take_while(|&ancestor| ancestor != scope)
            .any(|ancestor| is_block_context(doc, ancestor));
        if wrapped {
            verdicts[i] = Verdict::keep(Rule::SmartExternalWrapped);
        } else if !verdicts[i].hidden {
            verdicts[i] = Verdict::hide(Rule::SmartExternalNaked);
        }
    }
}

fn next_significant_sibling(doc: &Document, node: NodeId, marker_tag: &str) -> Option<NodeId> {
    let mut cursor = doc.next_sibling(node);
    while let Some(sibling) = cursor {
        if significance(doc, sibling, marker_tag) != Significance::Skip {
            return Some(sibling);
        }
        cursor = doc.next_sibling(sibling);
    }
    None
}
