use super::NodeId;

/// One structural change reported by a [`Document`](super::Document).
///
/// Shaped like a DOM `childList` record: `target` is the parent whose child
/// list changed. Removed nodes stay inspectable (they are detached, not
/// dropped), so consumers can look inside a removed subtree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    /// Parent whose children changed.
    pub target: NodeId,
    /// Nodes inserted under `target`.
    pub added: Vec<NodeId>,
    /// Nodes detached from `target`.
    pub removed: Vec<NodeId>,
}

impl MutationRecord {
    /// Record for nodes inserted under `target`.
    pub fn added(target: NodeId, nodes: Vec<NodeId>) -> Self {
        Self {
            target,
            added: nodes,
            removed: Vec::new(),
        }
    }

    /// Record for nodes detached from `target`.
    pub fn removed(target: NodeId, nodes: Vec<NodeId>) -> Self {
        Self {
            target,
            added: Vec::new(),
            removed: nodes,
        }
    }
}
