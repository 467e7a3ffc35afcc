//! Error types for the document model and selector parsing.

use thiserror::Error;

use crate::dom::NodeId;

/// Errors raised by [`Document`](crate::dom::Document) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The id does not refer to a node of this document.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The node exists but is no longer attached under the document root.
    #[error("node {0} is detached from the document")]
    Detached(NodeId),

    /// The operation needs an element but the node is a text node.
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// Inserting the node would make it its own ancestor.
    #[error("cannot insert {child} under {parent}: would create a cycle")]
    Cycle {
        /// Node being inserted.
        child: NodeId,
        /// Intended parent.
        parent: NodeId,
    },

    /// The reference node passed to an insert is not a child of the parent.
    #[error("{reference} is not a child of {parent}")]
    NotAChild {
        /// Reference sibling.
        reference: NodeId,
        /// Parent it was expected under.
        parent: NodeId,
    },
}

/// Errors raised while parsing a selector string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Blank selector string.
    #[error("empty selector")]
    Empty,

    /// The CSS selector parser rejected the text.
    #[error("invalid selector {input:?}: {reason}")]
    Invalid {
        /// Full selector text.
        input: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// Result alias for document operations.
pub type Result<T> = std::result::Result<T, DomError>;
