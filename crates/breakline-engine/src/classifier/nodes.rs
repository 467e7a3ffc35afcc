//! Node significance tables.

use breakline_core::{Document, NodeId};

/// Inline elements that count as text when deciding a marker's context.
pub const TEXTUAL_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "del", "dfn", "em", "i", "img", "ins",
    "kbd", "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var",
];

/// Ancestors that make a marker "wrapped" for the smart-external rule.
pub const BLOCK_CONTEXT_TAGS: &[&str] = &[
    "p",
    "div",
    "li",
    "blockquote",
    "pre",
    "td",
    "th",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "dd",
    "dt",
    "figcaption",
];

/// How a node counts when scanning around a marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Significance {
    /// Whitespace-only text (or an unknown id).
    Skip,
    /// Non-empty text or an inline text-bearing element.
    Textual,
    /// Another marker.
    Marker,
    /// Any other element: block-level or special content.
    Wrapper,
}

/// Classify a node for context scans.
pub fn significance(doc: &Document, node: NodeId, marker_tag: &str) -> Significance {
    if let Some(text) = doc.text(node) {
        return if text.trim().is_empty() {
            Significance::Skip
        } else {
            Significance::Textual
        };
    }
    match doc.tag_name(node) {
        None => Significance::Skip,
        Some(tag) if tag == marker_tag => Significance::Marker,
        Some(tag) if TEXTUAL_TAGS.contains(&tag) => Significance::Textual,
        Some(_) => Significance::Wrapper,
    }
}

/// Whether the node is a block-context wrapper element.
pub fn is_block_context(doc: &Document, node: NodeId) -> bool {
    doc.tag_name(node)
        .is_some_and(|tag| BLOCK_CONTEXT_TAGS.contains(&tag))
}
