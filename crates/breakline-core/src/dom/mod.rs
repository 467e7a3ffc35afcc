//! Arena document tree.
//!
//! [`Document`] owns every node in a flat arena addressed by [`NodeId`].
//! Removing a node only detaches it: the id stays valid and the detached
//! subtree can still be inspected, which is how a mutation observer sees
//! removed content.
//!
//! Structural changes (append, insert, remove) are recorded as
//! [`MutationRecord`]s while recording is enabled, mirroring a
//! `childList` + `subtree` DOM observer. Attribute and display changes are
//! never recorded, so the engine's own writes cannot feed back into the
//! watcher.

mod html;
mod mutation;

pub use mutation::MutationRecord;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{DomError, Result};
use crate::selector::SelectorList;

/// Tag of the root element every document starts with.
pub const ROOT_TAG: &str = "body";

/// Opaque handle to a node of a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Build an id from its arena index.
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Arena index of this id.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    name: String,
    attrs: Vec<(String, String)>,
    display: Option<String>,
}

impl ElementData {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
            display: None,
        }
    }

    /// Lowercased tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in insertion order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Value of one attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the whitespace-separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    /// Inline `display` value, `None` when unset.
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }
}

/// Node payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    /// An element with a tag name and attributes.
    Element(ElementData),
    /// A text node.
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Mutable document tree rooted at a `body` element.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    recording: bool,
    pending: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root element.
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element(ElementData::new(ROOT_TAG)),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            recording: false,
            pending: Vec::new(),
        }
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total number of nodes ever created, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds only the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(el) => Ok(el),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    // ── Construction ────────────────────────────────────────────────────

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(name)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_owned()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Append `child` as the last child of `parent`, detaching it first if
    /// it already has a parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference` (or last when
    /// `reference` is `None`).
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        let _ = self.element_mut(parent)?;
        let _ = self.node(child)?;
        if child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(DomError::Cycle { child, parent });
        }
        if let Some(reference) = reference {
            if self.node(reference)?.parent != Some(parent) || reference == child {
                return Err(DomError::NotAChild { reference, parent });
            }
        }

        if self.node(child)?.parent.is_some() {
            self.remove(child)?;
        }

        let node = self.node_mut(parent)?;
        let position = reference
            .and_then(|r| node.children.iter().position(|&c| c == r))
            .unwrap_or(node.children.len());
        node.children.insert(position, child);
        self.node_mut(child)?.parent = Some(parent);

        if self.recording {
            self.pending.push(MutationRecord::added(parent, vec![child]));
        }
        Ok(())
    }

    /// Detach `node` from its parent. Detaching a node without a parent is
    /// a no-op.
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        let Some(parent) = self.node(node)?.parent else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|&c| c != node);
        self.node_mut(node)?.parent = None;

        if self.recording {
            self.pending.push(MutationRecord::removed(parent, vec![node]));
        }
        Ok(())
    }

    /// Replace the content of a text node. Not a structural change.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<()> {
        match &mut self.node_mut(node)?.data {
            NodeData::Text(t) => {
                text.clone_into(t);
                Ok(())
            }
            NodeData::Element(_) => Err(DomError::NotAnElement(node)),
        }
    }

    // ── Mutation recording ──────────────────────────────────────────────

    /// Start or stop recording structural mutations.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
        if !recording {
            self.pending.clear();
        }
    }

    /// Whether structural mutations are being recorded.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Drain the mutations recorded since the last call, as one batch.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending)
    }

    // ── Navigation ──────────────────────────────────────────────────────

    /// Whether the id refers to a node of this document.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(id) && (id == self.root || self.ancestors(id).any(|a| a == self.root))
    }

    /// Fail with [`DomError`] unless the node exists and is attached.
    pub fn ensure_attached(&self, id: NodeId) -> Result<()> {
        let _ = self.node(id)?;
        if self.is_attached(id) {
            Ok(())
        } else {
            Err(DomError::Detached(id))
        }
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Children of a node, empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map_or(&[][..], |n| n.children.as_slice())
    }

    /// Next sibling in the parent's child list.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|&c| c == id)?;
        siblings.get(position + 1).copied()
    }

    /// Previous sibling in the parent's child list.
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|&c| c == id)?;
        position.checked_sub(1).map(|p| siblings[p])
    }

    /// Ancestors from the parent up to the topmost node (self excluded).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Descendants of `id` in document order (self excluded).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    // ── Node data ───────────────────────────────────────────────────────

    /// Payload of a node.
    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).map(|n| &n.data)
    }

    /// Element payload, `None` for text nodes and unknown ids.
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.data(id)? {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    /// Tag name of an element.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(ElementData::name)
    }

    /// Whether the node is an element with the given tag.
    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id).is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Content of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Text(t) => Some(t),
            NodeData::Element(_) => None,
        }
    }

    /// Whether the node is a text node holding only whitespace.
    pub fn is_whitespace_text(&self, id: NodeId) -> bool {
        self.text(id).is_some_and(|t| t.trim().is_empty())
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(t) = self.text(id) {
            return t.to_owned();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.text(d))
            .collect()
    }

    /// Attribute value of an element.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    /// Set (or overwrite) an attribute. Not a structural change.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        let el = self.element_mut(id)?;
        match el.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => value.clone_into(v),
            None => el.attrs.push((name.to_owned(), value.to_owned())),
        }
        Ok(())
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<Option<String>> {
        let el = self.element_mut(id)?;
        let position = el.attrs.iter().position(|(k, _)| k == name);
        Ok(position.map(|p| el.attrs.remove(p).1))
    }

    /// Inline `display` value of an element.
    pub fn display(&self, id: NodeId) -> Option<&str> {
        self.element(id)?.display()
    }

    /// Set or clear the inline `display` value of an element.
    pub fn set_display(&mut self, id: NodeId, display: Option<&str>) -> Result<()> {
        self.element_mut(id)?.display = display.map(str::to_owned);
        Ok(())
    }

    /// Whether the element is hidden through its inline display.
    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.display(id) == Some("none")
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Descendants of `scope` matching any selector of `selectors`, in
    /// document order. `scope` itself is never returned.
    pub fn select(&self, scope: NodeId, selectors: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&d| selectors.matches(self, d))
            .collect()
    }

    /// Nearest ancestor-or-self matching `selectors`.
    pub fn closest(&self, id: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| selectors.matches(self, n))
    }

    /// Descendant elements of `scope` with the given tag, in document order.
    pub fn elements_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&d| self.is_tag(d, tag))
            .collect()
    }
}

/// Iterator returned by [`Document::ancestors`].
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}
