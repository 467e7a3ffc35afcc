//! CSS selectors over the arena document.
//!
//! Selector strings are parsed with scraper's selector grammar (the same
//! parser `scraper::Selector::parse` uses), so anything scraper accepts is
//! accepted here: combinators, `:not()`, `:is()`, `:has()`, attribute
//! operators and structural pseudo-classes. Matching runs through the
//! `selectors` crate against [`ElementHandle`], a borrowed view of one arena
//! element.

use std::fmt;

use scraper::error::SelectorErrorKind;
use scraper::selector::{CssLocalName, CssString, NonTSPseudoClass, Parser, PseudoElement, Simple};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::bloom::BloomFilter;
use selectors::matching::{
    self, ElementSelectorFlags, MatchingContext, MatchingForInvalidation, MatchingMode,
    NeedsSelectorFlags, QuirksMode, SelectorCaches,
};
use selectors::parser::ParseRelative;
use selectors::{Element, OpaqueElement, SelectorImpl};

use crate::dom::{Document, ElementData, NodeId};
use crate::errors::SelectorError;

type Namespace = <Simple as SelectorImpl>::NamespaceUrl;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// One selector string, which may itself be a comma group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    source: String,
    compiled: selectors::SelectorList<Simple>,
}

impl Selector {
    /// Parse a selector string.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let source = input.trim();
        if source.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut css = cssparser::ParserInput::new(source);
        let mut parser = cssparser::Parser::new(&mut css);
        let compiled = selectors::SelectorList::parse(&Parser, &mut parser, ParseRelative::No)
            .map_err(|error| SelectorError::Invalid {
                input: source.to_owned(),
                reason: SelectorErrorKind::from(error).to_string(),
            })?;

        Ok(Self {
            source: source.to_owned(),
            compiled,
        })
    }

    /// Selector text as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the node is an element matching this selector.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(element) = ElementHandle::new(doc, id) else {
            return false;
        };
        let mut caches = SelectorCaches::default();
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut caches,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            MatchingForInvalidation::No,
        );
        matching::matches_selector_list(&self.compiled, &element, &mut context)
    }
}

/// Configured selectors; matches when any member matches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Selector>,
}

impl SelectorList {
    /// Parse one selector string (commas allowed).
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        Ok(Self {
            selectors: vec![Selector::parse(input)?],
        })
    }

    /// Parse each string of `items`.
    pub fn from_strings<S: AsRef<str>>(items: &[S]) -> Result<Self, SelectorError> {
        let selectors = items
            .iter()
            .map(|item| Selector::parse(item.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { selectors })
    }

    /// Whether the list holds no selectors (and therefore matches nothing).
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Selector strings as written.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.selectors.iter().map(Selector::as_str)
    }

    /// Whether any selector matches the node.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(doc, id))
    }
}

/// Borrowed view of one arena element, as the selector matcher sees it.
#[derive(Clone, Copy)]
pub struct ElementHandle<'a> {
    doc: &'a Document,
    id: NodeId,
    data: &'a ElementData,
}

impl<'a> ElementHandle<'a> {
    /// Handle on `id`, `None` unless it is an element.
    pub fn new(doc: &'a Document, id: NodeId) -> Option<Self> {
        let data = doc.element(id)?;
        Some(Self { doc, id, data })
    }

    fn sibling_element(&self, step: fn(&Document, NodeId) -> Option<NodeId>) -> Option<Self> {
        let mut cursor = step(self.doc, self.id);
        while let Some(node) = cursor {
            if let Some(handle) = Self::new(self.doc, node) {
                return Some(handle);
            }
            cursor = step(self.doc, node);
        }
        None
    }
}

impl fmt::Debug for ElementHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> {}", self.data.name(), self.id)
    }
}

impl Element for ElementHandle<'_> {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self.data)
    }

    fn parent_element(&self) -> Option<Self> {
        Self::new(self.doc, self.doc.parent(self.id)?)
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.sibling_element(Document::previous_sibling)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.sibling_element(Document::next_sibling)
    }

    fn first_element_child(&self) -> Option<Self> {
        self.doc
            .children(self.id)
            .iter()
            .find_map(|&child| Self::new(self.doc, child))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &CssLocalName) -> bool {
        self.data.name().eq_ignore_ascii_case(&name.0)
    }

    fn has_namespace(&self, namespace: &Namespace) -> bool {
        &**namespace == HTML_NAMESPACE
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.data.name().eq_ignore_ascii_case(other.data.name())
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&Namespace>,
        local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        // arena attributes carry no namespace
        if let NamespaceConstraint::Specific(url) = ns {
            if !url.is_empty() {
                return false;
            }
        }
        self.data
            .attr(&local_name.0)
            .is_some_and(|value| operation.eval_str(value))
    }

    fn match_non_ts_pseudo_class(
        &self,
        _pc: &NonTSPseudoClass,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        false
    }

    fn match_pseudo_element(
        &self,
        _pe: &PseudoElement,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        matches!(self.data.name(), "a" | "area" | "link") && self.data.attr("href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.data
            .attr("id")
            .is_some_and(|value| case_sensitivity.eq(id.0.as_bytes(), value.as_bytes()))
    }

    fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.data.attr("class").is_some_and(|classes| {
            classes
                .split_ascii_whitespace()
                .any(|class| case_sensitivity.eq(name.0.as_bytes(), class.as_bytes()))
        })
    }

    fn has_custom_state(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
        None
    }

    fn is_part(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        !self.doc.children(self.id).iter().any(|&child| {
            self.doc.element(child).is_some() || self.doc.text(child).is_some_and(|t| !t.is_empty())
        })
    }

    fn is_root(&self) -> bool {
        self.id == self.doc.root()
    }

    fn add_element_unique_hashes(&self, _filter: &mut BloomFilter) -> bool {
        false
    }
}
