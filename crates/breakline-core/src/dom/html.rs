//! HTML import and export.
//!
//! Import uses `scraper` (html5ever) in fragment mode, so malformed markup is
//! repaired the way a browser would repair it. Comments, doctypes and
//! processing instructions are dropped. A `display` declaration in the
//! `style` attribute is lifted into the element's inline display on import
//! and written back into `style` on export.

use std::fmt::Write as _;

use scraper::{ElementRef, Html, Node as HtmlNode};

use super::{Document, NodeData, NodeId};

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

impl Document {
    /// Build a document whose root holds the parsed `html` fragment.
    pub fn from_html(html: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        let _ = doc.append_html(root, html);
        doc
    }

    /// Parse `html` as a fragment and append its nodes under `parent`.
    ///
    /// Returns the ids of the appended top-level nodes. Each appended node
    /// produces one mutation record when recording is enabled.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let fragment = Html::parse_fragment(html);

        let recording = self.recording;
        self.recording = false;
        let top_level = self.import_children(fragment.root_element());
        self.recording = recording;

        for &id in &top_level {
            if self.append_child(parent, id).is_err() {
                break;
            }
        }
        top_level
    }

    /// Import the children of `element` as detached nodes, returning them
    /// in order.
    fn import_children(&mut self, element: ElementRef<'_>) -> Vec<NodeId> {
        let mut imported = Vec::new();
        for child in element.children() {
            let id = match child.value() {
                HtmlNode::Text(text) => self.create_text(text),
                HtmlNode::Element(_) => match ElementRef::wrap(child) {
                    Some(el) => self.import_element(el),
                    None => continue,
                },
                _ => continue,
            };
            imported.push(id);
        }
        imported
    }

    fn import_element(&mut self, element: ElementRef<'_>) -> NodeId {
        let id = self.create_element(element.value().name());
        for (name, value) in element.value().attrs() {
            if name == "style" {
                let (rest, display) = split_display(value);
                let _ = self.set_display(id, display.as_deref());
                if rest.is_empty() {
                    continue;
                }
                let _ = self.set_attr(id, name, &rest);
            } else {
                let _ = self.set_attr(id, name, value);
            }
        }
        for child in self.import_children(element) {
            let _ = self.append_child(id, child);
        }
        id
    }

    /// Serialize the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(&mut out, child);
        }
        out
    }

    /// Serialize `id` including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, id);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        match self.data(id) {
            Some(NodeData::Text(text)) => escape_text(out, text),
            Some(NodeData::Element(el)) => {
                out.push('<');
                out.push_str(el.name());
                let mut wrote_style = false;
                for (name, value) in el.attrs() {
                    if name == "style" {
                        wrote_style = true;
                        let merged = merge_style(value, el.display());
                        write_attr(out, name, &merged);
                    } else {
                        write_attr(out, name, value);
                    }
                }
                if let (false, Some(display)) = (wrote_style, el.display()) {
                    write_attr(out, "style", &merge_style("", Some(display)));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.name()) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_node(out, child);
                }
                let _ = write!(out, "</{}>", el.name());
            }
            None => {}
        }
    }
}

/// Split a `display` declaration out of a style string. The last one wins.
fn split_display(style: &str) -> (String, Option<String>) {
    let mut display = None;
    let mut rest = Vec::new();
    for declaration in style.split(';').map(str::trim).filter(|d| !d.is_empty()) {
        match declaration.split_once(':') {
            Some((property, value)) if property.trim().eq_ignore_ascii_case("display") => {
                display = Some(value.trim().to_owned());
            }
            _ => rest.push(declaration),
        }
    }
    (rest.join("; "), display)
}

fn merge_style(style: &str, display: Option<&str>) -> String {
    let base = style.trim().trim_end_matches(';').trim_end();
    match display {
        None => base.to_owned(),
        Some(display) if base.is_empty() => format!("display: {display}"),
        Some(display) => format!("{base}; display: {display}"),
    }
}

fn write_attr(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, " {name}=\"");
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
