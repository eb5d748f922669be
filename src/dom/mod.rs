//! Document tree module
//!
//! The anchoring engine never holds references into a live browser DOM.
//! Everything it does is expressed against the [`DocumentTree`] capability
//! set (children, parent, text and a few element queries), so path encoding
//! and text search are pure functions that can be exercised against
//! synthetic trees.
//!
//! [`Document`] is the arena implementation used by the server. It adds the
//! handful of mutations highlighting needs: wrapping a range in a marker,
//! the extract-and-reinsert fallback, and replacing markers with plain text.
//!
//! # Offsets
//!
//! Boundary offsets follow DOM range conventions: inside a text node an
//! offset counts characters (Unicode scalar values), inside an element it
//! counts children.

mod document;
mod html;
mod range;

use serde::{Deserialize, Serialize};

pub use document::Document;
pub use html::{parse_html, strip_markers, HtmlError};
pub use range::{Boundary, RangeError, TextRange};

/// Handle to a node inside a [`Document`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

/// Read-only capability set over a document tree
pub trait DocumentTree {
    /// The fixed root all structural addresses are relative to
    fn content_root(&self) -> Option<NodeId>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> &[NodeId];

    fn kind(&self, node: NodeId) -> NodeKind;

    /// Lowercase tag name for elements, `None` otherwise
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Own character data of a text or comment node
    fn text(&self, node: NodeId) -> Option<&str>;

    /// First attached element carrying `id`
    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    fn is_text(&self, node: NodeId) -> bool {
        self.kind(node) == NodeKind::Text
    }

    /// DOM-style node name used for same-type sibling comparison
    fn node_name(&self, node: NodeId) -> &str {
        match self.kind(node) {
            NodeKind::Element => self.tag_name(node).unwrap_or(""),
            NodeKind::Text => "#text",
            NodeKind::Comment => "#comment",
        }
    }

    /// Concatenated text of the node and all its text descendants
    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        match self.kind(node) {
            NodeKind::Text => out.push_str(self.text(node).unwrap_or("")),
            NodeKind::Comment => {}
            NodeKind::Element => {
                for text_node in Descendants::new(self, node).filter(|n| self.is_text(*n)) {
                    out.push_str(self.text(text_node).unwrap_or(""));
                }
            }
        }
        out
    }

    /// Boundary length: characters for text, child count for elements
    fn node_length(&self, node: NodeId) -> usize {
        match self.kind(node) {
            NodeKind::Element => self.children(node).len(),
            _ => self.text(node).map(|t| t.chars().count()).unwrap_or(0),
        }
    }

    fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|c| *c == node)
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }
}

/// Pre-order walk over the descendants of a node (the node itself excluded)
pub struct Descendants<'a, T: ?Sized> {
    tree: &'a T,
    stack: Vec<NodeId>,
}

impl<'a, T: DocumentTree + ?Sized> Descendants<'a, T> {
    pub fn new(tree: &'a T, root: NodeId) -> Self {
        let stack = tree.children(root).iter().rev().copied().collect();
        Self { tree, stack }
    }
}

impl<'a, T: DocumentTree + ?Sized> Iterator for Descendants<'a, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(node).iter().rev().copied());
        Some(node)
    }
}

/// Byte index of the `char_offset`-th character, clamped to the end
pub(crate) fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Character offset of the first occurrence of `needle` in `haystack`
pub(crate) fn find_chars(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .find(needle)
        .map(|byte| haystack[..byte].chars().count())
}

/// Collapse whitespace runs to a single space and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendants_document_order() {
        let mut doc = Document::new("body");
        let root = doc.root();
        let p = doc.append_element(root, "p");
        let a = doc.append_text(p, "a");
        let b = doc.append_element(p, "b");
        let bt = doc.append_text(b, "b");
        let c = doc.append_text(root, "c");

        let order: Vec<NodeId> = Descendants::new(&doc, root).collect();
        assert_eq!(order, vec![p, a, b, bt, c]);
    }

    #[test]
    fn test_text_content_skips_comments() {
        let mut doc = Document::new("body");
        let root = doc.root();
        let p = doc.append_element(root, "p");
        doc.append_text(p, "one ");
        let c = doc.create_comment("hidden");
        doc.append_child(p, c);
        doc.append_text(p, "two");

        assert_eq!(doc.text_content(p), "one two");
    }

    #[test]
    fn test_char_helpers() {
        assert_eq!(byte_index("héllo", 2), 3);
        assert_eq!(byte_index("abc", 10), 3);
        assert_eq!(find_chars("naïve report", "report"), Some(6));
        assert_eq!(find_chars("abc", "z"), None);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  See\n  the\treport  "), "See the report");
    }
}
