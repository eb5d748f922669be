//! Ranges over a document tree
//!
//! A [`TextRange`] is a pair of DOM-style boundary points. Two ways of turning
//! a range into a marker are provided:
//!
//! - [`Document::surround_contents`] refuses ranges that partially select an
//!   element and leaves the tree untouched when it refuses.
//! - [`Document::extract_and_wrap`] follows the DOM `extractContents` rules,
//!   splitting partially selected elements into shallow clones, then wraps the
//!   extracted fragment and reinserts it at the collapsed range position.

use std::cmp::Ordering;
use std::collections::HashMap;

use thiserror::Error;

use super::{byte_index, Descendants, Document, DocumentTree, NodeId, NodeKind};

/// One end of a range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A start/end pair of boundary points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: Boundary,
    pub end: Boundary,
}

/// Errors raised by range validation and wrapping
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Boundary offset {offset} exceeds node length {length}")]
    OffsetOutOfBounds { offset: usize, length: usize },

    #[error("Range boundaries are not in the same tree")]
    Disconnected,

    #[error("Range boundary cannot sit inside a comment")]
    InvalidContainer,

    #[error("Range end precedes its start")]
    Reversed,

    #[error("Range partially selects an element")]
    PartiallySelected,
}

impl TextRange {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// Range between two offsets of the same node
    pub fn within(node: NodeId, start: usize, end: usize) -> Self {
        Self::new(Boundary::new(node, start), Boundary::new(node, end))
    }

    /// Range covering everything inside `node`
    pub fn select_contents<T: DocumentTree + ?Sized>(tree: &T, node: NodeId) -> Self {
        Self::within(node, 0, tree.node_length(node))
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Locate the `occurrence`-th match of `quote` in the concatenated text
    /// under `root`; the match may span several text nodes
    pub fn from_quote<T: DocumentTree + ?Sized>(
        tree: &T,
        root: NodeId,
        quote: &str,
        occurrence: usize,
    ) -> Option<Self> {
        if quote.is_empty() {
            return None;
        }

        // (node, first char index, char length)
        let mut segments: Vec<(NodeId, usize, usize)> = Vec::new();
        let mut full = String::new();
        let mut total = 0;
        for node in Descendants::new(tree, root).filter(|n| tree.is_text(*n)) {
            let text = tree.text(node).unwrap_or("");
            let len = text.chars().count();
            segments.push((node, total, len));
            full.push_str(text);
            total += len;
        }

        let (byte, _) = full.match_indices(quote).nth(occurrence)?;
        let start_char = full[..byte].chars().count();
        let end_char = start_char + quote.chars().count();

        let (start_node, start_base, _) = segments
            .iter()
            .find(|(_, base, len)| start_char >= *base && start_char < base + len)?;
        let (end_node, end_base, _) = segments
            .iter()
            .find(|(_, base, len)| end_char > *base && end_char <= base + len)?;

        Some(Self::new(
            Boundary::new(*start_node, start_char - start_base),
            Boundary::new(*end_node, end_char - end_base),
        ))
    }

    /// Deepest node that contains both boundaries
    pub fn common_ancestor<T: DocumentTree + ?Sized>(&self, tree: &T) -> Option<NodeId> {
        common_ancestor(tree, self.start.node, self.end.node)
    }

    /// Plain text selected by the range
    pub fn text<T: DocumentTree + ?Sized>(&self, tree: &T) -> String {
        let (start, end) = (self.start, self.end);
        if start.node == end.node && tree.kind(start.node) != NodeKind::Element {
            let text = tree.text(start.node).unwrap_or("");
            let from = byte_index(text, start.offset);
            let to = byte_index(text, end.offset).max(from);
            return text[from..to].to_string();
        }

        let Some(ancestor) = self.common_ancestor(tree) else {
            return String::new();
        };
        let mut out = String::new();
        let mut inside = false;
        collect_text(tree, ancestor, start, end, &mut inside, &mut out);
        out
    }

    /// Check offsets, connectivity and ordering; returns the common ancestor
    pub fn validate<T: DocumentTree + ?Sized>(&self, tree: &T) -> Result<NodeId, RangeError> {
        for boundary in [self.start, self.end] {
            if tree.kind(boundary.node) == NodeKind::Comment {
                return Err(RangeError::InvalidContainer);
            }
            let length = tree.node_length(boundary.node);
            if boundary.offset > length {
                return Err(RangeError::OffsetOutOfBounds {
                    offset: boundary.offset,
                    length,
                });
            }
        }

        let ancestor = self.common_ancestor(tree).ok_or(RangeError::Disconnected)?;

        let top = topmost(tree, ancestor);
        let order: HashMap<NodeId, usize> = std::iter::once(top)
            .chain(Descendants::new(tree, top))
            .enumerate()
            .map(|(i, n)| (n, i))
            .collect();
        let start_key = boundary_key(tree, &order, self.start);
        let end_key = boundary_key(tree, &order, self.end);
        if start_key.cmp(&end_key) == Ordering::Greater {
            return Err(RangeError::Reversed);
        }

        Ok(ancestor)
    }
}

fn common_ancestor<T: DocumentTree + ?Sized>(tree: &T, a: NodeId, b: NodeId) -> Option<NodeId> {
    let mut ancestors = Vec::new();
    let mut current = Some(a);
    while let Some(node) = current {
        ancestors.push(node);
        current = tree.parent(node);
    }

    let mut current = Some(b);
    while let Some(node) = current {
        if ancestors.contains(&node) {
            return Some(node);
        }
        current = tree.parent(node);
    }
    None
}

fn topmost<T: DocumentTree + ?Sized>(tree: &T, node: NodeId) -> NodeId {
    let mut top = node;
    while let Some(parent) = tree.parent(top) {
        top = parent;
    }
    top
}

/// Tree-order sort key: element boundaries sit just before the child at
/// their offset (or just past the element's subtree)
fn boundary_key<T: DocumentTree + ?Sized>(
    tree: &T,
    order: &HashMap<NodeId, usize>,
    boundary: Boundary,
) -> (usize, i64) {
    let position = |n: NodeId| order.get(&n).copied().unwrap_or(0);
    match tree.kind(boundary.node) {
        NodeKind::Element => match tree.children(boundary.node).get(boundary.offset) {
            Some(child) => (position(*child), -1),
            None => {
                let subtree = Descendants::new(tree, boundary.node).count();
                (position(boundary.node) + subtree + 1, -1)
            }
        },
        _ => (position(boundary.node), boundary.offset as i64),
    }
}

/// Depth-first text collection; returns true once the end boundary is hit
fn collect_text<T: DocumentTree + ?Sized>(
    tree: &T,
    node: NodeId,
    start: Boundary,
    end: Boundary,
    inside: &mut bool,
    out: &mut String,
) -> bool {
    match tree.kind(node) {
        NodeKind::Text => {
            let text = tree.text(node).unwrap_or("");
            let mut from = 0;
            if node == start.node {
                *inside = true;
                from = byte_index(text, start.offset);
            }
            if node == end.node {
                if *inside {
                    let to = byte_index(text, end.offset).max(from);
                    out.push_str(&text[from..to]);
                }
                return true;
            }
            if *inside {
                out.push_str(&text[from..]);
            }
            false
        }
        NodeKind::Comment => false,
        NodeKind::Element => {
            let children = tree.children(node);
            for (index, child) in children.iter().enumerate() {
                if node == start.node && index == start.offset {
                    *inside = true;
                }
                if node == end.node && index == end.offset {
                    return true;
                }
                if collect_text(tree, *child, start, end, inside, out) {
                    return true;
                }
            }
            if node == start.node && start.offset == children.len() {
                *inside = true;
            }
            node == end.node
        }
    }
}

impl Document {
    /// Wrap the range in `wrapper`, refusing ranges that cross element
    /// boundaries. The tree is untouched when an error is returned.
    pub fn surround_contents(&mut self, range: &TextRange, wrapper: NodeId) -> Result<(), RangeError> {
        let ancestor = range.validate(self)?;

        for boundary in [range.start, range.end] {
            let mut node = boundary.node;
            while node != ancestor {
                if !self.is_text(node) {
                    return Err(RangeError::PartiallySelected);
                }
                node = self.parent(node).ok_or(RangeError::Disconnected)?;
            }
        }

        self.wrap_validated(range, wrapper);
        Ok(())
    }

    /// Extract the range (cloning partially selected elements), move the
    /// fragment into `wrapper` and insert it where the range collapsed
    pub fn extract_and_wrap(&mut self, range: &TextRange, wrapper: NodeId) -> Result<(), RangeError> {
        range.validate(self)?;
        self.wrap_validated(range, wrapper);
        Ok(())
    }

    /// Detach the selected content and return it with the collapse point
    pub fn extract_contents(&mut self, range: &TextRange) -> Result<(Vec<NodeId>, Boundary), RangeError> {
        range.validate(self)?;
        Ok(self.extract_validated(range.start, range.end))
    }

    fn wrap_validated(&mut self, range: &TextRange, wrapper: NodeId) {
        let (fragment, point) = self.extract_validated(range.start, range.end);
        self.insert_node(point, wrapper);
        for node in fragment {
            self.append_child(wrapper, node);
        }
        if let Some(parent) = self.parent(wrapper) {
            self.prune_empty_text(parent);
        }
    }

    fn extract_validated(&mut self, start: Boundary, end: Boundary) -> (Vec<NodeId>, Boundary) {
        if start == end {
            return (Vec::new(), start);
        }

        if start.node == end.node && self.kind(start.node) != NodeKind::Element {
            let text = self.text_value(start.node);
            let from = byte_index(&text, start.offset);
            let to = byte_index(&text, end.offset).max(from);
            let clone = self.create_text(&text[from..to]);
            self.set_text(start.node, format!("{}{}", &text[..from], &text[to..]));
            return (vec![clone], start);
        }

        let Some(ancestor) = common_ancestor(self, start.node, end.node) else {
            return (Vec::new(), start);
        };

        let first_partial = if self.is_inclusive_ancestor(start.node, end.node) {
            None
        } else {
            self.child_toward(ancestor, start.node)
        };
        let last_partial = if self.is_inclusive_ancestor(end.node, start.node) {
            None
        } else {
            self.child_toward(ancestor, end.node)
        };

        let children = self.children(ancestor).to_vec();
        let low = match first_partial {
            Some(first) => self.index_in_parent(first).map_or(0, |i| i + 1),
            None => start.offset,
        };
        let high = match last_partial {
            Some(last) => self.index_in_parent(last).unwrap_or(children.len()),
            None => end.offset,
        };
        let contained: Vec<NodeId> = children.get(low..high).map(<[NodeId]>::to_vec).unwrap_or_default();

        let point = match first_partial {
            Some(first) => Boundary::new(ancestor, self.index_in_parent(first).map_or(0, |i| i + 1)),
            None => start,
        };

        let mut fragment = Vec::new();

        if let Some(first) = first_partial {
            if self.kind(first) == NodeKind::Element {
                let clone = self.shallow_clone(first);
                let length = self.node_length(first);
                let (inner, _) = self.extract_validated(start, Boundary::new(first, length));
                for node in inner {
                    self.append_child(clone, node);
                }
                fragment.push(clone);
            } else {
                let text = self.text_value(first);
                let split = byte_index(&text, start.offset);
                fragment.push(self.create_text(&text[split..]));
                self.set_text(first, &text[..split]);
            }
        }

        for node in contained {
            self.detach(node);
            fragment.push(node);
        }

        if let Some(last) = last_partial {
            if self.kind(last) == NodeKind::Element {
                let clone = self.shallow_clone(last);
                let (inner, _) = self.extract_validated(Boundary::new(last, 0), end);
                for node in inner {
                    self.append_child(clone, node);
                }
                fragment.push(clone);
            } else {
                let text = self.text_value(last);
                let split = byte_index(&text, end.offset);
                fragment.push(self.create_text(&text[..split]));
                self.set_text(last, &text[split..]);
            }
        }

        (fragment, point)
    }

    /// Insert `node` at a boundary point, splitting a text container
    pub fn insert_node(&mut self, at: Boundary, node: NodeId) {
        if self.kind(at.node) == NodeKind::Element {
            self.insert_child(at.node, at.offset, node);
            return;
        }

        let Some(parent) = self.parent(at.node) else {
            return;
        };
        let index = self.index_in_parent(at.node).unwrap_or(0);
        if at.offset == 0 {
            self.insert_child(parent, index, node);
        } else if at.offset >= self.node_length(at.node) {
            self.insert_child(parent, index + 1, node);
        } else {
            self.split_text(at.node, at.offset);
            self.insert_child(parent, index + 1, node);
        }
    }

    /// Split a text node at a character offset; the tail follows it
    pub fn split_text(&mut self, node: NodeId, offset: usize) -> NodeId {
        let text = self.text_value(node);
        let split = byte_index(&text, offset);
        let tail = self.create_text(&text[split..]);
        self.set_text(node, &text[..split]);
        if let Some(parent) = self.parent(node) {
            let index = self.index_in_parent(node).unwrap_or(0);
            self.insert_child(parent, index + 1, tail);
        }
        tail
    }

    fn prune_empty_text(&mut self, parent: NodeId) {
        let empty: Vec<NodeId> = self
            .children(parent)
            .iter()
            .copied()
            .filter(|c| self.is_text(*c) && self.text(*c).map_or(true, str::is_empty))
            .collect();
        for node in empty {
            self.detach(node);
        }
    }

    /// The child of `ancestor` on the path down to `node`
    fn child_toward(&self, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            let parent = self.parent(current)?;
            if parent == ancestor {
                return Some(current);
            }
            current = parent;
        }
    }
}
