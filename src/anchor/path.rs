//! Structural address encoding and decoding
//!
//! # Overview
//!
//! [`PathCodec::encode`] walks from a node up to the content root and records
//! one [`AddressStep`] per level. [`PathCodec::decode`] walks back down and,
//! at every level, tries the step's clues from most to least specific:
//!
//! 1. `elementId`, looked up anywhere in the document
//! 2. the ordinal among siblings of the same kind and tag
//! 3. for text steps, the first text child containing the text fragment
//! 4. the raw child index
//!
//! Counting same-type siblings rather than all children is what keeps an
//! address valid when a page injects unrelated elements (ads, widgets) next
//! to the highlighted content. Decoding is all-or-nothing: a step that no
//! rule can satisfy fails the whole address.

use tracing::debug;

use super::{AddressStep, AnchorError, StructuralAddress};
use crate::dom::{DocumentTree, NodeId, NodeKind};

/// Converts nodes to structural addresses and back
#[derive(Debug, Clone)]
pub struct PathCodec {
    fragment_len: usize,
}

impl Default for PathCodec {
    fn default() -> Self {
        Self { fragment_len: 50 }
    }
}

impl PathCodec {
    pub fn new(fragment_len: usize) -> Self {
        Self { fragment_len }
    }

    /// Address of `node` relative to the content root
    pub fn encode<T: DocumentTree + ?Sized>(
        &self,
        tree: &T,
        node: NodeId,
    ) -> Result<StructuralAddress, AnchorError> {
        let root = tree.content_root().ok_or(AnchorError::MissingRoot)?;

        let mut steps = Vec::new();
        let mut current = node;
        while current != root {
            let parent = tree.parent(current).ok_or(AnchorError::Detached)?;
            steps.push(self.step(tree, parent, current));
            current = parent;
        }
        steps.reverse();

        Ok(StructuralAddress(steps))
    }

    fn step<T: DocumentTree + ?Sized>(&self, tree: &T, parent: NodeId, node: NodeId) -> AddressStep {
        let siblings = tree.children(parent);
        let kind = tree.kind(node);
        let name = tree.node_name(node);

        let ordinal_among_all_siblings = siblings.iter().position(|s| *s == node).unwrap_or(0);
        let ordinal_among_same_type_siblings = siblings
            .iter()
            .filter(|s| tree.kind(**s) == kind && tree.node_name(**s) == name)
            .position(|s| *s == node)
            .unwrap_or(0);

        let non_empty = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_string);

        AddressStep {
            ordinal_among_all_siblings,
            ordinal_among_same_type_siblings,
            node_kind: kind,
            tag_name: tree.tag_name(node).map(str::to_string),
            css_class: non_empty(tree.attribute(node, "class")),
            element_id: non_empty(tree.attribute(node, "id")),
            text_fragment_prefix: match kind {
                NodeKind::Text => tree
                    .text(node)
                    .map(|t| t.chars().take(self.fragment_len).collect()),
                _ => None,
            },
        }
    }

    /// Node the address points at in `tree`
    pub fn decode<T: DocumentTree + ?Sized>(
        &self,
        tree: &T,
        address: &StructuralAddress,
    ) -> Result<NodeId, AnchorError> {
        let root = tree.content_root().ok_or(AnchorError::MissingRoot)?;

        address
            .steps()
            .iter()
            .enumerate()
            .try_fold(root, |parent, (index, step)| {
                decode_step(tree, parent, step).ok_or_else(|| {
                    debug!(step = index, depth = address.len(), "Address step did not match");
                    AnchorError::AddressDecode { step: index }
                })
            })
    }
}

fn decode_step<T: DocumentTree + ?Sized>(tree: &T, parent: NodeId, step: &AddressStep) -> Option<NodeId> {
    if let Some(found) = step.element_id.as_deref().and_then(|id| tree.element_by_id(id)) {
        return Some(found);
    }

    let children = tree.children(parent);

    let same_type = children
        .iter()
        .copied()
        .filter(|c| tree.kind(*c) == step.node_kind && tree.tag_name(*c) == step.tag_name.as_deref())
        .nth(step.ordinal_among_same_type_siblings);
    if same_type.is_some() {
        return same_type;
    }

    if step.node_kind == NodeKind::Text {
        if let Some(fragment) = step.text_fragment_prefix.as_deref().filter(|f| !f.is_empty()) {
            let found = children
                .iter()
                .copied()
                .find(|c| tree.is_text(*c) && tree.text(*c).is_some_and(|t| t.contains(fragment)));
            if found.is_some() {
                return found;
            }
        }
    }

    // Kind-blind: a marker step decoded against a page without markers may
    // land on a neighbouring element and highlight its contents instead.
    children.get(step.ordinal_among_all_siblings).copied()
}
