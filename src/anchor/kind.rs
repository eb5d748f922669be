//! Anchor kinds and their capability table
//!
//! Every kind supplies three capabilities: `build` turns a selection into an
//! anchor, `apply` locates a stored anchor and materializes its marker, and
//! `remove` takes a marker back out of the tree. Only text highlights exist
//! today; a new kind adds a variant and a table entry, and nothing that
//! dispatches through [`AnchorKind::ops`] has to change.

use serde::{Deserialize, Serialize};

use super::{Anchor, AnchorBuilder, AnchorError, AnchorResolver, Strategy};
use crate::config::MarkerConfig;
use crate::dom::{Document, DocumentTree, NodeId, TextRange};
use crate::identity::DocumentIdentity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum AnchorKind {
    #[default]
    Text,
}

pub type BuildFn = fn(
    &AnchorBuilder,
    &mut Document,
    &DocumentIdentity,
    &TextRange,
    &str,
) -> Result<Anchor, AnchorError>;

pub type ApplyFn = fn(&AnchorResolver, &mut Document, &Anchor) -> Result<(NodeId, Strategy), AnchorError>;

pub type RemoveFn = fn(&mut Document, NodeId) -> bool;

/// Capabilities of one anchor kind
pub struct KindOps {
    pub build: BuildFn,
    pub apply: ApplyFn,
    pub remove: RemoveFn,
}

static TEXT_OPS: KindOps = KindOps {
    build: build_text,
    apply: apply_text,
    remove: remove_text,
};

impl AnchorKind {
    pub fn ops(self) -> &'static KindOps {
        match self {
            AnchorKind::Text => &TEXT_OPS,
        }
    }
}

fn build_text(
    builder: &AnchorBuilder,
    doc: &mut Document,
    identity: &DocumentIdentity,
    range: &TextRange,
    color: &str,
) -> Result<Anchor, AnchorError> {
    builder.build(doc, identity, range, color)
}

fn apply_text(resolver: &AnchorResolver, doc: &mut Document, anchor: &Anchor) -> Result<(NodeId, Strategy), AnchorError> {
    let resolution = resolver.resolve(doc, anchor)?;
    let marker = resolver.materialize(doc, &resolution.range, anchor)?;
    Ok((marker, resolution.strategy))
}

/// Replace a marker with a single text node holding its text
fn remove_text(doc: &mut Document, marker: NodeId) -> bool {
    let Some(parent) = doc.parent(marker) else {
        return false;
    };
    let text = doc.text_content(marker);
    let replacement = doc.create_text(text);
    doc.replace_node(marker, replacement);
    doc.normalize(parent);
    true
}

/// Create a detached marker element for an anchor
pub(crate) fn create_marker(doc: &mut Document, marker: &MarkerConfig, id: &str, color: &str) -> NodeId {
    let node = doc.create_element(&marker.tag);
    doc.set_attribute(node, "class", &marker.class);
    doc.set_attribute(node, &marker.id_attribute, id);
    set_marker_color(doc, node, color);
    node
}

pub(crate) fn set_marker_color(doc: &mut Document, node: NodeId, color: &str) {
    doc.set_attribute(node, "style", &format!("background-color: {};", color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AnchorKind::Text).unwrap(), "\"text\"");
    }

    #[test]
    fn test_remove_restores_plain_text() {
        let mut doc = Document::new("body");
        let body = doc.root();
        let p = doc.append_element(body, "p");
        doc.append_text(p, "See ");
        let marker = create_marker(&mut doc, &MarkerConfig::default(), "hl-1", "yellow");
        doc.append_child(p, marker);
        let b = doc.append_element(marker, "b");
        doc.append_text(b, "the report");
        doc.append_text(p, " for details.");

        assert_eq!(doc.attribute(marker, "style"), Some("background-color: yellow;"));
        assert!((AnchorKind::Text.ops().remove)(&mut doc, marker));

        assert_eq!(doc.children(p).len(), 1);
        assert_eq!(doc.text_content(p), "See the report for details.");
        assert!(!(AnchorKind::Text.ops().remove)(&mut doc, marker));
    }
}
