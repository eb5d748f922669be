//! Turning a live selection into an anchor

use chrono::Utc;
use tracing::debug;

use super::kind::create_marker;
use super::{Anchor, AnchorError, AnchorKind, PathCodec};
use crate::config::{EngineConfig, MarkerConfig};
use crate::dom::{normalize_whitespace, Document, DocumentTree, NodeId, TextRange};
use crate::identity::DocumentIdentity;

/// Builds anchors from selections and wraps the selection in a marker
#[derive(Debug, Clone)]
pub struct AnchorBuilder {
    codec: PathCodec,
    marker: MarkerConfig,
}

impl AnchorBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            codec: PathCodec::new(config.text_fragment_len),
            marker: config.marker.clone(),
        }
    }

    /// Capture `range` as an anchor and wrap it in a marker
    ///
    /// Container addresses, offsets and context are read before the wrap,
    /// which splits text nodes. A range that cannot be wrapped atomically is
    /// rejected and the tree is left as it was.
    pub fn build(
        &self,
        doc: &mut Document,
        identity: &DocumentIdentity,
        range: &TextRange,
        color: &str,
    ) -> Result<Anchor, AnchorError> {
        range.validate(doc)?;

        let selected_text = range.text(doc);
        if selected_text.trim().is_empty() {
            return Err(AnchorError::EmptySelection);
        }

        let start_container_address = self.codec.encode(doc, range.start.node)?;
        let end_container_address = self.codec.encode(doc, range.end.node)?;
        let surrounding_context = context_text(doc, range.start.node, &selected_text);

        let id = Anchor::generate_id();
        let marker = create_marker(doc, &self.marker, &id, color);
        doc.surround_contents(range, marker)?;

        let primary_address = self.codec.encode(doc, marker)?;
        debug!(id = %id, depth = primary_address.len(), "Built anchor");

        Ok(Anchor {
            id,
            kind: AnchorKind::Text,
            document_identity: identity.clone(),
            selected_text,
            surrounding_context,
            primary_address,
            start_container_address,
            end_container_address,
            start_offset: range.start.offset,
            end_offset: range.end.offset,
            color: color.to_string(),
            created_at: Utc::now(),
        })
    }

    /// Marker of an anchor built into `doc` by this builder
    pub fn marker_of<T: DocumentTree + ?Sized>(&self, tree: &T, anchor: &Anchor) -> Result<NodeId, AnchorError> {
        self.codec.decode(tree, &anchor.primary_address)
    }
}

/// Text of the selection's immediate container
///
/// When that container holds nothing but the selection itself (a selection
/// covering a whole `<b>` or `<a>`), the nearest ancestor with more text is
/// used instead so context matching has something to compare against.
fn context_text(doc: &Document, start: NodeId, selected_text: &str) -> String {
    let Some(mut container) = (if doc.is_text(start) { doc.parent(start) } else { Some(start) }) else {
        return String::new();
    };

    let selected_len = normalize_whitespace(selected_text).chars().count();
    let root = doc.content_root();
    let mut text = doc.text_content(container);
    while normalize_whitespace(&text).chars().count() <= selected_len && Some(container) != root {
        let Some(parent) = doc.parent(container) else {
            break;
        };
        container = parent;
        text = doc.text_content(container);
    }
    text
}
