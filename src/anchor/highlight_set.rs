//! Markers currently materialized in a document

use std::collections::HashMap;

use tracing::debug;

use super::kind::set_marker_color;
use super::{Anchor, AnchorKind, AnchorResolver, ResolveReport, Strategy};
use crate::dom::{Document, NodeId};
use crate::identity::DocumentIdentity;

/// A materialized highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Materialized {
    pub kind: AnchorKind,
    pub marker: NodeId,
    /// Cascade stage that located it; `None` for freshly built highlights
    pub strategy: Option<Strategy>,
}

/// The resolver's working set, keyed by anchor id
///
/// Rebuilt on every activation and never persisted.
#[derive(Debug, Default)]
pub struct HighlightSet {
    entries: HashMap<String, Materialized>,
    applied_for: Option<DocumentIdentity>,
}

impl HighlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Materialized> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, id: &str, kind: AnchorKind, marker: NodeId, strategy: Option<Strategy>) {
        self.entries.insert(
            id.to_string(),
            Materialized {
                kind,
                marker,
                strategy,
            },
        );
    }

    /// Whether a pass already ran for `identity` since the last clear
    pub fn is_applied_for(&self, identity: &DocumentIdentity) -> bool {
        self.applied_for.as_ref() == Some(identity)
    }

    /// Markers that are still part of the document
    pub fn visible_count(&self, doc: &Document) -> usize {
        self.entries
            .values()
            .filter(|m| doc.is_attached(m.marker))
            .count()
    }

    /// Replace every attached marker with its plain text and forget them all
    pub fn clear(&mut self, doc: &mut Document) -> usize {
        let mut removed = 0;
        for (id, entry) in self.entries.drain() {
            if !doc.is_attached(entry.marker) {
                debug!(id = %id, "Marker already detached");
                continue;
            }
            if (entry.kind.ops().remove)(doc, entry.marker) {
                removed += 1;
            }
        }
        self.applied_for = None;
        removed
    }

    /// Resolve `anchors` into `doc`
    ///
    /// A forced pass clears first. An unforced pass is a no-op (`None`) when
    /// the set was already applied for `identity`.
    pub fn apply_all(
        &mut self,
        doc: &mut Document,
        resolver: &AnchorResolver,
        identity: &DocumentIdentity,
        anchors: &[Anchor],
        force: bool,
    ) -> Option<ResolveReport> {
        if force {
            self.clear(doc);
        } else if self.is_applied_for(identity) {
            debug!(identity = %identity, "Highlights already applied");
            return None;
        }

        let report = resolver.resolve_all(doc, self, anchors);
        self.applied_for = Some(identity.clone());
        Some(report)
    }

    /// Repaint every live marker
    pub fn recolor(&self, doc: &mut Document, color: &str) {
        for entry in self.entries.values() {
            set_marker_color(doc, entry.marker, color);
        }
    }
}
