//! Locating stored anchors in a (possibly changed) document
//!
//! # Overview
//!
//! [`AnchorResolver::resolve`] runs a cascade of independent strategies and
//! stops at the first that yields a node:
//!
//! 1. the primary address (where the marker was)
//! 2. the start-container address (where the selection began)
//! 3. the first text node containing the selected text verbatim
//! 4. the first context match, see [`TextLocator::find_by_context`]
//!
//! The node is then narrowed to a range. Address hits trust the stored
//! offsets (clamped to the node) as long as they still select the stored
//! text; search hits look the text up again. When nothing narrower fits, the
//! whole node is selected.
//!
//! [`AnchorResolver::materialize`] wraps the range, falling back to
//! extract-and-reinsert when the range crosses element boundaries.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::kind::create_marker;
use super::locate::find_loose;
use super::{Anchor, AnchorError, HighlightSet, PathCodec, StructuralAddress, TextLocator};
use crate::config::{EngineConfig, MarkerConfig};
use crate::dom::{find_chars, Boundary, Document, DocumentTree, NodeId, NodeKind, TextRange};

/// Which cascade stage located an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    PrimaryAddress,
    StartContainer,
    TextSearch,
    ContextMatch,
}

impl Strategy {
    fn from_address(self) -> bool {
        matches!(self, Strategy::PrimaryAddress | Strategy::StartContainer)
    }
}

/// A located anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub range: TextRange,
    pub strategy: Strategy,
}

/// One anchor that could not be materialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorFailure {
    pub anchor_id: String,
    pub reason: String,
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReport {
    pub resolved: usize,
    pub total: usize,
    pub failures: Vec<AnchorFailure>,
}

/// Resolves anchors against a document and materializes their markers
#[derive(Debug, Clone)]
pub struct AnchorResolver {
    codec: PathCodec,
    locator: TextLocator,
    marker: MarkerConfig,
}

impl AnchorResolver {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            codec: PathCodec::new(config.text_fragment_len),
            locator: TextLocator::new(config.context_tags.clone(), config.context_band),
            marker: config.marker.clone(),
        }
    }

    /// Locate `anchor` in `tree` without touching it
    pub fn resolve<T: DocumentTree + ?Sized>(&self, tree: &T, anchor: &Anchor) -> Result<Resolution, AnchorError> {
        let root = tree.content_root().ok_or(AnchorError::MissingRoot)?;

        let (node, strategy) = self
            .decode(tree, &anchor.primary_address, &anchor.id, Strategy::PrimaryAddress)
            .or_else(|| self.decode(tree, &anchor.start_container_address, &anchor.id, Strategy::StartContainer))
            .or_else(|| {
                TextLocator::find_nodes_containing(tree, root, &anchor.selected_text)
                    .next()
                    .map(|n| (n, Strategy::TextSearch))
            })
            .or_else(|| {
                if anchor.surrounding_context.trim().is_empty() {
                    return None;
                }
                self.locator
                    .find_by_context(tree, root, &anchor.surrounding_context, &anchor.selected_text)
                    .next()
                    .map(|n| (n, Strategy::ContextMatch))
            })
            .ok_or_else(|| AnchorError::ResolutionExhausted { id: anchor.id.clone() })?;

        debug!(id = %anchor.id, ?strategy, "Located anchor node");

        let range = narrow(tree, node, anchor, strategy)?;
        Ok(Resolution { range, strategy })
    }

    fn decode<T: DocumentTree + ?Sized>(
        &self,
        tree: &T,
        address: &StructuralAddress,
        id: &str,
        strategy: Strategy,
    ) -> Option<(NodeId, Strategy)> {
        // An empty address names the content root itself, never a highlight
        if address.is_empty() {
            return None;
        }
        match self.codec.decode(tree, address) {
            Ok(node) => Some((node, strategy)),
            Err(e) => {
                debug!(id = %id, ?strategy, error = %e, "Address did not resolve");
                None
            }
        }
    }

    /// Wrap `range` in a fresh marker for `anchor`
    pub fn materialize(&self, doc: &mut Document, range: &TextRange, anchor: &Anchor) -> Result<NodeId, AnchorError> {
        let marker = create_marker(doc, &self.marker, &anchor.id, &anchor.color);

        match doc.surround_contents(range, marker) {
            Ok(()) => Ok(marker),
            Err(e) => {
                debug!(id = %anchor.id, error = %e, "Surround failed, extracting instead");
                doc.extract_and_wrap(range, marker)?;
                Ok(marker)
            }
        }
    }

    /// Apply a batch; failures are recorded and never stop the batch
    pub fn resolve_all(&self, doc: &mut Document, set: &mut HighlightSet, anchors: &[Anchor]) -> ResolveReport {
        let mut report = ResolveReport {
            total: anchors.len(),
            ..ResolveReport::default()
        };

        for anchor in anchors {
            if set.contains(&anchor.id) {
                report.resolved += 1;
                continue;
            }

            let applied = anchor
                .validate()
                .and_then(|()| (anchor.kind.ops().apply)(self, doc, anchor));

            match applied {
                Ok((marker, strategy)) => {
                    set.insert(&anchor.id, anchor.kind, marker, Some(strategy));
                    report.resolved += 1;
                }
                Err(e) => {
                    if e.is_expected() {
                        debug!(id = %anchor.id, error = %e, "Anchor skipped");
                    } else {
                        warn!(id = %anchor.id, error = %e, "Anchor skipped");
                    }
                    report.failures.push(AnchorFailure {
                        anchor_id: anchor.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!("Applied {} of {} highlights", report.resolved, report.total);
        report
    }
}

/// Narrow a located node to the range to wrap
fn narrow<T: DocumentTree + ?Sized>(
    tree: &T,
    node: NodeId,
    anchor: &Anchor,
    strategy: Strategy,
) -> Result<TextRange, AnchorError> {
    let exhausted = || AnchorError::ResolutionExhausted { id: anchor.id.clone() };

    match tree.kind(node) {
        NodeKind::Text => {
            let len = tree.node_length(node);
            if strategy.from_address() {
                if let Some((start, end)) = stored_offsets(anchor, len) {
                    return Ok(TextRange::within(node, start, end));
                }
                debug!(id = %anchor.id, len, "Stored offsets collapse in this node; searching it");
            }

            let text = tree.text(node).unwrap_or("");
            Ok(search(text, &anchor.selected_text)
                .map(|(s, e)| TextRange::within(node, s, e))
                .unwrap_or_else(|| TextRange::within(node, 0, len)))
        }
        NodeKind::Element => {
            let inside = crate::dom::Descendants::new(tree, node)
                .filter(|n| tree.is_text(*n))
                .find_map(|n| {
                    search(tree.text(n).unwrap_or(""), &anchor.selected_text)
                        .map(|(s, e)| TextRange::within(n, s, e))
                });
            if let Some(range) = inside {
                return Ok(range);
            }

            let count = tree.children(node).len();
            if count == 0 {
                return Err(exhausted());
            }
            Ok(TextRange::new(Boundary::new(node, 0), Boundary::new(node, count)))
        }
        NodeKind::Comment => Err(exhausted()),
    }
}

/// Stored offsets clamped to `[0, len]`; `None` when the clamped span is empty
fn stored_offsets(anchor: &Anchor, len: usize) -> Option<(usize, usize)> {
    let start = anchor.start_offset.min(len);
    let end = anchor.end_offset.min(len);
    (start < end).then_some((start, end))
}

/// Exact character span of `needle`, then a whitespace-tolerant one
fn search(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    match find_chars(haystack, needle) {
        Some(start) if !needle.is_empty() => Some((start, start + needle.chars().count())),
        _ => find_loose(haystack, needle),
    }
}
