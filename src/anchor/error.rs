//! Anchoring errors

use crate::dom::RangeError;

/// Errors raised while building, resolving or materializing anchors
///
/// All variants except [`AnchorError::MissingRoot`] are per-anchor: a batch
/// records them and moves on to the next anchor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnchorError {
    #[error("Address could not be decoded at step {step}")]
    AddressDecode { step: usize },

    #[error("Range could not be wrapped: {0}")]
    Wrap(#[from] RangeError),

    #[error("No strategy located anchor {id}")]
    ResolutionExhausted { id: String },

    #[error("Malformed anchor {id}: {reason}")]
    MalformedAnchor { id: String, reason: String },

    #[error("Document has no content root")]
    MissingRoot,

    #[error("Selection is empty")]
    EmptySelection,

    #[error("Node is not attached below the content root")]
    Detached,
}

impl AnchorError {
    /// Failures that are part of normal operation and only logged at debug
    pub fn is_expected(&self) -> bool {
        matches!(self, AnchorError::AddressDecode { .. })
    }
}
