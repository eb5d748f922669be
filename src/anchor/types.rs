//! Anchor data types
//!
//! An [`Anchor`] is the durable description of one highlight. It never holds
//! node handles: everything needed to find the span again is either a
//! [`StructuralAddress`] (a hint that tolerates vanished steps) or plain text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AnchorError, AnchorKind};
use crate::dom::NodeKind;
use crate::identity::DocumentIdentity;

/// One level of a structural address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressStep {
    /// Position among all of the parent's children
    pub ordinal_among_all_siblings: usize,
    /// Position among siblings of the same kind and tag
    pub ordinal_among_same_type_siblings: usize,
    pub node_kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    /// Leading characters of a text node's content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_fragment_prefix: Option<String>,
}

/// Root-to-node path below the content root (root excluded)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuralAddress(pub Vec<AddressStep>);

impl StructuralAddress {
    pub fn steps(&self) -> &[AddressStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A persisted highlight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub id: String,
    #[serde(default)]
    pub kind: AnchorKind,
    pub document_identity: DocumentIdentity,
    pub selected_text: String,
    #[serde(default)]
    pub surrounding_context: String,
    #[serde(default)]
    pub primary_address: StructuralAddress,
    #[serde(default)]
    pub start_container_address: StructuralAddress,
    #[serde(default)]
    pub end_container_address: StructuralAddress,
    #[serde(default)]
    pub start_offset: usize,
    #[serde(default)]
    pub end_offset: usize,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl Anchor {
    /// Timestamp plus random suffix, e.g. `hl-1718000000000-3f9a1c2e`
    pub fn generate_id() -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("hl-{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
    }

    /// Reject anchors that can never be resolved
    pub fn validate(&self) -> Result<(), AnchorError> {
        let malformed = |reason: &str| AnchorError::MalformedAnchor {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(malformed("missing id"));
        }
        if self.selected_text.trim().is_empty() {
            return Err(malformed("empty selected text"));
        }
        // Offsets only compare meaningfully inside one container
        if self.start_container_address == self.end_container_address
            && self.start_offset > self.end_offset
        {
            return Err(malformed("start offset after end offset"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_step() -> AddressStep {
        AddressStep {
            ordinal_among_all_siblings: 2,
            ordinal_among_same_type_siblings: 1,
            node_kind: NodeKind::Text,
            tag_name: None,
            css_class: None,
            element_id: None,
            text_fragment_prefix: Some(" for details.".to_string()),
        }
    }

    fn sample_anchor() -> Anchor {
        Anchor {
            id: "hl-1-abc".to_string(),
            kind: AnchorKind::Text,
            document_identity: DocumentIdentity::from_normalized("https://example.com/a"),
            selected_text: "report".to_string(),
            surrounding_context: "See the report for details.".to_string(),
            primary_address: StructuralAddress(vec![text_step()]),
            start_container_address: StructuralAddress(vec![text_step()]),
            end_container_address: StructuralAddress(vec![text_step()]),
            start_offset: 4,
            end_offset: 10,
            color: "rgba(255, 230, 0, 0.5)".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let json = serde_json::to_value(sample_anchor()).unwrap();

        assert_eq!(json["documentIdentity"], "https://example.com/a");
        assert_eq!(json["kind"], "text");
        assert_eq!(json["startOffset"], 4);
        let step = &json["primaryAddress"][0];
        assert_eq!(step["ordinalAmongSameTypeSiblings"], 1);
        assert_eq!(step["nodeKind"], "text");
        assert_eq!(step["textFragmentPrefix"], " for details.");
        assert!(step.get("tagName").is_none());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{
            "id": "hl-2-def",
            "documentIdentity": "https://example.com/a",
            "selectedText": "report",
            "color": "yellow",
            "createdAt": "2024-06-01T12:00:00Z"
        }"#;
        let anchor: Anchor = serde_json::from_str(json).unwrap();

        assert_eq!(anchor.kind, AnchorKind::Text);
        assert!(anchor.primary_address.is_empty());
        assert_eq!(anchor.end_offset, 0);
    }

    #[test]
    fn test_validate() {
        assert!(sample_anchor().validate().is_ok());

        let mut blank = sample_anchor();
        blank.selected_text = "  ".to_string();
        assert!(matches!(blank.validate(), Err(AnchorError::MalformedAnchor { .. })));

        let mut reversed = sample_anchor();
        reversed.start_offset = 12;
        assert!(reversed.validate().is_err());

        reversed.end_container_address = StructuralAddress::default();
        assert!(reversed.validate().is_ok());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Anchor::generate_id();
        let b = Anchor::generate_id();
        assert!(a.starts_with("hl-"));
        assert_ne!(a, b);
    }
}
