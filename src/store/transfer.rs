//! Bulk export and import
//!
//! The bundle format is
//!
//! ```json
//! { "version": 1, "exportTimestamp": "...", "index": { "<identity>": {...} },
//!   "data": { "<identity>": [ <anchor>, ... ] } }
//! ```
//!
//! Import is all-or-nothing per identity: one bad anchor rejects that
//! identity's whole sequence and leaves every other identity unaffected.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::{AnchorStore, IndexEntry, StoreError};
use crate::anchor::Anchor;
use crate::identity::DocumentIdentity;

pub const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: u32,
    pub export_timestamp: DateTime<Utc>,
    pub index: BTreeMap<DocumentIdentity, IndexEntry>,
    pub data: BTreeMap<DocumentIdentity, Vec<Anchor>>,
}

/// One identity that could not be imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    pub identity: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported_documents: usize,
    pub imported_anchors: usize,
    pub failures: Vec<ImportFailure>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),

    #[error("Unsupported bundle version {0}")]
    UnsupportedVersion(u64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Snapshot every indexed document
pub async fn export_all(store: &dyn AnchorStore) -> Result<ExportBundle, StoreError> {
    let index = store.index().await?;

    let mut data = BTreeMap::new();
    for identity in index.keys() {
        data.insert(identity.clone(), store.load_anchors(identity).await?);
    }

    Ok(ExportBundle {
        version: BUNDLE_VERSION,
        export_timestamp: Utc::now(),
        index,
        data,
    })
}

/// Import a bundle, replacing the anchors of each identity it contains
pub async fn import_bundle(store: &dyn AnchorStore, bundle: &Value) -> Result<ImportReport, TransferError> {
    let object = bundle
        .as_object()
        .ok_or_else(|| TransferError::InvalidBundle("expected a JSON object".to_string()))?;

    if let Some(version) = object.get("version") {
        let version = version
            .as_u64()
            .ok_or_else(|| TransferError::InvalidBundle("version must be a number".to_string()))?;
        if version > u64::from(BUNDLE_VERSION) {
            return Err(TransferError::UnsupportedVersion(version));
        }
    }

    let data = object
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| TransferError::InvalidBundle("missing data object".to_string()))?;
    let index = object.get("index").and_then(Value::as_object);

    let mut report = ImportReport::default();

    for (key, value) in data {
        let title = index
            .and_then(|index| index.get(key))
            .and_then(|entry| entry.get("title"))
            .and_then(Value::as_str);

        match import_document(store, key, value, title).await {
            Ok(count) => {
                report.imported_documents += 1;
                report.imported_anchors += count;
            }
            Err(message) => {
                warn!(identity = %key, error = %message, "Import rejected");
                report.failures.push(ImportFailure {
                    identity: key.clone(),
                    message,
                });
            }
        }
    }

    info!(
        "Imported {} anchors across {} documents ({} rejected)",
        report.imported_anchors,
        report.imported_documents,
        report.failures.len()
    );
    Ok(report)
}

async fn import_document(
    store: &dyn AnchorStore,
    key: &str,
    value: &Value,
    title: Option<&str>,
) -> Result<usize, String> {
    let identity = DocumentIdentity::parse(key).map_err(|e| e.to_string())?;

    let mut anchors: Vec<Anchor> =
        serde_json::from_value(value.clone()).map_err(|e| format!("malformed anchor list: {}", e))?;

    for anchor in &mut anchors {
        anchor.validate().map_err(|e| e.to_string())?;
        anchor.document_identity = identity.clone();
    }

    let title = title.unwrap_or(identity.as_str());
    store
        .save_anchors(&identity, &anchors, title)
        .await
        .map_err(|e| e.to_string())?;

    Ok(anchors.len())
}
