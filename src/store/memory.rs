//! In-memory anchor store

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::warn;

use super::{AnchorStore, IndexEntry, StoreError};
use crate::anchor::Anchor;
use crate::identity::DocumentIdentity;

/// Process-local store; contents vanish with the process
#[derive(Default)]
pub struct MemoryAnchorStore {
    documents: RwLock<HashMap<DocumentIdentity, StoredDocument>>,
}

struct StoredDocument {
    anchors: Vec<Anchor>,
    entry: IndexEntry,
}

impl MemoryAnchorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnchorStore for MemoryAnchorStore {
    async fn load_anchors(&self, identity: &DocumentIdentity) -> Result<Vec<Anchor>, StoreError> {
        let documents = self.documents.read();
        let Some(stored) = documents.get(identity) else {
            return Ok(Vec::new());
        };

        let anchors = stored
            .anchors
            .iter()
            .filter(|anchor| match anchor.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(identity = %identity, error = %e, "Skipping stored anchor");
                    false
                }
            })
            .cloned()
            .collect();
        Ok(anchors)
    }

    async fn save_anchors(
        &self,
        identity: &DocumentIdentity,
        anchors: &[Anchor],
        title: &str,
    ) -> Result<(), StoreError> {
        let stored = StoredDocument {
            anchors: anchors.to_vec(),
            entry: IndexEntry {
                count: anchors.len(),
                last_updated: Utc::now(),
                title: title.to_string(),
            },
        };
        self.documents.write().insert(identity.clone(), stored);
        Ok(())
    }

    async fn delete_anchors(&self, identity: &DocumentIdentity) -> Result<bool, StoreError> {
        Ok(self.documents.write().remove(identity).is_some())
    }

    async fn index(&self) -> Result<BTreeMap<DocumentIdentity, IndexEntry>, StoreError> {
        Ok(self
            .documents
            .read()
            .iter()
            .map(|(identity, stored)| (identity.clone(), stored.entry.clone()))
            .collect())
    }
}
