//! Anchor persistence
//!
//! The engine talks to storage only through [`AnchorStore`]. Two backends
//! exist: [`SqliteAnchorStore`] for the server and [`MemoryAnchorStore`] for
//! throwaway instances and tests. [`transfer`] moves whole stores in and out
//! as a single JSON bundle.

mod memory;
mod sqlite;
pub mod transfer;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::MemoryAnchorStore;
pub use sqlite::SqliteAnchorStore;

use crate::anchor::Anchor;
use crate::identity::DocumentIdentity;

/// Index metadata kept per document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub count: usize,
    pub last_updated: DateTime<Utc>,
    pub title: String,
}

/// Errors raised by storage backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence collaborator of the engine
#[async_trait]
pub trait AnchorStore: Send + Sync {
    /// Stored anchors of a document, in save order; undecodable entries are
    /// skipped
    async fn load_anchors(&self, identity: &DocumentIdentity) -> Result<Vec<Anchor>, StoreError>;

    /// Replace a document's anchors and refresh its index entry
    async fn save_anchors(
        &self,
        identity: &DocumentIdentity,
        anchors: &[Anchor],
        title: &str,
    ) -> Result<(), StoreError>;

    /// Remove a document's anchors and index entry; `false` when none existed
    async fn delete_anchors(&self, identity: &DocumentIdentity) -> Result<bool, StoreError>;

    /// Index of every saved document
    async fn index(&self) -> Result<BTreeMap<DocumentIdentity, IndexEntry>, StoreError>;
}
