//! SQLite-backed anchor store

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::warn;

use super::{AnchorStore, IndexEntry, StoreError};
use crate::anchor::Anchor;
use crate::db::{AnchorRepository, AnchorRow};
use crate::identity::DocumentIdentity;

#[derive(Clone)]
pub struct SqliteAnchorStore {
    pool: SqlitePool,
}

impl SqliteAnchorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl AnchorStore for SqliteAnchorStore {
    async fn load_anchors(&self, identity: &DocumentIdentity) -> Result<Vec<Anchor>, StoreError> {
        let repo = AnchorRepository::new(&self.pool);
        let rows = repo.list_for_document(identity.as_str()).await?;

        let anchors = rows
            .into_iter()
            .filter_map(|row| match row.into_anchor() {
                Ok(anchor) => Some(anchor),
                Err(e) => {
                    warn!(identity = %identity, error = %e, "Skipping stored anchor");
                    None
                }
            })
            .collect();

        Ok(anchors)
    }

    async fn save_anchors(
        &self,
        identity: &DocumentIdentity,
        anchors: &[Anchor],
        title: &str,
    ) -> Result<(), StoreError> {
        let rows = anchors
            .iter()
            .map(AnchorRow::from_anchor)
            .collect::<Result<Vec<_>, _>>()?;

        let repo = AnchorRepository::new(&self.pool);
        repo.replace_for_document(identity.as_str(), &rows, title).await?;
        Ok(())
    }

    async fn delete_anchors(&self, identity: &DocumentIdentity) -> Result<bool, StoreError> {
        let repo = AnchorRepository::new(&self.pool);
        Ok(repo.delete_for_document(identity.as_str()).await?)
    }

    async fn index(&self) -> Result<BTreeMap<DocumentIdentity, IndexEntry>, StoreError> {
        let repo = AnchorRepository::new(&self.pool);
        let rows = repo.list_documents().await?;

        let index = rows
            .into_iter()
            .map(|row| {
                let last_updated = DateTime::parse_from_rfc3339(&row.last_updated)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|e| {
                        warn!(identity = %row.document_identity, error = %e, "Bad index timestamp");
                        DateTime::<Utc>::default()
                    });
                let entry = IndexEntry {
                    count: usize::try_from(row.highlight_count).unwrap_or(0),
                    last_updated,
                    title: row.title,
                };
                (DocumentIdentity::from_normalized(row.document_identity), entry)
            })
            .collect();

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{AddressStep, AnchorKind, StructuralAddress};
    use crate::db::initialize_schema;
    use crate::dom::NodeKind;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteAnchorStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_schema(&pool).await.unwrap();
        SqliteAnchorStore::new(pool)
    }

    fn identity() -> DocumentIdentity {
        DocumentIdentity::from_normalized("https://example.com/article")
    }

    fn anchor(id: &str, text: &str) -> Anchor {
        let step = AddressStep {
            ordinal_among_all_siblings: 3,
            ordinal_among_same_type_siblings: 1,
            node_kind: NodeKind::Element,
            tag_name: Some("p".to_string()),
            css_class: Some("lead".to_string()),
            element_id: None,
            text_fragment_prefix: None,
        };
        Anchor {
            id: id.to_string(),
            kind: AnchorKind::Text,
            document_identity: identity(),
            selected_text: text.to_string(),
            surrounding_context: format!("before {} after", text),
            primary_address: StructuralAddress(vec![step.clone()]),
            start_container_address: StructuralAddress(vec![step]),
            end_container_address: StructuralAddress::default(),
            start_offset: 2,
            end_offset: 9,
            color: "rgba(1, 2, 3, 0.5)".to_string(),
            created_at: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_preserves_fields_and_order() {
        let store = store().await;
        let anchors = vec![anchor("hl-b", "second"), anchor("hl-a", "first")];

        store.save_anchors(&identity(), &anchors, "Article").await.unwrap();
        let loaded = store.load_anchors(&identity()).await.unwrap();

        assert_eq!(loaded, anchors);
    }

    #[tokio::test]
    async fn test_save_replaces_and_updates_index() {
        let store = store().await;
        store
            .save_anchors(&identity(), &[anchor("hl-1", "one"), anchor("hl-2", "two")], "Draft")
            .await
            .unwrap();
        store
            .save_anchors(&identity(), &[anchor("hl-3", "three")], "Final")
            .await
            .unwrap();

        let loaded = store.load_anchors(&identity()).await.unwrap();
        assert_eq!(loaded.len(), 1);

        let index = store.index().await.unwrap();
        let entry = &index[&identity()];
        assert_eq!(entry.count, 1);
        assert_eq!(entry.title, "Final");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store().await;
        store.save_anchors(&identity(), &[anchor("hl-1", "one")], "T").await.unwrap();

        assert!(store.delete_anchors(&identity()).await.unwrap());
        assert!(!store.delete_anchors(&identity()).await.unwrap());
        assert!(store.load_anchors(&identity()).await.unwrap().is_empty());
        assert!(store.index().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped() {
        let store = store().await;
        store.save_anchors(&identity(), &[anchor("hl-1", "one")], "T").await.unwrap();
        sqlx::query(
            r#"
            INSERT INTO anchors (id, document_identity, seq, selected_text, primary_address, color, created_at)
            VALUES ('hl-broken', ?, 5, 'x', 'not json', 'red', '2024-05-01T10:00:00Z')
            "#,
        )
        .bind(identity().as_str())
        .execute(store.pool())
        .await
        .unwrap();

        let loaded = store.load_anchors(&identity()).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "hl-1");
    }
}
