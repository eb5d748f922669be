//! Anchor database operations

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::DbResult;
use crate::anchor::{Anchor, AnchorError, AnchorKind, StructuralAddress};
use crate::identity::DocumentIdentity;

/// Anchor record as stored
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnchorRow {
    pub id: String,
    pub document_identity: String,
    pub kind: String,
    pub selected_text: String,
    pub surrounding_context: String,
    pub primary_address: String,
    pub start_container_address: String,
    pub end_container_address: String,
    pub start_offset: i64,
    pub end_offset: i64,
    pub color: String,
    pub created_at: String,
}

impl AnchorRow {
    pub fn from_anchor(anchor: &Anchor) -> Result<Self, serde_json::Error> {
        let kind = match serde_json::to_value(anchor.kind)? {
            serde_json::Value::String(kind) => kind,
            other => other.to_string(),
        };

        Ok(Self {
            id: anchor.id.clone(),
            document_identity: anchor.document_identity.to_string(),
            kind,
            selected_text: anchor.selected_text.clone(),
            surrounding_context: anchor.surrounding_context.clone(),
            primary_address: serde_json::to_string(&anchor.primary_address)?,
            start_container_address: serde_json::to_string(&anchor.start_container_address)?,
            end_container_address: serde_json::to_string(&anchor.end_container_address)?,
            start_offset: anchor.start_offset as i64,
            end_offset: anchor.end_offset as i64,
            color: anchor.color.clone(),
            created_at: anchor.created_at.to_rfc3339(),
        })
    }

    /// Decode the row, rejecting anything that would not resolve
    pub fn into_anchor(self) -> Result<Anchor, AnchorError> {
        let id = self.id.clone();
        let malformed = |reason: String| AnchorError::MalformedAnchor {
            id: id.clone(),
            reason,
        };

        let address = |column: &str, raw: &str| -> Result<StructuralAddress, AnchorError> {
            serde_json::from_str(raw).map_err(|e| malformed(format!("{}: {}", column, e)))
        };
        let offset = |column: &str, raw: i64| -> Result<usize, AnchorError> {
            usize::try_from(raw).map_err(|_| malformed(format!("{}: negative offset", column)))
        };

        let kind: AnchorKind = serde_json::from_value(serde_json::Value::String(self.kind.clone()))
            .map_err(|e| malformed(format!("kind: {}", e)))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| malformed(format!("created_at: {}", e)))?
            .with_timezone(&Utc);

        let anchor = Anchor {
            kind,
            primary_address: address("primary_address", &self.primary_address)?,
            start_container_address: address("start_container_address", &self.start_container_address)?,
            end_container_address: address("end_container_address", &self.end_container_address)?,
            start_offset: offset("start_offset", self.start_offset)?,
            end_offset: offset("end_offset", self.end_offset)?,
            created_at,
            id: self.id,
            document_identity: DocumentIdentity::from_normalized(self.document_identity),
            selected_text: self.selected_text,
            surrounding_context: self.surrounding_context,
            color: self.color,
        };
        anchor.validate()?;
        Ok(anchor)
    }
}

/// Highlight index record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub document_identity: String,
    pub title: String,
    pub highlight_count: i64,
    pub last_updated: String,
}

/// Anchor repository
pub struct AnchorRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AnchorRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Anchors of one document in the order they were saved
    pub async fn list_for_document(&self, identity: &str) -> DbResult<Vec<AnchorRow>> {
        let rows = sqlx::query_as::<_, AnchorRow>(
            r#"
            SELECT id, document_identity, kind, selected_text, surrounding_context,
                   primary_address, start_container_address, end_container_address,
                   start_offset, end_offset, color, created_at
            FROM anchors
            WHERE document_identity = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(identity)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Replace a document's anchors and refresh its index entry atomically
    pub async fn replace_for_document(&self, identity: &str, rows: &[AnchorRow], title: &str) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM anchors WHERE document_identity = ?")
            .bind(identity)
            .execute(&mut *tx)
            .await?;

        for (seq, row) in rows.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO anchors (id, document_identity, seq, kind, selected_text, surrounding_context,
                                     primary_address, start_container_address, end_container_address,
                                     start_offset, end_offset, color, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&row.id)
            .bind(identity)
            .bind(seq as i64)
            .bind(&row.kind)
            .bind(&row.selected_text)
            .bind(&row.surrounding_context)
            .bind(&row.primary_address)
            .bind(&row.start_container_address)
            .bind(&row.end_container_address)
            .bind(row.start_offset)
            .bind(row.end_offset)
            .bind(&row.color)
            .bind(&row.created_at)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO documents (document_identity, title, highlight_count, last_updated)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(document_identity) DO UPDATE SET
                title = excluded.title,
                highlight_count = excluded.highlight_count,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(identity)
        .bind(title)
        .bind(rows.len() as i64)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete a document's anchors and index entry
    pub async fn delete_for_document(&self, identity: &str) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let anchors = sqlx::query("DELETE FROM anchors WHERE document_identity = ?")
            .bind(identity)
            .execute(&mut *tx)
            .await?;
        let documents = sqlx::query("DELETE FROM documents WHERE document_identity = ?")
            .bind(identity)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(anchors.rows_affected() + documents.rows_affected() > 0)
    }

    /// Every indexed document
    pub async fn list_documents(&self) -> DbResult<Vec<DocumentRow>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT document_identity, title, highlight_count, last_updated
            FROM documents
            ORDER BY document_identity ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
