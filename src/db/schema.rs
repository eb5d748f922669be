//! Database schema initialization

use sqlx::SqlitePool;

use super::DbResult;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- One row per anchor; addresses are stored as JSON arrays of steps
CREATE TABLE IF NOT EXISTS anchors (
    id TEXT NOT NULL,
    document_identity TEXT NOT NULL,
    seq INTEGER NOT NULL,
    kind TEXT NOT NULL DEFAULT 'text',
    selected_text TEXT NOT NULL,
    surrounding_context TEXT NOT NULL DEFAULT '',
    primary_address TEXT NOT NULL DEFAULT '[]',
    start_container_address TEXT NOT NULL DEFAULT '[]',
    end_container_address TEXT NOT NULL DEFAULT '[]',
    start_offset INTEGER NOT NULL DEFAULT 0,
    end_offset INTEGER NOT NULL DEFAULT 0,
    color TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (document_identity, id)
);

CREATE INDEX IF NOT EXISTS idx_anchors_document_seq ON anchors(document_identity, seq);

-- Highlight index: one row per document that has been saved
CREATE TABLE IF NOT EXISTS documents (
    document_identity TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    highlight_count INTEGER NOT NULL DEFAULT 0,
    last_updated TEXT NOT NULL
);
"#;
