//! SQLite schema definition and application.
//!
//! The schema is applied idempotently on connect. Ownership follows the
//! paper aggregate: deleting a paper cascades to its chunks, embeddings,
//! and jobs (`PRAGMA foreign_keys` is enabled by the pool).

use sqlx::sqlite::SqlitePool;

use quire_core::{Error, Result};

/// Current schema version, recorded in `schema_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Full schema DDL. All statements are idempotent.
pub const SCHEMA_SQL: &str = r#"
-- Papers
CREATE TABLE IF NOT EXISTS paper (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    authors TEXT,
    year INTEGER,
    doi TEXT,
    source_url TEXT,
    pdf_path TEXT NOT NULL,
    added_at TEXT NOT NULL,
    indexed_at TEXT,
    embeddings_ready INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'pending',
    collection TEXT NOT NULL DEFAULT 'default'
);

-- Positioned text chunks
CREATE TABLE IF NOT EXISTS chunk (
    id TEXT PRIMARY KEY,
    paper_id TEXT NOT NULL REFERENCES paper(id) ON DELETE CASCADE,
    page INTEGER NOT NULL,
    x REAL NOT NULL,
    y REAL NOT NULL,
    width REAL NOT NULL,
    height REAL NOT NULL,
    text TEXT NOT NULL,
    chunk_index INTEGER NOT NULL
);

-- Chunk embeddings (f32 little-endian blobs)
CREATE TABLE IF NOT EXISTS embedding (
    chunk_id TEXT PRIMARY KEY REFERENCES chunk(id) ON DELETE CASCADE,
    vector BLOB NOT NULL
);

-- Job queue (append-only; terminal rows are the audit trail)
CREATE TABLE IF NOT EXISTS job (
    id TEXT PRIMARY KEY,
    paper_id TEXT NOT NULL REFERENCES paper(id) ON DELETE CASCADE,
    job_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    priority INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    created_at TEXT NOT NULL,
    started_at TEXT,
    finished_at TEXT
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE INDEX IF NOT EXISTS idx_paper_status ON paper(status);
CREATE INDEX IF NOT EXISTS idx_paper_collection ON paper(collection);
CREATE INDEX IF NOT EXISTS idx_chunk_paper ON chunk(paper_id);
CREATE INDEX IF NOT EXISTS idx_job_status ON job(status);
CREATE INDEX IF NOT EXISTS idx_job_paper ON job(paper_id);
"#;

/// Apply the schema to a pool, recording the schema version on first run.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .map_err(Error::Database)?;

    let existing: Option<i64> = sqlx::query_scalar("SELECT version FROM schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)?;

    if existing.is_none() {
        sqlx::query("INSERT INTO schema_version (version) VALUES (?1)")
            .bind(SCHEMA_VERSION)
            .execute(pool)
            .await
            .map_err(Error::Database)?;
    }

    Ok(())
}
