//! Chunk repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use quire_core::{BoundingBox, Chunk, ChunkRepository, Error, Result};

use crate::convert::parse_uuid;

/// SQLite implementation of ChunkRepository.
#[derive(Clone)]
pub struct SqliteChunkRepository {
    pool: Pool<Sqlite>,
}

const CHUNK_COLUMNS: &str = "id, paper_id, page, x, y, width, height, text, chunk_index";

impl SqliteChunkRepository {
    /// Create a new SqliteChunkRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Parse a chunk row into a Chunk struct.
    pub(crate) fn parse_row(row: &sqlx::sqlite::SqliteRow) -> Result<Chunk> {
        Ok(Chunk {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            paper_id: parse_uuid(&row.get::<String, _>("paper_id"))?,
            page: row.get("page"),
            bbox: BoundingBox {
                x: row.get("x"),
                y: row.get("y"),
                width: row.get("width"),
                height: row.get("height"),
            },
            text: row.get("text"),
            chunk_index: row.get("chunk_index"),
        })
    }
}

#[async_trait]
impl ChunkRepository for SqliteChunkRepository {
    async fn replace_for_paper(&self, paper_id: Uuid, chunks: Vec<Chunk>) -> Result<()> {
        if let Some(stray) = chunks.iter().find(|c| c.paper_id != paper_id) {
            return Err(Error::InvalidInput(format!(
                "Chunk {} belongs to paper {}, not {}",
                stray.id, stray.paper_id, paper_id
            )));
        }

        let chunk_count = chunks.len();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Dropping the old generation cascades to its embeddings, so the
        // ready flag must come down in the same transaction.
        sqlx::query("DELETE FROM chunk WHERE paper_id = ?1")
            .bind(paper_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        for chunk in &chunks {
            sqlx::query(
                "INSERT INTO chunk (id, paper_id, page, x, y, width, height, text, chunk_index) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(chunk.id.to_string())
            .bind(chunk.paper_id.to_string())
            .bind(chunk.page)
            .bind(chunk.bbox.x)
            .bind(chunk.bbox.y)
            .bind(chunk.bbox.width)
            .bind(chunk.bbox.height)
            .bind(&chunk.text)
            .bind(chunk.chunk_index)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        sqlx::query("UPDATE paper SET embeddings_ready = 0 WHERE id = ?1")
            .bind(paper_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "chunks",
            op = "replace_for_paper",
            paper_id = %paper_id,
            chunk_count,
            "Replaced chunk set"
        );
        Ok(())
    }

    async fn get_for_paper(&self, paper_id: Uuid) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(&format!(
            "SELECT {CHUNK_COLUMNS} FROM chunk WHERE paper_id = ?1 \
             ORDER BY page, chunk_index"
        ))
        .bind(paper_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(Self::parse_row).collect()
    }

    async fn count_for_paper(&self, paper_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk WHERE paper_id = ?1")
            .bind(paper_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }
}
