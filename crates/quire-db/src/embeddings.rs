//! Embedding repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use quire_core::{Chunk, EmbeddingRepository, Error, Result, Vector};

use crate::chunks::SqliteChunkRepository;

/// Vector blob encoding helpers.
///
/// Vectors are stored as little-endian f32 byte sequences, four bytes per
/// component.
pub mod utils {
    use quire_core::{Error, Result, Vector};

    /// Encode a vector as a little-endian f32 blob.
    pub fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(vector.len() * 4);
        for v in vector {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    /// Decode a little-endian f32 blob back into a vector.
    pub fn bytes_to_vector(data: &[u8]) -> Result<Vector> {
        if data.len() % 4 != 0 {
            return Err(Error::Serialization(format!(
                "Vector blob length {} is not a multiple of 4",
                data.len()
            )));
        }
        Ok(data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

/// SQLite implementation of EmbeddingRepository.
#[derive(Clone)]
pub struct SqliteEmbeddingRepository {
    pool: Pool<Sqlite>,
}

impl SqliteEmbeddingRepository {
    /// Create a new SqliteEmbeddingRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmbeddingRepository for SqliteEmbeddingRepository {
    async fn replace_for_paper(&self, paper_id: Uuid, vectors: Vec<(Uuid, Vector)>) -> Result<()> {
        if vectors.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Refusing to store an empty embedding set for paper {}",
                paper_id
            )));
        }

        let dimension = vectors[0].1.len();
        if let Some((chunk_id, v)) = vectors.iter().find(|(_, v)| v.len() != dimension) {
            return Err(Error::InvalidInput(format!(
                "Inconsistent vector dimensions: chunk {} has {} components, expected {}",
                chunk_id,
                v.len(),
                dimension
            )));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let chunk_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk WHERE paper_id = ?1")
            .bind(paper_id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;

        // Embeddings are produced and replaced together; a partial set must
        // never become the paper's active generation.
        if vectors.len() as i64 != chunk_count {
            return Err(Error::InvalidInput(format!(
                "Embedding set covers {} chunks but paper {} has {}",
                vectors.len(),
                paper_id,
                chunk_count
            )));
        }

        sqlx::query(
            "DELETE FROM embedding WHERE chunk_id IN \
             (SELECT id FROM chunk WHERE paper_id = ?1)",
        )
        .bind(paper_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        for (chunk_id, vector) in &vectors {
            let inserted = sqlx::query(
                "INSERT INTO embedding (chunk_id, vector) \
                 SELECT id, ?1 FROM chunk WHERE id = ?2 AND paper_id = ?3",
            )
            .bind(utils::vector_to_bytes(vector))
            .bind(chunk_id.to_string())
            .bind(paper_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

            if inserted.rows_affected() != 1 {
                return Err(Error::InvalidInput(format!(
                    "Chunk {} does not belong to paper {}",
                    chunk_id, paper_id
                )));
            }
        }

        // Flag flip is the generation swap: readers never see vectors
        // without the flag or the flag without full coverage.
        sqlx::query("UPDATE paper SET embeddings_ready = 1 WHERE id = ?1")
            .bind(paper_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "embeddings",
            op = "replace_for_paper",
            paper_id = %paper_id,
            chunk_count = vectors.len(),
            dimension,
            "Replaced embedding set"
        );
        Ok(())
    }

    async fn get_for_paper(&self, paper_id: Uuid) -> Result<Vec<(Chunk, Vector)>> {
        let rows = sqlx::query(
            "SELECT c.id, c.paper_id, c.page, c.x, c.y, c.width, c.height, \
                    c.text, c.chunk_index, e.vector \
             FROM chunk c \
             JOIN embedding e ON e.chunk_id = c.id \
             WHERE c.paper_id = ?1 \
             ORDER BY c.page, c.chunk_index",
        )
        .bind(paper_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|row| {
                let chunk = SqliteChunkRepository::parse_row(row)?;
                let vector = utils::bytes_to_vector(&row.get::<Vec<u8>, _>("vector"))?;
                Ok((chunk, vector))
            })
            .collect()
    }

    async fn count_for_paper(&self, paper_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM embedding e \
             JOIN chunk c ON c.id = e.chunk_id \
             WHERE c.paper_id = ?1",
        )
        .bind(paper_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(count)
    }
}
