//! Paper repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use quire_core::{
    new_v7, CreatePaperRequest, Error, Paper, PaperRepository, PaperStatus, Result,
};

use crate::convert::{fmt_ts, parse_ts, parse_ts_opt, parse_uuid};

/// SQLite implementation of PaperRepository.
#[derive(Clone)]
pub struct SqlitePaperRepository {
    pool: Pool<Sqlite>,
}

const PAPER_COLUMNS: &str = "id, title, authors, year, doi, source_url, pdf_path, \
     added_at, indexed_at, embeddings_ready, status, collection";

impl SqlitePaperRepository {
    /// Create a new SqlitePaperRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Convert PaperStatus to string for the database.
    fn status_to_str(status: PaperStatus) -> &'static str {
        match status {
            PaperStatus::Pending => "pending",
            PaperStatus::Indexed => "indexed",
            PaperStatus::NeedsOcr => "needs_ocr",
            PaperStatus::Error => "error",
        }
    }

    /// Convert string from the database to PaperStatus.
    fn str_to_status(s: &str) -> PaperStatus {
        match s {
            "pending" => PaperStatus::Pending,
            "indexed" => PaperStatus::Indexed,
            "needs_ocr" => PaperStatus::NeedsOcr,
            "error" => PaperStatus::Error,
            _ => PaperStatus::Pending, // fallback
        }
    }

    /// Parse a paper row into a Paper struct.
    fn parse_row(row: sqlx::sqlite::SqliteRow) -> Result<Paper> {
        Ok(Paper {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            title: row.get("title"),
            authors: row.get("authors"),
            year: row.get("year"),
            doi: row.get("doi"),
            source_url: row.get("source_url"),
            pdf_path: row.get("pdf_path"),
            added_at: parse_ts(&row.get::<String, _>("added_at"))?,
            indexed_at: parse_ts_opt(row.get("indexed_at"))?,
            embeddings_ready: row.get("embeddings_ready"),
            status: Self::str_to_status(&row.get::<String, _>("status")),
            collection: row.get("collection"),
        })
    }
}

#[async_trait]
impl PaperRepository for SqlitePaperRepository {
    async fn insert(&self, req: CreatePaperRequest) -> Result<Uuid> {
        let id = new_v7();
        let now = Utc::now();
        let collection = req.collection.unwrap_or_else(|| "default".to_string());

        sqlx::query(
            "INSERT INTO paper (id, title, authors, year, doi, source_url, pdf_path, \
             added_at, embeddings_ready, status, collection) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 'pending', ?9)",
        )
        .bind(id.to_string())
        .bind(&req.title)
        .bind(&req.authors)
        .bind(req.year)
        .bind(&req.doi)
        .bind(&req.source_url)
        .bind(&req.pdf_path)
        .bind(fmt_ts(&now))
        .bind(&collection)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Paper> {
        let row = sqlx::query(&format!("SELECT {PAPER_COLUMNS} FROM paper WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        match row {
            Some(row) => Self::parse_row(row),
            None => Err(Error::PaperNotFound(id)),
        }
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM paper WHERE id = ?1")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count > 0)
    }

    async fn list(&self, collection: Option<&str>) -> Result<Vec<Paper>> {
        let rows = match collection {
            Some(c) => {
                sqlx::query(&format!(
                    "SELECT {PAPER_COLUMNS} FROM paper WHERE collection = ?1 \
                     ORDER BY added_at DESC"
                ))
                .bind(c)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {PAPER_COLUMNS} FROM paper ORDER BY added_at DESC"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(Error::Database)?;

        rows.into_iter().map(Self::parse_row).collect()
    }

    async fn set_status(&self, id: Uuid, status: PaperStatus) -> Result<()> {
        sqlx::query("UPDATE paper SET status = ?1 WHERE id = ?2")
            .bind(Self::status_to_str(status))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn mark_indexed(&self, id: Uuid) -> Result<()> {
        let now = Utc::now();
        sqlx::query("UPDATE paper SET status = 'indexed', indexed_at = ?1 WHERE id = ?2")
            .bind(fmt_ts(&now))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn set_doi(&self, id: Uuid, doi: &str) -> Result<()> {
        sqlx::query("UPDATE paper SET doi = ?1 WHERE id = ?2")
            .bind(doi)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn set_embeddings_ready(&self, id: Uuid, ready: bool) -> Result<()> {
        sqlx::query("UPDATE paper SET embeddings_ready = ?1 WHERE id = ?2")
            .bind(ready)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM paper WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
