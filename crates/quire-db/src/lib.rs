//! # quire-db
//!
//! SQLite persistence layer for quire.
//!
//! This crate provides:
//! - Connection pool management over a single database file (or `:memory:`)
//! - Repository implementations for papers, chunks, embeddings, and jobs
//! - Atomic generation-replace semantics for chunk and embedding sets
//! - The append-only job queue with an atomic claim transition
//!
//! ## Example
//!
//! ```rust,ignore
//! use quire_db::Database;
//! use quire_core::{CreatePaperRequest, JobType, JobRepository, PaperRepository};
//!
//! let db = Database::connect("sqlite:quire.db").await?;
//!
//! let paper_id = db.papers.insert(CreatePaperRequest {
//!     title: "Attention Is All You Need".into(),
//!     authors: None,
//!     year: Some(2017),
//!     doi: None,
//!     source_url: None,
//!     pdf_path: "/papers/1706.03762.pdf".into(),
//!     collection: None,
//! }).await?;
//!
//! db.jobs.queue(paper_id, JobType::ExtractText, 10).await?;
//! ```

pub mod chunks;
mod convert;
pub mod embeddings;
pub mod jobs;
pub mod papers;
pub mod pool;
pub mod schema;

// Re-export core types
pub use quire_core::*;

// Re-export repository implementations
pub use chunks::SqliteChunkRepository;
pub use embeddings::{utils as embedding_utils, SqliteEmbeddingRepository};
pub use jobs::SqliteJobRepository;
pub use papers::SqlitePaperRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Sqlite>,
    /// Paper repository.
    pub papers: SqlitePaperRepository,
    /// Chunk repository.
    pub chunks: SqliteChunkRepository,
    /// Embedding repository.
    pub embeddings: SqliteEmbeddingRepository,
    /// Job queue repository.
    pub jobs: SqliteJobRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    ///
    /// Assumes the schema has already been applied; prefer [`Database::connect`].
    pub fn new(pool: sqlx::Pool<sqlx::Sqlite>) -> Self {
        Self {
            papers: SqlitePaperRepository::new(pool.clone()),
            chunks: SqliteChunkRepository::new(pool.clone()),
            embeddings: SqliteEmbeddingRepository::new(pool.clone()),
            jobs: SqliteJobRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the given SQLite URL and apply the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        schema::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        schema::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Open a fresh in-memory database (used by tests and ephemeral tooling).
    ///
    /// The pool is pinned to one connection: every connection to
    /// `sqlite::memory:` sees its own private database, so a wider pool
    /// would scatter the tables.
    pub async fn connect_in_memory() -> Result<Self> {
        let config = PoolConfig::default().max_connections(1).min_connections(1);
        let pool = create_pool_with_config("sqlite::memory:", config).await?;
        schema::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        &self.pool
    }
}
