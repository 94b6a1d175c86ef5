//! Core traits for quire abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability. The persistence
//! traits are the contract the storage layer is expected to honor: atomic
//! replacement of chunk/embedding generations, an append-only job table,
//! and an atomic claim transition.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// PAPER REPOSITORY
// =============================================================================

/// Repository for paper records.
#[async_trait]
pub trait PaperRepository: Send + Sync {
    /// Insert a new paper in `Pending` status.
    async fn insert(&self, req: CreatePaperRequest) -> Result<Uuid>;

    /// Fetch a paper by ID, failing with `PaperNotFound` when absent.
    async fn get(&self, id: Uuid) -> Result<Paper>;

    /// Check if a paper exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// List papers, optionally filtered by collection, newest first.
    async fn list(&self, collection: Option<&str>) -> Result<Vec<Paper>>;

    /// Set the processing status.
    async fn set_status(&self, id: Uuid, status: PaperStatus) -> Result<()>;

    /// Mark the paper indexed: sets status and stamps `indexed_at`.
    async fn mark_indexed(&self, id: Uuid) -> Result<()>;

    /// Attach a DOI discovered during extraction.
    async fn set_doi(&self, id: Uuid, doi: &str) -> Result<()>;

    /// Set the embeddings-ready flag directly.
    ///
    /// Normal operation flips the flag inside the embedding replace
    /// transaction; this exists for administrative correction.
    async fn set_embeddings_ready(&self, id: Uuid, ready: bool) -> Result<()>;

    /// Delete a paper and (by cascade) its chunks, embeddings, and jobs.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// CHUNK REPOSITORY
// =============================================================================

/// Repository for positioned text chunks.
#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// Atomically replace the paper's full chunk set.
    ///
    /// The swap also resets `embeddings_ready` to false: a new chunk
    /// generation invalidates any vectors computed for the old one. No
    /// reader ever observes a partial set.
    async fn replace_for_paper(&self, paper_id: Uuid, chunks: Vec<Chunk>) -> Result<()>;

    /// Get all chunks for a paper ordered by (page, chunk_index).
    async fn get_for_paper(&self, paper_id: Uuid) -> Result<Vec<Chunk>>;

    /// Count chunks for a paper.
    async fn count_for_paper(&self, paper_id: Uuid) -> Result<i64>;
}

// =============================================================================
// EMBEDDING REPOSITORY
// =============================================================================

/// Repository for chunk embeddings.
#[async_trait]
pub trait EmbeddingRepository: Send + Sync {
    /// Atomically replace the paper's embeddings.
    ///
    /// `vectors` must cover the paper's current chunk set exactly (one
    /// vector per chunk); a partial set fails with `InvalidInput`. On
    /// success `embeddings_ready` flips to true in the same transaction,
    /// so the flag and the vectors are never observably out of sync.
    async fn replace_for_paper(&self, paper_id: Uuid, vectors: Vec<(Uuid, Vector)>) -> Result<()>;

    /// Get all (chunk, vector) pairs for a paper ordered by (page, chunk_index).
    async fn get_for_paper(&self, paper_id: Uuid) -> Result<Vec<(Chunk, Vector)>>;

    /// Count embeddings stored for a paper.
    async fn count_for_paper(&self, paper_id: Uuid) -> Result<i64>;
}

// =============================================================================
// JOB REPOSITORY
// =============================================================================

/// Repository for the durable job queue.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Queue a new job, returning its ID.
    ///
    /// Enqueueing is idempotent per (paper_id, job_type): if a pending or
    /// running job of the same type already exists for the paper, its ID is
    /// returned and no new row is inserted.
    async fn queue(&self, paper_id: Uuid, job_type: JobType, priority: i32) -> Result<Uuid>;

    /// Claim the next pending job: oldest among the highest-priority tier.
    ///
    /// The claim atomically transitions the job to `Running` and stamps
    /// `started_at`; no two concurrent callers can claim the same job.
    async fn claim_next(&self) -> Result<Option<Job>>;

    /// Mark a job completed, stamping `finished_at`.
    ///
    /// A no-op for jobs already in a terminal state.
    async fn complete(&self, job_id: Uuid) -> Result<()>;

    /// Mark a job failed with a reason, stamping `finished_at`.
    ///
    /// Failed jobs are retained as an audit trail and never retried
    /// automatically. A no-op for jobs already in a terminal state.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Get a job by ID.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Get all jobs for a paper, newest first.
    async fn get_for_paper(&self, paper_id: Uuid) -> Result<Vec<Job>>;

    /// Count pending jobs.
    async fn pending_count(&self) -> Result<i64>;

    /// Get counts by status plus the currently running job, if any.
    async fn queue_stats(&self) -> Result<QueueStats>;
}

// =============================================================================
// INFERENCE
// =============================================================================

/// Backend for generating text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts.
    ///
    /// Returns one vector per input text, in input order. Implementations
    /// must issue the whole batch as a single model invocation.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// PDF TEXT SOURCE
// =============================================================================

/// The PDF/text collaborator: raw page text plus layout.
///
/// Implementations must be deterministic for fixed input bytes: re-running
/// on the same PDF yields identical block text and rectangles, so chunk
/// boundaries stay stable across re-extraction runs.
#[async_trait]
pub trait PdfTextSource: Send + Sync {
    /// Extract per-page text layout from raw PDF bytes.
    ///
    /// Fails with `Error::Extraction` for unreadable or corrupt input.
    async fn extract_pages(&self, data: &[u8]) -> Result<Vec<PageLayout>>;

    /// Check whether the source's external dependencies are available.
    async fn health_check(&self) -> Result<bool>;

    /// Human-readable name of this source.
    fn name(&self) -> &str;
}
