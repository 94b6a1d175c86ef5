//! Core data models for quire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fixed-length embedding vector.
pub type Vector = Vec<f32>;

// =============================================================================
// PAPER TYPES
// =============================================================================

/// Processing status of a paper.
///
/// Transitions are driven by the batch scheduler only:
/// `Pending → Indexed` (text extracted), `Pending → NeedsOcr` (readable PDF
/// without a text layer), `Pending → Error` (extraction produced nothing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    Pending,
    Indexed,
    NeedsOcr,
    Error,
}

/// A research paper registered with the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: Uuid,
    pub title: String,
    pub authors: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub source_url: Option<String>,
    /// Path to the stored PDF bytes (owned by the storage collaborator).
    pub pdf_path: String,
    pub added_at: DateTime<Utc>,
    pub indexed_at: Option<DateTime<Utc>>,
    /// True only when every chunk of the paper carries an embedding.
    pub embeddings_ready: bool,
    pub status: PaperStatus,
    pub collection: String,
}

/// Request for registering a new paper.
#[derive(Debug, Clone)]
pub struct CreatePaperRequest {
    pub title: String,
    pub authors: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub source_url: Option<String>,
    pub pdf_path: String,
    pub collection: Option<String>,
}

// =============================================================================
// CHUNK TYPES
// =============================================================================

/// Axis-aligned rectangle in page-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A positioned span of extracted text within one page of a paper.
///
/// Chunks are immutable once written; a re-extraction replaces the paper's
/// full chunk set atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub paper_id: Uuid,
    /// 0-based page index.
    pub page: i32,
    pub bbox: BoundingBox,
    pub text: String,
    /// 0-based position unique within the paper, monotonic in (page, layout order).
    pub chunk_index: i32,
}

// =============================================================================
// LAYOUT TYPES (PDF collaborator contract)
// =============================================================================

/// A positioned block of text as reported by the PDF layout collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub bbox: BoundingBox,
    pub text: String,
}

/// Raw text layout of one PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    /// 0-based page index.
    pub page: i32,
    pub width: f64,
    pub height: f64,
    pub blocks: Vec<TextBlock>,
}

// =============================================================================
// JOB TYPES
// =============================================================================

/// Status of a job in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// A job is terminal once completed or failed; terminal jobs are an
    /// audit trail and never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Type of deferred processing work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Extract positioned text chunks from the paper's PDF
    ExtractText,
    /// Scan leading pages for a DOI
    ExtractDoi,
    /// Compute embeddings for the paper's chunk set
    Embed,
}

impl JobType {
    /// Default priority for this job type (higher = runs first).
    pub fn default_priority(&self) -> i32 {
        match self {
            // Text extraction gates everything downstream
            JobType::ExtractText => 10,
            JobType::ExtractDoi => 5,
            JobType::Embed => 1,
        }
    }
}

/// One unit of deferred processing work tied to a paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    pub priority: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Queue statistics summary: counts by status plus the current running job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
    pub current: Option<Job>,
}

/// Outcome summary of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

// =============================================================================
// SEARCH TYPES
// =============================================================================

/// One ranked chunk in a similarity search result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHit {
    pub chunk_id: Uuid,
    pub page: i32,
    pub bbox: BoundingBox,
    pub text: String,
    /// Raw cosine similarity against the query vector.
    pub score: f32,
    /// Min-max rescale of `score` within this result set; always in [0, 1].
    pub normalized_score: f32,
}
