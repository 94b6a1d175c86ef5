//! Paper ingestion: register the record, queue the work, run nothing.

use tracing::info;
use uuid::Uuid;

use quire_core::{CreatePaperRequest, JobRepository, JobType, PaperRepository, Result};
use quire_db::Database;

/// Register a paper and enqueue its processing jobs.
///
/// Ingestion only queues work: it creates the Paper record and queues
/// `ExtractText` and `ExtractDoi` at their default priorities. Extraction
/// and embedding run later, when a batch run is explicitly triggered; the
/// `Embed` job is queued by the extraction handler once text exists.
pub async fn ingest_paper(db: &Database, req: CreatePaperRequest) -> Result<Uuid> {
    let paper_id = db.papers.insert(req).await?;

    db.jobs
        .queue(
            paper_id,
            JobType::ExtractText,
            JobType::ExtractText.default_priority(),
        )
        .await?;
    db.jobs
        .queue(
            paper_id,
            JobType::ExtractDoi,
            JobType::ExtractDoi.default_priority(),
        )
        .await?;

    info!(
        subsystem = "jobs",
        component = "ingest",
        paper_id = %paper_id,
        "Paper registered, processing queued"
    );
    Ok(paper_id)
}
