//! Job handlers for each job type.
//!
//! Handlers own the paper-level state transitions; the batch runner owns
//! job-level state. A handler returning `JobResult::Failed` never takes the
//! rest of the batch down with it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use quire_core::{
    ChunkRepository, EmbeddingRepository, JobRepository, JobType, PaperRepository, PaperStatus,
    PdfTextSource,
};
use quire_db::Database;
use quire_inference::EmbeddingEngine;

use crate::extract::{extract_doi, ChunkExtractor};
use crate::handler::{JobContext, JobHandler, JobResult};

/// Handler for `ExtractText` jobs: PDF bytes → positioned chunk set.
pub struct ExtractTextHandler {
    db: Database,
    extractor: Arc<ChunkExtractor>,
}

impl ExtractTextHandler {
    pub fn new(db: Database, extractor: Arc<ChunkExtractor>) -> Self {
        Self { db, extractor }
    }
}

#[async_trait]
impl JobHandler for ExtractTextHandler {
    fn job_type(&self) -> JobType {
        JobType::ExtractText
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let paper_id = ctx.paper_id();

        let paper = match self.db.papers.get(paper_id).await {
            Ok(paper) => paper,
            Err(e) => return JobResult::Failed(e.to_string()),
        };

        ctx.report_progress(10, Some("Reading PDF"));

        let data = match tokio::fs::read(&paper.pdf_path).await {
            Ok(data) => data,
            Err(e) => {
                // Unreadable source: the paper is stuck until re-ingested
                let _ = self.db.papers.set_status(paper_id, PaperStatus::Error).await;
                return JobResult::Failed(format!(
                    "Cannot read PDF at {}: {}",
                    paper.pdf_path, e
                ));
            }
        };

        ctx.report_progress(30, Some("Extracting text"));

        let chunks = match self.extractor.extract(paper_id, &data).await {
            Ok(chunks) => chunks,
            Err(e) => {
                let _ = self.db.papers.set_status(paper_id, PaperStatus::Error).await;
                return JobResult::Failed(e.to_string());
            }
        };

        if chunks.is_empty() {
            // Readable PDF with no text layer: flag for OCR, nothing to embed
            warn!(
                subsystem = "jobs",
                component = "extract_text",
                paper_id = %paper_id,
                "No text layer found, paper needs OCR"
            );
            if let Err(e) = self
                .db
                .papers
                .set_status(paper_id, PaperStatus::NeedsOcr)
                .await
            {
                return JobResult::Failed(e.to_string());
            }
            return JobResult::Success;
        }

        ctx.report_progress(60, Some("Storing chunks"));

        let chunk_count = chunks.len();
        if let Err(e) = self.db.chunks.replace_for_paper(paper_id, chunks).await {
            return JobResult::Failed(e.to_string());
        }
        if let Err(e) = self.db.papers.mark_indexed(paper_id).await {
            return JobResult::Failed(e.to_string());
        }

        // Embedding is deferred work too: queued now, run on the next claim,
        // at the priority the extraction ran at.
        if let Err(e) = self
            .db
            .jobs
            .queue(paper_id, JobType::Embed, ctx.job.priority)
            .await
        {
            return JobResult::Failed(e.to_string());
        }

        info!(
            subsystem = "jobs",
            component = "extract_text",
            paper_id = %paper_id,
            chunk_count,
            "Extraction complete, embed job queued"
        );
        ctx.report_progress(100, Some("Done"));
        JobResult::Success
    }
}

/// Handler for `ExtractDoi` jobs: best-effort DOI scan over leading pages.
///
/// Independent of the indexing pipeline: it only ever attaches metadata
/// and never touches paper status or the embeddings flag.
pub struct ExtractDoiHandler {
    db: Database,
    source: Arc<dyn PdfTextSource>,
}

impl ExtractDoiHandler {
    pub fn new(db: Database, source: Arc<dyn PdfTextSource>) -> Self {
        Self { db, source }
    }
}

#[async_trait]
impl JobHandler for ExtractDoiHandler {
    fn job_type(&self) -> JobType {
        JobType::ExtractDoi
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let paper_id = ctx.paper_id();

        let paper = match self.db.papers.get(paper_id).await {
            Ok(paper) => paper,
            Err(e) => return JobResult::Failed(e.to_string()),
        };

        let data = match tokio::fs::read(&paper.pdf_path).await {
            Ok(data) => data,
            Err(e) => {
                return JobResult::Failed(format!("Cannot read PDF at {}: {}", paper.pdf_path, e))
            }
        };

        ctx.report_progress(50, Some("Scanning for DOI"));

        let pages = match self.source.extract_pages(&data).await {
            Ok(pages) => pages,
            Err(e) => return JobResult::Failed(e.to_string()),
        };

        match extract_doi(&pages) {
            Some(doi) => {
                info!(
                    subsystem = "jobs",
                    component = "extract_doi",
                    paper_id = %paper_id,
                    doi = %doi,
                    "DOI found"
                );
                if let Err(e) = self.db.papers.set_doi(paper_id, &doi).await {
                    return JobResult::Failed(e.to_string());
                }
            }
            None => {
                ctx.report_progress(100, Some("No DOI found"));
            }
        }

        JobResult::Success
    }
}

/// Handler for `Embed` jobs: one batched model call over the chunk set.
pub struct EmbedHandler {
    db: Database,
    engine: Arc<EmbeddingEngine>,
}

impl EmbedHandler {
    pub fn new(db: Database, engine: Arc<EmbeddingEngine>) -> Self {
        Self { db, engine }
    }
}

#[async_trait]
impl JobHandler for EmbedHandler {
    fn job_type(&self) -> JobType {
        JobType::Embed
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let paper_id = ctx.paper_id();

        let chunks = match self.db.chunks.get_for_paper(paper_id).await {
            Ok(chunks) => chunks,
            Err(e) => return JobResult::Failed(e.to_string()),
        };

        if chunks.is_empty() {
            return JobResult::Failed(format!(
                "No chunks found for paper {}; run text extraction first",
                paper_id
            ));
        }

        ctx.report_progress(10, Some("Embedding chunks"));

        // The whole chunk set goes through one model invocation; per-chunk
        // calls are dominated by invocation overhead.
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = match self.engine.embed(&texts).await {
            Ok(vectors) => vectors,
            // embeddings_ready stays false: all-or-nothing per paper
            Err(e) => return JobResult::Failed(e.to_string()),
        };

        ctx.report_progress(80, Some("Storing embeddings"));

        let pairs: Vec<_> = chunks
            .iter()
            .map(|c| c.id)
            .zip(vectors.into_iter())
            .collect();

        if let Err(e) = self.db.embeddings.replace_for_paper(paper_id, pairs).await {
            return JobResult::Failed(e.to_string());
        }

        info!(
            subsystem = "jobs",
            component = "embed",
            paper_id = %paper_id,
            chunk_count = chunks.len(),
            "Embeddings stored, paper ready for search"
        );
        ctx.report_progress(100, Some("Done"));
        JobResult::Success
    }
}
