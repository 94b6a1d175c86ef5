//! Batch scheduler: drains the job queue on demand.
//!
//! `run_batch` is invoked synchronously by an explicit user action; there is
//! no polling loop and nothing runs at ingest time. Jobs execute strictly
//! sequentially within one call: the embedding model is a single shared,
//! non-reentrant resource.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use quire_core::{BatchSummary, Job, JobRepository, JobType, PdfTextSource, Result};
use quire_db::Database;
use quire_inference::EmbeddingEngine;

use crate::extract::ChunkExtractor;
use crate::handler::{JobContext, JobHandler, JobResult};
use crate::handlers::{EmbedHandler, ExtractDoiHandler, ExtractTextHandler};

/// Batch runner that claims and executes queued jobs.
pub struct BatchRunner {
    db: Database,
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl BatchRunner {
    /// Create a runner with no handlers registered.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            handlers: HashMap::new(),
        }
    }

    /// Create a runner with the standard pipeline handlers registered.
    pub fn standard(
        db: Database,
        source: Arc<dyn PdfTextSource>,
        engine: Arc<EmbeddingEngine>,
    ) -> Self {
        let extractor = Arc::new(ChunkExtractor::new(source.clone()));
        Self::new(db.clone())
            .with_handler(ExtractTextHandler::new(db.clone(), extractor))
            .with_handler(ExtractDoiHandler::new(db.clone(), source))
            .with_handler(EmbedHandler::new(db, engine))
    }

    /// Register a handler for its job type.
    pub fn with_handler<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        let job_type = handler.job_type();
        self.handlers.insert(job_type, Arc::new(handler));
        debug!(?job_type, "Registered job handler");
        self
    }

    /// Drain the queue: claim, execute, and finish jobs until the queue is
    /// empty or `limit` jobs have been attempted.
    ///
    /// Handler failures are recorded on the job and counted in the summary;
    /// they never abort the run. One paper's broken PDF must not block
    /// every other paper in the queue.
    #[instrument(skip(self), fields(subsystem = "jobs", component = "batch_runner", op = "run_batch"))]
    pub async fn run_batch(&self, limit: Option<usize>) -> Result<BatchSummary> {
        let start = Instant::now();
        let mut summary = BatchSummary::default();

        loop {
            if let Some(limit) = limit {
                if summary.processed + summary.failed >= limit {
                    break;
                }
            }

            let job = match self.db.jobs.claim_next().await? {
                Some(job) => job,
                None => break,
            };

            if self.execute_job(job).await {
                summary.processed += 1;
            } else {
                summary.failed += 1;
            }
        }

        info!(
            processed = summary.processed,
            failed = summary.failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch run complete"
        );
        Ok(summary)
    }

    /// Execute one claimed job, returning true on success.
    async fn execute_job(&self, job: Job) -> bool {
        let job_id = job.id;
        let job_type = job.job_type;
        let start = Instant::now();

        info!(job_id = %job_id, ?job_type, paper_id = %job.paper_id, "Processing job");

        let result = match self.handlers.get(&job_type) {
            Some(handler) => handler.execute(JobContext::new(job)).await,
            None => {
                warn!(?job_type, "No handler registered for job type");
                JobResult::Failed(format!("No handler for job type: {:?}", job_type))
            }
        };

        match result {
            JobResult::Success => {
                if let Err(e) = self.db.jobs.complete(job_id).await {
                    error!(error = %e, job_id = %job_id, "Failed to mark job as completed");
                    return false;
                }
                info!(
                    job_id = %job_id,
                    ?job_type,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job completed"
                );
                true
            }
            JobResult::Failed(reason) => {
                if let Err(e) = self.db.jobs.fail(job_id, &reason).await {
                    error!(error = %e, job_id = %job_id, "Failed to mark job as failed");
                }
                warn!(
                    job_id = %job_id,
                    ?job_type,
                    error = %reason,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job failed"
                );
                false
            }
        }
    }

    /// Pending job count (point-in-time snapshot).
    pub async fn pending_count(&self) -> Result<i64> {
        self.db.jobs.pending_count().await
    }
}
