//! # quire-jobs
//!
//! Deferred processing for quire: chunk extraction, job handlers, and the
//! batch scheduler.
//!
//! This crate provides:
//! - Positioned chunk extraction from PDFs (poppler `pdftotext -bbox-layout`)
//! - DOI scanning over leading pages
//! - Job handlers for each job type
//! - The synchronous, user-triggered [`BatchRunner`]
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quire_db::Database;
//! use quire_inference::EmbeddingEngine;
//! use quire_jobs::{ingest_paper, BatchRunner, PdftotextSource};
//!
//! let db = Database::connect("sqlite:quire.db").await?;
//! let engine = Arc::new(EmbeddingEngine::ollama_from_env());
//! let runner = BatchRunner::standard(db.clone(), Arc::new(PdftotextSource::new()), engine);
//!
//! let paper_id = ingest_paper(&db, request).await?; // queues work, runs nothing
//! let summary = runner.run_batch(None).await?;      // drains the queue
//! println!("processed={} failed={}", summary.processed, summary.failed);
//! ```

pub mod extract;
pub mod handler;
pub mod handlers;
pub mod ingest;
pub mod scheduler;

// Re-export core types
pub use quire_core::*;

pub use extract::{assemble_chunks, extract_doi, ChunkExtractor, PdftotextSource};
pub use handler::{JobContext, JobHandler, JobResult, NoOpHandler};
pub use handlers::{EmbedHandler, ExtractDoiHandler, ExtractTextHandler};
pub use ingest::ingest_paper;
pub use scheduler::BatchRunner;
