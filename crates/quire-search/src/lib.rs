//! # quire-search
//!
//! Chunk similarity search for quire.
//!
//! This crate provides:
//! - Cosine similarity over a paper's stored chunk vectors (linear scan)
//! - Per-result-set min-max score normalization for relevance display
//! - The [`RelevanceSearch`] engine combining both with query embedding
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quire_db::Database;
//! use quire_inference::EmbeddingEngine;
//! use quire_search::RelevanceSearch;
//!
//! let db = Database::connect("sqlite:quire.db").await?;
//! let engine = Arc::new(EmbeddingEngine::ollama_from_env());
//! let search = RelevanceSearch::new(db, engine);
//!
//! let hits = search.search(paper_id, "sparse attention", 20).await?;
//! for hit in hits {
//!     println!("p{} {:.3} {}", hit.page, hit.normalized_score, hit.text);
//! }
//! ```

pub mod engine;
pub mod similarity;

// Re-export core types
pub use quire_core::*;

pub use engine::RelevanceSearch;
pub use similarity::{cosine_similarity, normalize_scores};
