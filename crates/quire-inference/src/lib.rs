//! # quire-inference
//!
//! Embedding backend abstraction for quire.
//!
//! This crate provides:
//! - The Ollama embedding backend (default)
//! - The process-resident [`EmbeddingEngine`] with lazy model initialization
//! - A deterministic mock backend for testing
//!
//! # Example
//!
//! ```rust,no_run
//! use quire_inference::{EmbeddingEngine, OllamaBackend};
//!
//! # async fn run() -> quire_core::Result<()> {
//! let engine = EmbeddingEngine::ollama_from_env();
//! let query_vector = engine.embed_query("sparse attention").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod mock;
pub mod ollama;

// Re-export core types
pub use quire_core::*;

pub use config::EmbeddingConfig;
pub use engine::EmbeddingEngine;
pub use mock::{MockEmbeddingBackend, MockEmbeddingGenerator};
pub use ollama::OllamaBackend;
