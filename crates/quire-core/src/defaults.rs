//! Centralized default constants for the quire system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates should reference these constants instead of defining
//! their own magic numbers.

// =============================================================================
// CHUNKING
// =============================================================================

/// Minimum characters for a text block to become a chunk.
///
/// Blocks shorter than this (page numbers, stray ligatures, running headers
/// reduced to a glyph or two) add noise to the vector index without carrying
/// searchable meaning.
pub const MIN_CHUNK_CHARS: usize = 10;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default embedding model name (Ollama).
pub const EMBED_MODEL: &str = "all-minilm";

/// Default embedding vector dimension for all-minilm.
pub const EMBED_DIMENSION: usize = 384;

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Timeout for embedding requests in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// EXTRACTION
// =============================================================================

/// Timeout for a single external extraction command (pdftotext/pdfinfo).
pub const EXTRACTION_CMD_TIMEOUT_SECS: u64 = 120;

/// Number of leading pages scanned for a DOI.
pub const DOI_SCAN_PAGES: usize = 3;

// =============================================================================
// SEARCH
// =============================================================================

/// Default maximum number of results returned by a similarity search.
pub const SEARCH_TOP_K: i64 = 50;
