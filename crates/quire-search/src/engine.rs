//! The relevance search engine.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};
use uuid::Uuid;

use quire_core::{
    defaults, ChunkHit, EmbeddingRepository, Error, PaperRepository, Result,
};
use quire_db::Database;
use quire_inference::EmbeddingEngine;

use crate::similarity::{cosine_similarity, normalize_scores};

/// Similarity search over a paper's stored chunk vectors.
///
/// Every stored vector is scanned linearly; per-paper chunk counts run from
/// tens to low thousands, well under where an index structure starts paying
/// for itself.
pub struct RelevanceSearch {
    db: Database,
    engine: Arc<EmbeddingEngine>,
}

impl RelevanceSearch {
    /// Create a search engine over the given database and embedding engine.
    pub fn new(db: Database, engine: Arc<EmbeddingEngine>) -> Self {
        Self { db, engine }
    }

    /// Rank a paper's chunks against a natural-language query.
    ///
    /// Results are ordered by descending raw `score` (ties broken by
    /// ascending chunk position), truncated to `top_k`, then rescaled so the
    /// best of the returned set is 1.0 and the worst 0.0.
    ///
    /// Preconditions the caller must have arranged:
    /// - the paper exists (`PaperNotFound` otherwise)
    /// - `embeddings_ready` is set (`NotIndexed` otherwise; this component
    ///   never triggers indexing itself)
    /// - `top_k` is positive and the query is non-blank (`InvalidInput`)
    #[instrument(skip(self, query), fields(subsystem = "search", component = "relevance", op = "search", paper_id = %paper_id))]
    pub async fn search(&self, paper_id: Uuid, query: &str, top_k: i64) -> Result<Vec<ChunkHit>> {
        if top_k <= 0 {
            return Err(Error::InvalidInput(format!(
                "top_k must be positive, got {}",
                top_k
            )));
        }
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("Query cannot be blank".to_string()));
        }

        let paper = self.db.papers.get(paper_id).await?;
        if !paper.embeddings_ready {
            return Err(Error::NotIndexed(paper_id));
        }

        let start = Instant::now();
        let query_vector = self.engine.embed_query(query).await?;
        let stored = self.db.embeddings.get_for_paper(paper_id).await?;

        let mut hits = Vec::with_capacity(stored.len());
        for (chunk, vector) in stored {
            if vector.len() != query_vector.len() {
                return Err(Error::Internal(format!(
                    "Stored vector for chunk {} has dimension {}, query has {}",
                    chunk.id,
                    vector.len(),
                    query_vector.len()
                )));
            }

            let score = cosine_similarity(&query_vector, &vector);
            hits.push((chunk, score));
        }

        // Descending score, ascending position on ties: reproducible for
        // identical inputs.
        hits.sort_by(|(a, sa), (b, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
        });
        hits.truncate(top_k as usize);

        let mut results: Vec<ChunkHit> = hits
            .into_iter()
            .map(|(chunk, score)| ChunkHit {
                chunk_id: chunk.id,
                page: chunk.page,
                bbox: chunk.bbox,
                text: chunk.text,
                score,
                normalized_score: 0.0,
            })
            .collect();
        normalize_scores(&mut results);

        debug!(
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );
        Ok(results)
    }

    /// `search` with the default result budget.
    pub async fn search_default(&self, paper_id: Uuid, query: &str) -> Result<Vec<ChunkHit>> {
        self.search(paper_id, query, defaults::SEARCH_TOP_K).await
    }
}
