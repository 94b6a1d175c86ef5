//! Cosine similarity and per-result-set score normalization.

use quire_core::ChunkHit;

/// Cosine similarity between two vectors of equal dimension.
///
/// Returns 0.0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have the same dimension");

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a > 0.0 && mag_b > 0.0 {
        dot / (mag_a * mag_b)
    } else {
        0.0
    }
}

/// Rescale raw scores to [0,1] within one result set via min-max scaling.
///
/// The rescale is per-query-result-set, not global: the heatmap consumer
/// needs relative intensity within one query's results, and raw cosine
/// similarity of unrelated text rarely sits near zero. If all scores are
/// equal (including a single result), every `normalized_score` becomes 1.0.
pub fn normalize_scores(hits: &mut [ChunkHit]) {
    if hits.is_empty() {
        return;
    }

    let min = hits.iter().map(|h| h.score).fold(f32::INFINITY, f32::min);
    let max = hits
        .iter()
        .map(|h| h.score)
        .fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    if range == 0.0 {
        for hit in hits.iter_mut() {
            hit.normalized_score = 1.0;
        }
        return;
    }

    for hit in hits.iter_mut() {
        hit.normalized_score = (hit.score - min) / range;
    }
}
