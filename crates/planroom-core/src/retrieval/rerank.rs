//! Query-term overlap re-ranking.

use crate::search::ScoredChunk;
use std::collections::HashSet;

/// Fraction of the query's whitespace-separated terms that also appear as
/// whole terms in `content`. Case-insensitive; `0.0` for a blank query.
pub fn term_overlap(query: &str, content: &str) -> f32 {
    let query_lower = query.to_lowercase();
    let query_terms: HashSet<&str> = query_lower.split_whitespace().collect();
    if query_terms.is_empty() {
        return 0.0;
    }

    let content_lower = content.to_lowercase();
    let content_terms: HashSet<&str> = content_lower.split_whitespace().collect();
    let shared = query_terms.intersection(&content_terms).count();
    shared as f32 / query_terms.len() as f32
}

/// Adds `boost × overlap` to each score and re-sorts descending.
///
/// The sort is stable, so ties keep their fused order.
pub fn rerank_by_query_overlap(hits: &mut [ScoredChunk], query: &str, boost: f32) {
    for hit in hits.iter_mut() {
        hit.score += boost * term_overlap(query, &hit.chunk.content);
    }
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
}
