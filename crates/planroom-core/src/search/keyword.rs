//! Substring keyword scan.
//!
//! Every chunk's content is lowercased and searched for the lowercased term,
//! O(index size × content length) per term. No stemming and no inverted
//! index; codes like `D-101` or `2 HR` match as exact substrings.
//!
//! # Scoring
//!
//! `score = min(occurrences × 0.1, 1.0)`, counting non-overlapping matches.

use super::types::{ChunkRecord, MetadataFilter, RowId};
use tracing::instrument;

/// Score contributed by each occurrence of the term.
pub const OCCURRENCE_WEIGHT: f32 = 0.1;

/// Non-overlapping occurrences of `needle` in `haystack`.
///
/// Both arguments are expected to be lowercased already. An empty needle
/// never matches.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Keyword relevance for one chunk content; zero when the term is absent.
pub fn keyword_score(content: &str, term: &str) -> f32 {
    let count = count_occurrences(&content.to_lowercase(), &term.to_lowercase());
    (count as f32 * OCCURRENCE_WEIGHT).min(1.0)
}

/// Scans `records` for `term`, returning up to `top_k` `(row id, score)` pairs.
///
/// The filter is applied before scoring. Chunks without a match are
/// omitted. Results are sorted by score descending; equal scores keep
/// row order.
#[instrument(skip_all, fields(term = %term, top_k = top_k))]
pub fn keyword_scan<'a, I>(
    records: I,
    term: &str,
    top_k: usize,
    filter: Option<&MetadataFilter>,
) -> Vec<(RowId, f32)>
where
    I: IntoIterator<Item = &'a ChunkRecord>,
{
    let needle = term.trim().to_lowercase();
    if needle.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let mut results: Vec<(RowId, f32)> = records
        .into_iter()
        .filter(|record| filter.is_none_or(|f| f.matches(&record.chunk)))
        .filter_map(|record| {
            let score = keyword_score(&record.chunk.content, &needle);
            (score > 0.0).then_some((record.row_id, score))
        })
        .collect();

    // Stable: ties keep row order
    results.sort_by(|a, b| b.1.total_cmp(&a.1));
    results.truncate(top_k);
    results
}
