// rust-cv/hnsw vector search over row-aligned normalized embeddings

use super::types::{validate_dimension, RowId, SearchError};
use crate::config::EXACT_SEARCH_THRESHOLD;
use crate::embedding::{dot, is_zero_vector, l2_normalize};
use hnsw::{Hnsw, Searcher};
use space::{Metric, Neighbor};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Minimum ef_search parameter for HNSW queries.
///
/// We use max(k * 2, MIN_EF_SEARCH) to scale with result count while
/// keeping a recall floor.
const MIN_EF_SEARCH: usize = 50;

/// Cosine distance for unit-length vectors, scaled to u32.
///
/// Rows are normalized on insertion, so `1 - dot` is the cosine distance.
struct CosineDistance;

impl Metric<Arc<[f32]>> for CosineDistance {
    type Unit = u32;

    fn distance(&self, a: &Arc<[f32]>, b: &Arc<[f32]>) -> u32 {
        let similarity = dot(a, b).clamp(-1.0, 1.0);
        let distance = 1.0 - similarity; // [0, 2]
        (distance * (u32::MAX as f32 / 2.0)) as u32
    }
}

/// Row-aligned vector store with an HNSW graph for larger indexes.
///
/// Every inserted embedding occupies exactly one row, in insertion order;
/// row `i` is the join key to metadata record `i`. Embeddings are stored
/// normalized so inner product equals cosine similarity.
///
/// Zero vectors (uncaptioned image placeholders) are kept as sentinel rows:
/// they hold their slot so row ids stay aligned, but they are never
/// inserted into the graph and never scored.
///
/// Small indexes are searched by exact scan. Past
/// [`EXACT_SEARCH_THRESHOLD`] scored rows the HNSW graph produces the
/// candidate set and scores are recomputed exactly from the stored rows.
///
/// # HNSW Parameters
///
/// - **M = 16**: bidirectional links per node at layers > 0
/// - **M0 = 32**: links at layer 0 (2*M)
///
/// The graph's PRNG is seeded deterministically, so rebuilding from the
/// same rows in the same order reproduces the same graph.
pub struct VectorSearchEngine {
    /// Normalized rows, indexed by row id
    rows: Vec<Arc<[f32]>>,
    /// Sentinel flag per row
    sentinel: Vec<bool>,
    /// HNSW graph over non-sentinel rows
    graph: Hnsw<CosineDistance, Arc<[f32]>, rand::rngs::StdRng, 16, 32>,
    /// Searcher reused across inserts
    searcher: Searcher<u32>,
    /// Map from graph position to row id
    graph_rows: Vec<RowId>,
    dimension: usize,
}

impl VectorSearchEngine {
    pub fn new(dimension: usize) -> Self {
        Self {
            rows: Vec::new(),
            sentinel: Vec::new(),
            graph: Hnsw::new(CosineDistance),
            searcher: Searcher::default(),
            graph_rows: Vec::new(),
            dimension,
        }
    }

    /// Checks an embedding against the configured dimension without inserting.
    pub fn validate(&self, embedding: &[f32]) -> Result<(), SearchError> {
        validate_dimension(self.dimension, embedding.len())
    }

    /// Normalizes and appends an embedding, returning its row id.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::DimensionMismatch` if the embedding length
    /// doesn't match the engine's dimension.
    pub fn push(&mut self, embedding: &[f32]) -> Result<RowId, SearchError> {
        self.validate(embedding)?;
        let mut row = embedding.to_vec();
        l2_normalize(&mut row);
        Ok(self.push_normalized(row))
    }

    /// Appends a row that is already unit length (or all zeros).
    ///
    /// Used when restoring persisted rows, which were normalized before
    /// they were saved.
    pub(crate) fn push_normalized(&mut self, row: Vec<f32>) -> RowId {
        let row_id = RowId::from_u64(self.rows.len() as u64);
        let row: Arc<[f32]> = row.into();
        let is_sentinel = is_zero_vector(&row);

        if !is_sentinel {
            self.graph_rows.push(row_id);
            self.graph.insert(Arc::clone(&row), &mut self.searcher);
        }
        self.rows.push(row);
        self.sentinel.push(is_sentinel);
        row_id
    }

    /// Returns up to `k` `(row id, cosine similarity)` pairs, most similar first.
    ///
    /// Sentinel rows are never returned. A zero query, or an index without
    /// scored rows, yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::DimensionMismatch` if the query length doesn't
    /// match the engine's dimension.
    #[instrument(skip_all, fields(k = k, rows = self.rows.len()))]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(RowId, f32)>, SearchError> {
        validate_dimension(self.dimension, query.len())?;

        if k == 0 || self.graph_rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = query.to_vec();
        l2_normalize(&mut query);
        if is_zero_vector(&query) {
            debug!("Zero query vector, nothing to rank");
            return Ok(Vec::new());
        }

        let mut results = if self.graph_rows.len() <= EXACT_SEARCH_THRESHOLD {
            self.exact_scan(&query)
        } else {
            self.graph_candidates(query.into(), k)
        };

        sort_by_score(&mut results);
        results.truncate(k);
        Ok(results)
    }

    fn exact_scan(&self, query: &[f32]) -> Vec<(RowId, f32)> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.sentinel[*i])
            .map(|(i, row)| (RowId::from_u64(i as u64), dot(query, row)))
            .collect()
    }

    fn graph_candidates(&self, query: Arc<[f32]>, k: usize) -> Vec<(RowId, f32)> {
        let actual_k = k.min(self.graph_rows.len());
        let mut neighbors = vec![
            Neighbor {
                index: !0,
                distance: !0
            };
            actual_k
        ];
        let ef_search = std::cmp::max(actual_k * 2, MIN_EF_SEARCH);
        let mut searcher = Searcher::default();

        let found = self
            .graph
            .nearest(&query, ef_search, &mut searcher, &mut neighbors);

        // Graph distances are quantized; rescore from the stored rows
        found
            .iter()
            .filter(|n| n.index != !0)
            .filter_map(|n| self.graph_rows.get(n.index).copied())
            .map(|row_id| (row_id, dot(&query, &self.rows[row_id.as_index()])))
            .collect()
    }

    /// Stored (normalized) row, if the id is in range.
    pub fn row(&self, row_id: RowId) -> Option<&[f32]> {
        self.rows.get(row_id.as_index()).map(|r| &r[..])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.rows.iter().map(|r| &r[..])
    }

    pub fn is_sentinel(&self, row_id: RowId) -> bool {
        self.sentinel
            .get(row_id.as_index())
            .copied()
            .unwrap_or(false)
    }

    pub fn sentinel_count(&self) -> usize {
        self.sentinel.iter().filter(|s| **s).count()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Builds a new engine holding only the rows whose `keep` flag is set.
    ///
    /// Surviving rows are renumbered densely in their original order.
    pub fn retain(&self, keep: &[bool]) -> Self {
        let mut compacted = Self::new(self.dimension);
        for (row, _) in self
            .rows
            .iter()
            .zip(keep.iter())
            .filter(|(_, keep)| **keep)
        {
            compacted.push_normalized(row.to_vec());
        }
        compacted
    }
}

/// Sorts by score descending, ties by ascending row id.
fn sort_by_score(results: &mut [(RowId, f32)]) {
    results.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}
