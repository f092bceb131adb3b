//! Production configuration constants.
//!
//! These values define the production configuration for Planroom and are
//! shared by the chunker, the index, the retriever, the CLI and benchmarks.
//! Runtime knobs are grouped into [`ChunkerConfig`] and [`RetrievalConfig`],
//! whose `Default` impls are built from the constants below.
//!
//! # Usage
//!
//! ```
//! use planroom_core::config::{ChunkerConfig, VECTOR_DIMENSION};
//!
//! let embedding = vec![0.0f32; VECTOR_DIMENSION];
//! let chunker = ChunkerConfig::default();
//! assert!(chunker.validate().is_ok());
//! ```

use crate::error::ChunkingError;
use crate::search::SearchError;
use serde::{Deserialize, Serialize};

// =============================================================================
// Embedding Configuration
// =============================================================================

/// Embedding vector dimension.
///
/// Matches small sentence-embedding models (MiniLM class) and the
/// `dimensions` parameter sent to OpenAI-compatible endpoints.
pub const VECTOR_DIMENSION: usize = 384;

/// Number of texts sent to the embedding provider per request.
pub const EMBEDDING_BATCH_SIZE: usize = 12;

// =============================================================================
// Chunking Configuration
// =============================================================================

/// Window length in characters (Unicode scalar values).
pub const CHUNK_SIZE: usize = 1000;

/// Characters shared between consecutive windows.
pub const CHUNK_OVERLAP: usize = 200;

/// Minimum width and height, in pixels, for an extracted image to be kept.
///
/// Smaller rasters are almost always logos, title-block stamps or
/// decorative borders.
pub const MIN_IMAGE_SIZE: u32 = 100;

/// Fraction of the window a sentence-boundary cut must preserve.
pub const BOUNDARY_THRESHOLD: f32 = 0.7;

// =============================================================================
// Retrieval Configuration
// =============================================================================

/// Candidate width requested from hybrid search before re-ranking.
pub const TOP_K_RETRIEVAL: usize = 10;

/// Final number of chunks returned to the answer generator.
pub const RERANK_TOP_K: usize = 5;

/// Weight of the vector score in hybrid fusion; keywords get the remainder.
pub const VECTOR_WEIGHT: f32 = 0.7;

/// Maximum boost added by query-term overlap during re-ranking.
pub const RERANK_BOOST: f32 = 0.2;

/// Characters of chunk content shown in a citation preview.
pub const PREVIEW_CHARS: usize = 200;

/// Result count used when gathering context for structured extraction.
pub const EXTRACTION_TOP_K: usize = 15;

/// Over-fetch multiplier applied when a metadata filter is present.
pub const FILTER_OVERFETCH: usize = 3;

/// Over-fetch multiplier for the vector leg of hybrid search.
pub const HYBRID_OVERFETCH: usize = 2;

/// Graph sizes at or below this use an exact scan instead of HNSW.
///
/// Exact search over a few thousand 384-d vectors is sub-millisecond and
/// gives perfect recall, so the graph only pays off past this point.
pub const EXACT_SEARCH_THRESHOLD: usize = 4096;

/// Deleted-row ratio above which [`crate::search::VectorIndex::needs_compaction`]
/// reports true.
pub const COMPACTION_THRESHOLD: f32 = 0.3;

/// Chunker settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Window length in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive windows
    pub chunk_overlap: usize,
    /// Minimum image side in pixels
    pub min_image_size: u32,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
            min_image_size: MIN_IMAGE_SIZE,
        }
    }
}

impl ChunkerConfig {
    /// Rejects configurations that cannot make forward progress.
    pub fn validate(&self) -> Result<(), ChunkingError> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::InvalidConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkingError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Retriever settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates requested from hybrid search before re-ranking
    pub retrieval_width: usize,
    /// Default number of chunks returned
    pub top_k: usize,
    /// Vector weight for fusion, in `[0, 1]`
    pub vector_weight: f32,
    /// Maximum re-rank boost from query-term overlap
    pub rerank_boost: f32,
    /// Citation preview length in characters
    pub preview_chars: usize,
    /// Result count for extraction queries
    pub extraction_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            retrieval_width: TOP_K_RETRIEVAL,
            top_k: RERANK_TOP_K,
            vector_weight: VECTOR_WEIGHT,
            rerank_boost: RERANK_BOOST,
            preview_chars: PREVIEW_CHARS,
            extraction_top_k: EXTRACTION_TOP_K,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        if !(0.0..=1.0).contains(&self.vector_weight) {
            return Err(SearchError::InvalidQuery(format!(
                "vector_weight must be within [0, 1], got {}",
                self.vector_weight
            )));
        }
        if self.top_k == 0 {
            return Err(SearchError::InvalidQuery(
                "top_k must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
