//! Vector index with keyword scan, weighted fusion and persistence.
//!
//! # Architecture
//!
//! - `types`: Core types (ChunkId, DocumentId, RowId, Chunk, MetadataFilter, SearchError)
//! - `index`: VectorIndex, the lock-guarded shared index
//! - `vector`: row-aligned normalized vectors, exact scan or HNSW
//! - `keyword`: case-insensitive substring scan
//! - `fusion`: weighted convex combination of vector and keyword scores
//! - `persistence`: artifact encode/decode and validation
//!
//! # Usage
//!
//! ```ignore
//! use planroom_core::search::{MetadataFilter, VectorIndex};
//! use planroom_core::storage::InMemoryStorage;
//!
//! let index = VectorIndex::new(InMemoryStorage::new(), 384);
//! index.add(chunks, embeddings).await?;
//!
//! let keywords = vec!["D-101".to_string(), "door".to_string()];
//! let hits = index
//!     .hybrid_search(&query, &keywords, 10, 0.7, Some(&MetadataFilter::active()))
//!     .await?;
//! ```
//!
//! # Algorithm Details
//!
//! **Vector search**: embeddings are L2-normalized on insertion so inner
//! product is cosine similarity. Up to a few thousand rows the engine
//! scans exactly; beyond that an HNSW graph supplies candidates, which are
//! rescored exactly.
//!
//! **Keyword search**: `min(occurrences × 0.1, 1.0)` over lowercased
//! content. A linear scan, not an inverted index.
//!
//! **Fusion**: `vector × w + keyword × (1 − w)` per chunk id, `w = 0.7` by
//! default. A chunk missing from one list gets only the other's
//! contribution.

pub mod types;

mod index;
#[doc(hidden)]
pub mod fusion;
#[doc(hidden)]
pub mod keyword;
pub mod persistence;
#[doc(hidden)]
pub mod vector;

pub use index::VectorIndex;
pub use types::{
    validate_dimension, Chunk, ChunkId, ChunkKind, ChunkRecord, CompactionStats, DocumentId,
    DocumentSummary, ImageRef, IndexStats, MetadataFilter, RowId, ScoredChunk, SearchError,
};
