//! Error types for planroom-core.
//!
//! Search and persistence errors live next to the index in
//! [`crate::search::SearchError`]; storage backends report
//! [`crate::storage::StorageError`]. This module holds the errors raised by
//! chunking, embedding providers, ingestion and retrieval.

use crate::search::SearchError;
use thiserror::Error;

/// Errors that can occur during document chunking.
#[derive(Debug, Clone, Error)]
pub enum ChunkingError {
    /// The document could not be opened or decoded at all (fatal)
    #[error("Failed to read document: {0}")]
    DocumentRead(String),
    /// A single page or image could not be extracted (logged and skipped)
    #[error("Extraction failed on page {page}: {reason}")]
    ExtractionFailed {
        /// 1-indexed page number
        page: u32,
        /// Underlying decoder message
        reason: String,
    },
    /// Invalid chunking configuration
    #[error("Invalid chunking config: {0}")]
    InvalidConfig(String),
    /// Writing an extracted image to disk failed
    #[error("IO error: {0}")]
    Io(String),
}

/// Errors raised by embedding and captioning providers.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// Transport failure or non-success status after retries
    #[error("Embedding request failed: {0}")]
    RequestFailed(String),
    /// Provider answered with a body we could not interpret
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
    /// Provider returned a vector of the wrong length
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension
        expected: usize,
        /// Length actually returned
        actual: usize,
    },
    /// Invalid provider configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors that abort ingestion of a single document.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Index(#[from] SearchError),
}

/// Errors surfaced by the hybrid retriever.
///
/// An empty result set is never an error.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Index(#[from] SearchError),
}

impl From<std::io::Error> for ChunkingError {
    fn from(err: std::io::Error) -> Self {
        ChunkingError::Io(err.to_string())
    }
}
