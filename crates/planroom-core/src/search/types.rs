use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Position of a vector in the index, assigned at insertion.
///
/// Row ids are the only handle the vector engine returns; everything above
/// it joins row id to [`ChunkRecord`] by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Position in the row-aligned vector and metadata arrays.
    pub fn as_index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owning document identifier (`doc_` + 12 hex chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Issues a fresh identifier for an upload.
    ///
    /// The digest covers filename, content and the current time, so
    /// re-uploading the same file yields a distinct document.
    pub fn generate(filename: &str, content: &[u8]) -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let mut hasher = Sha256::new();
        hasher.update(filename.as_bytes());
        hasher.update(content);
        hasher.update(nanos.to_le_bytes());
        let digest = hex(&hasher.finalize());
        Self(format!("doc_{}", &digest[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deterministic chunk identifier: `{kind}_{page}_{index}_{hash}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

/// Hex characters of the SHA-256 digest kept in a chunk id.
const CHUNK_HASH_LEN: usize = 16;

impl ChunkId {
    /// Derives the id from `(document_id, page_number, sequence_index, kind)`.
    ///
    /// Identical inputs always yield the same id; the readable prefix keeps
    /// ids greppable in logs.
    pub fn derive(
        document_id: &DocumentId,
        page_number: u32,
        sequence_index: u32,
        kind: ChunkKind,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(document_id.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(page_number.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(kind.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(sequence_index.to_string().as_bytes());
        let digest = hex(&hasher.finalize());

        Self(format!(
            "{}_{}_{}_{}",
            kind.as_str(),
            page_number,
            sequence_index,
            &digest[..CHUNK_HASH_LEN]
        ))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex(bytes: &[u8]) -> String {
    use fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{:02x}", b);
        s
    })
}

/// Chunk variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Text,
    Image,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Text => "text",
            ChunkKind::Image => "image",
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted raster written next to the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Path of the saved image bytes
    pub path: PathBuf,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
}

/// The atomic retrievable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub document_id: DocumentId,
    /// Source filename, used for citations
    pub filename: String,
    pub kind: ChunkKind,
    /// Text content; empty for image chunks until captioned
    pub content: String,
    /// 1-indexed page number
    pub page_number: u32,
    /// 0-indexed position within its page and kind
    pub sequence_index: u32,
    /// Present for image chunks only
    pub image: Option<ImageRef>,
    /// Logical delete flag
    #[serde(default)]
    pub deleted: bool,
}

/// Chunk paired with the row holding its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub row_id: RowId,
    pub chunk: Chunk,
}

/// Search hit with its relevance score.
///
/// Score semantics depend on the producing search: raw cosine for vector
/// search, `min(count × 0.1, 1.0)` for keyword search, the weighted sum
/// for hybrid search.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub row_id: RowId,
    pub chunk: Chunk,
    pub score: f32,
}

/// Exact field-equality conjunction over chunk metadata.
///
/// `None` fields match anything. An all-`None` filter matches every chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub document_id: Option<DocumentId>,
    pub kind: Option<ChunkKind>,
    pub page_number: Option<u32>,
    pub filename: Option<String>,
    pub deleted: Option<bool>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter that hides logically deleted chunks.
    pub fn active() -> Self {
        Self {
            deleted: Some(false),
            ..Self::default()
        }
    }

    pub fn with_document(mut self, document_id: DocumentId) -> Self {
        self.document_id = Some(document_id);
        self
    }

    pub fn with_kind(mut self, kind: ChunkKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_page(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = Some(deleted);
        self
    }

    /// True when no field constrains the match.
    pub fn is_empty(&self) -> bool {
        self.document_id.is_none()
            && self.kind.is_none()
            && self.page_number.is_none()
            && self.filename.is_none()
            && self.deleted.is_none()
    }

    pub fn matches(&self, chunk: &Chunk) -> bool {
        self.document_id
            .as_ref()
            .is_none_or(|id| *id == chunk.document_id)
            && self.kind.is_none_or(|k| k == chunk.kind)
            && self.page_number.is_none_or(|p| p == chunk.page_number)
            && self
                .filename
                .as_deref()
                .is_none_or(|f| f == chunk.filename)
            && self.deleted.is_none_or(|d| d == chunk.deleted)
    }
}

/// Index statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Rows in the vector store, sentinels included
    pub total_vectors: usize,
    /// Metadata records, logically deleted included
    pub total_chunks: usize,
    /// Documents in the active document map
    pub total_documents: usize,
    /// Configured embedding dimension
    pub dimension: usize,
    /// Records flagged deleted but not yet compacted
    pub deleted_chunks: usize,
    /// Zero-vector placeholder rows excluded from scoring
    pub sentinel_vectors: usize,
}

/// Outcome of a compaction run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompactionStats {
    /// Rows before compaction
    pub rows_before: usize,
    /// Rows physically removed
    pub chunks_removed: usize,
    /// Deleted ratio before compaction (0.0 to 1.0)
    pub deleted_ratio_before: f32,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Aggregate view of one active document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_id: DocumentId,
    pub filename: String,
    /// Highest page number with at least one chunk
    pub total_pages: u32,
    pub text_chunks: usize,
    pub image_chunks: usize,
    pub total_chunks: usize,
}

/// Error types for index operations.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// Chunk and embedding counts differ on insertion
    #[error("Shape mismatch: {chunks} chunks but {embeddings} embeddings")]
    ShapeMismatch {
        /// Number of chunks submitted
        chunks: usize,
        /// Number of embeddings submitted
        embeddings: usize,
    },
    /// Vector dimension mismatch (expected vs actual)
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured embedding dimension
        expected: usize,
        /// Dimension received
        actual: usize,
    },
    /// Persisted artifacts are partial or inconsistent
    #[error("Persisted index is corrupt: {0}")]
    PersistenceCorrupt(String),
    /// Storage backend error
    #[error("Storage error: {0}")]
    StorageError(String),
    /// Invalid search query or parameter
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Validates that an embedding has the expected dimension.
///
/// # Errors
///
/// Returns `SearchError::DimensionMismatch` if `actual != expected`.
#[inline]
pub fn validate_dimension(expected: usize, actual: usize) -> Result<(), SearchError> {
    if expected != actual {
        return Err(SearchError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
