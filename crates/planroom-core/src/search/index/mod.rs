//! The shared vector index.
//!
//! [`VectorIndex`] owns the three pieces of mutable state that must move
//! together:
//!
//! - the row-aligned vector store ([`VectorSearchEngine`])
//! - the chunk metadata list, where record `i` describes row `i`
//! - the active document map (document id -> owned row ids)
//!
//! # Concurrency
//!
//! All three sit behind one `tokio::sync::RwLock`. Searches take the read
//! lock and may run concurrently; `add`, `add_and_save`, `delete_document`,
//! `compact`, `save` and `load` take the write lock, so a reader never observes a row
//! without its metadata. The index is constructed once and shared by
//! handle (`Arc<VectorIndex<_>>`).
//!
//! # Deletion
//!
//! [`delete_document`](VectorIndex::delete_document) is logical: rows stay
//! in the vector store and raw [`search`](VectorIndex::search) can still
//! return them, flagged `deleted = true`, unless the caller filters on
//! `deleted = false`. [`compact`](VectorIndex::compact) is the maintenance
//! operation that physically drops them.

mod compaction;


use super::fusion::weighted_fusion;
use super::keyword::keyword_scan;
use super::persistence::{
    decode_index, encode_document_map, encode_metadata, encode_vectors, DocumentMap,
    ARTIFACT_KEYS, DOCUMENT_MAP_KEY, METADATA_KEY, VECTORS_KEY,
};
use super::types::{
    Chunk, ChunkId, ChunkKind, ChunkRecord, DocumentId, DocumentSummary, IndexStats,
    MetadataFilter, RowId, ScoredChunk, SearchError,
};
use super::vector::VectorSearchEngine;
use crate::config::{FILTER_OVERFETCH, HYBRID_OVERFETCH};
use crate::storage::StorageBackend;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Index state guarded by the lock.
struct IndexState {
    /// Created on first `add` (or on load of a non-empty index)
    vectors: Option<VectorSearchEngine>,
    metadata: Vec<ChunkRecord>,
    document_map: DocumentMap,
}

impl IndexState {
    fn empty() -> Self {
        Self {
            vectors: None,
            metadata: Vec::new(),
            document_map: DocumentMap::new(),
        }
    }

    fn total_vectors(&self) -> usize {
        self.vectors.as_ref().map_or(0, VectorSearchEngine::len)
    }

    /// Appends pre-validated rows and records them in the document map.
    fn append(
        &mut self,
        dimension: usize,
        chunks: Vec<Chunk>,
        embeddings: &[Vec<f32>],
    ) -> Result<Vec<RowId>, SearchError> {
        let vectors = self
            .vectors
            .get_or_insert_with(|| VectorSearchEngine::new(dimension));

        let mut row_ids = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.into_iter().zip(embeddings.iter()) {
            let row_id = vectors.push(embedding)?;
            debug_assert_eq!(row_id.as_index(), self.metadata.len());

            self.document_map
                .entry(chunk.document_id.clone())
                .or_default()
                .push(row_id);
            self.metadata.push(ChunkRecord { row_id, chunk });
            row_ids.push(row_id);
        }
        Ok(row_ids)
    }

    /// Drops every row at or past `rows`, undoing appends made since the
    /// index held that many rows.
    fn truncate(&mut self, rows: usize) {
        if self.metadata.len() <= rows {
            return;
        }
        self.vectors = self.vectors.as_ref().and_then(|v| {
            let keep: Vec<bool> = (0..v.len()).map(|i| i < rows).collect();
            Some(v.retain(&keep)).filter(|v| !v.is_empty())
        });
        self.metadata.truncate(rows);
        self.document_map.retain(|_, owned| {
            owned.retain(|row| row.as_index() < rows);
            !owned.is_empty()
        });
    }

    fn vector_search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
        overfetch: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        let Some(vectors) = self.vectors.as_ref() else {
            debug!("Search on empty index");
            return Ok(Vec::new());
        };
        vectors.validate(query)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let filter = filter.filter(|f| !f.is_empty());
        let fetch = if filter.is_some() {
            top_k.saturating_mul(overfetch).min(vectors.len())
        } else {
            top_k
        };

        let hits = vectors.search(query, fetch)?;
        Ok(hits
            .into_iter()
            .filter_map(|(row_id, score)| {
                // Rows without metadata are skipped, never surfaced
                let record = self.metadata.get(row_id.as_index())?;
                Some(ScoredChunk {
                    row_id,
                    chunk: record.chunk.clone(),
                    score,
                })
            })
            .filter(|hit| filter.is_none_or(|f| f.matches(&hit.chunk)))
            .take(top_k)
            .collect())
    }

    fn keyword_search(
        &self,
        term: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Vec<ScoredChunk> {
        keyword_scan(&self.metadata, term, top_k, filter)
            .into_iter()
            .filter_map(|(row_id, score)| {
                let record = self.metadata.get(row_id.as_index())?;
                Some(ScoredChunk {
                    row_id,
                    chunk: record.chunk.clone(),
                    score,
                })
            })
            .collect()
    }
}

/// Vector index with metadata, document map and persistence.
///
/// # Example
///
/// ```ignore
/// use planroom_core::search::VectorIndex;
/// use planroom_core::storage::FileStorage;
///
/// let index = VectorIndex::open(FileStorage::open("./data")?, 384).await?;
/// index.add(chunks, embeddings).await?;
/// let hits = index.search(&query, 5, Some(&MetadataFilter::active())).await?;
/// index.save().await?;
/// ```
pub struct VectorIndex<S: StorageBackend> {
    state: RwLock<IndexState>,
    storage: S,
    dimension: usize,
}

impl<S: StorageBackend> VectorIndex<S> {
    /// Creates an empty index (no persistence load).
    ///
    /// Use [`open`](Self::open) to restore previously saved artifacts.
    pub fn new(storage: S, dimension: usize) -> Self {
        Self {
            state: RwLock::new(IndexState::empty()),
            storage,
            dimension,
        }
    }

    /// Creates an index, loading saved artifacts if any exist.
    ///
    /// A fresh deployment with no artifacts yields an empty index.
    pub async fn open(storage: S, dimension: usize) -> Result<Self, SearchError> {
        let index = Self::new(storage, dimension);
        index.load().await?;
        Ok(index)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Appends chunks with their embeddings.
    ///
    /// Embeddings are normalized before storage. Row ids are assigned in
    /// submission order, starting at the current vector count. All
    /// embeddings are validated before any row is written, so a failed
    /// call leaves the index unchanged.
    ///
    /// # Errors
    ///
    /// - `ShapeMismatch` if `chunks.len() != embeddings.len()`
    /// - `DimensionMismatch` if any embedding has the wrong length
    #[instrument(skip_all, fields(chunks = chunks.len()))]
    pub async fn add(
        &self,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Vec<RowId>, SearchError> {
        if chunks.len() != embeddings.len() {
            return Err(SearchError::ShapeMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        if chunks.is_empty() {
            warn!("add called with no chunks");
            return Ok(Vec::new());
        }
        for embedding in &embeddings {
            super::types::validate_dimension(self.dimension, embedding.len())?;
        }

        let mut state = self.state.write().await;
        let row_ids = state.append(self.dimension, chunks, &embeddings)?;
        debug!(
            "Added {} rows, index now holds {}",
            row_ids.len(),
            state.total_vectors()
        );
        Ok(row_ids)
    }

    /// Appends chunks like [`add`](Self::add) and persists the result
    /// under the same write lock.
    ///
    /// If writing the artifacts fails, the appended rows are removed
    /// again before the error is returned, so the chunks are either
    /// indexed and saved or absent from the in-memory index.
    ///
    /// # Errors
    ///
    /// The errors of [`add`](Self::add), plus `StorageError` or
    /// `PersistenceCorrupt` from the save.
    #[instrument(skip_all, fields(chunks = chunks.len()))]
    pub async fn add_and_save(
        &self,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Vec<RowId>, SearchError> {
        if chunks.len() != embeddings.len() {
            return Err(SearchError::ShapeMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        for embedding in &embeddings {
            super::types::validate_dimension(self.dimension, embedding.len())?;
        }

        let mut state = self.state.write().await;
        let rows_before = state.metadata.len();
        let row_ids = state.append(self.dimension, chunks, &embeddings)?;

        if let Err(err) = self.write_artifacts(&state).await {
            state.truncate(rows_before);
            warn!("Save failed, rolled back {} rows: {}", row_ids.len(), err);
            return Err(err);
        }
        debug!(
            "Added and saved {} rows, index now holds {}",
            row_ids.len(),
            state.total_vectors()
        );
        Ok(row_ids)
    }

    /// Nearest-neighbor search by cosine similarity.
    ///
    /// With a non-empty filter the engine over-fetches `3 × top_k`
    /// candidates (capped at index size) before filtering. Results are
    /// similarity-descending and at most `top_k` long. An empty index
    /// returns an empty list.
    ///
    /// Logically deleted chunks are returned unless the filter excludes
    /// them.
    #[instrument(skip_all, fields(top_k = top_k, filtered = filter.is_some()))]
    pub async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        let state = self.state.read().await;
        state.vector_search(query, top_k, filter, FILTER_OVERFETCH)
    }

    /// Case-insensitive substring search over chunk content.
    ///
    /// Scores are `min(occurrences × 0.1, 1.0)`; the filter applies
    /// before scoring.
    pub async fn keyword_search(
        &self,
        term: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Vec<ScoredChunk> {
        let state = self.state.read().await;
        state.keyword_search(term, top_k, filter)
    }

    /// Weighted fusion of vector search and per-keyword searches.
    ///
    /// The vector leg over-fetches `2 × top_k`; each keyword leg fetches
    /// `top_k`. Per chunk id, `fused = vector × w + Σ keyword × (1 − w)`.
    /// Both legs run under one read lock so they see the same state.
    ///
    /// # Errors
    ///
    /// `InvalidQuery` if `vector_weight` is outside `[0, 1]`.
    #[instrument(skip_all, fields(top_k = top_k, keywords = keywords.len(), vector_weight = vector_weight))]
    pub async fn hybrid_search(
        &self,
        query: &[f32],
        keywords: &[String],
        top_k: usize,
        vector_weight: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        if !(0.0..=1.0).contains(&vector_weight) {
            return Err(SearchError::InvalidQuery(format!(
                "vector_weight must be within [0, 1], got {}",
                vector_weight
            )));
        }

        let state = self.state.read().await;
        let vector_hits = state.vector_search(
            query,
            top_k.saturating_mul(HYBRID_OVERFETCH),
            filter,
            FILTER_OVERFETCH,
        )?;
        let keyword_hits: Vec<ScoredChunk> = keywords
            .iter()
            .flat_map(|keyword| state.keyword_search(keyword, top_k, filter))
            .collect();

        let mut rows: HashMap<ChunkId, RowId> = HashMap::new();
        for hit in vector_hits.iter().chain(keyword_hits.iter()) {
            rows.entry(hit.chunk.chunk_id.clone()).or_insert(hit.row_id);
        }

        let vector_scores: Vec<(ChunkId, f32)> = vector_hits
            .iter()
            .map(|h| (h.chunk.chunk_id.clone(), h.score))
            .collect();
        let keyword_scores: Vec<(ChunkId, f32)> = keyword_hits
            .iter()
            .map(|h| (h.chunk.chunk_id.clone(), h.score))
            .collect();

        let fused = weighted_fusion(&vector_scores, &keyword_scores, vector_weight);
        debug!(
            "Hybrid: {} vector hits, {} keyword hits, {} fused",
            vector_hits.len(),
            keyword_hits.len(),
            fused.len()
        );

        Ok(fused
            .into_iter()
            .filter_map(|(chunk_id, score)| {
                let row_id = *rows.get(&chunk_id)?;
                let record = state.metadata.get(row_id.as_index())?;
                Some(ScoredChunk {
                    row_id,
                    chunk: record.chunk.clone(),
                    score,
                })
            })
            .take(top_k)
            .collect())
    }

    /// Chunks of an active document, in row order.
    ///
    /// Empty for unknown or deleted documents.
    pub async fn get_chunks_by_document(&self, document_id: &DocumentId) -> Vec<Chunk> {
        let state = self.state.read().await;
        state
            .document_map
            .get(document_id)
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| state.metadata.get(row.as_index()))
                    .map(|record| record.chunk.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Marks every chunk of a document deleted and removes it from the
    /// active map. Returns the number of chunks marked.
    ///
    /// Vectors are not removed; see [`compact`](Self::compact).
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn delete_document(&self, document_id: &DocumentId) -> usize {
        let mut state = self.state.write().await;
        let Some(rows) = state.document_map.remove(document_id) else {
            debug!("Delete of unknown document {}", document_id);
            return 0;
        };

        let mut marked = 0;
        for row in &rows {
            if let Some(record) = state.metadata.get_mut(row.as_index()) {
                record.chunk.deleted = true;
                marked += 1;
            }
        }
        info!("Deleted document {} ({} chunks)", document_id, marked);
        marked
    }

    pub async fn get_stats(&self) -> IndexStats {
        let state = self.state.read().await;
        IndexStats {
            total_vectors: state.total_vectors(),
            total_chunks: state.metadata.len(),
            total_documents: state.document_map.len(),
            dimension: self.dimension,
            deleted_chunks: state.metadata.iter().filter(|r| r.chunk.deleted).count(),
            sentinel_vectors: state
                .vectors
                .as_ref()
                .map_or(0, VectorSearchEngine::sentinel_count),
        }
    }

    /// One summary per active document, ordered by document id.
    pub async fn list_documents(&self) -> Vec<DocumentSummary> {
        let state = self.state.read().await;
        state
            .document_map
            .iter()
            .map(|(document_id, rows)| {
                let chunks: Vec<&Chunk> = rows
                    .iter()
                    .filter_map(|row| state.metadata.get(row.as_index()))
                    .map(|record| &record.chunk)
                    .collect();
                DocumentSummary {
                    document_id: document_id.clone(),
                    filename: chunks
                        .first()
                        .map(|c| c.filename.clone())
                        .unwrap_or_default(),
                    total_pages: chunks.iter().map(|c| c.page_number).max().unwrap_or(0),
                    text_chunks: chunks.iter().filter(|c| c.kind == ChunkKind::Text).count(),
                    image_chunks: chunks
                        .iter()
                        .filter(|c| c.kind == ChunkKind::Image)
                        .count(),
                    total_chunks: chunks.len(),
                }
            })
            .collect()
    }

    /// Writes the three artifacts to storage.
    ///
    /// Holds the write lock for the duration so the artifacts describe one
    /// consistent state.
    #[instrument(skip_all)]
    pub async fn save(&self) -> Result<(), SearchError> {
        let state = self.state.write().await;
        self.write_artifacts(&state).await
    }

    async fn write_artifacts(&self, state: &IndexState) -> Result<(), SearchError> {
        let vectors = match state.vectors.as_ref() {
            Some(v) => encode_vectors(self.dimension, v.len(), v.rows()),
            None => encode_vectors(self.dimension, 0, std::iter::empty()),
        };
        let metadata = encode_metadata(&state.metadata)?;
        let document_map = encode_document_map(&state.document_map)?;

        self.storage.save(VECTORS_KEY, &vectors).await?;
        self.storage.save(METADATA_KEY, &metadata).await?;
        self.storage.save(DOCUMENT_MAP_KEY, &document_map).await?;

        info!(
            "Saved index: {} vectors, {} chunks, {} documents",
            state.total_vectors(),
            state.metadata.len(),
            state.document_map.len()
        );
        Ok(())
    }

    /// Restores the index from storage, replacing the in-memory state.
    ///
    /// Returns `Ok(false)` when no artifacts exist (fresh deployment).
    ///
    /// # Errors
    ///
    /// `PersistenceCorrupt` (or `DimensionMismatch`) when artifacts are
    /// partial or inconsistent; the index is left empty in that case.
    #[instrument(skip_all)]
    pub async fn load(&self) -> Result<bool, SearchError> {
        let mut state = self.state.write().await;

        let mut present = Vec::with_capacity(ARTIFACT_KEYS.len());
        for key in ARTIFACT_KEYS {
            if self.storage.exists(key).await? {
                present.push(key);
            }
        }

        if present.is_empty() {
            info!("No saved index found, starting empty");
            *state = IndexState::empty();
            return Ok(false);
        }

        match self.read_artifacts(present.len()).await {
            Ok(restored) => {
                info!(
                    "Loaded index: {} vectors, {} chunks, {} documents",
                    restored.total_vectors(),
                    restored.metadata.len(),
                    restored.document_map.len()
                );
                *state = restored;
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to load saved index, continuing empty: {}", e);
                *state = IndexState::empty();
                Err(e)
            }
        }
    }

    async fn read_artifacts(&self, present: usize) -> Result<IndexState, SearchError> {
        if present != ARTIFACT_KEYS.len() {
            return Err(SearchError::PersistenceCorrupt(format!(
                "only {} of {} artifacts present",
                present,
                ARTIFACT_KEYS.len()
            )));
        }

        let vectors = self.storage.load(VECTORS_KEY).await?;
        let metadata = self.storage.load(METADATA_KEY).await?;
        let document_map = self.storage.load(DOCUMENT_MAP_KEY).await?;
        let persisted = decode_index(self.dimension, &vectors, &metadata, &document_map)?;

        let engine = if persisted.rows.is_empty() {
            None
        } else {
            let mut engine = VectorSearchEngine::new(self.dimension);
            for row in persisted.rows {
                engine.push_normalized(row);
            }
            Some(engine)
        };

        Ok(IndexState {
            vectors: engine,
            metadata: persisted.metadata,
            document_map: persisted.document_map,
        })
    }
}
