//! Ingestion pipeline: chunk, caption, embed, index, save.

use super::progress::{IngestionProgress, IngestionStage, ProgressTimer};
use crate::chunking::{ChunkedDocument, DocumentChunker, PagedDocument};
use crate::config::EMBEDDING_BATCH_SIZE;
use crate::embedding::{
    is_zero_vector, ImageDescriber, ImageEmbedder, TextEmbedder, DESCRIPTION_PLACEHOLDER,
};
use crate::error::{EmbeddingError, IngestionError};
use crate::search::{
    validate_dimension, Chunk, ChunkKind, DocumentId, DocumentSummary, RowId, VectorIndex,
};
use crate::storage::StorageBackend;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub summary: DocumentSummary,
    /// Pages in the source, including pages that produced no chunks
    pub page_count: u32,
    /// Rows assigned by the index, in chunk order
    pub row_ids: Vec<RowId>,
    /// Image chunks that received a description
    pub captioned_images: usize,
    /// Image chunks stored as zero sentinel rows
    pub sentinel_images: usize,
    /// Wall-clock time for the whole document (milliseconds)
    pub elapsed_ms: u64,
}

impl IngestionReport {
    pub fn document_id(&self) -> &DocumentId {
        &self.summary.document_id
    }
}

/// Coordinates chunking, captioning and embedding into a shared index.
///
/// # Thread Safety
///
/// The pipeline is `Send + Sync`; providers and the index are held through
/// `Arc`, so one pipeline can serve concurrent uploads. Each document's
/// rows are added in a single `add` call.
pub struct IngestionPipeline<S: StorageBackend> {
    index: Arc<VectorIndex<S>>,
    chunker: DocumentChunker,
    embedder: Arc<dyn TextEmbedder>,
    describer: Option<Arc<dyn ImageDescriber>>,
    image_embedder: Option<Arc<dyn ImageEmbedder>>,
    batch_size: usize,
}

impl<S: StorageBackend> IngestionPipeline<S> {
    /// Creates a pipeline without captioning or image embedding.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if the embedder's dimension differs from the
    /// index's.
    pub fn new(
        index: Arc<VectorIndex<S>>,
        chunker: DocumentChunker,
        embedder: Arc<dyn TextEmbedder>,
    ) -> Result<Self, IngestionError> {
        validate_dimension(index.dimension(), embedder.dimension())?;
        Ok(Self {
            index,
            chunker,
            embedder,
            describer: None,
            image_embedder: None,
            batch_size: EMBEDDING_BATCH_SIZE,
        })
    }

    /// Captions image chunks before embedding.
    pub fn with_describer(mut self, describer: Arc<dyn ImageDescriber>) -> Self {
        self.describer = Some(describer);
        self
    }

    /// Embeds uncaptioned images directly.
    ///
    /// Image vectors share rows with text vectors, so the image embedder
    /// must produce the index's dimension (a joint text/image space).
    pub fn with_image_embedder(
        mut self,
        image_embedder: Arc<dyn ImageEmbedder>,
    ) -> Result<Self, IngestionError> {
        validate_dimension(self.index.dimension(), image_embedder.dimension())?;
        self.image_embedder = Some(image_embedder);
        Ok(self)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn index(&self) -> &Arc<VectorIndex<S>> {
        &self.index
    }

    pub fn chunker(&self) -> &DocumentChunker {
        &self.chunker
    }

    /// Ingests an uploaded file, detecting its format from `filename`.
    ///
    /// A fresh [`DocumentId`] is generated for every call.
    pub async fn ingest_bytes<F>(
        &self,
        bytes: &[u8],
        filename: &str,
        on_progress: F,
    ) -> Result<IngestionReport, IngestionError>
    where
        F: FnMut(IngestionProgress) + Send,
    {
        let timer = ProgressTimer::new();
        let document_id = DocumentId::generate(filename, bytes);
        let chunked = self.chunker.chunk_bytes(bytes, &document_id, filename)?;
        self.index_document(document_id, filename, chunked, timer, on_progress)
            .await
    }

    /// Ingests an already decoded document under `document_id`.
    pub async fn ingest_document<F>(
        &self,
        document: &dyn PagedDocument,
        document_id: DocumentId,
        filename: &str,
        on_progress: F,
    ) -> Result<IngestionReport, IngestionError>
    where
        F: FnMut(IngestionProgress) + Send,
    {
        let timer = ProgressTimer::new();
        let chunked = self.chunker.chunk(document, &document_id, filename)?;
        self.index_document(document_id, filename, chunked, timer, on_progress)
            .await
    }

    #[instrument(skip_all, fields(document_id = %document_id, filename = filename))]
    async fn index_document<F>(
        &self,
        document_id: DocumentId,
        filename: &str,
        chunked: ChunkedDocument,
        timer: ProgressTimer,
        mut on_progress: F,
    ) -> Result<IngestionReport, IngestionError>
    where
        F: FnMut(IngestionProgress) + Send,
    {
        let page_count = chunked.page_count;
        let mut chunks = chunked.into_chunks();
        on_progress(IngestionProgress::new(
            IngestionStage::Chunking,
            chunks.len(),
            chunks.len(),
            timer.elapsed_ms(),
        ));

        let captioned_images = self
            .caption_images(&mut chunks, filename, &timer, &mut on_progress)
            .await;
        let embeddings = self.embed_chunks(&chunks, &timer, &mut on_progress).await?;
        let sentinel_images = embeddings.iter().filter(|e| is_zero_vector(e)).count();
        let summary = summarize(&document_id, filename, &chunks);

        let row_ids = if chunks.is_empty() {
            warn!("{} produced no chunks; nothing indexed", filename);
            Vec::new()
        } else {
            let total = chunks.len();
            let row_ids = self.index.add_and_save(chunks, embeddings).await?;
            on_progress(IngestionProgress::new(
                IngestionStage::Indexing,
                total,
                total,
                timer.elapsed_ms(),
            ));
            row_ids
        };

        let report = IngestionReport {
            summary,
            page_count,
            row_ids,
            captioned_images,
            sentinel_images,
            elapsed_ms: timer.elapsed_ms(),
        };
        info!(
            "Ingested {}: {} text chunks + {} image chunks ({} captioned) in {}ms",
            filename,
            report.summary.text_chunks,
            report.summary.image_chunks,
            captioned_images,
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Fills image chunk content from the describer. Returns how many
    /// images got a real description.
    async fn caption_images<F>(
        &self,
        chunks: &mut [Chunk],
        filename: &str,
        timer: &ProgressTimer,
        on_progress: &mut F,
    ) -> usize
    where
        F: FnMut(IngestionProgress) + Send,
    {
        let Some(describer) = self.describer.as_ref() else {
            return 0;
        };

        let total = chunks.iter().filter(|c| c.kind == ChunkKind::Image).count();
        let mut captioned = 0;
        for (done, chunk) in chunks
            .iter_mut()
            .filter(|c| c.kind == ChunkKind::Image)
            .enumerate()
        {
            let Some(path) = chunk.image.as_ref().map(|i| i.path.clone()) else {
                continue;
            };
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    let hint = format!(
                        "Construction drawing from {}, page {}",
                        filename, chunk.page_number
                    );
                    let description = describer.describe_image(&bytes, &hint).await;
                    if description != DESCRIPTION_PLACEHOLDER {
                        chunk.content = description;
                        captioned += 1;
                    }
                }
                Err(e) => warn!("Cannot read image {}: {}", path.display(), e),
            }
            on_progress(IngestionProgress::new(
                IngestionStage::Captioning,
                done + 1,
                total,
                timer.elapsed_ms(),
            ));
        }

        debug!("Captioned {} of {} images", captioned, total);
        captioned
    }

    /// One embedding per chunk, aligned with `chunks`.
    ///
    /// Chunks with text go through the text embedder in batches; a zero
    /// vector back from it is an upstream failure. Blank image chunks go
    /// through the image embedder when configured and get a zero sentinel
    /// otherwise.
    async fn embed_chunks<F>(
        &self,
        chunks: &[Chunk],
        timer: &ProgressTimer,
        on_progress: &mut F,
    ) -> Result<Vec<Vec<f32>>, IngestionError>
    where
        F: FnMut(IngestionProgress) + Send,
    {
        let dimension = self.index.dimension();
        let mut embeddings = vec![vec![0.0f32; dimension]; chunks.len()];

        let text_jobs: Vec<usize> = chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.content.trim().is_empty())
            .map(|(i, _)| i)
            .collect();

        let mut completed = 0;
        for batch in text_jobs.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|&i| chunks[i].content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "requested {} embeddings, received {}",
                    texts.len(),
                    vectors.len()
                ))
                .into());
            }
            for (&i, vector) in batch.iter().zip(vectors) {
                check_dimension(dimension, &vector)?;
                if is_zero_vector(&vector) {
                    return Err(EmbeddingError::InvalidResponse(format!(
                        "zero vector for chunk {}",
                        chunks[i].chunk_id
                    ))
                    .into());
                }
                embeddings[i] = vector;
            }

            completed += batch.len();
            on_progress(IngestionProgress::new(
                IngestionStage::Embedding,
                completed,
                text_jobs.len(),
                timer.elapsed_ms(),
            ));
        }

        if let Some(image_embedder) = self.image_embedder.as_ref() {
            for (i, chunk) in chunks.iter().enumerate() {
                if chunk.kind != ChunkKind::Image || !chunk.content.trim().is_empty() {
                    continue;
                }
                let Some(image) = chunk.image.as_ref() else {
                    continue;
                };
                let bytes = match tokio::fs::read(&image.path).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Cannot read image {}: {}", image.path.display(), e);
                        continue;
                    }
                };
                let vector = image_embedder.embed_image(&bytes).await?;
                check_dimension(dimension, &vector)?;
                embeddings[i] = vector;
            }
        }

        Ok(embeddings)
    }
}

fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

fn summarize(document_id: &DocumentId, filename: &str, chunks: &[Chunk]) -> DocumentSummary {
    let text_chunks = chunks.iter().filter(|c| c.kind == ChunkKind::Text).count();
    DocumentSummary {
        document_id: document_id.clone(),
        filename: filename.to_string(),
        total_pages: chunks.iter().map(|c| c.page_number).max().unwrap_or(0),
        text_chunks,
        image_chunks: chunks.len() - text_chunks,
        total_chunks: chunks.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::RasterImage;
    use crate::config::ChunkerConfig;
    use crate::error::ChunkingError;
    use crate::search::{MetadataFilter, SearchError};
    use crate::storage::{InMemoryStorage, StorageError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Deterministic 4-d embedder that counts its batch calls.
    #[derive(Default)]
    struct CountingEmbedder {
        batches: AtomicUsize,
    }

    #[async_trait]
    impl TextEmbedder for CountingEmbedder {
        fn dimension(&self) -> usize {
            4
        }

        async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let len = text.len() as f32;
            Ok(vec![1.0, len, (len * 0.5).sin(), 0.25])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            let mut out = Vec::with_capacity(texts.len());
            for t in texts {
                out.push(self.embed_text(t).await?);
            }
            Ok(out)
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl TextEmbedder for BrokenEmbedder {
        fn dimension(&self) -> usize {
            4
        }

        async fn embed_text(&self, _: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::RequestFailed("429 Too Many Requests".to_string()))
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl TextEmbedder for ShortEmbedder {
        fn dimension(&self) -> usize {
            4
        }

        async fn embed_text(&self, _: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct ZeroEmbedder;

    #[async_trait]
    impl TextEmbedder for ZeroEmbedder {
        fn dimension(&self) -> usize {
            4
        }

        async fn embed_text(&self, _: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![0.0; 4])
        }
    }

    /// Memory storage whose writes always fail.
    #[derive(Default)]
    struct ReadOnlyStorage(InMemoryStorage);

    #[async_trait]
    impl StorageBackend for ReadOnlyStorage {
        async fn save(&self, _: &str, _: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::IoError("disk full".to_string()))
        }

        async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            self.0.load(key).await
        }

        async fn exists(&self, key: &str) -> Result<bool, StorageError> {
            self.0.exists(key).await
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.0.delete(key).await
        }

        async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
            self.0.list_keys().await
        }

        async fn clear(&self) -> Result<(), StorageError> {
            self.0.clear().await
        }
    }

    struct FixedDescriber(&'static str);

    #[async_trait]
    impl ImageDescriber for FixedDescriber {
        async fn try_describe(&self, _: &[u8], _: &str) -> Result<String, EmbeddingError> {
            if self.0.is_empty() {
                Err(EmbeddingError::RequestFailed("vision model offline".to_string()))
            } else {
                Ok(self.0.to_string())
            }
        }
    }

    struct FlatImageEmbedder(usize);

    #[async_trait]
    impl ImageEmbedder for FlatImageEmbedder {
        fn dimension(&self) -> usize {
            self.0
        }

        async fn embed_image(&self, _: &[u8]) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![0.5; self.0])
        }
    }

    struct PlanSet;

    impl PagedDocument for PlanSet {
        fn page_count(&self) -> u32 {
            2
        }

        fn page_text(&self, page: u32) -> Result<String, ChunkingError> {
            Ok(match page {
                1 => "Door D-101: 900mm, 60 min fire rating.".to_string(),
                _ => "Room 204 finishes: carpet.".to_string(),
            })
        }

        fn page_images(
            &self,
            page: u32,
        ) -> Result<Vec<Result<RasterImage, ChunkingError>>, ChunkingError> {
            if page == 2 {
                Ok(vec![Ok(RasterImage {
                    width: 400,
                    height: 300,
                    bytes: vec![0xff, 0xd8, 0xff],
                    extension: "jpg".to_string(),
                })])
            } else {
                Ok(Vec::new())
            }
        }
    }

    type Shared = Arc<InMemoryStorage>;

    fn setup(
        dir: &TempDir,
        embedder: Arc<dyn TextEmbedder>,
    ) -> (Arc<VectorIndex<Shared>>, IngestionPipeline<Shared>, Shared) {
        let storage = Arc::new(InMemoryStorage::new());
        let index = Arc::new(VectorIndex::new(Arc::clone(&storage), 4));
        let chunker = DocumentChunker::new(ChunkerConfig::default(), dir.path()).unwrap();
        let pipeline = IngestionPipeline::new(Arc::clone(&index), chunker, embedder).unwrap();
        (index, pipeline, storage)
    }

    #[tokio::test]
    async fn test_ingest_indexes_and_saves() {
        let dir = TempDir::new().unwrap();
        let (index, pipeline, storage) = setup(&dir, Arc::new(CountingEmbedder::default()));

        let report = pipeline
            .ingest_document(&PlanSet, DocumentId::new("doc_plans"), "plans.pdf", |_| {})
            .await
            .unwrap();

        assert_eq!(report.summary.text_chunks, 2);
        assert_eq!(report.summary.image_chunks, 1);
        assert_eq!(report.summary.total_pages, 2);
        assert_eq!(report.page_count, 2);
        assert_eq!(report.row_ids.len(), 3);
        assert_eq!(report.sentinel_images, 1);
        assert_eq!(report.captioned_images, 0);

        let stats = index.get_stats().await;
        assert_eq!(stats.total_vectors, 3);
        assert_eq!(stats.sentinel_vectors, 1);
        assert!(!storage.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_captioned_images_are_embedded_as_text() {
        let dir = TempDir::new().unwrap();
        let (index, pipeline, _) = setup(&dir, Arc::new(CountingEmbedder::default()));
        let pipeline = pipeline.with_describer(Arc::new(FixedDescriber("Floor plan, level 2")));

        let report = pipeline
            .ingest_document(&PlanSet, DocumentId::new("doc_plans"), "plans.pdf", |_| {})
            .await
            .unwrap();

        assert_eq!(report.captioned_images, 1);
        assert_eq!(report.sentinel_images, 0);

        let hits = index
            .keyword_search("floor plan", 5, Some(&MetadataFilter::active()))
            .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.kind, ChunkKind::Image);
    }

    #[tokio::test]
    async fn test_failed_caption_leaves_sentinel() {
        let dir = TempDir::new().unwrap();
        let (_, pipeline, _) = setup(&dir, Arc::new(CountingEmbedder::default()));
        let pipeline = pipeline.with_describer(Arc::new(FixedDescriber("")));

        let report = pipeline
            .ingest_document(&PlanSet, DocumentId::new("d"), "plans.pdf", |_| {})
            .await
            .unwrap();

        assert_eq!(report.captioned_images, 0);
        assert_eq!(report.sentinel_images, 1);
    }

    #[tokio::test]
    async fn test_image_embedder_fills_uncaptioned_images() {
        let dir = TempDir::new().unwrap();
        let (index, pipeline, _) = setup(&dir, Arc::new(CountingEmbedder::default()));
        let pipeline = pipeline
            .with_image_embedder(Arc::new(FlatImageEmbedder(4)))
            .unwrap();

        let report = pipeline
            .ingest_document(&PlanSet, DocumentId::new("d"), "plans.pdf", |_| {})
            .await
            .unwrap();

        assert_eq!(report.sentinel_images, 0);
        assert_eq!(index.get_stats().await.sentinel_vectors, 0);
    }

    #[tokio::test]
    async fn test_image_embedder_dimension_checked() {
        let dir = TempDir::new().unwrap();
        let (_, pipeline, _) = setup(&dir, Arc::new(CountingEmbedder::default()));
        let result = pipeline.with_image_embedder(Arc::new(FlatImageEmbedder(512)));
        assert!(matches!(result, Err(IngestionError::Index(_))));
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_without_adding() {
        let dir = TempDir::new().unwrap();
        let (index, pipeline, storage) = setup(&dir, Arc::new(BrokenEmbedder));

        let result = pipeline
            .ingest_document(&PlanSet, DocumentId::new("d"), "plans.pdf", |_| {})
            .await;

        assert!(matches!(result, Err(IngestionError::Embedding(_))));
        assert_eq!(index.get_stats().await.total_chunks, 0);
        assert!(storage.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_dimension_from_provider_aborts() {
        let dir = TempDir::new().unwrap();
        let (index, pipeline, _) = setup(&dir, Arc::new(ShortEmbedder));

        let result = pipeline
            .ingest_document(&PlanSet, DocumentId::new("d"), "plans.pdf", |_| {})
            .await;

        assert!(matches!(
            result,
            Err(IngestionError::Embedding(EmbeddingError::DimensionMismatch {
                expected: 4,
                actual: 2
            }))
        ));
        assert_eq!(index.get_stats().await.total_chunks, 0);
    }

    #[tokio::test]
    async fn test_zero_text_embedding_aborts() {
        let dir = TempDir::new().unwrap();
        let (index, pipeline, storage) = setup(&dir, Arc::new(ZeroEmbedder));

        let result = pipeline
            .ingest_document(&PlanSet, DocumentId::new("d"), "plans.pdf", |_| {})
            .await;

        assert!(matches!(
            result,
            Err(IngestionError::Embedding(EmbeddingError::InvalidResponse(_)))
        ));
        let stats = index.get_stats().await;
        assert_eq!(stats.total_chunks, 0);
        assert_eq!(stats.sentinel_vectors, 0);
        assert!(storage.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_leaves_document_absent() {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(VectorIndex::new(ReadOnlyStorage::default(), 4));
        let chunker = DocumentChunker::new(ChunkerConfig::default(), dir.path()).unwrap();
        let pipeline = IngestionPipeline::new(
            Arc::clone(&index),
            chunker,
            Arc::new(CountingEmbedder::default()),
        )
        .unwrap();

        let text = b"Door D-101: 900mm.\x0cRoom 204 finishes.";
        for _ in 0..2 {
            let result = pipeline.ingest_bytes(text, "notes.txt", |_| {}).await;
            assert!(matches!(
                result,
                Err(IngestionError::Index(SearchError::StorageError(_)))
            ));
        }

        let stats = index.get_stats().await;
        assert_eq!(stats.total_chunks, 0);
        assert_eq!(stats.total_vectors, 0);
        assert_eq!(stats.total_documents, 0);
        assert!(index.list_documents().await.is_empty());
    }

    #[tokio::test]
    async fn test_batches_respect_batch_size() {
        let dir = TempDir::new().unwrap();
        let embedder = Arc::new(CountingEmbedder::default());
        let (_, pipeline, _) = setup(&dir, embedder.clone());
        let pipeline = pipeline.with_batch_size(1);

        pipeline
            .ingest_document(&PlanSet, DocumentId::new("d"), "plans.pdf", |_| {})
            .await
            .unwrap();

        assert_eq!(embedder.batches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_progress_reports_every_stage() {
        let dir = TempDir::new().unwrap();
        let (_, pipeline, _) = setup(&dir, Arc::new(CountingEmbedder::default()));
        let pipeline = pipeline.with_describer(Arc::new(FixedDescriber("Elevation")));
        let stages = Mutex::new(Vec::new());

        pipeline
            .ingest_document(&PlanSet, DocumentId::new("d"), "plans.pdf", |p| {
                stages.lock().unwrap().push(p.stage)
            })
            .await
            .unwrap();

        let stages = stages.into_inner().unwrap();
        assert_eq!(stages.first(), Some(&IngestionStage::Chunking));
        assert!(stages.contains(&IngestionStage::Captioning));
        assert!(stages.contains(&IngestionStage::Embedding));
        assert_eq!(stages.last(), Some(&IngestionStage::Indexing));
    }

    #[tokio::test]
    async fn test_ingest_bytes_generates_document_id() {
        let dir = TempDir::new().unwrap();
        let (index, pipeline, _) = setup(&dir, Arc::new(CountingEmbedder::default()));

        let report = pipeline
            .ingest_bytes(b"Corridor C-2 partition.\x0cLobby ceiling.", "notes.txt", |_| {})
            .await
            .unwrap();

        assert!(report.document_id().as_str().starts_with("doc_"));
        assert_eq!(report.summary.total_chunks, 2);
        assert_eq!(index.get_chunks_by_document(report.document_id()).await.len(), 2);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected_at_construction() {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(VectorIndex::new(InMemoryStorage::new(), 8));
        let chunker = DocumentChunker::new(ChunkerConfig::default(), dir.path()).unwrap();
        let result = IngestionPipeline::new(index, chunker, Arc::new(CountingEmbedder::default()));
        assert!(result.is_err());
    }
}
