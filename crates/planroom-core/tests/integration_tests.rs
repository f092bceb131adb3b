//! End-to-end tests for ingestion, retrieval, persistence and maintenance.
//!
//! These tests exercise the full workflow with deterministic in-test
//! providers (no network, no model files):
//! 1. Ingestion: chunking → captioning → embedding → index add → save
//! 2. Retrieval: query embedding → hybrid search → re-rank → citations
//! 3. Persistence: save → load into a fresh index over the same storage
//!
//! Run with: `cargo test -p planroom-core --test integration_tests`

use async_trait::async_trait;
use planroom_core::chunking::{split_windows, DocumentChunker, PagedDocument, RasterImage};
use planroom_core::config::{ChunkerConfig, RetrievalConfig};
use planroom_core::embedding::{ImageDescriber, TextEmbedder};
use planroom_core::error::{ChunkingError, EmbeddingError};
use planroom_core::processing::IngestionPipeline;
use planroom_core::retrieval::{ExtractionKind, HybridRetriever};
use planroom_core::search::{ChunkKind, DocumentId, MetadataFilter, SearchError, VectorIndex};
use planroom_core::storage::{FileStorage, StorageBackend};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Test Fixtures
// ============================================================================

const DIM: usize = 64;

/// Hashed bag-of-words embedder: each lowercase word adds 1.0 to a bucket.
struct BagOfWords;

#[async_trait]
impl TextEmbedder for BagOfWords {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut v = vec![0.0; DIM];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            v[(hasher.finish() % DIM as u64) as usize] += 1.0;
        }
        Ok(v)
    }
}

struct StaticDescriber;

#[async_trait]
impl ImageDescriber for StaticDescriber {
    async fn try_describe(&self, _: &[u8], hint: &str) -> Result<String, EmbeddingError> {
        Ok(format!("Door elevation drawing ({})", hint))
    }
}

/// A three-page plan set: door schedule, room finishes, mechanical notes.
/// Page 1 carries one drawing and one logo too small to keep.
struct PlanSet;

impl PagedDocument for PlanSet {
    fn page_count(&self) -> u32 {
        3
    }

    fn page_text(&self, page: u32) -> Result<String, ChunkingError> {
        Ok(match page {
            1 => "DOOR SCHEDULE\nDoor D-101: 900mm x 2100mm, 60 min fire rating, hardware set 4.\n\
                  Door D-102: 1000mm x 2100mm, 90 min fire rating, hardware set 7."
                .to_string(),
            2 => "ROOM FINISH SCHEDULE\nRoom 204: carpet floor, painted wall, acoustic ceiling.\n\
                  Corridor C-1: vinyl floor, painted wall."
                .to_string(),
            _ => "MECHANICAL NOTES\nAHU-1 serves level 2. Coordinate HVAC ductwork with ceiling."
                .to_string(),
        })
    }

    fn page_images(
        &self,
        page: u32,
    ) -> Result<Vec<Result<RasterImage, ChunkingError>>, ChunkingError> {
        if page != 1 {
            return Ok(Vec::new());
        }
        Ok(vec![
            Ok(RasterImage {
                width: 1200,
                height: 900,
                bytes: vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10],
                extension: "jpg".to_string(),
            }),
            Ok(RasterImage {
                width: 40,
                height: 40,
                bytes: vec![0x89, 0x50],
                extension: "png".to_string(),
            }),
        ])
    }
}

struct Deployment {
    _dir: TempDir,
    data_dir: std::path::PathBuf,
    index: Arc<VectorIndex<FileStorage>>,
    pipeline: IngestionPipeline<FileStorage>,
    retriever: HybridRetriever<FileStorage>,
}

async fn deploy() -> Deployment {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().to_path_buf();
    let (index, pipeline, retriever) = open_at(&data_dir).await;
    Deployment {
        _dir: dir,
        data_dir,
        index,
        pipeline,
        retriever,
    }
}

async fn open_at(
    data_dir: &std::path::Path,
) -> (
    Arc<VectorIndex<FileStorage>>,
    IngestionPipeline<FileStorage>,
    HybridRetriever<FileStorage>,
) {
    let storage = FileStorage::open(data_dir.join("index")).unwrap();
    let index = Arc::new(VectorIndex::open(storage, DIM).await.unwrap());
    let chunker =
        DocumentChunker::new(ChunkerConfig::default(), data_dir.join("images")).unwrap();
    let pipeline = IngestionPipeline::new(Arc::clone(&index), chunker, Arc::new(BagOfWords))
        .unwrap()
        .with_describer(Arc::new(StaticDescriber));
    let retriever = HybridRetriever::new(
        Arc::clone(&index),
        Arc::new(BagOfWords),
        RetrievalConfig::default(),
    )
    .unwrap();
    (index, pipeline, retriever)
}

// ============================================================================
// Ingestion + Retrieval
// ============================================================================

#[tokio::test]
async fn test_ingest_and_retrieve_plan_set() {
    let d = deploy().await;

    let report = d
        .pipeline
        .ingest_document(&PlanSet, DocumentId::new("doc_plans"), "A-601.pdf", |_| {})
        .await
        .unwrap();

    assert_eq!(report.summary.text_chunks, 3);
    assert_eq!(report.summary.image_chunks, 1);
    assert_eq!(report.captioned_images, 1);

    let context = d
        .retriever
        .retrieve_context("What is the fire rating of door D-101?", None, true, None)
        .await
        .unwrap();

    assert!(!context.is_empty());
    assert_eq!(context.citations[0].source, "A-601.pdf");
    assert_eq!(context.citations[0].page, 1);
    assert!(context.text_contexts.iter().any(|t| t.contains("D-101")));
    assert!(context
        .image_contexts
        .iter()
        .any(|i| i.description.starts_with("Door elevation") && i.image_path.is_some()));
}

#[tokio::test]
async fn test_extraction_context_for_room_schedule() {
    let d = deploy().await;
    d.pipeline
        .ingest_document(&PlanSet, DocumentId::new("doc_plans"), "A-601.pdf", |_| {})
        .await
        .unwrap();

    let context = d
        .retriever
        .retrieve_for_extraction(&ExtractionKind::RoomSchedule, None)
        .await
        .unwrap();

    assert!(context
        .citations
        .iter()
        .any(|c| c.page == 2 && c.chunk_kind == ChunkKind::Text));
}

#[tokio::test]
async fn test_ingest_plain_text_bytes() {
    let d = deploy().await;
    let text = "General notes.\u{c}Plumbing fixture schedule: WC-1 wall hung.";

    let report = d
        .pipeline
        .ingest_bytes(text.as_bytes(), "notes.txt", |_| {})
        .await
        .unwrap();

    assert_eq!(report.page_count, 2);
    let chunks = d.index.get_chunks_by_document(report.document_id()).await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].page_number, 2);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_restart_reproduces_search_results() {
    let d = deploy().await;
    d.pipeline
        .ingest_document(&PlanSet, DocumentId::new("doc_plans"), "A-601.pdf", |_| {})
        .await
        .unwrap();

    let query = BagOfWords.embed_text("hvac ductwork ceiling").await.unwrap();
    let before = d.index.search(&query, 5, None).await.unwrap();

    // Ingestion saved; a fresh process opens the same directory
    let (restored, _, _) = open_at(&d.data_dir).await;
    let after = restored.search(&query, 5, None).await.unwrap();

    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.row_id, b.row_id);
        assert_eq!(a.chunk, b.chunk);
        assert_eq!(a.score, b.score);
    }
    assert_eq!(d.index.get_stats().await, restored.get_stats().await);
}

#[tokio::test]
async fn test_corrupt_artifact_fails_load_and_leaves_index_empty() {
    let d = deploy().await;
    d.pipeline
        .ingest_document(&PlanSet, DocumentId::new("doc_plans"), "A-601.pdf", |_| {})
        .await
        .unwrap();

    let storage = FileStorage::open(d.data_dir.join("index")).unwrap();
    storage.save("metadata.json", b"{ not json").await.unwrap();

    let index = VectorIndex::new(storage, DIM);
    let result = index.load().await;

    assert!(matches!(result, Err(SearchError::PersistenceCorrupt(_))));
    assert_eq!(index.get_stats().await.total_chunks, 0);
}

// ============================================================================
// Deletion + Compaction
// ============================================================================

#[tokio::test]
async fn test_delete_then_compact_survives_restart() {
    let d = deploy().await;
    d.pipeline
        .ingest_document(&PlanSet, DocumentId::new("doc_old"), "old.pdf", |_| {})
        .await
        .unwrap();
    d.pipeline
        .ingest_document(&PlanSet, DocumentId::new("doc_new"), "new.pdf", |_| {})
        .await
        .unwrap();

    let marked = d.index.delete_document(&DocumentId::new("doc_old")).await;
    assert_eq!(marked, 4);
    assert!(d
        .index
        .get_chunks_by_document(&DocumentId::new("doc_old"))
        .await
        .is_empty());

    // Raw search still sees the flagged rows; the retriever does not
    let query = BagOfWords.embed_text("door schedule").await.unwrap();
    let raw = d.index.search(&query, 8, None).await.unwrap();
    assert!(raw.iter().any(|h| h.chunk.deleted));
    let context = d
        .retriever
        .retrieve_context("door schedule", Some(8), true, None)
        .await
        .unwrap();
    assert!(context.citations.iter().all(|c| c.source == "new.pdf"));

    assert!(d.index.needs_compaction().await);
    let stats = d.index.compact().await.unwrap();
    assert_eq!(stats.chunks_removed, 4);
    d.index.save().await.unwrap();

    let (restored, _, _) = open_at(&d.data_dir).await;
    let after = restored.get_stats().await;
    assert_eq!(after.total_chunks, 4);
    assert_eq!(after.deleted_chunks, 0);
    assert_eq!(after.total_documents, 1);
    let active = restored
        .search(&query, 8, Some(&MetadataFilter::active()))
        .await
        .unwrap();
    assert!(active.iter().all(|h| h.chunk.filename == "new.pdf"));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_retrieval_during_ingestion_sees_whole_documents() {
    let d = deploy().await;
    d.pipeline
        .ingest_document(&PlanSet, DocumentId::new("doc_a"), "a.pdf", |_| {})
        .await
        .unwrap();

    let ingest = d
        .pipeline
        .ingest_document(&PlanSet, DocumentId::new("doc_b"), "b.pdf", |_| {});
    let retrieve = d
        .retriever
        .retrieve_context("door hardware", Some(10), true, None);
    let (report, context) = tokio::join!(ingest, retrieve);

    report.unwrap();
    let context = context.unwrap();
    assert!(context
        .citations
        .iter()
        .all(|c| c.source == "a.pdf" || c.source == "b.pdf"));

    let stats = d.index.get_stats().await;
    assert_eq!(stats.total_vectors, stats.total_chunks);
    assert_eq!(stats.total_documents, 2);
    let doc_b = d
        .index
        .get_chunks_by_document(&DocumentId::new("doc_b"))
        .await;
    assert_eq!(doc_b.len(), 4);
}

// ============================================================================
// Chunk boundaries
// ============================================================================

#[test]
fn test_window_boundaries_with_production_defaults() {
    let config = ChunkerConfig::default();
    let text = "x".repeat(1500);

    let windows = split_windows(&text, config.chunk_size, config.chunk_overlap);

    assert_eq!(windows[0].start_char, 0);
    assert_eq!(windows[0].end_char, 1000);
    assert_eq!(windows[1].start_char, 800);
}
