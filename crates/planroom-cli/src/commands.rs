//! Subcommand implementations.
//!
//! Each invocation opens the index from the data directory, runs one
//! operation and persists the result when the operation mutates the index.

use crate::config::{self, ProviderArgs, StorageKind};
use anyhow::{anyhow, bail, Context, Result};
use planroom_core::chunking::DocumentChunker;
use planroom_core::config::{ChunkerConfig, RetrievalConfig};
use planroom_core::embedding::{OpenAiConfig, OpenAiEmbedder, OpenAiImageDescriber};
use planroom_core::processing::{IngestionPipeline, IngestionReport};
use planroom_core::retrieval::{ExtractionKind, HybridRetriever, RetrievedContext};
use planroom_core::search::{
    CompactionStats, DocumentId, DocumentSummary, IndexStats, MetadataFilter, VectorIndex,
};
use planroom_core::storage::StorageBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

type SharedIndex = Arc<VectorIndex<Box<dyn StorageBackend>>>;

/// Opened index plus the settings needed to build pipelines around it.
pub struct Workspace {
    data_dir: PathBuf,
    index: SharedIndex,
    provider: OpenAiConfig,
}

impl Workspace {
    /// Opens (or creates) the index under the data directory.
    pub async fn open(
        data_dir: Option<&PathBuf>,
        storage: StorageKind,
        provider: &ProviderArgs,
    ) -> Result<Self> {
        let data_dir = config::get_data_dir(data_dir)?;
        info!("Opening index in {}", data_dir.display());

        let backend = config::open_storage(storage, &data_dir)?;
        let index = VectorIndex::open(backend, provider.dimension)
            .await
            .context("Failed to load index")?;

        Ok(Self {
            data_dir,
            index: Arc::new(index),
            provider: provider.openai_config(),
        })
    }

    fn embedder(&self) -> Result<Arc<OpenAiEmbedder>> {
        let embedder =
            OpenAiEmbedder::new(&self.provider).context("Failed to configure embedding provider")?;
        Ok(Arc::new(embedder))
    }

    fn retriever(&self) -> Result<HybridRetriever<Box<dyn StorageBackend>>> {
        HybridRetriever::new(
            self.index.clone(),
            self.embedder()?,
            RetrievalConfig::default(),
        )
        .context("Failed to create retriever")
    }
}

/// Ingests each file in order, stopping at the first failure.
///
/// Documents ingested before a failure stay indexed and saved.
pub async fn ingest(
    workspace: &Workspace,
    files: &[PathBuf],
    describe_images: bool,
) -> Result<Vec<IngestionReport>> {
    if files.is_empty() {
        bail!("No input files given");
    }

    let chunker = DocumentChunker::new(
        ChunkerConfig::default(),
        config::image_dir(&workspace.data_dir),
    )?;
    let mut pipeline =
        IngestionPipeline::new(workspace.index.clone(), chunker, workspace.embedder()?)?;
    if describe_images {
        let describer = OpenAiImageDescriber::new(&workspace.provider)
            .context("Failed to configure vision provider")?;
        pipeline = pipeline.with_describer(Arc::new(describer));
    }

    let mut reports = Vec::with_capacity(files.len());
    for path in files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = display_name(path);

        let report = pipeline
            .ingest_bytes(&bytes, &filename, |progress| {
                debug!(
                    "{}: {:?} {}/{} ({:.0}%)",
                    filename,
                    progress.stage,
                    progress.completed,
                    progress.total,
                    progress.percent_complete()
                );
            })
            .await
            .with_context(|| format!("Failed to ingest {}", path.display()))?;

        info!(
            "Ingested {} as {} ({} chunks)",
            filename,
            report.document_id(),
            report.summary.total_chunks
        );
        reports.push(report);
    }
    Ok(reports)
}

/// Retrieves context for a free-text question.
pub async fn search(
    workspace: &Workspace,
    query: &str,
    top_k: Option<usize>,
    include_images: bool,
    document: Option<&str>,
) -> Result<RetrievedContext> {
    if query.trim().is_empty() {
        bail!("Search query is empty");
    }

    let filter = document_filter(document);
    let context = workspace
        .retriever()?
        .retrieve_context(query, top_k, include_images, filter.as_ref())
        .await
        .context("Retrieval failed")?;
    Ok(context)
}

/// Retrieves context for a structured extraction category.
pub async fn extract(
    workspace: &Workspace,
    kind: &ExtractionKind,
    document: Option<&str>,
) -> Result<RetrievedContext> {
    let filter = document_filter(document);
    let context = workspace
        .retriever()?
        .retrieve_for_extraction(kind, filter.as_ref())
        .await
        .context("Retrieval failed")?;
    Ok(context)
}

pub async fn documents(workspace: &Workspace) -> Vec<DocumentSummary> {
    workspace.index.list_documents().await
}

/// Logically deletes a document and saves the index.
pub async fn delete(workspace: &Workspace, document_id: &str) -> Result<usize> {
    let document_id = DocumentId::new(document_id);
    let removed = workspace.index.delete_document(&document_id).await;
    if removed == 0 {
        return Err(anyhow!("Unknown document: {}", document_id));
    }
    workspace.index.save().await.context("Failed to save index")?;
    Ok(removed)
}

/// Compacts the index (always, or only past the deleted-ratio threshold)
/// and saves it when rows were dropped.
pub async fn compact(workspace: &Workspace, if_needed: bool) -> Result<Option<CompactionStats>> {
    let stats = if if_needed {
        workspace.index.compact_if_needed().await?
    } else {
        Some(workspace.index.compact().await?)
    };

    if stats.is_some_and(|s| s.chunks_removed > 0) {
        workspace.index.save().await.context("Failed to save index")?;
    }
    Ok(stats)
}

pub async fn stats(workspace: &Workspace) -> IndexStats {
    workspace.index.get_stats().await
}

fn document_filter(document: Option<&str>) -> Option<MetadataFilter> {
    document.map(|id| MetadataFilter::new().with_document(DocumentId::new(id)))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[derive(Parser)]
    struct ProviderOnly {
        #[command(flatten)]
        provider: ProviderArgs,
    }

    fn provider() -> ProviderArgs {
        ProviderOnly::parse_from(["test", "--dimension", "8"]).provider
    }

    async fn open_temp(dir: &TempDir) -> Workspace {
        let data_dir = dir.path().to_path_buf();
        Workspace::open(Some(&data_dir), StorageKind::Files, &provider())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_empty_workspace() {
        let dir = TempDir::new().unwrap();
        let workspace = open_temp(&dir).await;

        let index_stats = stats(&workspace).await;
        assert_eq!(index_stats.total_chunks, 0);
        assert_eq!(index_stats.dimension, 8);
        assert!(documents(&workspace).await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_document() {
        let dir = TempDir::new().unwrap();
        let workspace = open_temp(&dir).await;

        let err = delete(&workspace, "doc_missing").await.unwrap_err();
        assert!(err.to_string().contains("Unknown document"));
    }

    #[tokio::test]
    async fn test_compact_empty_index() {
        let dir = TempDir::new().unwrap();
        let workspace = open_temp(&dir).await;

        assert!(compact(&workspace, true).await.unwrap().is_none());
        let forced = compact(&workspace, false).await.unwrap().unwrap();
        assert_eq!(forced.chunks_removed, 0);
    }

    #[tokio::test]
    async fn test_ingest_requires_files() {
        let dir = TempDir::new().unwrap();
        let workspace = open_temp(&dir).await;

        let err = ingest(&workspace, &[], false).await.unwrap_err();
        assert!(err.to_string().contains("No input files"));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let dir = TempDir::new().unwrap();
        let workspace = open_temp(&dir).await;

        let err = search(&workspace, "   ", None, true, None).await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_document_filter() {
        assert!(document_filter(None).is_none());
        let filter = document_filter(Some("doc_abc")).unwrap();
        assert_eq!(filter.document_id, Some(DocumentId::new("doc_abc")));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/plans/A-201.pdf")), "A-201.pdf");
    }
}
