//! Hybrid retrieval: query keywords, fused search, re-ranking, citations.
//!
//! [`HybridRetriever::retrieve_context`] runs the full query path:
//!
//! 1. Embed the query text
//! 2. Extract keyword candidates (codes, measurements, domain terms)
//! 3. Hybrid search with the configured retrieval width
//! 4. Re-rank by query-term overlap (`+ 0.2 × overlap`)
//! 5. Truncate to `top_k`
//! 6. Partition into text and image contexts, cite every hit
//!
//! Embedding and index failures propagate unchanged. No matches is an
//! empty [`RetrievedContext`], not an error.

mod context;
mod keywords;
mod rerank;

pub use context::{assemble, preview, Citation, ImageContext, RetrievedContext};
pub use keywords::{extract_keywords, DOMAIN_TERMS};
pub use rerank::{rerank_by_query_overlap, term_overlap};

use crate::config::RetrievalConfig;
use crate::embedding::TextEmbedder;
use crate::error::RetrievalError;
use crate::search::{validate_dimension, MetadataFilter, VectorIndex};
use crate::storage::StorageBackend;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Structured-extraction category with a canned retrieval query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExtractionKind {
    DoorSchedule,
    RoomSchedule,
    MepEquipment,
    /// Any other category; its name is used as the query
    Other(String),
}

impl ExtractionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ExtractionKind::DoorSchedule => "door_schedule",
            ExtractionKind::RoomSchedule => "room_schedule",
            ExtractionKind::MepEquipment => "mep_equipment",
            ExtractionKind::Other(name) => name,
        }
    }

    /// Query text sent through [`HybridRetriever::retrieve_context`].
    pub fn query(&self) -> &str {
        match self {
            ExtractionKind::DoorSchedule => "door schedule doors hardware dimensions fire rating",
            ExtractionKind::RoomSchedule => "room schedule finishes floor ceiling wall area",
            ExtractionKind::MepEquipment => "MEP equipment mechanical electrical plumbing HVAC",
            ExtractionKind::Other(name) => name,
        }
    }
}

impl FromStr for ExtractionKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "door_schedule" => ExtractionKind::DoorSchedule,
            "room_schedule" => ExtractionKind::RoomSchedule,
            "mep_equipment" => ExtractionKind::MepEquipment,
            other => ExtractionKind::Other(other.to_string()),
        })
    }
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query-side orchestrator over a shared [`VectorIndex`].
pub struct HybridRetriever<S: StorageBackend> {
    index: Arc<VectorIndex<S>>,
    embedder: Arc<dyn TextEmbedder>,
    config: RetrievalConfig,
}

impl<S: StorageBackend> HybridRetriever<S> {
    /// Creates a retriever.
    ///
    /// # Errors
    ///
    /// Fails if the config is invalid or the embedder's dimension differs
    /// from the index's.
    pub fn new(
        index: Arc<VectorIndex<S>>,
        embedder: Arc<dyn TextEmbedder>,
        config: RetrievalConfig,
    ) -> Result<Self, RetrievalError> {
        config.validate()?;
        validate_dimension(index.dimension(), embedder.dimension())?;
        Ok(Self {
            index,
            embedder,
            config,
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<VectorIndex<S>> {
        &self.index
    }

    /// Retrieves ranked text and image context for `query`.
    ///
    /// `top_k` defaults to the configured re-rank cut. Logically deleted
    /// chunks are excluded unless `filter` sets `deleted` explicitly.
    #[instrument(skip_all, fields(top_k = ?top_k, include_images = include_images))]
    pub async fn retrieve_context(
        &self,
        query: &str,
        top_k: Option<usize>,
        include_images: bool,
        filter: Option<&MetadataFilter>,
    ) -> Result<RetrievedContext, RetrievalError> {
        let start = Instant::now();
        let top_k = top_k.unwrap_or(self.config.top_k);
        let filter = active_filter(filter);

        let query_embedding = self.embedder.embed_text(query).await?;
        let keywords = extract_keywords(query);
        debug!("Extracted keywords: {:?}", keywords);

        let width = self.config.retrieval_width.max(top_k);
        let mut hits = self
            .index
            .hybrid_search(
                &query_embedding,
                &keywords,
                width,
                self.config.vector_weight,
                Some(&filter),
            )
            .await?;

        rerank_by_query_overlap(&mut hits, query, self.config.rerank_boost);
        hits.truncate(top_k);

        let context = assemble(&hits, include_images, self.config.preview_chars);
        info!(
            "Retrieved {} text chunks, {} images in {:.1}ms",
            context.text_contexts.len(),
            context.image_contexts.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(context)
    }

    /// Wider retrieval for structured extraction of `kind`.
    pub async fn retrieve_for_extraction(
        &self,
        kind: &ExtractionKind,
        filter: Option<&MetadataFilter>,
    ) -> Result<RetrievedContext, RetrievalError> {
        info!("Retrieving context for {} extraction", kind);
        self.retrieve_context(
            kind.query(),
            Some(self.config.extraction_top_k),
            true,
            filter,
        )
        .await
    }
}

/// The caller's filter with `deleted = false` unless it says otherwise.
fn active_filter(filter: Option<&MetadataFilter>) -> MetadataFilter {
    match filter {
        Some(f) if f.deleted.is_some() => f.clone(),
        Some(f) => f.clone().with_deleted(false),
        None => MetadataFilter::active(),
    }
}
