//! Index compaction to reclaim space from logically deleted rows.
//!
//! `delete_document` only flags chunks; their vectors keep occupying rows.
//! Compaction rebuilds the vector store, metadata list and document map
//! from the surviving records.
//!
//! # Row renumbering
//!
//! Surviving rows are renumbered densely in their original order, so row
//! ids held by callers from before compaction are invalidated. Compaction
//! is a maintenance operation; run it between request batches.
//!
//! # When to Compact
//!
//! Compaction is recommended when the deleted ratio exceeds 30% of rows.
//! Use `needs_compaction()` to check if compaction is advisable.

use super::{IndexState, VectorIndex};
use crate::config::COMPACTION_THRESHOLD;
use crate::search::persistence::DocumentMap;
use crate::search::types::{ChunkRecord, CompactionStats, RowId, SearchError};
use crate::storage::StorageBackend;
use std::time::Instant;
use tracing::{info, instrument};

impl IndexState {
    fn deleted_ratio(&self) -> f32 {
        if self.metadata.is_empty() {
            return 0.0;
        }
        let deleted = self.metadata.iter().filter(|r| r.chunk.deleted).count();
        deleted as f32 / self.metadata.len() as f32
    }
}

impl<S: StorageBackend> VectorIndex<S> {
    /// Check if the index needs compaction.
    ///
    /// Returns `true` if the deleted ratio exceeds the 30% threshold.
    pub async fn needs_compaction(&self) -> bool {
        self.state.read().await.deleted_ratio() > COMPACTION_THRESHOLD
    }

    /// Physically drops logically deleted rows.
    ///
    /// Holds the write lock for the whole rebuild. The in-memory index is
    /// replaced; call [`save`](Self::save) afterwards to persist it.
    #[instrument(skip_all)]
    pub async fn compact(&self) -> Result<CompactionStats, SearchError> {
        let start = Instant::now();
        let mut state = self.state.write().await;

        let rows_before = state.metadata.len();
        let deleted_ratio_before = state.deleted_ratio();
        let keep: Vec<bool> = state.metadata.iter().map(|r| !r.chunk.deleted).collect();
        let removed = keep.iter().filter(|k| !**k).count();

        if removed == 0 {
            info!("Compaction skipped: no deleted rows");
            return Ok(CompactionStats {
                rows_before,
                chunks_removed: 0,
                deleted_ratio_before,
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        info!(
            "Starting compaction: {} deleted / {} total ({:.1}%)",
            removed,
            rows_before,
            deleted_ratio_before * 100.0
        );

        let vectors = state
            .vectors
            .as_ref()
            .map(|v| v.retain(&keep))
            .filter(|v| !v.is_empty());

        let old_metadata = std::mem::take(&mut state.metadata);
        let mut metadata = Vec::with_capacity(rows_before - removed);
        let mut document_map = DocumentMap::new();
        for record in old_metadata.into_iter().filter(|r| !r.chunk.deleted) {
            let row_id = RowId::from_u64(metadata.len() as u64);
            if state.document_map.contains_key(&record.chunk.document_id) {
                document_map
                    .entry(record.chunk.document_id.clone())
                    .or_default()
                    .push(row_id);
            }
            metadata.push(ChunkRecord {
                row_id,
                chunk: record.chunk,
            });
        }

        *state = IndexState {
            vectors,
            metadata,
            document_map,
        };

        let stats = CompactionStats {
            rows_before,
            chunks_removed: removed,
            deleted_ratio_before,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Compaction complete: {} → {} rows in {}ms",
            rows_before,
            rows_before - removed,
            stats.duration_ms
        );
        Ok(stats)
    }

    /// Conditionally run compaction if needed.
    ///
    /// # Returns
    /// - `Ok(Some(stats))` if compaction was performed
    /// - `Ok(None)` if compaction was not needed
    pub async fn compact_if_needed(&self) -> Result<Option<CompactionStats>, SearchError> {
        if self.needs_compaction().await {
            Ok(Some(self.compact().await?))
        } else {
            Ok(None)
        }
    }
}
