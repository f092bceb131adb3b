//! Progress reporting for document ingestion.

use serde::Serialize;
use std::time::Instant;

/// Pipeline stage a progress update refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStage {
    Chunking,
    Captioning,
    Embedding,
    Indexing,
}

/// Progress of one stage of a single document's ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionProgress {
    pub stage: IngestionStage,
    /// Units finished in this stage
    pub completed: usize,
    /// Units in this stage
    pub total: usize,
    /// Time since ingestion started (milliseconds)
    pub elapsed_ms: u64,
}

impl IngestionProgress {
    pub fn new(stage: IngestionStage, completed: usize, total: usize, elapsed_ms: u64) -> Self {
        Self {
            stage,
            completed,
            total,
            elapsed_ms,
        }
    }

    /// Returns the completion percentage of the stage (0.0 to 100.0).
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Wall-clock timer for one ingestion.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProgressTimer {
    start: Instant,
}

impl ProgressTimer {
    pub(crate) fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub(crate) fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_complete() {
        let p = IngestionProgress::new(IngestionStage::Embedding, 3, 12, 40);
        assert!((p.percent_complete() - 25.0).abs() < 1e-9);
        assert!(!p.is_complete());

        let done = IngestionProgress::new(IngestionStage::Indexing, 12, 12, 90);
        assert!(done.is_complete());
    }

    #[test]
    fn test_empty_stage_is_complete() {
        let p = IngestionProgress::new(IngestionStage::Captioning, 0, 0, 0);
        assert!(p.is_complete());
        assert!((p.percent_complete() - 100.0).abs() < 1e-9);
    }
}
