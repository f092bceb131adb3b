//! Document ingestion pipeline.
//!
//! [`IngestionPipeline`] takes one document from bytes to a saved index:
//!
//! 1. **Chunking**: page-scoped text windows and extracted images
//! 2. **Captioning** (optional): best-effort image descriptions
//! 3. **Embedding**: text chunks and captioned images through the text
//!    embedder in batches; uncaptioned images through an image embedder
//!    sharing the text space, or a zero sentinel row
//! 4. **Indexing**: one `add` for the whole document, then `save`
//!
//! An embedding failure aborts the document before anything is added, so a
//! document is either fully indexed or not at all.
//!
//! # Example
//!
//! ```ignore
//! use planroom_core::processing::IngestionPipeline;
//!
//! let pipeline = IngestionPipeline::new(index.clone(), chunker, embedder)?
//!     .with_describer(describer);
//!
//! let report = pipeline
//!     .ingest_bytes(&bytes, "A-201.pdf", |p| println!("{:?} {:.0}%", p.stage, p.percent_complete()))
//!     .await?;
//! ```

mod pipeline;
mod progress;

pub use pipeline::{IngestionPipeline, IngestionReport};
pub use progress::{IngestionProgress, IngestionStage};
