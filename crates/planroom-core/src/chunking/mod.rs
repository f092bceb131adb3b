//! Document chunking into page-scoped text windows and image chunks.
//!
//! The chunker reads any [`PagedDocument`]: a PDF (feature `pdf`), plain
//! text, or a test double. For every page it emits:
//!
//! - **Text chunks**: overlapping character windows that prefer to end at a
//!   sentence or line boundary (see [`split_windows`])
//! - **Image chunks**: embedded images at least `min_image_size` pixels on
//!   both sides, written to `{image_dir}/{document}_p{page}_img{index}.{ext}`
//!   with empty content until captioned
//!
//! # Failure Policy
//!
//! Opening the document is fatal. A page whose text or image list cannot be
//! extracted, or a single image that cannot be decoded or written, is logged
//! at `warn` and skipped; its siblings are still chunked.

#[cfg(feature = "pdf")]
mod pdf;
mod source;
mod window;

#[cfg(feature = "pdf")]
pub use pdf::PdfDocument;
pub use source::{PagedDocument, PlainTextDocument, RasterImage};
pub use window::{split_windows, TextWindow};

use crate::config::ChunkerConfig;
use crate::error::ChunkingError;
use crate::search::{Chunk, ChunkId, ChunkKind, DocumentId, ImageRef};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Source format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.pdf`
    Pdf,
    /// Everything else, read as UTF-8 text with form-feed page breaks
    PlainText,
}

/// Detects the document format from a filename or path.
pub fn detect_format<P: AsRef<Path>>(filename: P) -> DocumentFormat {
    match filename.as_ref().extension() {
        Some(ext) if ext.to_string_lossy().eq_ignore_ascii_case("pdf") => DocumentFormat::Pdf,
        _ => DocumentFormat::PlainText,
    }
}

/// Output of chunking one document.
#[derive(Debug, Clone, Default)]
pub struct ChunkedDocument {
    pub text_chunks: Vec<Chunk>,
    pub image_chunks: Vec<Chunk>,
    /// Pages in the source document, including pages that produced nothing
    pub page_count: u32,
}

impl ChunkedDocument {
    pub fn len(&self) -> usize {
        self.text_chunks.len() + self.image_chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text chunks followed by image chunks, the order they are indexed in.
    pub fn into_chunks(self) -> Vec<Chunk> {
        let mut chunks = self.text_chunks;
        chunks.extend(self.image_chunks);
        chunks
    }
}

/// Splits documents into text and image chunks.
#[derive(Debug, Clone)]
pub struct DocumentChunker {
    config: ChunkerConfig,
    image_dir: PathBuf,
}

impl DocumentChunker {
    /// Creates a chunker that writes extracted images under `image_dir`.
    ///
    /// The directory is created lazily when the first image is written.
    pub fn new(config: ChunkerConfig, image_dir: impl Into<PathBuf>) -> Result<Self, ChunkingError> {
        config.validate()?;
        Ok(Self {
            config,
            image_dir: image_dir.into(),
        })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Chunks every page of `document`.
    #[instrument(skip_all, fields(document_id = %document_id, filename = filename))]
    pub fn chunk(
        &self,
        document: &dyn PagedDocument,
        document_id: &DocumentId,
        filename: &str,
    ) -> Result<ChunkedDocument, ChunkingError> {
        let page_count = document.page_count();
        let mut output = ChunkedDocument {
            page_count,
            ..ChunkedDocument::default()
        };

        for page in 1..=page_count {
            match document.page_text(page) {
                Ok(text) => output
                    .text_chunks
                    .extend(self.text_chunks(&text, page, document_id, filename)),
                Err(e) => warn!("Skipping text of page {}: {}", page, e),
            }

            match document.page_images(page) {
                Ok(images) => {
                    let chunks = self.image_chunks(images, page, document_id, filename);
                    output.image_chunks.extend(chunks);
                }
                Err(e) => warn!("Skipping images of page {}: {}", page, e),
            }
        }

        info!(
            "Chunking complete: {} pages, {} text chunks, {} image chunks",
            page_count,
            output.text_chunks.len(),
            output.image_chunks.len()
        );
        Ok(output)
    }

    /// Decodes `bytes` according to the filename's format and chunks them.
    pub fn chunk_bytes(
        &self,
        bytes: &[u8],
        document_id: &DocumentId,
        filename: &str,
    ) -> Result<ChunkedDocument, ChunkingError> {
        match detect_format(filename) {
            #[cfg(feature = "pdf")]
            DocumentFormat::Pdf => self.chunk_pdf(bytes, document_id, filename),
            #[cfg(not(feature = "pdf"))]
            DocumentFormat::Pdf => Err(ChunkingError::DocumentRead(
                "PDF support is not enabled (feature `pdf`)".to_string(),
            )),
            DocumentFormat::PlainText => {
                let document = PlainTextDocument::from_bytes(bytes)?;
                self.chunk(&document, document_id, filename)
            }
        }
    }

    /// Parses PDF bytes and chunks them.
    #[cfg(feature = "pdf")]
    pub fn chunk_pdf(
        &self,
        bytes: &[u8],
        document_id: &DocumentId,
        filename: &str,
    ) -> Result<ChunkedDocument, ChunkingError> {
        let document = PdfDocument::from_bytes(bytes)?;
        self.chunk(&document, document_id, filename)
    }

    fn text_chunks(
        &self,
        text: &str,
        page: u32,
        document_id: &DocumentId,
        filename: &str,
    ) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        split_windows(text, self.config.chunk_size, self.config.chunk_overlap)
            .into_iter()
            .map(|window| {
                let sequence_index = window.index as u32;
                Chunk {
                    chunk_id: ChunkId::derive(document_id, page, sequence_index, ChunkKind::Text),
                    document_id: document_id.clone(),
                    filename: filename.to_string(),
                    kind: ChunkKind::Text,
                    content: window.text,
                    page_number: page,
                    sequence_index,
                    image: None,
                    deleted: false,
                }
            })
            .collect()
    }

    /// Image chunks keep the image's position in the page's image list as
    /// their sequence index, so skipped images leave gaps.
    fn image_chunks(
        &self,
        images: Vec<Result<RasterImage, ChunkingError>>,
        page: u32,
        document_id: &DocumentId,
        filename: &str,
    ) -> Vec<Chunk> {
        let min = self.config.min_image_size;
        let mut chunks = Vec::new();

        for (index, image) in images.into_iter().enumerate() {
            let image = match image {
                Ok(image) => image,
                Err(e) => {
                    warn!("Failed to extract image {} from page {}: {}", index, page, e);
                    continue;
                }
            };

            if image.width < min || image.height < min {
                debug!(
                    "Skipping small image {} on page {} ({}x{})",
                    index, page, image.width, image.height
                );
                continue;
            }

            let path = self.image_path(document_id, page, index, &image.extension);
            if let Err(e) = self.write_image(&path, &image.bytes) {
                warn!("Failed to save image {} from page {}: {}", index, page, e);
                continue;
            }
            debug!(
                "Extracted image: {} ({}x{})",
                path.display(),
                image.width,
                image.height
            );

            let sequence_index = index as u32;
            chunks.push(Chunk {
                chunk_id: ChunkId::derive(document_id, page, sequence_index, ChunkKind::Image),
                document_id: document_id.clone(),
                filename: filename.to_string(),
                kind: ChunkKind::Image,
                content: String::new(),
                page_number: page,
                sequence_index,
                image: Some(ImageRef {
                    path,
                    width: image.width,
                    height: image.height,
                }),
                deleted: false,
            });
        }

        chunks
    }

    fn image_path(&self, document_id: &DocumentId, page: u32, index: usize, ext: &str) -> PathBuf {
        self.image_dir
            .join(format!("{}_p{}_img{}.{}", document_id, page, index, ext))
    }

    fn write_image(&self, path: &Path, bytes: &[u8]) -> Result<(), ChunkingError> {
        std::fs::create_dir_all(&self.image_dir)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Returns the chunk with `target` id plus up to `window` neighbours on
/// each side. Empty if `target` is not in `chunks`.
pub fn page_context<'a>(chunks: &'a [Chunk], target: &ChunkId, window: usize) -> &'a [Chunk] {
    match chunks.iter().position(|c| &c.chunk_id == target) {
        Some(position) => {
            let start = position.saturating_sub(window);
            let end = (position + window + 1).min(chunks.len());
            &chunks[start..end]
        }
        None => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Pages of text plus scripted image results.
    struct FakeDocument {
        pages: Vec<Result<String, ChunkingError>>,
        images: Vec<Vec<Result<RasterImage, ChunkingError>>>,
    }

    impl PagedDocument for FakeDocument {
        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn page_text(&self, page: u32) -> Result<String, ChunkingError> {
            self.pages[page as usize - 1].clone()
        }

        fn page_images(
            &self,
            page: u32,
        ) -> Result<Vec<Result<RasterImage, ChunkingError>>, ChunkingError> {
            Ok(self.images.get(page as usize - 1).cloned().unwrap_or_default())
        }
    }

    fn raster(width: u32, height: u32) -> RasterImage {
        RasterImage {
            width,
            height,
            bytes: vec![0xff, 0xd8, 0xff, 0xe0],
            extension: "jpg".to_string(),
        }
    }

    fn chunker(dir: &TempDir) -> DocumentChunker {
        DocumentChunker::new(ChunkerConfig::default(), dir.path().join("images")).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ChunkerConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..ChunkerConfig::default()
        };
        assert!(DocumentChunker::new(config, "/tmp/unused").is_err());
    }

    #[test]
    fn test_text_chunks_are_page_scoped() {
        let dir = TempDir::new().unwrap();
        let doc = FakeDocument {
            pages: vec![
                Ok("x".repeat(1500)),
                Ok("   ".to_string()),
                Ok("Door schedule".to_string()),
            ],
            images: vec![],
        };
        let doc_id = DocumentId::new("doc_1");

        let out = chunker(&dir).chunk(&doc, &doc_id, "plans.pdf").unwrap();

        assert_eq!(out.page_count, 3);
        assert_eq!(out.text_chunks.len(), 3);
        let pages: Vec<(u32, u32)> = out
            .text_chunks
            .iter()
            .map(|c| (c.page_number, c.sequence_index))
            .collect();
        assert_eq!(pages, vec![(1, 0), (1, 1), (3, 0)]);
        assert_eq!(out.text_chunks[2].content, "Door schedule");
        assert!(out.text_chunks.iter().all(|c| c.filename == "plans.pdf"));
        assert!(out.image_chunks.is_empty());
    }

    #[test]
    fn test_chunk_ids_are_deterministic() {
        let dir = TempDir::new().unwrap();
        let doc = FakeDocument {
            pages: vec![Ok("Room 204 finishes.".to_string())],
            images: vec![],
        };
        let doc_id = DocumentId::new("doc_1");
        let c = chunker(&dir);

        let first = c.chunk(&doc, &doc_id, "a.pdf").unwrap();
        let second = c.chunk(&doc, &doc_id, "a.pdf").unwrap();

        assert_eq!(first.text_chunks[0].chunk_id, second.text_chunks[0].chunk_id);
        assert!(first.text_chunks[0].chunk_id.as_str().starts_with("text_1_0_"));
    }

    #[test]
    fn test_images_filtered_saved_and_failures_skipped() {
        let dir = TempDir::new().unwrap();
        let doc = FakeDocument {
            pages: vec![Ok(String::new())],
            images: vec![vec![
                Ok(raster(50, 400)),
                Err(ChunkingError::ExtractionFailed {
                    page: 1,
                    reason: "corrupt stream".to_string(),
                }),
                Ok(raster(640, 480)),
            ]],
        };
        let doc_id = DocumentId::new("doc_7");

        let out = chunker(&dir).chunk(&doc, &doc_id, "a.pdf").unwrap();

        assert_eq!(out.image_chunks.len(), 1);
        let chunk = &out.image_chunks[0];
        assert_eq!(chunk.kind, ChunkKind::Image);
        assert_eq!(chunk.sequence_index, 2);
        assert!(chunk.content.is_empty());

        let image = chunk.image.as_ref().unwrap();
        assert_eq!((image.width, image.height), (640, 480));
        assert_eq!(
            image.path,
            dir.path().join("images").join("doc_7_p1_img2.jpg")
        );
        assert!(image.path.exists());
    }

    #[test]
    fn test_page_text_failure_skips_only_that_page() {
        let dir = TempDir::new().unwrap();
        let doc = FakeDocument {
            pages: vec![
                Err(ChunkingError::ExtractionFailed {
                    page: 1,
                    reason: "bad content stream".to_string(),
                }),
                Ok("Corridor C-2".to_string()),
            ],
            images: vec![],
        };

        let out = chunker(&dir)
            .chunk(&doc, &DocumentId::new("d"), "a.pdf")
            .unwrap();
        assert_eq!(out.text_chunks.len(), 1);
        assert_eq!(out.text_chunks[0].page_number, 2);
    }

    #[test]
    fn test_into_chunks_orders_text_before_images() {
        let dir = TempDir::new().unwrap();
        let doc = FakeDocument {
            pages: vec![Ok("Lobby".to_string())],
            images: vec![vec![Ok(raster(200, 200))]],
        };

        let out = chunker(&dir)
            .chunk(&doc, &DocumentId::new("d"), "a.pdf")
            .unwrap();
        assert_eq!(out.len(), 2);
        let kinds: Vec<ChunkKind> = out.into_chunks().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ChunkKind::Text, ChunkKind::Image]);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("A-201.pdf"), DocumentFormat::Pdf);
        assert_eq!(detect_format("/plans/A-501.PDF"), DocumentFormat::Pdf);
        assert_eq!(detect_format("notes.txt"), DocumentFormat::PlainText);
        assert_eq!(detect_format("no_extension"), DocumentFormat::PlainText);
    }

    #[test]
    fn test_chunk_bytes_plain_text_pages() {
        let dir = TempDir::new().unwrap();
        let out = chunker(&dir)
            .chunk_bytes(
                "Door D-101.\u{c}Room 204.".as_bytes(),
                &DocumentId::new("d"),
                "outline.txt",
            )
            .unwrap();

        assert_eq!(out.page_count, 2);
        assert_eq!(out.text_chunks[1].page_number, 2);
        assert_eq!(out.text_chunks[1].content, "Room 204.");
    }

    #[test]
    fn test_page_context_window() {
        let dir = TempDir::new().unwrap();
        let pages = (0..5).map(|i| Ok(format!("page {}", i))).collect();
        let doc = FakeDocument {
            pages,
            images: vec![],
        };
        let chunks = chunker(&dir)
            .chunk(&doc, &DocumentId::new("d"), "a.pdf")
            .unwrap()
            .text_chunks;

        let around = page_context(&chunks, &chunks[2].chunk_id, 1);
        assert_eq!(around.len(), 3);
        assert_eq!(around[0].page_number, 2);

        let edge = page_context(&chunks, &chunks[0].chunk_id, 2);
        assert_eq!(edge.len(), 3);

        assert!(page_context(&chunks, &ChunkId::new("missing"), 1).is_empty());
    }
}
