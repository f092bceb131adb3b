//! PDF page source backed by `lopdf`.
//!
//! Text comes from each page's content stream. Images are the page's image
//! XObjects; only self-contained encodings (JPEG, JPEG 2000) are emitted,
//! since the bytes are written to disk and handed to a vision model as-is.

use super::source::{PagedDocument, RasterImage};
use crate::error::ChunkingError;
use lopdf::{Document, ObjectId};
use std::path::Path;

/// A parsed PDF.
pub struct PdfDocument {
    document: Document,
    pages: Vec<ObjectId>,
}

impl PdfDocument {
    /// Parses a PDF from memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChunkingError> {
        let document =
            Document::load_mem(bytes).map_err(|e| ChunkingError::DocumentRead(e.to_string()))?;
        let pages = document.get_pages().into_values().collect();
        Ok(Self { document, pages })
    }

    /// Reads and parses a PDF file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ChunkingError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| ChunkingError::DocumentRead(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(&bytes)
    }

    fn page_id(&self, page: u32) -> Result<ObjectId, ChunkingError> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .copied()
            .ok_or_else(|| ChunkingError::ExtractionFailed {
                page,
                reason: "page out of range".to_string(),
            })
    }
}

impl PagedDocument for PdfDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String, ChunkingError> {
        self.page_id(page)?;
        self.document
            .extract_text(&[page])
            .map_err(|e| ChunkingError::ExtractionFailed {
                page,
                reason: e.to_string(),
            })
    }

    fn page_images(
        &self,
        page: u32,
    ) -> Result<Vec<Result<RasterImage, ChunkingError>>, ChunkingError> {
        let page_id = self.page_id(page)?;
        let images = self
            .document
            .get_page_images(page_id)
            .map_err(|e| ChunkingError::ExtractionFailed {
                page,
                reason: e.to_string(),
            })?;

        Ok(images
            .into_iter()
            .map(|image| {
                let failed = |reason: String| ChunkingError::ExtractionFailed { page, reason };
                let width = u32::try_from(image.width)
                    .map_err(|_| failed(format!("invalid width {}", image.width)))?;
                let height = u32::try_from(image.height)
                    .map_err(|_| failed(format!("invalid height {}", image.height)))?;
                let filters = image.filters.unwrap_or_default();
                let extension = extension_for(&filters).ok_or_else(|| {
                    failed(format!("unsupported image encoding {:?}", filters))
                })?;
                Ok(RasterImage {
                    width,
                    height,
                    bytes: image.content.to_vec(),
                    extension: extension.to_string(),
                })
            })
            .collect())
    }
}

/// File extension for a stream whose final filter is a standalone image
/// codec.
fn extension_for(filters: &[String]) -> Option<&'static str> {
    match filters.last().map(String::as_str) {
        Some("DCTDecode") => Some("jpg"),
        Some("JPXDecode") => Some("jp2"),
        _ => None,
    }
}
