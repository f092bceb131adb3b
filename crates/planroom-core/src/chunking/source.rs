//! Page sources the chunker reads from.

use crate::error::ChunkingError;

/// An image extracted from a page, still in its encoded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Encoded image bytes, written to disk as-is
    pub bytes: Vec<u8>,
    /// File extension matching the encoding, without the dot
    pub extension: String,
}

/// A decoded multi-page document.
///
/// Pages are 1-indexed. Opening the document is the only fatal step;
/// per-page and per-image errors are returned so the chunker can log and
/// skip them.
pub trait PagedDocument: Send + Sync {
    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Raw text of one page.
    fn page_text(&self, page: u32) -> Result<String, ChunkingError>;

    /// Embedded images of one page, in page order.
    ///
    /// The outer error means the page's images could not be listed at all;
    /// an inner error affects only that image position.
    fn page_images(&self, page: u32)
        -> Result<Vec<Result<RasterImage, ChunkingError>>, ChunkingError>;
}

/// Plain text split into pages on form feeds. Has no images.
#[derive(Debug, Clone, Default)]
pub struct PlainTextDocument {
    pages: Vec<String>,
}

impl PlainTextDocument {
    pub fn from_pages(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// Splits on `\x0c`, the page break `pdftotext` and friends emit.
    pub fn from_text(text: &str) -> Self {
        Self::from_pages(text.split('\u{c}').map(str::to_string).collect())
    }

    /// Decodes UTF-8 bytes; invalid UTF-8 is a document read failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChunkingError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ChunkingError::DocumentRead(format!("invalid UTF-8: {}", e)))?;
        Ok(Self::from_text(text))
    }
}

impl PagedDocument for PlainTextDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String, ChunkingError> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .cloned()
            .ok_or_else(|| ChunkingError::ExtractionFailed {
                page,
                reason: "page out of range".to_string(),
            })
    }

    fn page_images(
        &self,
        _page: u32,
    ) -> Result<Vec<Result<RasterImage, ChunkingError>>, ChunkingError> {
        Ok(Vec::new())
    }
}
