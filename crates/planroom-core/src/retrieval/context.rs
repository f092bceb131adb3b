//! Context partitioning and citations for the answer generator.

use crate::search::{ChunkKind, ScoredChunk};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Image handed to the answer generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContext {
    /// Caption, or a page reference when the image was never captioned
    pub description: String,
    pub image_path: Option<PathBuf>,
    /// Source filename
    pub source: String,
    pub page: u32,
}

/// User-facing provenance for one retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Source filename
    pub source: String,
    pub page: u32,
    pub chunk_kind: ChunkKind,
    pub content_preview: String,
    pub relevance_score: f32,
    /// Set for image chunks only
    pub image_path: Option<PathBuf>,
}

/// Result of one retrieval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub text_contexts: Vec<String>,
    pub image_contexts: Vec<ImageContext>,
    /// One per retrieved chunk, both kinds, in rank order
    pub citations: Vec<Citation>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }
}

/// Splits ranked hits into text and image contexts and cites every hit.
///
/// Image contexts are only built when `include_images` is set; image hits
/// are cited either way.
pub fn assemble(hits: &[ScoredChunk], include_images: bool, preview_chars: usize) -> RetrievedContext {
    let mut context = RetrievedContext::default();

    for hit in hits {
        let chunk = &hit.chunk;
        match chunk.kind {
            ChunkKind::Text => context.text_contexts.push(chunk.content.clone()),
            ChunkKind::Image if include_images => {
                let description = if chunk.content.trim().is_empty() {
                    format!("[Drawing page {} - image available]", chunk.page_number)
                } else {
                    chunk.content.clone()
                };
                context.image_contexts.push(ImageContext {
                    description,
                    image_path: chunk.image.as_ref().map(|i| i.path.clone()),
                    source: chunk.filename.clone(),
                    page: chunk.page_number,
                });
            }
            ChunkKind::Image => {}
        }

        context.citations.push(Citation {
            source: chunk.filename.clone(),
            page: chunk.page_number,
            chunk_kind: chunk.kind,
            content_preview: preview(&chunk.content, preview_chars),
            relevance_score: hit.score,
            image_path: match chunk.kind {
                ChunkKind::Image => chunk.image.as_ref().map(|i| i.path.clone()),
                ChunkKind::Text => None,
            },
        });
    }

    context
}

/// First `max_chars` characters, with `...` appended when truncated.
pub fn preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Chunk, ChunkId, DocumentId, ImageRef, RowId};

    fn scored(kind: ChunkKind, content: &str, page: u32, score: f32) -> ScoredChunk {
        ScoredChunk {
            row_id: RowId::from_u64(0),
            chunk: Chunk {
                chunk_id: ChunkId::new(format!("{}_{}_0", kind, page)),
                document_id: DocumentId::new("doc"),
                filename: "A-201.pdf".to_string(),
                kind,
                content: content.to_string(),
                page_number: page,
                sequence_index: 0,
                image: (kind == ChunkKind::Image).then(|| ImageRef {
                    path: PathBuf::from("/data/images/doc_p3_img0.jpg"),
                    width: 800,
                    height: 600,
                }),
                deleted: false,
            },
            score,
        }
    }

    #[test]
    fn test_partition_by_kind() {
        let hits = vec![
            scored(ChunkKind::Text, "Door D-101 is 900mm.", 1, 0.9),
            scored(ChunkKind::Image, "", 3, 0.8),
            scored(ChunkKind::Image, "Floor plan level 2", 4, 0.7),
        ];

        let context = assemble(&hits, true, 200);

        assert_eq!(context.text_contexts, vec!["Door D-101 is 900mm."]);
        assert_eq!(context.image_contexts.len(), 2);
        assert_eq!(
            context.image_contexts[0].description,
            "[Drawing page 3 - image available]"
        );
        assert_eq!(context.image_contexts[1].description, "Floor plan level 2");
        assert_eq!(context.image_contexts[0].source, "A-201.pdf");
        assert_eq!(context.citations.len(), 3);
        assert!(context.citations[0].image_path.is_none());
        assert!(context.citations[1].image_path.is_some());
    }

    #[test]
    fn test_images_excluded_but_still_cited() {
        let hits = vec![scored(ChunkKind::Image, "Elevation", 2, 0.5)];
        let context = assemble(&hits, false, 200);

        assert!(context.image_contexts.is_empty());
        assert_eq!(context.citations.len(), 1);
        assert_eq!(context.citations[0].chunk_kind, ChunkKind::Image);
        assert!((context.citations[0].relevance_score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_preview_truncation() {
        let long = "a".repeat(250);
        let p = preview(&long, 200);
        assert_eq!(p.len(), 203);
        assert!(p.ends_with("..."));

        assert_eq!(preview(&"b".repeat(200), 200), "b".repeat(200));
        assert_eq!(preview("", 200), "");
    }

    #[test]
    fn test_preview_is_char_safe() {
        let text = "é".repeat(201);
        let p = preview(&text, 200);
        assert_eq!(p.chars().count(), 203);
    }
}
