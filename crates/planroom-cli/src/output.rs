//! Output formatting for command results.
//!
//! Supports both human-readable terminal output and JSON for scripting.

use planroom_core::processing::IngestionReport;
use planroom_core::retrieval::RetrievedContext;
use planroom_core::search::{ChunkKind, CompactionStats, DocumentSummary, IndexStats};
use serde::Serialize;

/// Maximum characters to show in a text snippet
const SNIPPET_MAX_LEN: usize = 200;

/// JSON output structure for retrievals
#[derive(Serialize)]
pub struct JsonRetrieval<'a> {
    pub query: &'a str,
    #[serde(flatten)]
    pub context: &'a RetrievedContext,
}

/// Serializes any result as pretty JSON.
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_retrieval_json(query: &str, context: &RetrievedContext) -> String {
    format_json(&JsonRetrieval { query, context })
}

/// Formats a retrieval as a numbered citation list.
pub fn format_retrieval(query: &str, context: &RetrievedContext) -> String {
    if context.is_empty() {
        return format!("No results found for \"{}\"", query);
    }

    let mut output = String::new();
    output.push_str(&format!(
        "Found {} result{} for \"{}\" ({} text, {} image):\n\n",
        context.citations.len(),
        plural(context.citations.len()),
        query,
        context.text_contexts.len(),
        context.image_contexts.len()
    ));

    for (i, citation) in context.citations.iter().enumerate() {
        output.push_str(&format!(
            "{}. {} p.{} [{}] (score: {:.2})\n",
            i + 1,
            citation.source,
            citation.page,
            citation.chunk_kind,
            citation.relevance_score
        ));

        if let Some(path) = &citation.image_path {
            output.push_str(&format!("   Image: {}\n", path.display()));
        }

        let snippet = match citation.chunk_kind {
            ChunkKind::Image if citation.content_preview.trim().is_empty() => {
                "(no description)".to_string()
            }
            _ => truncate_text(&citation.content_preview, SNIPPET_MAX_LEN),
        };
        output.push_str(&format!("   {}\n\n", indent_text(&snippet, "   ")));
    }

    output.trim_end().to_string()
}

pub fn format_ingestion(reports: &[IngestionReport]) -> String {
    let mut output = String::new();
    for report in reports {
        let summary = &report.summary;
        output.push_str(&format!(
            "{} -> {}\n   {} page{}, {} text chunk{}, {} image chunk{} ({} captioned) in {}ms\n",
            summary.filename,
            summary.document_id,
            report.page_count,
            plural(report.page_count as usize),
            summary.text_chunks,
            plural(summary.text_chunks),
            summary.image_chunks,
            plural(summary.image_chunks),
            report.captioned_images,
            report.elapsed_ms
        ));
    }
    output.trim_end().to_string()
}

pub fn format_documents(documents: &[DocumentSummary]) -> String {
    if documents.is_empty() {
        return "No documents indexed".to_string();
    }

    let mut output = format!(
        "{} document{}:\n\n",
        documents.len(),
        plural(documents.len())
    );
    for doc in documents {
        output.push_str(&format!(
            "{}  {}\n   {} page{}, {} chunks ({} text, {} image)\n",
            doc.document_id,
            doc.filename,
            doc.total_pages,
            plural(doc.total_pages as usize),
            doc.total_chunks,
            doc.text_chunks,
            doc.image_chunks
        ));
    }
    output.trim_end().to_string()
}

pub fn format_stats(stats: &IndexStats) -> String {
    format!(
        "Documents:        {}\n\
         Chunks:           {}\n\
         Vectors:          {}\n\
         Dimension:        {}\n\
         Deleted chunks:   {}\n\
         Sentinel vectors: {}",
        stats.total_documents,
        stats.total_chunks,
        stats.total_vectors,
        stats.dimension,
        stats.deleted_chunks,
        stats.sentinel_vectors
    )
}

pub fn format_compaction(stats: Option<&CompactionStats>) -> String {
    match stats {
        None => "Compaction not needed".to_string(),
        Some(stats) if stats.chunks_removed == 0 => "Nothing to compact".to_string(),
        Some(stats) => format!(
            "Removed {} of {} rows ({:.1}% deleted) in {}ms",
            stats.chunks_removed,
            stats.rows_before,
            stats.deleted_ratio_before * 100.0,
            stats.duration_ms
        ),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Truncates text to a maximum number of characters, adding an ellipsis
/// at a word boundary if needed.
fn truncate_text(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_len).collect();
    let truncated = truncated.trim_end_matches("...");
    match truncated.rfind(' ') {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}

/// Indents all lines of text after the first line.
fn indent_text(text: &str, indent: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.to_string()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
