//! Planroom CLI - ingest plan sets and retrieve cited context.
//!
//! # Usage
//!
//! ```bash
//! # Index documents (PDF or plain text)
//! planroom ingest A-101.pdf A-601.pdf --describe-images
//!
//! # Ask for context
//! planroom search "door fire ratings on level 2" -n 8
//! planroom extract door_schedule --json
//!
//! # Maintenance
//! planroom documents
//! planroom delete doc_0123456789ab
//! planroom compact --if-needed
//! planroom stats
//! ```
//!
//! Embeddings come from an OpenAI-compatible endpoint configured with
//! `--embedding-url` / `PLANROOM_EMBEDDING_URL` and friends.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::Workspace;
use config::{ProviderArgs, StorageKind};
use planroom_core::retrieval::ExtractionKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Planroom document retrieval CLI.
///
/// Chunks multi-page documents into text and image chunks, indexes them,
/// and serves hybrid-ranked context with page-level citations.
#[derive(Parser)]
#[command(name = "planroom", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Custom data directory (default: platform standard location)
    #[arg(long, env = "PLANROOM_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Index storage backend
    #[arg(long, value_enum, default_value = "files", global = true)]
    storage: StorageKind,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed and index documents
    Ingest {
        /// PDF or plain-text files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Caption extracted images with the vision model
        #[arg(long)]
        describe_images: bool,
    },
    /// Retrieve context for a question
    Search {
        query: String,

        /// Number of chunks to return
        #[arg(short = 'n', long)]
        top_k: Option<usize>,

        /// Leave image contexts out of the result
        #[arg(long)]
        no_images: bool,

        /// Restrict to one document id
        #[arg(long)]
        document: Option<String>,
    },
    /// Retrieve context for a structured extraction
    /// (door_schedule, room_schedule, mep_equipment, or any free-form category)
    Extract {
        kind: String,

        /// Restrict to one document id
        #[arg(long)]
        document: Option<String>,
    },
    /// List indexed documents
    Documents,
    /// Remove a document from search results
    Delete { document_id: String },
    /// Reclaim rows held by deleted documents
    Compact {
        /// Only compact once enough rows are deleted
        #[arg(long)]
        if_needed: bool,
    },
    /// Show index statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let workspace = Workspace::open(cli.data_dir.as_ref(), cli.storage, &cli.provider).await?;

    let output = match &cli.command {
        Command::Ingest {
            files,
            describe_images,
        } => {
            let reports = commands::ingest(&workspace, files, *describe_images).await?;
            if cli.json {
                output::format_json(&reports)
            } else {
                output::format_ingestion(&reports)
            }
        }
        Command::Search {
            query,
            top_k,
            no_images,
            document,
        } => {
            let context =
                commands::search(&workspace, query, *top_k, !no_images, document.as_deref())
                    .await?;
            if cli.json {
                output::format_retrieval_json(query, &context)
            } else {
                output::format_retrieval(query, &context)
            }
        }
        Command::Extract { kind, document } => {
            let kind: ExtractionKind = kind.parse()?;
            let context = commands::extract(&workspace, &kind, document.as_deref()).await?;
            if cli.json {
                output::format_retrieval_json(kind.query(), &context)
            } else {
                output::format_retrieval(kind.query(), &context)
            }
        }
        Command::Documents => {
            let documents = commands::documents(&workspace).await;
            if cli.json {
                output::format_json(&documents)
            } else {
                output::format_documents(&documents)
            }
        }
        Command::Delete { document_id } => {
            let removed = commands::delete(&workspace, document_id).await?;
            if cli.json {
                output::format_json(&serde_json::json!({
                    "document_id": document_id,
                    "chunks_deleted": removed,
                }))
            } else {
                format!("Deleted {} ({} chunks)", document_id, removed)
            }
        }
        Command::Compact { if_needed } => {
            let stats = commands::compact(&workspace, *if_needed).await?;
            if cli.json {
                output::format_json(&stats)
            } else {
                output::format_compaction(stats.as_ref())
            }
        }
        Command::Stats => {
            let stats = commands::stats(&workspace).await;
            if cli.json {
                output::format_json(&stats)
            } else {
                output::format_stats(&stats)
            }
        }
    };

    println!("{}", output);
    Ok(())
}
