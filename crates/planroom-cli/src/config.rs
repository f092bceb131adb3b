//! Data directory resolution, storage selection and provider settings.
//!
//! Layout under the data directory:
//! - `index/` - index artifacts when using file storage
//! - `index.redb` - single-file database when using redb storage
//! - `images/` - rasters extracted during ingestion

use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use directories::ProjectDirs;
use planroom_core::config::VECTOR_DIMENSION;
use planroom_core::embedding::OpenAiConfig;
use planroom_core::storage::{FileStorage, RedbStorage, StorageBackend};
use std::path::{Path, PathBuf};

/// Directory holding file-backed index artifacts
const INDEX_DIRNAME: &str = "index";

/// Database file name for redb storage
const DATABASE_FILENAME: &str = "index.redb";

/// Directory for extracted images
const IMAGE_DIRNAME: &str = "images";

/// Persistence backend for the index artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// One file per artifact under `index/`
    Files,
    /// Single redb database file
    Redb,
}

/// Settings for the OpenAI-compatible embedding and vision endpoints.
#[derive(Debug, Clone, Args)]
pub struct ProviderArgs {
    /// Base URL of an OpenAI-compatible API
    #[arg(
        long,
        env = "PLANROOM_EMBEDDING_URL",
        default_value = "https://api.openai.com/v1",
        global = true
    )]
    pub embedding_url: String,

    /// Embedding model name
    #[arg(
        long,
        env = "PLANROOM_EMBEDDING_MODEL",
        default_value = "text-embedding-3-small",
        global = true
    )]
    pub embedding_model: String,

    /// Vision model used to caption extracted images
    #[arg(
        long,
        env = "PLANROOM_VISION_MODEL",
        default_value = "gpt-4o-mini",
        global = true
    )]
    pub vision_model: String,

    /// Bearer token for the API
    #[arg(long, env = "PLANROOM_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Embedding dimension; must match an existing index
    #[arg(long, env = "PLANROOM_DIMENSION", default_value_t = VECTOR_DIMENSION, global = true)]
    pub dimension: usize,
}

impl ProviderArgs {
    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.embedding_url.trim_end_matches('/').to_string(),
            api_key: self.api_key.clone().filter(|key| !key.is_empty()),
            model: self.embedding_model.clone(),
            vision_model: self.vision_model.clone(),
            dimensions: self.dimension,
            ..OpenAiConfig::default()
        }
    }
}

/// Returns the data directory.
///
/// - Linux: `~/.local/share/planroom/`
/// - macOS: `~/Library/Application Support/dev.planroom.Planroom/`
/// - Windows: `%APPDATA%\planroom\Planroom\data\`
pub fn get_data_dir(custom_dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = custom_dir {
        return Ok(dir.clone());
    }

    ProjectDirs::from("dev", "planroom", "Planroom")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}

pub fn image_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(IMAGE_DIRNAME)
}

/// Opens the storage backend under `data_dir`, creating it if needed.
pub fn open_storage(kind: StorageKind, data_dir: &Path) -> Result<Box<dyn StorageBackend>> {
    match kind {
        StorageKind::Files => {
            let path = data_dir.join(INDEX_DIRNAME);
            let storage = FileStorage::open(&path)
                .with_context(|| format!("Failed to open index directory: {}", path.display()))?;
            Ok(Box::new(storage))
        }
        StorageKind::Redb => {
            std::fs::create_dir_all(data_dir).with_context(|| {
                format!("Failed to create data directory: {}", data_dir.display())
            })?;
            let path = data_dir.join(DATABASE_FILENAME);
            let storage = RedbStorage::open(&path)
                .with_context(|| format!("Failed to open database: {}", path.display()))?;
            Ok(Box::new(storage))
        }
    }
}
