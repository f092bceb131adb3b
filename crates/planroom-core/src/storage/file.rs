// Filesystem storage: one file per key under a base directory

use super::{StorageBackend, StorageError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Filesystem storage backend.
///
/// Keys map to paths relative to the base directory; nested keys such as
/// `index/metadata.json` create intermediate directories. Writes go to a
/// temporary sibling first and are renamed into place.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Opens (creating if needed) a storage directory.
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)
            .map_err(|e| StorageError::IoError(format!("Failed to create directory: {}", e)))?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn get_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    async fn ensure_parent_dirs(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::IoError(format!("Failed to create directory: {}", e)))?;
        }
        Ok(())
    }

    async fn collect_keys(&self, dir: &Path, keys: &mut Vec<String>) -> Result<(), StorageError> {
        let mut pending = vec![dir.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| StorageError::IoError(format!("Failed to read directory: {}", e)))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::IoError(format!("Failed to read entry: {}", e)))?
            {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.base_path) {
                    if !is_temp_file(relative) {
                        keys.push(relative.to_string_lossy().replace('\\', "/"));
                    }
                }
            }
        }
        keys.sort();
        Ok(())
    }
}

const TEMP_SUFFIX: &str = ".tmp";

fn is_temp_file(path: &Path) -> bool {
    path.to_string_lossy().ends_with(TEMP_SUFFIX)
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.get_path(key);
        self.ensure_parent_dirs(&path).await?;

        let tmp = PathBuf::from(format!("{}{}", path.display(), TEMP_SUFFIX));
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| StorageError::IoError(format!("Failed to write file: {}", e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::IoError(format!("Failed to replace file: {}", e)))?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.get_path(key);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::IoError(format!("Failed to read file: {}", e))
            }
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        tokio::fs::try_exists(self.get_path(key))
            .await
            .map_err(|e| StorageError::IoError(format!("Failed to stat file: {}", e)))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.get_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(format!(
                "Failed to delete file: {}",
                e
            ))),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        self.collect_keys(&self.base_path, &mut keys).await?;
        Ok(keys)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        for key in self.list_keys().await? {
            self.delete(&key).await?;
        }
        Ok(())
    }
}
