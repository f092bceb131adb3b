//! Storage backends for persisting index artifacts.
//!
//! The index writes three blobs (vectors, chunk metadata, document map)
//! through the [`StorageBackend`] key-value trait, so where they land is a
//! deployment choice.
//!
//! # Implementations
//!
//! - [`InMemoryStorage`] - process-local map, for tests and ephemeral use
//! - [`FileStorage`] - one file per key under a base directory
//! - [`RedbStorage`] - single redb database file (feature `redb-store`)

mod file;
mod memory;

#[cfg(feature = "redb-store")]
mod redb_store;

pub use file::FileStorage;
pub use memory::InMemoryStorage;

#[cfg(feature = "redb-store")]
pub use redb_store::RedbStorage;

use crate::search::SearchError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Key-value blob storage.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Save binary data under a key, replacing any previous value.
    #[must_use = "Storage save failures should be handled"]
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Load binary data by key.
    #[must_use = "Storage load failures should be handled"]
    async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Check if a key exists in storage.
    #[must_use = "Storage check failures should be handled"]
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete data by key. Missing keys are not an error.
    #[must_use = "Storage delete failures should be handled"]
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List all keys in storage.
    #[must_use = "Storage listing failures should be handled"]
    async fn list_keys(&self) -> Result<Vec<String>, StorageError>;

    /// Clear all stored data.
    #[must_use = "Storage clear failures should be handled"]
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Forwards every call to the pointee, so boxed trait objects and shared
/// handles can back an index.
macro_rules! forward_storage_backend {
    ($($ptr:ident),+) => {$(
        #[async_trait]
        impl<T: StorageBackend + ?Sized> StorageBackend for $ptr<T> {
            async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
                (**self).save(key, data).await
            }

            async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
                (**self).load(key).await
            }

            async fn exists(&self, key: &str) -> Result<bool, StorageError> {
                (**self).exists(key).await
            }

            async fn delete(&self, key: &str) -> Result<(), StorageError> {
                (**self).delete(key).await
            }

            async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
                (**self).list_keys().await
            }

            async fn clear(&self) -> Result<(), StorageError> {
                (**self).clear().await
            }
        }
    )+};
}

forward_storage_backend!(Box, Arc);

/// Storage error types.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StorageError> for SearchError {
    fn from(err: StorageError) -> Self {
        SearchError::StorageError(err.to_string())
    }
}
