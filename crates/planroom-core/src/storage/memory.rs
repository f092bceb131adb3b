use super::{StorageBackend, StorageError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-memory storage backend.
///
/// Data lives only as long as the value. Useful for tests and for running
/// the engine without persistence.
#[derive(Default)]
pub struct InMemoryStorage {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.blobs
            .write()
            .await
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.blobs.read().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.blobs.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.blobs.read().await.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.blobs.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_and_delete() {
        let storage = InMemoryStorage::new();
        assert!(!storage.exists("a").await.unwrap());

        storage.save("a", b"hello").await.unwrap();
        assert_eq!(storage.load("a").await.unwrap(), b"hello");
        assert_eq!(storage.list_keys().await.unwrap(), vec!["a".to_string()]);

        storage.delete("a").await.unwrap();
        assert!(matches!(
            storage.load("a").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clear() {
        let storage = InMemoryStorage::new();
        storage.save("a", b"1").await.unwrap();
        storage.save("b", b"2").await.unwrap();
        storage.clear().await.unwrap();
        assert!(storage.list_keys().await.unwrap().is_empty());
    }
}
