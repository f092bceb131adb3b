//! Redb-backed blob storage.
//!
//! Uses [redb](https://github.com/cberner/redb), a pure Rust embedded
//! B-tree database, so all index artifacts live in one file and each
//! write is its own committed transaction.
//!
//! # Tables
//!
//! - `blobs`: key (string) -> value (raw bytes)

use super::{StorageBackend, StorageError};
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const BLOBS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

/// Redb-backed storage for native deployments.
///
/// # Example
///
/// ```ignore
/// use planroom_core::storage::RedbStorage;
///
/// let storage = RedbStorage::open("./data/planroom.redb")?;
/// let index = VectorIndex::open(storage, 384).await?;
/// ```
pub struct RedbStorage {
    db: Arc<Database>,
}

fn db_err(context: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::DatabaseError(format!("{}: {}", context, e))
}

impl RedbStorage {
    /// Opens or creates a redb database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| db_err("Failed to open database", e))?;

        {
            let write_txn = db
                .begin_write()
                .map_err(|e| db_err("Failed to begin write transaction", e))?;
            write_txn
                .open_table(BLOBS_TABLE)
                .map_err(|e| db_err("Failed to create blobs table", e))?;
            write_txn
                .commit()
                .map_err(|e| db_err("Failed to commit table creation", e))?;
        }

        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl StorageBackend for RedbStorage {
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| db_err("Failed to begin write transaction", e))?;
        {
            let mut table = write_txn
                .open_table(BLOBS_TABLE)
                .map_err(|e| db_err("Failed to open blobs table", e))?;
            table
                .insert(key, data)
                .map_err(|e| db_err("Failed to insert blob", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| db_err("Failed to commit blob", e))?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| db_err("Failed to begin read transaction", e))?;
        let table = read_txn
            .open_table(BLOBS_TABLE)
            .map_err(|e| db_err("Failed to open blobs table", e))?;

        match table.get(key).map_err(|e| db_err("Failed to read blob", e))? {
            Some(value) => Ok(value.value().to_vec()),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| db_err("Failed to begin read transaction", e))?;
        let table = read_txn
            .open_table(BLOBS_TABLE)
            .map_err(|e| db_err("Failed to open blobs table", e))?;
        Ok(table
            .get(key)
            .map_err(|e| db_err("Failed to read blob", e))?
            .is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| db_err("Failed to begin write transaction", e))?;
        {
            let mut table = write_txn
                .open_table(BLOBS_TABLE)
                .map_err(|e| db_err("Failed to open blobs table", e))?;
            table
                .remove(key)
                .map_err(|e| db_err("Failed to delete blob", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| db_err("Failed to commit blob deletion", e))?;
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| db_err("Failed to begin read transaction", e))?;
        let table = read_txn
            .open_table(BLOBS_TABLE)
            .map_err(|e| db_err("Failed to open blobs table", e))?;

        let mut keys = Vec::new();
        for entry in table.iter().map_err(|e| db_err("Failed to iterate blobs", e))? {
            let (key, _) = entry.map_err(|e| db_err("Failed to read blob entry", e))?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| db_err("Failed to begin write transaction", e))?;
        write_txn
            .delete_table(BLOBS_TABLE)
            .map_err(|e| db_err("Failed to drop blobs table", e))?;
        write_txn
            .open_table(BLOBS_TABLE)
            .map_err(|e| db_err("Failed to recreate blobs table", e))?;
        write_txn
            .commit()
            .map_err(|e| db_err("Failed to commit clear", e))?;
        Ok(())
    }
}
