use redb::{Database as RedbDatabase, ReadTransaction, WriteTransaction};
use std::path::Path;
use thiserror::Error;

use super::tables::CLIENT_STATE;
use super::KeyValueStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("Stored value is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// redb-backed durable store, one file per data directory.
pub struct Database {
    db: RedbDatabase,
}

impl Database {
    /// Open or create the client state database in the given directory
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, StorageError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("client-state.redb");
        let db = RedbDatabase::create(db_path)?;

        // Create the table up front so read transactions never miss it
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CLIENT_STATE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn begin_read(&self) -> Result<ReadTransaction, StorageError> {
        Ok(self.db.begin_read()?)
    }

    fn begin_write(&self) -> Result<WriteTransaction, StorageError> {
        Ok(self.db.begin_write()?)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(CLIENT_STATE)?;

        match table.get(key)? {
            Some(data) => Ok(Some(String::from_utf8(data.value().to_vec())?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(CLIENT_STATE)?;
            table.insert(key, value.as_bytes())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let write_txn = self.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(CLIENT_STATE)?;
            let removed = table.remove(key)?;
            removed.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(CLIENT_STATE)?;

        let mut keys = Vec::new();
        for result in table.range(prefix..)? {
            let (key, _) = result?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_string());
        }
        Ok(keys)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
