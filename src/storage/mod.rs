//! Durable client-side storage.
//!
//! Everything the client remembers between runs (column visibility per
//! table, the persisted auth session) goes through the [`KeyValueStore`]
//! trait. Values are JSON documents; callers decide how to treat a missing
//! or unreadable entry.

pub mod db;
mod memory;
mod tables;

pub use db::{Database, StorageError};
pub use memory::MemoryStore;
pub use tables::*;

/// Narrow string key/value interface over durable storage.
///
/// Implementations must be safe to share between tasks. A failing store is
/// never fatal to callers: they fall back to an empty default.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Returns whether it existed.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// All keys starting with `prefix`, in key order
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}
