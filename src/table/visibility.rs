//! Per-table column visibility, persisted across runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::storage::{KeyValueStore, StorageError};

/// Column id -> visible. Columns without an entry are visible.
pub type ColumnVisibility = BTreeMap<String, bool>;

/// Reads and writes visibility maps under `<prefix><table identity>`.
#[derive(Clone)]
pub struct VisibilityStore {
    prefix: String,
    store: Arc<dyn KeyValueStore>,
}

impl VisibilityStore {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            store,
        }
    }

    pub fn key_for(&self, table: &str) -> String {
        format!("{}{}", self.prefix, table)
    }

    /// Stored visibility for `table`; empty when missing or unreadable.
    pub fn load(&self, table: &str) -> ColumnVisibility {
        let key = self.key_for(table);
        match self.store.get(&key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                debug!(key = %key, error = %e, "Ignoring unreadable column visibility");
                ColumnVisibility::new()
            }),
            Ok(None) => ColumnVisibility::new(),
            Err(e) => {
                debug!(key = %key, error = %e, "Column visibility storage unavailable");
                ColumnVisibility::new()
            }
        }
    }

    pub fn save(&self, table: &str, visibility: &ColumnVisibility) -> Result<(), StorageError> {
        let json = serde_json::to_string(visibility)?;
        self.store.set(&self.key_for(table), &json)
    }

    pub fn clear(&self, table: &str) -> Result<bool, StorageError> {
        self.store.remove(&self.key_for(table))
    }

    /// Identities of every table with a stored layout
    pub fn tables(&self) -> Result<Vec<String>, StorageError> {
        let keys = self.store.keys_with_prefix(&self.prefix)?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_string))
            .filter(|table| !table.is_empty())
            .collect())
    }
}

impl std::fmt::Debug for VisibilityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibilityStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
