//! Shared test helpers for the `#[cfg(test)]` modules of this crate.

use tempfile::TempDir;

use crate::auth::User;
use crate::config::{ApiConfig, Config, RouteConfig, StorageConfig};
use crate::storage::{Database, KeyValueStore, StorageError};

/// Open a fresh database in a temporary directory.
///
/// Returns both the `Database` and the `TempDir` guard; the caller must
/// keep the `TempDir` alive for the duration of the test.
pub fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path()).unwrap();
    (db, temp_dir)
}

/// A `Config` pointing at `base_url` with default routes and storage keys.
pub fn test_config(base_url: &str) -> Config {
    Config {
        api: ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        },
        routes: RouteConfig::default(),
        storage: StorageConfig {
            data_dir: "/tmp/test".to_string(),
            ..Default::default()
        },
    }
}

/// Create a `User` with the given id and username.
pub fn make_user(id: i64, username: &str) -> User {
    User {
        department_id: None,
        email: None,
        extra: Default::default(),
        full_name: None,
        id,
        is_active: true,
        last_login_at: None,
        role: "staff".to_string(),
        section_id: None,
        username: username.to_string(),
    }
}

/// Store whose every operation fails, like disabled or full storage.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(unavailable())
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(unavailable())
    }

    fn remove(&self, _key: &str) -> Result<bool, StorageError> {
        Err(unavailable())
    }

    fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>, StorageError> {
        Err(unavailable())
    }
}

fn unavailable() -> StorageError {
    StorageError::Io(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "storage disabled",
    ))
}
