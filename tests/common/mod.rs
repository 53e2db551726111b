//! Shared helpers for integration tests: a mock backend and a wired client.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;

use dept_admin_client::api::ApiClient;
use dept_admin_client::auth::{SessionStore, User};
use dept_admin_client::config::{ApiConfig, Config, RouteConfig, StorageConfig};
use dept_admin_client::navigation::MemoryNavigator;
use dept_admin_client::notify::CollectingNotifier;
use dept_admin_client::storage::{KeyValueStore, MemoryStore, StorageError};

/// Serve `app` on an ephemeral port. Returns the API root URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

pub fn test_config(base_url: &str) -> Config {
    Config {
        api: ApiConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 10,
            ..Default::default()
        },
        routes: RouteConfig::default(),
        storage: StorageConfig::default(),
    }
}

pub fn make_user(id: i64, username: &str) -> User {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "username": username,
        "role": "admin",
    }))
    .unwrap()
}

/// Memory store that counts writes per key
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    writes: Mutex<HashMap<String, usize>>,
}

impl CountingStore {
    pub fn writes(&self, key: &str) -> usize {
        self.writes.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn reset(&self) {
        self.writes.lock().unwrap().clear();
    }

    fn count(&self, key: &str) {
        *self.writes.lock().unwrap().entry(key.to_string()).or_default() += 1;
    }
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.count(key);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.count(key);
        self.inner.remove(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.keys_with_prefix(prefix)
    }
}

/// Client wired to in-memory collaborators the test can inspect
pub struct Harness {
    pub client: ApiClient,
    pub config: Config,
    pub navigator: Arc<MemoryNavigator>,
    pub notifier: Arc<CollectingNotifier>,
    pub session: Arc<SessionStore>,
    pub store: Arc<CountingStore>,
}

impl Harness {
    pub fn new(base_url: &str) -> Self {
        let config = test_config(base_url);
        let store = Arc::new(CountingStore::default());
        let session = Arc::new(SessionStore::new(
            store.clone(),
            config.storage.session_key.clone(),
        ));
        session.hydrate();

        let navigator = Arc::new(MemoryNavigator::new("/users"));
        let notifier = Arc::new(CollectingNotifier::new());
        let http = reqwest::Client::builder()
            .no_proxy()
            .cookie_store(true)
            .build()
            .unwrap();
        let client = ApiClient::with_http_client(
            &config,
            http,
            session.clone(),
            navigator.clone(),
            notifier.clone(),
        )
        .unwrap();

        Self {
            client,
            config,
            navigator,
            notifier,
            session,
            store,
        }
    }

    /// Start from a signed-in session with write counters at zero
    pub fn signed_in(base_url: &str) -> Self {
        let harness = Self::new(base_url);
        harness.session.login(make_user(7, "alice"));
        harness.store.reset();
        harness
    }
}

/// Request counter shared with mock handlers
#[derive(Default)]
pub struct Hits(AtomicUsize);

impl Hits {
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
