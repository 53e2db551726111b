//! dept-admin-client - client core for the departmental administration API
//!
//! This crate provides:
//! - A table state controller for paginated, sortable, filterable lists
//!   (query parameters, sort descriptors, row selection, per-table column
//!   visibility persisted across runs)
//! - An authenticated request pipeline: CSRF token on mutating requests,
//!   coalesced token refresh with a single retry, central handling of
//!   session expiry and maintenance mode
//! - Auth, CRUD resource and settings clients on top of the pipeline
//! - redb-backed durable client state

pub mod api;
pub mod auth;
pub mod config;
pub mod navigation;
pub mod notify;
pub mod storage;
pub mod table;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use api::{ApiClient, ApiError, Resource, SettingsApi};
use auth::{AuthApi, SessionStore};
use config::Config;
use navigation::Navigator;
use notify::Notifier;
use storage::KeyValueStore;
use table::{QueryParams, TableController, VisibilityStore};

/// Shared application state
pub struct AppState {
    pub client: ApiClient,
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub store: Arc<dyn KeyValueStore>,
    pub visibility: VisibilityStore,
}

impl AppState {
    /// Wire the session, visibility store and API client around `store`.
    /// The session is hydrated before this returns.
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let session = Arc::new(SessionStore::new(
            Arc::clone(&store),
            config.storage.session_key.clone(),
        ));
        session.hydrate();

        let client = ApiClient::new(&config, Arc::clone(&session), navigator, notifier)?;
        Ok(Self::assemble(config, store, session, client))
    }

    /// Like [`AppState::new`] but with a caller-built API client
    pub fn with_client(config: Config, store: Arc<dyn KeyValueStore>, client: ApiClient) -> Self {
        let session = Arc::clone(client.session());
        Self::assemble(config, store, session, client)
    }

    fn assemble(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        session: Arc<SessionStore>,
        client: ApiClient,
    ) -> Self {
        let visibility = VisibilityStore::new(
            Arc::clone(&store),
            config.storage.column_visibility_prefix.clone(),
        );
        Self {
            client,
            config,
            session,
            store,
            visibility,
        }
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.client.clone())
    }

    pub fn resource<T: DeserializeOwned>(&self, path: &str) -> Resource<T> {
        Resource::new(self.client.clone(), path)
    }

    pub fn settings(&self) -> SettingsApi {
        SettingsApi::new(self.client.clone())
    }

    /// Table controller for `identity` with its stored column visibility
    pub fn table<T>(&self, identity: &str, defaults: QueryParams) -> TableController<T> {
        TableController::new(identity, defaults, self.visibility.clone())
    }
}
