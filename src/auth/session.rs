//! Process-wide auth session with a single-writer discipline.
//!
//! The store is shared as `Arc<SessionStore>`. Anyone may read; only the
//! request pipeline (token refresh) and the explicit login/logout/profile
//! operations write. Every write is persisted so the session survives a
//! restart; a failing store only costs durability.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use super::models::{AuthSession, PersistedSession, User, UserPatch};
use crate::storage::{KeyValueStore, StorageError};

pub struct SessionStore {
    key: String,
    state: RwLock<AuthSession>,
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create an unhydrated store. Call [`SessionStore::hydrate`] before
    /// trusting any of its contents.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: RwLock::new(AuthSession::default()),
            store,
        }
    }

    /// Read the persisted session. Missing or unreadable state hydrates as
    /// an empty session.
    pub fn hydrate(&self) {
        let persisted = match self.store.get(&self.key) {
            Ok(Some(raw)) => serde_json::from_str::<PersistedSession>(&raw).unwrap_or_else(|e| {
                warn!(key = %self.key, error = %e, "Discarding unreadable persisted session");
                PersistedSession::default()
            }),
            Ok(None) => PersistedSession::default(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Session storage unavailable");
                PersistedSession::default()
            }
        };

        let mut state = self.write();
        *state = AuthSession {
            csrf_token: persisted.csrf_token,
            is_authenticated: persisted.is_authenticated && persisted.user.is_some(),
            is_hydrated: true,
            user: persisted.user,
        };
        debug!(authenticated = state.is_authenticated, "Session hydrated");
    }

    // ========================================================================
    // Readers
    // ========================================================================

    pub fn snapshot(&self) -> AuthSession {
        self.read().clone()
    }

    pub fn csrf_token(&self) -> Option<String> {
        self.read().csrf_token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    pub fn is_hydrated(&self) -> bool {
        self.read().is_hydrated
    }

    // ========================================================================
    // Writers
    // ========================================================================

    /// Start a session for `user`. Any token from a previous session is
    /// stale and dropped.
    pub fn login(&self, user: User) {
        let mut state = self.write();
        debug!(user_id = user.id, username = %user.username, "Session started");
        state.user = Some(user);
        state.csrf_token = None;
        state.is_authenticated = true;
        state.is_hydrated = true;
        self.persist(&state);
    }

    /// Clear user and token. Returns false when there was nothing to clear.
    pub fn logout(&self) -> bool {
        let mut state = self.write();
        let changed = state.is_authenticated || state.user.is_some() || state.csrf_token.is_some();
        if changed {
            state.user = None;
            state.csrf_token = None;
            state.is_authenticated = false;
            self.persist(&state);
            debug!("Session cleared");
        }
        changed
    }

    /// Patch profile fields of the current user. No-op without a user.
    pub fn update_user(&self, patch: &UserPatch) {
        let mut state = self.write();
        if let Some(user) = state.user.as_mut() {
            patch.apply(user);
            self.persist(&state);
        }
    }

    /// Replace the whole user record (fresh copy from `/auth/me`).
    pub(crate) fn replace_user(&self, user: User) {
        let mut state = self.write();
        if state.is_authenticated {
            state.user = Some(user);
            self.persist(&state);
        }
    }

    pub(crate) fn set_csrf_token(&self, token: Option<String>) {
        let mut state = self.write();
        state.csrf_token = token;
        self.persist(&state);
    }

    fn persist(&self, state: &AuthSession) {
        let persisted = PersistedSession {
            csrf_token: state.csrf_token.clone(),
            is_authenticated: state.is_authenticated,
            user: state.user.clone(),
        };
        let result = serde_json::to_string(&persisted)
            .map_err(StorageError::from)
            .and_then(|json| self.store.set(&self.key, &json));
        if let Err(e) = result {
            warn!(key = %self.key, error = %e, "Failed to persist session");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, AuthSession> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthSession> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("SessionStore")
            .field("key", &self.key)
            .field("is_authenticated", &state.is_authenticated)
            .field("is_hydrated", &state.is_hydrated)
            .finish_non_exhaustive()
    }
}
