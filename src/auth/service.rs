//! Login, logout and profile calls against `/auth/*`.

use tracing::{info, warn};

use super::models::{LoginRequest, User, UserEnvelope, UserPatch};
use crate::api::{ApiClient, ApiError, ApiRequest};

#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Get a CSRF token, joining a refresh already in flight.
    pub async fn fetch_csrf_token(&self) -> Option<String> {
        self.client.refresh_csrf_token().await
    }

    /// Sign in. Bad credentials come back as a 401 `Status` error instead
    /// of the session-expiry redirect.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let request = ApiRequest::post("auth/login")
            .json(&LoginRequest { password, username })?
            .without_session_redirect();
        let envelope: UserEnvelope = self.client.send(request).await?.json()?;

        self.client.session().login(envelope.user.clone());
        info!(user_id = envelope.user.id, username = %envelope.user.username, "Signed in");
        Ok(envelope.user)
    }

    /// Sign out on the server, then locally. The local session is cleared
    /// even when the server call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.client.send(ApiRequest::post("auth/logout")).await;
        self.client.session().logout();
        match result {
            Ok(_) => {
                info!("Signed out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Server logout failed; local session cleared anyway");
                Err(e)
            }
        }
    }

    /// Reload the current user from the server
    pub async fn me(&self) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self.client.send(ApiRequest::get("auth/me")).await?.json()?;
        self.client.session().replace_user(envelope.user.clone());
        Ok(envelope.user)
    }

    pub async fn update_profile(&self, patch: &UserPatch) -> Result<(), ApiError> {
        self.client
            .send(ApiRequest::put("auth/profile").json(patch)?)
            .await?;
        self.client.session().update_user(patch);
        Ok(())
    }
}
