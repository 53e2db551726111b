use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The signed-in account as returned by `/auth/login` and `/auth/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Numeric id; zero is a valid id
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    /// Role name as the backend spells it (`admin`, `manager`, ...)
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub section_id: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    /// Fields this client does not model, kept so profiles round-trip
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_active() -> bool {
    true
}

/// Profile fields a user may change on their own account.
///
/// `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<Option<i64>>,
}

impl UserPatch {
    pub fn apply(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(full_name) = &self.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(department_id) = self.department_id {
            user.department_id = department_id;
        }
        if let Some(section_id) = self.section_id {
            user.section_id = section_id;
        }
    }
}

/// In-memory view of the auth session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSession {
    pub csrf_token: Option<String>,
    pub is_authenticated: bool,
    /// False until persisted state has been read; gate auth UI on this
    pub is_hydrated: bool,
    pub user: Option<User>,
}

/// What survives a restart. `is_hydrated` is deliberately not stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersistedSession {
    #[serde(default)]
    pub csrf_token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CsrfTokenResponse {
    pub csrf_token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub password: &'a str,
    pub username: &'a str,
}
