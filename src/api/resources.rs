//! Typed CRUD access to the admin API's entity endpoints.

use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::client::ApiClient;
use super::error::ApiError;
use super::request::ApiRequest;
use super::response::Page;
use crate::table::{QueryKeys, QueryParams};

pub const USERS: &str = "users";
pub const DEPARTMENTS: &str = "departments";
pub const SECTIONS: &str = "sections";
pub const AUDIT_LOGS: &str = "audit-logs";
pub const BACKUPS: &str = "backups";

/// Endpoints the command line accepts by name
pub const KNOWN_RESOURCES: [&str; 5] = [USERS, DEPARTMENTS, SECTIONS, AUDIT_LOGS, BACKUPS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(format!("unsupported export format '{other}'")),
        }
    }
}

/// CRUD client for one endpoint, rows decoded as `T`.
pub struct Resource<T> {
    client: ApiClient,
    keys: QueryKeys,
    path: String,
    _row: PhantomData<fn() -> T>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            keys: self.keys.clone(),
            path: self.path.clone(),
            _row: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Resource<T> {
    pub fn new(client: ApiClient, path: impl Into<String>) -> Self {
        let path = path.into().trim_matches('/').to_string();
        Self {
            client,
            keys: QueryKeys::new(path.clone()),
            path,
            _row: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Cache keys for this entity
    pub fn keys(&self) -> &QueryKeys {
        &self.keys
    }

    pub async fn list(&self, params: &QueryParams) -> Result<Page<T>, ApiError> {
        self.client.list(&self.path, params).await
    }

    pub async fn detail(&self, id: i64) -> Result<T, ApiError> {
        self.client
            .get_json(&self.item_path(id), Vec::new())
            .await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> Result<T, ApiError> {
        self.client.post_json(&self.path, body).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, id: i64, body: &B) -> Result<T, ApiError> {
        self.client.put_json(&self.item_path(id), body).await
    }

    pub async fn remove(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&self.item_path(id)).await
    }

    /// Export rows matching `params` (paging ignored by the server) into
    /// `dest_dir`. Returns the written file.
    pub async fn export(
        &self,
        format: ExportFormat,
        params: &QueryParams,
        dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, ApiError> {
        let mut query = vec![("format".to_string(), format.as_str().to_string())];
        query.extend(
            params
                .to_query_pairs()
                .into_iter()
                .filter(|(k, _)| k != "page" && k != "limit"),
        );

        let request = ApiRequest::get(format!("{}/export", self.path)).with_query(query);
        let file_name = format!(
            "{}-{}.{}",
            self.path,
            chrono::Utc::now().format("%Y%m%d-%H%M%S"),
            format
        );
        self.client
            .download(request, dest_dir, Some(&file_name), cancel)
            .await
    }

    fn item_path(&self, id: i64) -> String {
        format!("{}/{id}", self.path)
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("path", &self.path).finish()
    }
}

// ============================================================================
// System settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    #[serde(default)]
    pub maintenance_message: Option<String>,
    #[serde(default)]
    pub maintenance_mode: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct MaintenanceToggle<'a> {
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct SettingsApi {
    client: ApiClient,
}

impl SettingsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<SystemSettings, ApiError> {
        self.client.get_json("settings", Vec::new()).await
    }

    /// Switch maintenance mode. Returns the settings as stored.
    pub async fn set_maintenance(
        &self,
        enabled: bool,
        message: Option<&str>,
    ) -> Result<SystemSettings, ApiError> {
        let toggle = MaintenanceToggle { enabled, message };
        let settings: SystemSettings = self
            .client
            .put_json("settings/maintenance", &toggle)
            .await?;
        tracing::info!(enabled = settings.maintenance_mode, "Maintenance mode updated");
        Ok(settings)
    }
}
