use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub routes: RouteConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Backend root, e.g. `http://localhost:3000/api`
    pub base_url: String,
    /// Header carrying the CSRF token on mutating requests
    pub csrf_header: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub login_path: String,
    pub maintenance_path: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Namespace for per-table column visibility keys
    pub column_visibility_prefix: String,
    pub data_dir: String,
    /// Key holding the persisted auth session
    pub session_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            csrf_header: "x-csrf-token".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            maintenance_path: "/maintenance".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            column_visibility_prefix: "table-columns:".to_string(),
            data_dir: "./data".to_string(),
            session_key: "auth-storage".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let base_url = std::env::var("API_BASE_URL").unwrap_or(defaults.base_url);
        let csrf_header = std::env::var("CSRF_HEADER").unwrap_or(defaults.csrf_header);
        let timeout_seconds = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.timeout_seconds);

        let routes = RouteConfig::default();
        let login_path = std::env::var("LOGIN_PATH").unwrap_or(routes.login_path);
        let maintenance_path =
            std::env::var("MAINTENANCE_PATH").unwrap_or(routes.maintenance_path);

        let storage = StorageConfig::default();
        let data_dir = std::env::var("DATA_DIR").unwrap_or(storage.data_dir);
        let column_visibility_prefix = std::env::var("COLUMN_VISIBILITY_PREFIX")
            .unwrap_or(storage.column_visibility_prefix);

        let config = Config {
            api: ApiConfig {
                base_url,
                csrf_header,
                timeout_seconds,
            },
            routes: RouteConfig {
                login_path,
                maintenance_path,
            },
            storage: StorageConfig {
                column_visibility_prefix,
                data_dir,
                ..Default::default()
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "API_BASE_URL '{}' is not a valid URL: {e}",
                self.api.base_url
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "API_BASE_URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "REQUEST_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if reqwest::header::HeaderName::from_bytes(self.api.csrf_header.as_bytes()).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "CSRF_HEADER '{}' is not a valid header name",
                self.api.csrf_header
            )));
        }

        for path in [&self.routes.login_path, &self.routes.maintenance_path] {
            if !path.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "route '{path}' must start with '/'"
                )));
            }
        }

        if self.storage.column_visibility_prefix.is_empty() {
            tracing::warn!(
                "COLUMN_VISIBILITY_PREFIX is empty; table keys may collide with other client state"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_config;

    #[test]
    fn test_default_config_is_valid() {
        assert!(test_config("http://127.0.0.1:1").validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let config = test_config("not a url");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let config = test_config("ftp://example.com/api");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = test_config("http://127.0.0.1:1");
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_relative_routes() {
        let mut config = test_config("http://127.0.0.1:1");
        config.routes.login_path = "login".to_string();
        assert!(config.validate().is_err());
    }
}
