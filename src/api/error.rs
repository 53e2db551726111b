use reqwest::StatusCode;
use thiserror::Error;

use crate::storage::StorageError;

/// Failures surfaced by the request pipeline and the services built on it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller-initiated abort; never reported to the user
    #[error("Request cancelled")]
    Cancelled,
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid request: {0}")]
    Invalid(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Service is in maintenance mode")]
    Maintenance,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Session expired")]
    SessionExpired,
    /// Non-success response. `message` is the user-facing text.
    #[error("{status}: {message}")]
    Status {
        message: String,
        server_message: Option<String>,
        status: StatusCode,
    },
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// True when the pipeline already acted on this failure (redirect,
    /// notification, or a silent cancel); callers only need local cleanup.
    pub fn is_handled(&self) -> bool {
        match self {
            ApiError::Cancelled
            | ApiError::Maintenance
            | ApiError::Network(_)
            | ApiError::SessionExpired => true,
            // 401s that did not redirect (login) are left to the caller
            ApiError::Status { status, .. } => *status != StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::SessionExpired => Some(StatusCode::UNAUTHORIZED),
            ApiError::Maintenance => Some(StatusCode::SERVICE_UNAVAILABLE),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}
