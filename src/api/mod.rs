//! Authenticated request pipeline and the API surfaces built on it.

mod client;
pub mod csrf;
mod download;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod request;
pub mod resources;
pub mod response;

pub use client::{ApiClient, CSRF_TOKEN_PATH};
pub use error::ApiError;
pub use request::{ApiRequest, ApiResponse, ErrorBody};
pub use resources::{ExportFormat, Resource, SettingsApi, SystemSettings};
pub use response::{Page, Pagination};
