//! User-facing error notifications.

use std::sync::{Mutex, PoisonError};

use reqwest::StatusCode;

/// Sink for messages the user should see (toasts in a browser shell).
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// Writes notifications to the log at `warn`.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::warn!(notification = %message, "Request failed");
    }
}

/// Keeps notifications in memory so they can be shown or inspected later.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for CollectingNotifier {
    fn error(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

pub const DEFAULT_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";
pub const NETWORK_ERROR_MESSAGE: &str = "Unable to reach the server. Check your connection.";

/// Pick the message shown for a failed response.
///
/// Server text is trusted only for statuses where it carries business
/// meaning; everything else gets a generic message keyed by status.
pub fn resolve_error_message(status: StatusCode, server_message: Option<&str>) -> String {
    let server_message = server_message.map(str::trim).filter(|m| !m.is_empty());

    if let Some(message) = server_message {
        if matches!(status.as_u16(), 400 | 403 | 404 | 409 | 422) {
            return message.to_string();
        }
    }

    generic_message(status)
        .unwrap_or(DEFAULT_ERROR_MESSAGE)
        .to_string()
}

fn generic_message(status: StatusCode) -> Option<&'static str> {
    let message = match status.as_u16() {
        400 => "The request was invalid.",
        403 => "You do not have permission to perform this action.",
        404 => "The requested resource was not found.",
        409 => "The resource was modified by someone else.",
        413 => "The uploaded file is too large.",
        422 => "Some of the submitted data is invalid.",
        429 => "Too many requests. Please slow down.",
        500 => "The server encountered an error.",
        502 | 504 => "The server is temporarily unreachable.",
        503 => "The service is temporarily unavailable.",
        _ => return None,
    };
    Some(message)
}
