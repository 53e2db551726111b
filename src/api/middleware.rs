//! Request and response interceptors of the API pipeline
//!
//! The request phase attaches the CSRF token to mutating requests. The
//! response phase is an ordered chain of stages; each failed response walks
//! the chain until a stage asks for a retry or stops it. Precedence comes
//! from the order of [`RESPONSE_CHAIN`], nothing else.

use reqwest::header::HeaderName;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use super::client::ApiClient;
use super::error::ApiError;
use super::request::{ApiRequest, ErrorBody};
use crate::auth::SessionStore;
use crate::notify::resolve_error_message;

/// A non-success response, body already read
#[derive(Debug, Clone)]
pub struct Rejection {
    pub body: ErrorBody,
    pub status: StatusCode,
}

impl Rejection {
    pub fn is_csrf_rejection(&self) -> bool {
        self.status == StatusCode::FORBIDDEN && self.body.is_csrf_rejection()
    }

    pub fn is_maintenance(&self) -> bool {
        self.status == StatusCode::SERVICE_UNAVAILABLE && self.body.maintenance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStage {
    /// 403 + csrf indicator: refresh the token, resend once
    CsrfRetry,
    /// 401: log out and redirect to the login route, once per burst
    SessionExpiry,
    /// 503 + maintenance flag: redirect to the maintenance route
    Maintenance,
    /// Anything left: notify the user (except 401)
    ErrorReport,
}

pub const RESPONSE_CHAIN: [ResponseStage; 4] = [
    ResponseStage::CsrfRetry,
    ResponseStage::SessionExpiry,
    ResponseStage::Maintenance,
    ResponseStage::ErrorReport,
];

/// What a stage decided
#[derive(Debug)]
pub(crate) enum Flow {
    /// Not mine; hand to the next stage
    Continue,
    /// Resend the (possibly modified) request
    Retry,
    /// Finish with this error
    Stop(ApiError),
}

// ============================================================================
// Request phase
// ============================================================================

/// Put the current CSRF token on mutating requests. Safe verbs never carry
/// it.
pub(crate) fn attach_csrf_token(
    request: &mut ApiRequest,
    header: &HeaderName,
    session: &SessionStore,
) {
    if !request.is_mutating() {
        request.headers.remove(header);
        return;
    }
    if let Some(token) = session.csrf_token() {
        if !request.set_header(header, &token) {
            warn!("CSRF token is not a valid header value; sending without it");
        }
    }
}

// ============================================================================
// Response phase
// ============================================================================

pub(crate) async fn run_response_chain(
    client: &ApiClient,
    request: &mut ApiRequest,
    rejection: &Rejection,
) -> Flow {
    for stage in RESPONSE_CHAIN {
        let flow = match stage {
            ResponseStage::CsrfRetry => csrf_retry(client, request, rejection).await,
            ResponseStage::SessionExpiry => session_expiry(client, request, rejection),
            ResponseStage::Maintenance => maintenance(client, rejection),
            ResponseStage::ErrorReport => error_report(client, request, rejection),
        };
        if !matches!(flow, Flow::Continue) {
            return flow;
        }
    }
    Flow::Continue
}

async fn csrf_retry(client: &ApiClient, request: &mut ApiRequest, rejection: &Rejection) -> Flow {
    if !rejection.is_csrf_rejection() {
        return Flow::Continue;
    }
    if request.is_retry() {
        debug!(path = %request.path, "CSRF rejected again after refresh; not retrying");
        return Flow::Continue;
    }

    request.mark_retried();
    match client.refresh_csrf_token().await {
        Some(token) if request.set_header(&client.inner.csrf_header, &token) => {
            debug!(method = %request.method, path = %request.path, "Retrying with refreshed CSRF token");
            Flow::Retry
        }
        _ => Flow::Continue,
    }
}

fn session_expiry(client: &ApiClient, request: &ApiRequest, rejection: &Rejection) -> Flow {
    if rejection.status != StatusCode::UNAUTHORIZED || !request.redirects_on_unauthorized() {
        return Flow::Continue;
    }

    // Later 401s of the same burst find the permit taken and stop quietly
    if let Some(_permit) = client.inner.expiry_guard.try_begin() {
        let inner = &client.inner;
        if inner.session.logout() {
            info!(path = %request.path, "Session expired; signed out");
        }
        let login = &inner.routes.login_path;
        if !is_at(&inner.navigator.current_path(), login) {
            inner.navigator.navigate(login);
        }
    }

    Flow::Stop(ApiError::SessionExpired)
}

fn maintenance(client: &ApiClient, rejection: &Rejection) -> Flow {
    if !rejection.is_maintenance() {
        return Flow::Continue;
    }

    let target = &client.inner.routes.maintenance_path;
    if !is_at(&client.inner.navigator.current_path(), target) {
        warn!("Service entered maintenance mode");
        client.inner.navigator.navigate(target);
    }
    Flow::Stop(ApiError::Maintenance)
}

fn error_report(client: &ApiClient, request: &ApiRequest, rejection: &Rejection) -> Flow {
    let error = status_error(rejection);
    if rejection.status != StatusCode::UNAUTHORIZED {
        if let ApiError::Status { message, .. } = &error {
            debug!(
                method = %request.method,
                path = %request.path,
                status = rejection.status.as_u16(),
                "Reporting failed request"
            );
            client.inner.notifier.error(message);
        }
    }
    Flow::Stop(error)
}

pub(crate) fn status_error(rejection: &Rejection) -> ApiError {
    let server_message = rejection.body.server_message().map(str::to_string);
    ApiError::Status {
        message: resolve_error_message(rejection.status, server_message.as_deref()),
        server_message,
        status: rejection.status,
    }
}

/// Compare route paths, ignoring any query string on the current location
fn is_at(current: &str, target: &str) -> bool {
    current.split('?').next().unwrap_or(current) == target
}
