use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderName;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::csrf::TokenRefresher;
use super::error::ApiError;
use super::guard::RedirectGuard;
use super::middleware::{self, Flow, Rejection};
use super::request::{ApiRequest, ApiResponse, ErrorBody};
use super::response::Page;
use crate::auth::models::CsrfTokenResponse;
use crate::auth::SessionStore;
use crate::config::{Config, RouteConfig};
use crate::navigation::Navigator;
use crate::notify::{Notifier, NETWORK_ERROR_MESSAGE};
use crate::table::QueryParams;

/// Path of the token-issuing endpoint, relative to the API root
pub const CSRF_TOKEN_PATH: &str = "auth/csrf-token";

/// Authenticated client for the admin API.
///
/// Every call goes through one pipeline that attaches the CSRF token,
/// retries once after a CSRF rejection, and handles session expiry and
/// maintenance mode centrally. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    pub(super) inner: Arc<ClientInner>,
}

pub(super) struct ClientInner {
    pub(super) base_url: String,
    pub(super) csrf_header: HeaderName,
    pub(super) expiry_guard: RedirectGuard,
    pub(super) http: reqwest::Client,
    pub(super) navigator: Arc<dyn Navigator>,
    pub(super) notifier: Arc<dyn Notifier>,
    pub(super) refresher: TokenRefresher,
    pub(super) routes: RouteConfig,
    pub(super) session: Arc<SessionStore>,
}

impl ApiClient {
    /// Build a client with its own cookie-keeping HTTP connection pool.
    pub fn new(
        config: &Config,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.api.timeout_seconds))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Self::with_http_client(config, http, session, navigator, notifier)
    }

    /// Build a client around an existing `reqwest::Client`.
    ///
    /// The session cookie lives in that client, so it should have a cookie
    /// store enabled.
    pub fn with_http_client(
        config: &Config,
        http: reqwest::Client,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let csrf_header = HeaderName::from_bytes(config.api.csrf_header.as_bytes())
            .map_err(|e| ApiError::Invalid(format!("bad CSRF header name: {e}")))?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url: config.api.base_url.trim_end_matches('/').to_string(),
                csrf_header,
                expiry_guard: RedirectGuard::new(),
                http,
                navigator,
                notifier,
                refresher: TokenRefresher::new(),
                routes: config.routes.clone(),
                session,
            }),
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Send a request through the pipeline and read the whole body.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let path = request.path.clone();
        let response = self.execute(request, None).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.network_failure(&path, e))?;
        Ok(ApiResponse {
            body,
            headers,
            status,
        })
    }

    /// Run the request/response phases until the request succeeds or the
    /// response chain stops it. Returns the unread success response.
    pub(super) async fn execute(
        &self,
        mut request: ApiRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<reqwest::Response, ApiError> {
        loop {
            middleware::attach_csrf_token(
                &mut request,
                &self.inner.csrf_header,
                &self.inner.session,
            );

            let sent = match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(path = %request.path, "Request cancelled");
                        return Err(ApiError::Cancelled);
                    }
                    result = self.dispatch(&request) => result,
                },
                None => self.dispatch(&request).await,
            };

            let response = match sent {
                Ok(response) => response,
                Err(ApiError::Network(e)) => return Err(self.network_failure(&request.path, e)),
                Err(e) => return Err(e),
            };

            let status = response.status();
            debug!(
                method = %request.method,
                path = %request.path,
                status = status.as_u16(),
                retry = request.is_retry(),
                "Response received"
            );
            if status.is_success() {
                return Ok(response);
            }

            let body = response.bytes().await.unwrap_or_default();
            let rejection = Rejection {
                body: ErrorBody::parse(&body),
                status,
            };

            match middleware::run_response_chain(self, &mut request, &rejection).await {
                Flow::Retry => continue,
                Flow::Stop(error) => return Err(error),
                Flow::Continue => return Err(middleware::status_error(&rejection)),
            }
        }
    }

    /// Report a transport failure once, whether it hit before the response
    /// head or while reading the body.
    pub(super) fn network_failure(&self, path: &str, error: reqwest::Error) -> ApiError {
        warn!(path = %path, error = %error, "Request failed in transit");
        self.inner.notifier.error(NETWORK_ERROR_MESSAGE);
        ApiError::Network(error)
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<reqwest::Response, ApiError> {
        let url = self.url(&request.path)?;
        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        let joined = format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'));
        reqwest::Url::parse(&joined).map_err(|e| ApiError::Invalid(format!("{joined}: {e}")))
    }

    // ========================================================================
    // CSRF token
    // ========================================================================

    /// Fetch a fresh CSRF token and store it in the session.
    ///
    /// Concurrent callers share one request. Returns `None` when the token
    /// endpoint fails; the failure is logged, not reported.
    pub async fn refresh_csrf_token(&self) -> Option<String> {
        let http = self.inner.http.clone();
        let session = Arc::clone(&self.inner.session);
        let url = self.url(CSRF_TOKEN_PATH);

        self.inner
            .refresher
            .refresh(move || async move {
                let url = match url {
                    Ok(url) => url,
                    Err(e) => {
                        warn!(error = %e, "Cannot build CSRF token URL");
                        return None;
                    }
                };
                match fetch_csrf_token(&http, url).await {
                    Ok(token) => {
                        debug!("CSRF token refreshed");
                        session.set_csrf_token(Some(token.clone()));
                        Some(token)
                    }
                    Err(e) => {
                        warn!(error = %e, "CSRF token refresh failed");
                        None
                    }
                }
            })
            .await
    }

    // ========================================================================
    // JSON helpers
    // ========================================================================

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path).with_query(query))
            .await?
            .data()
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path).json(body)?).await?.data()
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::put(path).json(body)?).await?.data()
    }

    pub async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::patch(path).json(body)?).await?.data()
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }

    /// Fetch one page of a list endpoint
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<Page<T>, ApiError> {
        self.send(ApiRequest::get(path).with_query(params.to_query_pairs()))
            .await?
            .json()
    }

    /// Download a binary payload into `dest_dir`. See [`super::download`].
    pub async fn download(
        &self,
        request: ApiRequest,
        dest_dir: &Path,
        file_name: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, ApiError> {
        super::download::download(self, request, dest_dir, file_name, cancel).await
    }
}

async fn fetch_csrf_token(http: &reqwest::Client, url: reqwest::Url) -> Result<String, ApiError> {
    let response = http.get(url).send().await?.error_for_status()?;
    let body: CsrfTokenResponse = response.json().await?;
    if body.csrf_token.is_empty() {
        return Err(ApiError::Invalid("empty CSRF token".to_string()));
    }
    Ok(body.csrf_token)
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("csrf_header", &self.inner.csrf_header)
            .finish_non_exhaustive()
    }
}
