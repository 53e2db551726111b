use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::bytes::Bytes;

use super::error::ApiError;

/// A request as the pipeline sees it: cloneable so it can be resent.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub body: Option<Value>,
    pub headers: HeaderMap,
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    redirect_on_unauthorized: bool,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            body: None,
            headers: HeaderMap::new(),
            method,
            path: path.into(),
            query: Vec::new(),
            redirect_on_unauthorized: true,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// A 401 on this request is an answer, not an expired session (login).
    pub fn without_session_redirect(mut self) -> Self {
        self.redirect_on_unauthorized = false;
        self
    }

    pub fn redirects_on_unauthorized(&self) -> bool {
        self.redirect_on_unauthorized
    }

    /// Verbs that change server state and must carry the CSRF token
    pub fn is_mutating(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }

    pub fn is_retry(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    pub(crate) fn set_header(&mut self, name: &HeaderName, value: &str) -> bool {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name.clone(), value);
                true
            }
            Err(_) => false,
        }
    }
}

/// A successful response, fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub body: Bytes,
    pub headers: HeaderMap,
    pub status: StatusCode,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decode `{ "data": T }` or a bare `T`.
    ///
    /// The body counts as an envelope only when it is an object holding
    /// `data` and nothing besides `success`, `status` or `message`. A record
    /// that has its own `data` field next to other fields decodes as itself.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let payload = match self.json::<Value>()? {
            Value::Object(mut map) if is_envelope(&map) => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        Ok(serde_json::from_value(payload)?)
    }
}

const ENVELOPE_FIELDS: [&str; 4] = ["data", "message", "status", "success"];

fn is_envelope(map: &serde_json::Map<String, Value>) -> bool {
    map.contains_key("data") && map.keys().all(|key| ENVELOPE_FIELDS.contains(&key.as_str()))
}

/// The parts of an error body the pipeline looks at.
///
/// Backends put the reason under `error`, `code` or `message`, sometimes as
/// a nested `{ message }` object; anything unparseable yields an empty body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: Option<String>,
    pub error: Option<String>,
    pub maintenance: bool,
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn parse(bytes: &[u8]) -> Self {
        let Ok(value) = serde_json::from_slice::<Value>(bytes) else {
            return Self::default();
        };

        Self {
            code: text_field(value.get("code")),
            error: text_field(value.get("error")),
            maintenance: value
                .get("maintenance")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            message: text_field(value.get("message")),
        }
    }

    /// Whether the server blamed the CSRF token
    pub fn is_csrf_rejection(&self) -> bool {
        [&self.error, &self.code, &self.message]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .any(|text| text.to_ascii_lowercase().contains("csrf"))
    }

    pub fn server_message(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutating_verbs() {
        assert!(ApiRequest::post("/x").is_mutating());
        assert!(ApiRequest::put("/x").is_mutating());
        assert!(ApiRequest::patch("/x").is_mutating());
        assert!(ApiRequest::delete("/x").is_mutating());
        assert!(!ApiRequest::get("/x").is_mutating());
        assert!(!ApiRequest::new(Method::HEAD, "/x").is_mutating());
        assert!(!ApiRequest::new(Method::OPTIONS, "/x").is_mutating());
    }

    #[test]
    fn test_csrf_detection_is_case_insensitive() {
        let body = ErrorBody::parse(br#"{"error":"Invalid CSRF token"}"#);
        assert!(body.is_csrf_rejection());

        let body = ErrorBody::parse(br#"{"code":"EBADCSRFTOKEN"}"#);
        assert!(body.is_csrf_rejection());

        let body = ErrorBody::parse(br#"{"error":{"message":"csrf mismatch"}}"#);
        assert!(body.is_csrf_rejection());

        let body = ErrorBody::parse(br#"{"message":"Forbidden"}"#);
        assert!(!body.is_csrf_rejection());
    }

    #[test]
    fn test_maintenance_flag() {
        assert!(ErrorBody::parse(br#"{"maintenance":true}"#).maintenance);
        assert!(!ErrorBody::parse(br#"{"maintenance":"yes"}"#).maintenance);
        assert!(!ErrorBody::parse(b"<html>").maintenance);
    }

    #[test]
    fn test_envelope_accepts_wrapped_and_bare() {
        let wrapped = ApiResponse {
            body: Bytes::from_static(br#"{"data":{"id":0}}"#),
            headers: HeaderMap::new(),
            status: StatusCode::OK,
        };
        let bare = ApiResponse {
            body: Bytes::from_static(br#"{"id":0}"#),
            ..wrapped.clone()
        };
        let a: Value = wrapped.data().unwrap();
        let b: Value = bare.data().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_record_with_data_field_is_not_unwrapped() {
        let record = ApiResponse {
            body: Bytes::from_static(br#"{"id":1,"data":"x"}"#),
            headers: HeaderMap::new(),
            status: StatusCode::OK,
        };
        let value: Value = record.data().unwrap();
        assert_eq!(value, serde_json::json!({ "id": 1, "data": "x" }));

        let wrapped = ApiResponse {
            body: Bytes::from_static(br#"{"success":true,"message":"ok","data":{"id":1}}"#),
            ..record.clone()
        };
        let value: Value = wrapped.data().unwrap();
        assert_eq!(value, serde_json::json!({ "id": 1 }));
    }
}
