//! Error taxonomy for IPTU API calls.
//!
//! Every failed call surfaces exactly one [`Error`]. The variant is chosen
//! from the HTTP status or from the transport failure; the body of an error
//! response only contributes detail (message, field errors, hints) and never
//! changes the variant.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value, json};
use thiserror::Error;

use super::headers;

/// Field name to validation messages, as reported by the service.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub type Result<T> = std::result::Result<T, Error>;

const MAX_SNIPPET_CHARS: usize = 512;

/// Condition class of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    Forbidden,
    NotFound,
    RateLimit,
    Validation,
    Server,
    Timeout,
    Network,
    Generic,
}

impl ErrorKind {
    /// Kind implied by an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimit,
            400 | 422 => Self::Validation,
            500..=599 => Self::Server,
            _ => Self::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::RateLimit => "rate_limit",
            Self::Validation => "validation",
            Self::Server => "server",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Generic => "generic",
        }
    }

    /// Transient kinds are worth retrying by default.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Server | Self::Timeout | Self::Network
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every IPTU API call.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// HTTP 401: the API key is missing or invalid.
    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        request_id: Option<String>,
    },

    /// HTTP 403: the current plan does not cover the resource.
    #[error("Access denied: {message}{}", match required_plan {
        Some(plan) => format!(" (requires plan '{plan}')"),
        None => String::new(),
    })]
    Forbidden {
        message: String,
        required_plan: Option<String>,
        request_id: Option<String>,
    },

    /// HTTP 404.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        resource: Option<String>,
        request_id: Option<String>,
    },

    /// HTTP 429.
    #[error("Rate limit exceeded: {message}{}", match retry_after {
        Some(d) => format!(", retry in {:.0}s", d.as_secs_f64()),
        None => String::new(),
    })]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
        request_id: Option<String>,
    },

    /// HTTP 400 or 422, with per-field messages when the service sends them.
    #[error("Validation failed (HTTP {status}): {message}")]
    Validation {
        message: String,
        status: u16,
        errors: FieldErrors,
        request_id: Option<String>,
    },

    /// HTTP 5xx.
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        message: String,
        status: u16,
        retry_after: Option<Duration>,
        request_id: Option<String>,
    },

    /// The local time budget expired.
    #[error("{message}")]
    Timeout {
        message: String,
        timeout: Duration,
        request_id: Option<String>,
        #[source]
        last_error: Option<Box<Error>>,
    },

    /// Connection-level failure before a response arrived.
    #[error("Network request failed: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Arc<reqwest::Error>>,
    },

    /// Any other non-2xx status, undecodable success body, or unusable client.
    #[error(
        "API error (HTTP {code}): {message}",
        code = status.map_or_else(|| "n/a".to_string(), |s| s.to_string())
    )]
    Generic {
        message: String,
        status: Option<u16>,
        request_id: Option<String>,
    },
}

impl Error {
    /// Builds the error matching a non-2xx response.
    ///
    /// Never fails: undecodable bodies contribute a trimmed snippet as the
    /// message, empty bodies the status reason phrase.
    pub fn from_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Self {
        let parsed: Option<Value> = serde_json::from_slice(body).ok();
        let detail = match parsed.as_ref() {
            Some(Value::Object(map)) => ErrorBody::from_json(map),
            _ => ErrorBody::from_text(body),
        };

        let code = status.as_u16();
        let message = detail.message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });
        let request_id = headers::request_id(headers, parsed.as_ref());
        let retry_after = headers::retry_after(headers, Utc::now()).or(detail.retry_after);

        match ErrorKind::from_status(code) {
            ErrorKind::Authentication => Self::Authentication {
                message,
                request_id,
            },
            ErrorKind::Forbidden => Self::Forbidden {
                message,
                required_plan: detail.required_plan,
                request_id,
            },
            ErrorKind::NotFound => Self::NotFound {
                message,
                resource: detail.resource,
                request_id,
            },
            ErrorKind::RateLimit => Self::RateLimit {
                message,
                retry_after,
                request_id,
            },
            ErrorKind::Validation => Self::Validation {
                message,
                status: code,
                errors: detail.errors,
                request_id,
            },
            ErrorKind::Server => Self::Server {
                message,
                status: code,
                retry_after,
                request_id,
            },
            _ => Self::Generic {
                message,
                status: Some(code),
                request_id,
            },
        }
    }

    /// Classifies a transport failure that happened before a response was read.
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            return Self::timeout(timeout, None);
        }
        let message = if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            err.to_string()
        };
        Self::Network {
            message,
            source: Some(Arc::new(err)),
        }
    }

    pub fn timeout(timeout: Duration, last_error: Option<Error>) -> Self {
        let request_id = last_error
            .as_ref()
            .and_then(|e| e.request_id())
            .map(String::from);
        Self::Timeout {
            message: format!("Request timed out after {:.1}s", timeout.as_secs_f64()),
            timeout,
            request_id,
            last_error: last_error.map(Box::new),
        }
    }

    /// A success response whose body does not match the expected shape.
    pub fn decode(
        err: impl std::fmt::Display,
        status: StatusCode,
        request_id: Option<String>,
    ) -> Self {
        Self::Generic {
            message: format!("Failed to decode response body: {err}"),
            status: Some(status.as_u16()),
            request_id,
        }
    }

    pub(crate) fn closed() -> Self {
        Self::Generic {
            message: "client has been closed".into(),
            status: None,
            request_id: None,
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
            status: None,
            request_id: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Server { .. } => ErrorKind::Server,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Network { .. } => ErrorKind::Network,
            Self::Generic { .. } => ErrorKind::Generic,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::RateLimit { .. } => Some(429),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Generic { status, .. } => *status,
            Self::Timeout { .. } | Self::Network { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Authentication { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::RateLimit { message, .. }
            | Self::Validation { message, .. }
            | Self::Server { message, .. }
            | Self::Timeout { message, .. }
            | Self::Network { message, .. }
            | Self::Generic { message, .. } => message,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Authentication { request_id, .. }
            | Self::Forbidden { request_id, .. }
            | Self::NotFound { request_id, .. }
            | Self::RateLimit { request_id, .. }
            | Self::Validation { request_id, .. }
            | Self::Server { request_id, .. }
            | Self::Timeout { request_id, .. }
            | Self::Generic { request_id, .. } => request_id.as_deref(),
            Self::Network { .. } => None,
        }
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_transient()
    }

    /// Server-provided wait hint.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after, .. } | Self::Server { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Field-level messages of a validation error.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Key-value export for logs and telemetry.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("error".into(), json!(self.kind().as_str()));
        map.insert("message".into(), json!(self.message()));
        map.insert("status_code".into(), json!(self.status_code()));
        map.insert("request_id".into(), json!(self.request_id()));
        map.insert("retryable".into(), json!(self.is_retryable()));

        match self {
            Self::Forbidden { required_plan, .. } => {
                map.insert("required_plan".into(), json!(required_plan));
            }
            Self::NotFound { resource, .. } => {
                map.insert("resource".into(), json!(resource));
            }
            Self::RateLimit { retry_after, .. } => {
                map.insert("retry_after".into(), json!(retry_after.map(whole_seconds)));
            }
            Self::Server {
                retry_after: Some(d),
                ..
            } => {
                map.insert("retry_after".into(), json!(whole_seconds(*d)));
            }
            Self::Validation { errors, .. } => {
                map.insert("validation_errors".into(), json!(errors));
            }
            Self::Timeout { timeout, .. } => {
                map.insert("timeout_seconds".into(), json!(timeout.as_secs_f64()));
            }
            _ => {}
        }

        map
    }
}

fn whole_seconds(d: Duration) -> u64 {
    d.as_secs_f64().ceil() as u64
}

/// Detail extracted from an error response body.
#[derive(Debug, Default)]
struct ErrorBody {
    message: Option<String>,
    errors: FieldErrors,
    required_plan: Option<String>,
    resource: Option<String>,
    retry_after: Option<Duration>,
}

impl ErrorBody {
    fn from_json(map: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        let mut errors = FieldErrors::new();
        if let Some(Value::Object(fields)) = map.get("errors") {
            for (field, messages) in fields {
                let entry = errors.entry(field.clone()).or_default();
                match messages {
                    Value::String(s) => entry.push(s.clone()),
                    Value::Array(items) => entry.extend(
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(String::from),
                    ),
                    _ => {}
                }
            }
        }

        // Framework-style `detail: [{"loc": [...], "msg": "..."}]`.
        let mut detail_messages = Vec::new();
        if let Some(Value::Array(items)) = map.get("detail") {
            for item in items {
                let Some(msg) = item.get("msg").and_then(Value::as_str) else {
                    continue;
                };
                detail_messages.push(msg.to_string());
                let loc = item.get("loc").and_then(Value::as_array);
                if let Some(field) = loc.map(|loc| field_path(loc.as_slice())) {
                    errors.entry(field).or_default().push(msg.to_string());
                }
            }
        }

        let message = text("detail").or_else(|| text("message")).or_else(|| {
            (!detail_messages.is_empty()).then(|| detail_messages.join("; "))
        });

        Self {
            message,
            errors,
            required_plan: text("required_plan"),
            resource: text("resource"),
            retry_after: map
                .get("retry_after")
                .and_then(Value::as_f64)
                .and_then(headers::seconds),
        }
    }

    fn from_text(body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        let text = text.trim();
        Self {
            message: (!text.is_empty()).then(|| text.chars().take(MAX_SNIPPET_CHARS).collect()),
            ..Default::default()
        }
    }
}

/// `["query", "cidade"]` -> `cidade`; `["body", "comprador", "nome"]` -> `comprador.nome`.
fn field_path(loc: &[Value]) -> String {
    let parts: Vec<String> = loc
        .iter()
        .enumerate()
        .filter(|(i, part)| {
            !(*i == 0 && matches!(part.as_str(), Some("body" | "query" | "path" | "header")))
        })
        .map(|(_, part)| match part {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    if parts.is_empty() {
        "__root__".to_string()
    } else {
        parts.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn response(status: u16, body: &str) -> Error {
        Error::from_response(
            StatusCode::from_u16(status).unwrap(),
            &HeaderMap::new(),
            body.as_bytes(),
        )
    }

    #[test]
    fn test_status_classification() {
        let cases = [
            (401, ErrorKind::Authentication),
            (403, ErrorKind::Forbidden),
            (404, ErrorKind::NotFound),
            (429, ErrorKind::RateLimit),
            (400, ErrorKind::Validation),
            (422, ErrorKind::Validation),
            (500, ErrorKind::Server),
            (503, ErrorKind::Server),
            (599, ErrorKind::Server),
            (409, ErrorKind::Generic),
            (418, ErrorKind::Generic),
        ];

        for (status, kind) in cases {
            let err = response(status, r#"{"detail": "boom"}"#);
            assert_eq!(err.kind(), kind, "status {status}");
            assert_eq!(err.status_code(), Some(status), "status {status}");
            assert_eq!(err.message(), "boom");
        }
    }

    #[test]
    fn test_retryable_by_kind() {
        assert!(response(429, "{}").is_retryable());
        assert!(response(502, "{}").is_retryable());
        assert!(!response(401, "{}").is_retryable());
        assert!(!response(403, "{}").is_retryable());
        assert!(!response(404, "{}").is_retryable());
        assert!(!response(422, "{}").is_retryable());
        assert!(!response(409, "{}").is_retryable());
        assert!(Error::timeout(Duration::from_secs(5), None).is_retryable());
    }

    #[test]
    fn test_message_falls_back_to_message_field_then_reason() {
        assert_eq!(response(404, r#"{"message": "sem imovel"}"#).message(), "sem imovel");
        assert_eq!(response(404, "").message(), "Not Found");
        assert_eq!(response(500, "{}").message(), "Internal Server Error");
    }

    #[test]
    fn test_malformed_body_keeps_kind_and_uses_snippet() {
        let err = response(502, "<html>Bad Gateway</html>");
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.message(), "<html>Bad Gateway</html>");

        let long = "x".repeat(2000);
        let err = response(500, &long);
        assert_eq!(err.message().chars().count(), MAX_SNIPPET_CHARS);
    }

    #[test]
    fn test_forbidden_required_plan() {
        let err = response(403, r#"{"detail": "Plano nao autorizado", "required_plan": "pro"}"#);
        match &err {
            Error::Forbidden { required_plan, .. } => {
                assert_eq!(required_plan.as_deref(), Some("pro"));
            }
            other => panic!("Expected Forbidden, got {other:?}"),
        }
        assert!(err.to_string().contains("requires plan 'pro'"));
        assert_eq!(err.to_map()["required_plan"], "pro");
    }

    #[test]
    fn test_not_found_resource() {
        let err = response(404, r#"{"detail": "nao encontrado", "resource": "imovel"}"#);
        assert!(matches!(
            err,
            Error::NotFound { resource: Some(ref r), .. } if r == "imovel"
        ));
    }

    #[test]
    fn test_validation_field_errors() {
        let err = response(
            422,
            r#"{
                "detail": "Parametros invalidos",
                "errors": {"cidade": ["invalida"], "sql": "obrigatorio"}
            }"#,
        );
        let errors = err.field_errors().unwrap();
        assert_eq!(errors["cidade"], vec!["invalida"]);
        assert_eq!(errors["sql"], vec!["obrigatorio"]);
        assert_eq!(err.status_code(), Some(422));
    }

    #[test]
    fn test_validation_detail_list() {
        let err = response(
            422,
            r#"{"detail": [
                {"loc": ["query", "cidade"], "msg": "field required", "type": "missing"},
                {"loc": ["body", "comprador", "nome"], "msg": "too short"}
            ]}"#,
        );
        let errors = err.field_errors().unwrap();
        assert_eq!(errors["cidade"], vec!["field required"]);
        assert_eq!(errors["comprador.nome"], vec!["too short"]);
        assert_eq!(err.message(), "field required; too short");
    }

    #[test]
    fn test_rate_limit_retry_after_header_and_body() {
        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", HeaderValue::from_static("60"));
        let err = Error::from_response(StatusCode::TOO_MANY_REQUESTS, &headers, b"{}");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));

        let err = response(429, r#"{"detail": "slow down", "retry_after": 3}"#);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));

        let err = response(429, "{}");
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_out_of_range_retry_after_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", HeaderValue::from_static("1e20"));
        let err = Error::from_response(StatusCode::TOO_MANY_REQUESTS, &headers, b"{}");
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.retry_after(), None);

        let err = response(503, r#"{"detail": "busy", "retry_after": 1e300}"#);
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.message(), "busy");
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_request_id_from_header_or_body() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Request-ID", HeaderValue::from_static("req_123"));
        let err = Error::from_response(StatusCode::UNAUTHORIZED, &headers, b"{}");
        assert_eq!(err.request_id(), Some("req_123"));

        let err = response(401, r#"{"request_id": "req_456"}"#);
        assert_eq!(err.request_id(), Some("req_456"));
    }

    #[test]
    fn test_to_map_rate_limit() {
        let err = Error::RateLimit {
            message: "Rate limit excedido".into(),
            retry_after: Some(Duration::from_secs(60)),
            request_id: Some("req_123".into()),
        };

        let map = err.to_map();
        assert_eq!(map["error"], "rate_limit");
        assert_eq!(map["retry_after"], 60);
        assert_eq!(map["retryable"], true);
        assert_eq!(map["status_code"], 429);
        assert_eq!(map["request_id"], "req_123");
    }

    #[test]
    fn test_to_map_network_has_null_status() {
        let err = Error::Network {
            message: "connection refused".into(),
            source: None,
        };
        let map = err.to_map();
        assert!(map["status_code"].is_null());
        assert!(map["request_id"].is_null());
        assert_eq!(map["retryable"], true);
    }

    #[test]
    fn test_timeout_keeps_last_error_as_source() {
        let last = response(503, r#"{"detail": "indisponivel"}"#);
        let err = Error::timeout(Duration::from_secs(5), Some(last));

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.status_code(), None);
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("indisponivel"));
        assert_eq!(err.to_map()["timeout_seconds"], 5.0);
    }
}
