//! One-shot delivery of a record to the collector.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use device_log::LogRecord;
use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use http::{Method, Request, StatusCode};
use serde::Serialize;
use serde_json::Value;
use telemetry::{Error, HttpRequest};
use tracing::{debug, warn};

const HEALTH_PATH: &str = "/api/auth/health";
const SUCCESS_CODE: &str = "000";
const BODY_PREVIEW: usize = 200;
const AGENT: &str = "ThiswayVehicleEmulator/1.0";

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    /// The collector answered but did not accept the record.
    BackendRejected { code: String, message: String },
    ConnectionError(String),
    Timeout,
    UnexpectedError(String),
}

impl DeliveryOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::BackendRejected { code, message } => write!(f, "rejected [{code}] {message}"),
            Self::ConnectionError(reason) => write!(f, "connection error: {reason}"),
            Self::Timeout => write!(f, "timeout"),
            Self::UnexpectedError(reason) => write!(f, "unexpected error: {reason}"),
        }
    }
}

/// Collector reachability as last observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum BackendStatus {
    Unknown,
    Connected,
    AuthRequired,
    Abnormal(u16),
    Unreachable(String),
}

#[derive(Clone)]
pub struct Sender {
    http: Arc<dyn HttpRequest>,
    backend_url: String,
    timeout: Duration,
    health_timeout: Duration,
}

impl Sender {
    #[must_use]
    pub fn new(http: Arc<dyn HttpRequest>, backend_url: impl Into<String>) -> Self {
        Self {
            http,
            backend_url: backend_url.into(),
            timeout: Duration::from_secs(10),
            health_timeout: Duration::from_secs(3),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.backend_url.trim_end_matches('/'))
    }

    /// Post `record` to the endpoint for its kind. Never fails; every
    /// failure mode is folded into the returned outcome.
    pub async fn send(&self, record: &LogRecord) -> DeliveryOutcome {
        let body = match record.to_json() {
            Ok(body) => body,
            Err(e) => return DeliveryOutcome::UnexpectedError(e.to_string()),
        };
        let request = match Request::builder()
            .method(Method::POST)
            .uri(self.url(record.kind().path()))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, AGENT)
            .body(body)
        {
            Ok(request) => request,
            Err(e) => return DeliveryOutcome::UnexpectedError(e.to_string()),
        };

        let outcome = match tokio::time::timeout(self.timeout, self.http.fetch(request)).await {
            Err(_) => DeliveryOutcome::Timeout,
            Ok(Err(e)) => classify(&e),
            Ok(Ok(response)) => interpret(response.status(), response.body()),
        };
        debug!(mdn = %record.mdn(), kind = %record.kind(), %outcome, "delivery attempt");
        outcome
    }

    /// Probe the collector's health endpoint.
    pub async fn check_health(&self) -> BackendStatus {
        let request = match Request::builder()
            .method(Method::GET)
            .uri(self.url(HEALTH_PATH))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, AGENT)
            .body(Vec::new())
        {
            Ok(request) => request,
            Err(e) => return BackendStatus::Unreachable(e.to_string()),
        };

        match tokio::time::timeout(self.health_timeout, self.http.fetch(request)).await {
            Err(_) => BackendStatus::Unreachable("health check timed out".to_string()),
            Ok(Err(e)) => {
                warn!(error = %e, "collector health check failed");
                BackendStatus::Unreachable(e.to_string())
            }
            Ok(Ok(response)) => match response.status() {
                StatusCode::OK => BackendStatus::Connected,
                StatusCode::UNAUTHORIZED => BackendStatus::AuthRequired,
                other => BackendStatus::Abnormal(other.as_u16()),
            },
        }
    }
}

fn classify(err: &anyhow::Error) -> DeliveryOutcome {
    match err.downcast_ref::<Error>() {
        Some(Error::Connection(reason)) => DeliveryOutcome::ConnectionError(reason.clone()),
        Some(Error::Timeout(_)) => DeliveryOutcome::Timeout,
        _ => DeliveryOutcome::UnexpectedError(err.to_string()),
    }
}

fn interpret(status: StatusCode, body: &Bytes) -> DeliveryOutcome {
    if status != StatusCode::OK && status != StatusCode::CREATED {
        let text = String::from_utf8_lossy(body);
        return DeliveryOutcome::BackendRejected {
            code: status.as_u16().to_string(),
            message: text.chars().take(BODY_PREVIEW).collect(),
        };
    }

    let json: Value = match serde_json::from_slice(body) {
        Ok(json) => json,
        Err(e) => return DeliveryOutcome::UnexpectedError(format!("invalid JSON response: {e}")),
    };

    let code = field(&json, "code");
    let result_code = field(&json, "rstCd");
    if code.as_deref() == Some(SUCCESS_CODE) || result_code.as_deref() == Some(SUCCESS_CODE) {
        return DeliveryOutcome::Success;
    }

    DeliveryOutcome::BackendRejected {
        code: code.or(result_code).unwrap_or_else(|| "N/A".to_string()),
        message: field(&json, "message")
            .or_else(|| field(&json, "rstMsg"))
            .unwrap_or_else(|| "unknown error".to_string()),
    }
}

fn field(json: &Value, name: &str) -> Option<String> {
    match json.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::StatusCode;
    use pretty_assertions::assert_eq;

    use super::{DeliveryOutcome, interpret};

    #[test]
    fn accepts_either_success_field() {
        let body = Bytes::from_static(br#"{"code":"000","message":"ok"}"#);
        assert_eq!(interpret(StatusCode::OK, &body), DeliveryOutcome::Success);

        let body = Bytes::from_static(br#"{"rstCd":"000","rstMsg":"Success"}"#);
        assert_eq!(interpret(StatusCode::CREATED, &body), DeliveryOutcome::Success);
    }

    #[test]
    fn business_rejection() {
        let body = Bytes::from_static(br#"{"rstCd":"103","rstMsg":"unknown device"}"#);
        assert_eq!(
            interpret(StatusCode::OK, &body),
            DeliveryOutcome::BackendRejected {
                code: "103".to_string(),
                message: "unknown device".to_string()
            }
        );
    }

    #[test]
    fn rejection_without_details() {
        let body = Bytes::from_static(br#"{"status":"nope"}"#);
        assert_eq!(
            interpret(StatusCode::OK, &body),
            DeliveryOutcome::BackendRejected {
                code: "N/A".to_string(),
                message: "unknown error".to_string()
            }
        );
    }

    #[test]
    fn http_status_rejection() {
        let body = Bytes::from("x".repeat(500));
        let DeliveryOutcome::BackendRejected { code, message } =
            interpret(StatusCode::SERVICE_UNAVAILABLE, &body)
        else {
            panic!("expected a rejection");
        };
        assert_eq!(code, "503");
        assert_eq!(message.len(), 200);
    }

    #[test]
    fn non_json_success_is_unexpected() {
        let body = Bytes::from_static(b"<html>ok</html>");
        assert!(matches!(interpret(StatusCode::OK, &body), DeliveryOutcome::UnexpectedError(_)));
    }
}
