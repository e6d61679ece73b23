//! Error types for hub calls and error responses for the dashboard

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Failure of a call to the JupyterHub REST API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// No token, or the hub rejected it
    #[error("authentication failed: {0}")]
    Auth(String),
    /// User or server does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// A server with that name already exists, or is running or pending
    #[error("conflict: {0}")]
    Conflict(String),
    /// The hub rejected the server options
    #[error("invalid request: {0}")]
    Validation(String),
    /// Network failure or an unexpected HTTP status
    #[error("transport error: {0}")]
    Transport(String),
}

impl HubError {
    /// Classify a non-success hub response by status code and message.
    ///
    /// JupyterHub answers a duplicate named server with 400 rather than 409,
    /// so the message is inspected to tell that apart from bad options.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HubError::Auth(message),
            StatusCode::NOT_FOUND => HubError::NotFound(message),
            StatusCode::CONFLICT => HubError::Conflict(message),
            StatusCode::BAD_REQUEST if is_duplicate_message(&message) => {
                HubError::Conflict(message)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                HubError::Validation(message)
            }
            other => HubError::Transport(format!("unexpected status {}: {}", other, message)),
        }
    }

    /// Short label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            HubError::Auth(_) => "auth",
            HubError::NotFound(_) => "not_found",
            HubError::Conflict(_) => "conflict",
            HubError::Validation(_) => "validation",
            HubError::Transport(_) => "transport",
        }
    }
}

fn is_duplicate_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already exists")
        || lower.contains("already running")
        || lower.contains("is pending")
}

impl From<reqwest::Error> for HubError {
    fn from(e: reqwest::Error) -> Self {
        HubError::Transport(e.to_string())
    }
}

/// Error codes for dashboard request failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardErrorCode {
    /// Origin header not in the allowed list
    OriginNotAllowed,
    /// No such route
    NotFound,
}

impl DashboardErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DashboardErrorCode::OriginNotAllowed => StatusCode::FORBIDDEN,
            DashboardErrorCode::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Value for the X-Launcher-Error header
    pub fn as_header_value(&self) -> &'static str {
        match self {
            DashboardErrorCode::OriginNotAllowed => "ORIGIN_NOT_ALLOWED",
            DashboardErrorCode::NotFound => "NOT_FOUND",
        }
    }
}

/// JSON error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: DashboardErrorCode,
    pub message: String,
    pub status: u16,
}

impl ErrorResponse {
    pub fn new(code: DashboardErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: code.status_code().as_u16(),
            code,
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("error response serializes")
    }
}

/// JSON error response with the X-Launcher-Error header
pub fn json_error_response(
    code: DashboardErrorCode,
    message: impl Into<String>,
) -> Response<Full<Bytes>> {
    let body = ErrorResponse::new(code, message).to_json();

    Response::builder()
        .status(code.status_code())
        .header("Content-Type", "application/json")
        .header("X-Launcher-Error", code.as_header_value())
        .body(Full::new(Bytes::from(body)))
        .expect("valid response with StatusCode enum and static headers")
}
