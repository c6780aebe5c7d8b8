use std::fmt;

use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// What the backend said about a failed request.
///
/// `detail` is the human-readable message the backend puts in a JSON
/// `{"detail": "..."}` body; `body` keeps the (truncated) raw text for logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    pub detail: Option<String>,
    pub body: String,
}

impl ErrorDetail {
    pub fn from_body(body: &str) -> Self {
        Self {
            detail: extract_detail(body),
            body: truncate_body(body),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.detail, self.body.is_empty()) {
            (Some(detail), _) => write!(f, "{}", detail),
            (None, false) => write!(f, "{}", self.body),
            (None, true) => write!(f, "no details"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - token may be missing or expired ({0})")]
    Unauthorized(ErrorDetail),

    #[error("Access denied: {0}")]
    AccessDenied(ErrorDetail),

    #[error("Resource not found: {0}")]
    NotFound(ErrorDetail),

    #[error("Request rejected: {0}")]
    Rejected(ErrorDetail),

    #[error("Server error: {0}")]
    ServerError(ErrorDetail),

    #[error("Unexpected status {status}: {detail}")]
    UnexpectedStatus { status: u16, detail: ErrorDetail },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = ErrorDetail::from_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(detail),
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            400 | 409 | 422 => ApiError::Rejected(detail),
            500..=599 => ApiError::ServerError(detail),
            other => ApiError::UnexpectedStatus { status: other, detail },
        }
    }

    /// True when the credentials presented were missing, invalid or expired.
    /// Callers should send the user back to login rather than retry.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// The backend's `detail` message, when it sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(d)
            | ApiError::AccessDenied(d)
            | ApiError::NotFound(d)
            | ApiError::Rejected(d)
            | ApiError::ServerError(d)
            | ApiError::UnexpectedStatus { detail: d, .. } => d.detail.as_deref(),
            ApiError::NetworkError(_) | ApiError::InvalidResponse(_) => None,
        }
    }

    /// Message to show the user: the backend's detail, or `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Pull a string `detail` field out of a JSON error body.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(|d| d.as_str())
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}
