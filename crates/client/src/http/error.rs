//! HTTP adapter errors.

use thiserror::Error;

/// Errors produced by the HTTP client adapter.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection or transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// The server rejected the credential (401/403).
    #[error("unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The resource does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The body was not valid JSON.
    #[error("invalid JSON response: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The request URL could not be built.
    #[error("invalid request path {path}: {message}")]
    InvalidPath { path: String, message: String },
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl HttpError {
    /// Whether the credential was rejected and the session must end.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
