//! HTTP client adapter.
//!
//! Wraps a single `reqwest` client with the API base URL, a fixed timeout and
//! credential attachment. Requests come in two classes:
//!
//! - **public** requests never carry the bearer credential (catalog, login);
//! - **authenticated** requests attach it when one is held (cart, wishlist,
//!   payments).
//!
//! Responses are returned as raw `serde_json::Value` payloads. Interpreting
//! their shape is the job of the store's normalization boundary.

mod error;

pub use error::HttpError;

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, error, instrument};
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// How long a freshly issued login token is trusted before the client
/// considers the session expired.
pub const TOKEN_LIFETIME_HOURS: i64 = 6;

/// Longest body excerpt kept in error messages and logs.
const BODY_EXCERPT_CHARS: usize = 200;

/// A bearer credential with a client-side expiry.
#[derive(Clone)]
pub struct AuthToken {
    secret: SecretString,
    expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AuthToken {
    /// A token issued now, valid for [`TOKEN_LIFETIME_HOURS`].
    #[must_use]
    pub fn issued_now(secret: SecretString) -> Self {
        Self {
            secret,
            expires_at: Utc::now() + ChronoDuration::hours(TOKEN_LIFETIME_HOURS),
        }
    }

    #[must_use]
    pub const fn with_expiry(secret: SecretString, expires_at: DateTime<Utc>) -> Self {
        Self { secret, expires_at }
    }

    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// REST client for the storefront API.
///
/// Cheaply cloneable; clones share the connection pool and the credential.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<AuthToken>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("has_token", &self.has_valid_token())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            // Some deployments also keep the session in an httpOnly cookie
            .cookie_store(true)
            .build()?;

        let token = config.api_token.clone().map(AuthToken::issued_now);

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_base_url.clone(),
                token: RwLock::new(token),
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Hold a credential for subsequent authenticated requests.
    pub fn set_token(&self, token: AuthToken) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Drop the held credential.
    pub fn clear_token(&self) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether an unexpired credential is held.
    #[must_use]
    pub fn has_valid_token(&self) -> bool {
        self.bearer().is_some()
    }

    /// The held credential, if still valid.
    #[must_use]
    pub fn current_token(&self) -> Option<SecretString> {
        self.bearer().map(SecretString::from)
    }

    fn bearer(&self) -> Option<String> {
        let guard = self
            .inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|t| !t.is_expired())
            .map(|t| t.secret.expose_secret().to_string())
    }

    // =========================================================================
    // Request Methods
    // =========================================================================

    /// `GET` without credentials.
    ///
    /// # Errors
    ///
    /// See [`HttpError`].
    pub async fn public_get(&self, path: &str) -> Result<Value, HttpError> {
        self.send(Method::GET, path, None, false).await
    }

    /// `POST` without credentials.
    ///
    /// # Errors
    ///
    /// See [`HttpError`].
    pub async fn public_post(&self, path: &str, body: &Value) -> Result<Value, HttpError> {
        self.send(Method::POST, path, Some(body), false).await
    }

    /// Authenticated `GET`.
    ///
    /// # Errors
    ///
    /// See [`HttpError`].
    pub async fn get(&self, path: &str) -> Result<Value, HttpError> {
        self.send(Method::GET, path, None, true).await
    }

    /// Authenticated `POST`. `None` sends no body.
    ///
    /// # Errors
    ///
    /// See [`HttpError`].
    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value, HttpError> {
        self.send(Method::POST, path, body, true).await
    }

    #[instrument(skip(self, body), fields(method = %method, path = %path, request_id))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        authenticated: bool,
    ) -> Result<Value, HttpError> {
        let url = self
            .inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::InvalidPath {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let mut request = self
            .inner
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, &request_id);

        if authenticated && let Some(token) = self.bearer() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &response_text));
        }

        if response_text.trim().is_empty() {
            debug!(status = %status, "Empty response body");
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_text).map_err(|e| {
            error!(
                error = %e,
                body = %excerpt(&response_text),
                "Failed to parse API response"
            );
            HttpError::InvalidJson(e)
        })
    }
}

/// Map a non-success status to an adapter error.
fn status_error(status: StatusCode, body: &str) -> HttpError {
    let message = server_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            debug!(status = %status, "Credential rejected");
            HttpError::Unauthorized {
                status: status.as_u16(),
            }
        }
        StatusCode::NOT_FOUND => HttpError::NotFound(message),
        _ => {
            error!(
                status = %status,
                body = %excerpt(body),
                "API returned non-success status"
            );
            HttpError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Prefer the backend's `{ "message": ... }` field over the raw body.
fn server_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| excerpt(body))
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_unauthorized() {
        let err = status_error(StatusCode::FORBIDDEN, "");
        assert!(err.is_unauthorized());
        let err = status_error(StatusCode::UNAUTHORIZED, r#"{"message":"jwt expired"}"#);
        assert!(matches!(err, HttpError::Unauthorized { status: 401 }));
    }

    #[test]
    fn test_status_error_uses_server_message() {
        let err = status_error(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Only 2 left in stock"}"#,
        );
        match err {
            HttpError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Only 2 left in stock");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_error_not_found() {
        let err = status_error(StatusCode::NOT_FOUND, "Item not in cart");
        assert!(matches!(err, HttpError::NotFound(m) if m == "Item not in cart"));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(500);
        assert_eq!(excerpt(&long).len(), BODY_EXCERPT_CHARS);
    }

    #[test]
    fn test_expired_token_is_not_used() {
        let config = ClientConfig::new(
            Url::parse("http://localhost:5000/api/v1").unwrap(),
            Url::parse("http://localhost:5173").unwrap(),
        );
        let client = ApiClient::new(&config).unwrap();
        assert!(!client.has_valid_token());

        client.set_token(AuthToken::with_expiry(
            SecretString::from("stale"),
            Utc::now() - ChronoDuration::minutes(1),
        ));
        assert!(!client.has_valid_token());

        client.set_token(AuthToken::issued_now(SecretString::from("fresh")));
        assert!(client.has_valid_token());

        client.clear_token();
        assert!(!client.has_valid_token());
    }
}
