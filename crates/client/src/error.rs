//! Orchestrator error taxonomy with Sentry integration.
//!
//! Every gateway failure is caught at the [`Storefront`](crate::Storefront)
//! boundary and converted into a [`SyncError`]. Nothing here is fatal: the
//! store keeps its last known good state and the caller shows
//! [`SyncError::user_message`].

use thiserror::Error;

use bazaar_core::ProductId;

use crate::http::HttpError;
use crate::store::MalformedPayload;

/// Result of a synchronization operation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The operation needs a signed-in user.
    #[error("login required")]
    LoginRequired,

    /// Rejected locally before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested quantity is above the last known stock ceiling.
    #[error("out of stock: {product_id} (requested {requested}, available {ceiling})")]
    OutOfStock {
        product_id: ProductId,
        requested: u64,
        ceiling: u32,
    },

    /// The server rejected the credential; the session has been ended.
    #[error("unauthorized")]
    Unauthorized,

    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The server refused the request.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The response could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The payment gateway answered with neither a URL nor a session.
    #[error("invalid checkout response")]
    InvalidCheckoutResponse,
}

impl From<HttpError> for SyncError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout => Self::Timeout,
            HttpError::Network(message) => Self::Network(message),
            HttpError::Unauthorized { .. } => Self::Unauthorized,
            HttpError::NotFound(message) => Self::NotFound(message),
            HttpError::Api { status, message } => Self::Api { status, message },
            HttpError::InvalidJson(e) => Self::Malformed(e.to_string()),
            HttpError::InvalidPath { path, message } => {
                Self::Validation(format!("invalid path {path}: {message}"))
            }
        }
    }
}

impl From<MalformedPayload> for SyncError {
    fn from(err: MalformedPayload) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl SyncError {
    /// Whether repeating the same intent may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the failure originates from the user's own input or session
    /// rather than from the system.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::LoginRequired
                | Self::Unauthorized
                | Self::Validation(_)
                | Self::OutOfStock { .. }
        )
    }

    /// Message safe to show to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::LoginRequired => "Please log in to continue".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::OutOfStock { ceiling, .. } => {
                format!("Only {ceiling} left in stock")
            }
            Self::Unauthorized => "Your session has expired, please log in again".to_string(),
            Self::Network(_) => "Could not reach the store, please try again".to_string(),
            Self::Timeout => "The store took too long to respond, please try again".to_string(),
            // 4xx messages come from the backend and are meant for users
            Self::Api { status, message } if (400..500).contains(status) && !message.is_empty() => {
                message.clone()
            }
            Self::Api { .. } | Self::Malformed(_) => {
                "Something went wrong, please try again".to_string()
            }
            Self::NotFound(_) => "Not found".to_string(),
            Self::InvalidCheckoutResponse => "Checkout is unavailable right now".to_string(),
        }
    }

    /// Capture system failures to Sentry and log them.
    pub(crate) fn report(&self, operation: &str) {
        if self.is_user_error() {
            tracing::debug!(operation, error = %self, "Operation rejected");
            return;
        }
        let event_id = sentry::capture_error(self);
        tracing::error!(
            operation,
            error = %self,
            sentry_event_id = %event_id,
            "Sync operation failed"
        );
    }
}

/// Set the Sentry user context.
///
/// Call this after a successful login to associate errors with the user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Record a user action so it shows up in the trail of later error reports.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_mapping() {
        assert!(matches!(
            SyncError::from(HttpError::Timeout),
            SyncError::Timeout
        ));
        assert!(matches!(
            SyncError::from(HttpError::Unauthorized { status: 403 }),
            SyncError::Unauthorized
        ));
        assert!(matches!(
            SyncError::from(HttpError::NotFound("cart line".to_string())),
            SyncError::NotFound(_)
        ));
        assert!(matches!(
            SyncError::from(HttpError::Api {
                status: 409,
                message: "conflict".to_string()
            }),
            SyncError::Api { status: 409, .. }
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::Network("reset".to_string()).is_retryable());
        assert!(
            SyncError::Api {
                status: 502,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !SyncError::Api {
                status: 400,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!SyncError::LoginRequired.is_retryable());
        assert!(!SyncError::InvalidCheckoutResponse.is_retryable());
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = SyncError::Network("tcp connect error: 10.0.0.3:5000".to_string());
        assert!(!err.user_message().contains("10.0.0.3"));

        let err = SyncError::Api {
            status: 500,
            message: "MongoServerError: E11000".to_string(),
        };
        assert!(!err.user_message().contains("Mongo"));

        let err = SyncError::Api {
            status: 400,
            message: "Only 2 left in stock".to_string(),
        };
        assert_eq!(err.user_message(), "Only 2 left in stock");
    }

    #[test]
    fn test_out_of_stock_message() {
        let err = SyncError::OutOfStock {
            product_id: ProductId::new("p1"),
            requested: 3,
            ceiling: 2,
        };
        assert_eq!(err.user_message(), "Only 2 left in stock");
        assert!(err.is_user_error());
        assert_eq!(
            err.to_string(),
            "out of stock: p1 (requested 3, available 2)"
        );
    }
}
