//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_API_BASE_URL` - Base URL of the storefront REST API
//!   (e.g. `http://localhost:5000/api/v1`)
//!
//! ## Optional
//! - `BAZAAR_PUBLIC_ORIGIN` - Origin used to build checkout callback URLs
//!   (default: `http://localhost:5173`)
//! - `BAZAAR_API_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)
//! - `BAZAAR_CART_STORAGE_PATH` - File that persists the cart between runs
//!   (default: in-memory only)
//! - `BAZAAR_API_TOKEN` - Bearer token for authenticated endpoints
//! - `BAZAAR_SERIALIZE_PER_PRODUCT` - Issue mutations of one product one at a time (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_PUBLIC_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_TIMEOUT_SECS: &str = "10";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL every API path is resolved against
    pub api_base_url: Url,
    /// Public origin of the storefront (checkout success/cancel pages)
    pub public_origin: Url,
    /// Timeout applied to every HTTP call
    pub timeout: Duration,
    /// Durable cart storage location; `None` keeps the cart in memory
    pub cart_storage_path: Option<PathBuf>,
    /// Pre-issued bearer token
    pub api_token: Option<SecretString>,
    /// Serialize mutations per product instead of last-response-wins
    pub serialize_per_product: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("public_origin", &self.public_origin.as_str())
            .field("timeout", &self.timeout)
            .field("cart_storage_path", &self.cart_storage_path)
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("serialize_per_product", &self.serialize_per_product)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

impl ClientConfig {
    /// Build a configuration with defaults for everything but the two URLs.
    #[must_use]
    pub fn new(api_base_url: Url, public_origin: Url) -> Self {
        Self {
            api_base_url: with_trailing_slash(api_base_url),
            public_origin,
            timeout: Duration::from_secs(10),
            cart_storage_path: None,
            api_token: None,
            serialize_per_product: false,
            sentry_dsn: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_url(
            "BAZAAR_API_BASE_URL",
            &get_required_env("BAZAAR_API_BASE_URL")?,
        )?;
        let public_origin = parse_url(
            "BAZAAR_PUBLIC_ORIGIN",
            &get_env_or_default("BAZAAR_PUBLIC_ORIGIN", DEFAULT_PUBLIC_ORIGIN),
        )?;
        let timeout_secs = get_env_or_default("BAZAAR_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("BAZAAR_API_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BAZAAR_API_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let serialize_per_product = parse_bool(
            "BAZAAR_SERIALIZE_PER_PRODUCT",
            &get_env_or_default("BAZAAR_SERIALIZE_PER_PRODUCT", "false"),
        )?;

        Ok(Self {
            api_base_url: with_trailing_slash(api_base_url),
            public_origin,
            timeout: Duration::from_secs(timeout_secs),
            cart_storage_path: get_optional_env("BAZAAR_CART_STORAGE_PATH").map(PathBuf::from),
            api_token: get_optional_env("BAZAAR_API_TOKEN").map(SecretString::from),
            serialize_per_product,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Checkout success callback; the provider substitutes the session id.
    #[must_use]
    pub fn checkout_success_url(&self) -> String {
        format!(
            "{}/checkout-success?session_id={{CHECKOUT_SESSION_ID}}",
            self.origin()
        )
    }

    /// Checkout cancel callback (back to the cart page).
    #[must_use]
    pub fn checkout_cancel_url(&self) -> String {
        format!("{}/cart", self.origin())
    }

    fn origin(&self) -> String {
        self.public_origin.as_str().trim_end_matches('/').to_string()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Relative joins drop the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::new(
            Url::parse("http://localhost:5000/api/v1").unwrap(),
            Url::parse(DEFAULT_PUBLIC_ORIGIN).unwrap(),
        )
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = config();
        assert_eq!(config.api_base_url.as_str(), "http://localhost:5000/api/v1/");
        assert_eq!(
            config.api_base_url.join("cart/add").unwrap().as_str(),
            "http://localhost:5000/api/v1/cart/add"
        );
    }

    #[test]
    fn test_checkout_urls() {
        let mut config = config();
        config.public_origin = Url::parse("https://shop.example.com/").unwrap();
        assert_eq!(
            config.checkout_success_url(),
            "https://shop.example.com/checkout-success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(config.checkout_cancel_url(), "https://shop.example.com/cart");
    }

    #[test]
    fn test_default_timeout_is_ten_seconds() {
        assert_eq!(config().timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        assert!(matches!(
            parse_bool("X", "maybe"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let mut config = config();
        config.api_token = Some(SecretString::from("super_secret_bearer_token"));

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("localhost:5000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_bearer_token"));
    }
}
