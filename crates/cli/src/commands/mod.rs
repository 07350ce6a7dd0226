//! CLI command implementations.

pub mod cart;
pub mod checkout;
pub mod output;
pub mod products;
pub mod session;
pub mod wishlist;

use thiserror::Error;
use tracing::info;

use bazaar_client::{
    ApiClient, CatalogClient, CatalogError, ClientConfig, ConfigError, HttpError, RestGateway,
    Store, Storefront, SyncError,
};

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] HttpError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Message for the terminal.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Sync(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Everything a command needs.
pub struct Context {
    pub config: ClientConfig,
    pub storefront: Storefront<RestGateway>,
    pub catalog: CatalogClient,
    pub json: bool,
}

impl Context {
    /// Build the client stack from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, json: bool) -> Result<Self, CliError> {
        let api = ApiClient::new(&config)?;
        let store = Store::restore(bazaar_client::cart_storage(&config));
        let storefront = Storefront::from_config(RestGateway::new(api.clone()), store, &config);
        let catalog = CatalogClient::new(api);

        Ok(Self {
            config,
            storefront,
            catalog,
            json,
        })
    }

    /// Resume the session from `BAZAAR_API_TOKEN`, loading cart and wishlist.
    ///
    /// # Errors
    ///
    /// `LoginRequired` without a token, or the session restore failure.
    pub async fn signed_in(&self) -> Result<(), CliError> {
        match self.storefront.restore_session().await? {
            Some(user) => {
                info!(user_id = %user.id, "Session restored");
                Ok(())
            }
            None => Err(SyncError::LoginRequired.into()),
        }
    }
}
