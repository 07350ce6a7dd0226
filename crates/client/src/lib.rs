//! Bazaar storefront client.
//!
//! Keeps a local cart and wishlist consistent with the storefront REST API:
//!
//! - [`http`]: `reqwest` adapter with base URL, timeout and credentials
//! - [`gateway`]: raw request/response mapping for cart, wishlist, payments
//!   and auth resources
//! - [`store`]: the state container, its reducer, payload normalization and
//!   durable cart storage
//! - [`sync`]: the orchestrator applying server responses to the store
//! - [`catalog`]: cached product catalog reads
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ClientConfig::from_env()?;
//! let api = ApiClient::new(&config)?;
//! let store = Store::restore(Arc::new(MemoryCartStorage::new()));
//! let storefront = Storefront::from_config(RestGateway::new(api), store, &config);
//!
//! storefront.restore_session().await?;
//! storefront.add_item(&ProductId::new("p1"), 1).await?;
//! println!("{} items", storefront.store().cart_count());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod store;
pub mod sync;

pub use catalog::{CatalogClient, CatalogError, FilterOptions, ProductFilter, ProductQuery};
pub use checkout::{CheckoutHandoff, CheckoutRequest, PaymentSession};
pub use config::{ClientConfig, ConfigError};
pub use error::SyncError;
pub use gateway::{Gateway, LoginCredentials, Registration, RestGateway};
pub use http::{ApiClient, HttpError};
pub use store::{
    Action, CartStorage, FileCartStorage, MemoryCartStorage, PendingKey, Store, StoreState,
};
pub use sync::{CheckoutUrls, Storefront, SyncOptions};

use std::sync::Arc;

/// Cart storage for a configuration: a file when a path is set, memory
/// otherwise.
#[must_use]
pub fn cart_storage(config: &ClientConfig) -> Arc<dyn CartStorage> {
    match &config.cart_storage_path {
        Some(path) => Arc::new(FileCartStorage::new(path)),
        None => Arc::new(MemoryCartStorage::new()),
    }
}
