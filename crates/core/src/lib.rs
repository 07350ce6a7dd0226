//! Bazaar Core - Shared types library.
//!
//! This crate provides the domain types used across the Bazaar components:
//! - `client` - Cart/wishlist synchronization against the storefront REST API
//! - `cli` - Command-line driver for the client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! Normalization of server payloads into these types lives in the client crate.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, statuses, cart and wishlist items, products

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
