//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for the storefront domain.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;
pub mod status;
pub mod user;
pub mod wishlist;

pub use cart::{CartItem, SellerRef};
pub use id::*;
pub use price::{CurrencyCode, Price, PriceError};
pub use product::{Product, Review};
pub use status::*;
pub use user::User;
pub use wishlist::WishlistItem;
