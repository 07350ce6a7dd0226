//! Wishlist entries.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A wishlisted product.
///
/// Depending on which endpoint populated it, an entry is either a full
/// product snapshot or just the product identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub image: Option<String>,
    pub price: Option<Price>,
    pub stock: Option<u32>,
}

impl WishlistItem {
    /// An entry known only by its identity.
    #[must_use]
    pub const fn bare(product_id: ProductId) -> Self {
        Self {
            product_id,
            name: None,
            image: None,
            price: None,
            stock: None,
        }
    }

    #[must_use]
    pub const fn is_bare(&self) -> bool {
        self.name.is_none() && self.image.is_none() && self.price.is_none()
    }
}
