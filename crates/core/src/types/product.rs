//! Catalog products.

use serde::{Deserialize, Serialize};

use super::cart::SellerRef;
use super::id::ProductId;
use super::price::Price;

/// A product as listed in the public catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub image: Option<String>,
    pub stock: u32,
    pub product_type: Option<String>,
    pub color: Option<String>,
    pub rating: Option<f64>,
    pub sales_count: u32,
    pub seller: Option<SellerRef>,
}

impl Product {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A shopper's review of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub reviewer: String,
    pub rating: Option<f64>,
    pub comment: String,
    pub created_at: Option<String>,
}
