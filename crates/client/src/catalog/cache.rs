//! Cache types for catalog responses.

use bazaar_core::{Product, ProductId};

use super::filter::ProductQuery;

/// Cache key for products and product lists.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products(ProductQuery),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}
