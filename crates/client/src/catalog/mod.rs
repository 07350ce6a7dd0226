//! Public product catalog reader.
//!
//! Products and product lists are cached for 5 minutes with `moka`. Filtered
//! searches, reviews and everything seller-scoped are never cached.

mod cache;
mod filter;

pub use filter::{FilterOptions, ProductFilter, ProductQuery};

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use bazaar_core::{Product, ProductId, Review};

use crate::http::{ApiClient, HttpError};
use crate::store::{decimal_value, price_value, seller_value};

use cache::{CacheKey, CacheValue};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("product not found: {0}")]
    NotFound(ProductId),

    #[error("unrecognized catalog payload: {0}")]
    Malformed(String),
}

// =============================================================================
// CatalogClient
// =============================================================================

/// Reader for `/products` and seller reports.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    api: ApiClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("api", &self.inner.api)
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish()
    }
}

impl CatalogClient {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogClientInner { api, cache }),
        }
    }

    /// List products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload is not a list.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogError> {
        let cache_key = CacheKey::Products(query.clone());
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let path = with_query("products", &query.to_query_string());
        let payload = self.inner.api.public_get(&path).await?;
        let products = products_from_payload(&payload)?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or an error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let cache_key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("products/{}", urlencoding::encode(id.as_str()));
        let payload = match self.inner.api.public_get(&path).await {
            Ok(payload) => payload,
            Err(HttpError::NotFound(_)) => return Err(CatalogError::NotFound(id.clone())),
            Err(e) => return Err(e.into()),
        };

        // Either a bare product or `{ product: {...} }`
        let body = payload
            .get("product")
            .filter(|p| p.is_object())
            .unwrap_or(&payload);
        let product = product_from_value(body).ok_or_else(|| CatalogError::NotFound(id.clone()))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Server-side filtered search (type, color, price range).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload is not a list.
    #[instrument(skip(self))]
    pub async fn filter_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, CatalogError> {
        let path = with_query("products/filter", &filter.to_query_string());
        let payload = self.inner.api.get(&path).await?;
        products_from_payload(&payload)
    }

    /// Products listed by the signed-in seller.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload is not a list.
    #[instrument(skip(self))]
    pub async fn seller_products(&self) -> Result<Vec<Product>, CatalogError> {
        let payload = self.inner.api.get("products/seller/getproduct").await?;
        products_from_payload(&payload)
    }

    /// Reviews of a product, in server order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or an error if the request fails
    /// or the payload is not a list.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product_reviews(&self, id: &ProductId) -> Result<Vec<Review>, CatalogError> {
        let path = format!("products/{}/reviews", urlencoding::encode(id.as_str()));
        let payload = match self.inner.api.get(&path).await {
            Ok(payload) => payload,
            Err(HttpError::NotFound(_)) => return Err(CatalogError::NotFound(id.clone())),
            Err(e) => return Err(e.into()),
        };
        reviews_from_payload(&payload)
    }

    /// Sales report for the signed-in seller, uninterpreted.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn seller_reports(&self) -> Result<Value, CatalogError> {
        Ok(self.inner.api.get("orders/seller-reports").await?)
    }

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.inner
            .cache
            .invalidate(&CacheKey::Product(id.clone()))
            .await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

fn with_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

/// A bare list or `{ products: [...] }`. Unusable entries are dropped.
fn products_from_payload(payload: &Value) -> Result<Vec<Product>, CatalogError> {
    let entries = payload
        .as_array()
        .or_else(|| payload.get("products").and_then(Value::as_array))
        .ok_or_else(|| {
            CatalogError::Malformed(payload.to_string().chars().take(120).collect())
        })?;

    Ok(entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let product = product_from_value(entry);
            if product.is_none() {
                warn!(index, "Dropping unrecognized product entry");
            }
            product
        })
        .collect())
}

/// A bare list or `{ reviews: [...] }`.
fn reviews_from_payload(payload: &Value) -> Result<Vec<Review>, CatalogError> {
    let entries = payload
        .as_array()
        .or_else(|| payload.get("reviews").and_then(Value::as_array))
        .ok_or_else(|| {
            CatalogError::Malformed(payload.to_string().chars().take(120).collect())
        })?;

    Ok(entries.iter().filter_map(review_from_value).collect())
}

/// The reviewer is `name`, or the populated `user`.
fn review_from_value(value: &Value) -> Option<Review> {
    let obj = value.as_object()?;
    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(String::from);

    Some(Review {
        reviewer: text("name")
            .or_else(|| {
                obj.get("user")
                    .and_then(|u| u.get("name"))
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .unwrap_or_default(),
        rating: obj
            .get("rating")
            .and_then(decimal_value)
            .and_then(|d| d.to_f64()),
        comment: text("comment").unwrap_or_default(),
        created_at: text("createdAt"),
    })
}

fn product_from_value(value: &Value) -> Option<Product> {
    let obj = value.as_object()?;
    let id = obj
        .get("_id")
        .or_else(|| obj.get("id"))
        .and_then(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })?;

    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(String::from);
    let count = |key: &str| {
        obj.get(key)
            .and_then(decimal_value)
            .and_then(|d| d.trunc().to_u32())
    };

    Some(Product {
        id: ProductId::new(id),
        name: text("name").or_else(|| text("title")).unwrap_or_default(),
        description: text("description"),
        price: obj.get("price").map_or_else(bazaar_core::Price::zero, price_value),
        image: text("image").or_else(|| {
            obj.get("images")
                .and_then(Value::as_array)
                .and_then(|images| images.first())
                .and_then(Value::as_str)
                .map(String::from)
        }),
        stock: count("stock").unwrap_or(0),
        product_type: text("productType").or_else(|| text("type")),
        color: text("color"),
        rating: obj
            .get("rating")
            .and_then(decimal_value)
            .and_then(|d| d.to_f64()),
        sales_count: count("salesCount").or_else(|| count("sold")).unwrap_or(0),
        seller: obj.get("seller").and_then(seller_value),
    })
}
