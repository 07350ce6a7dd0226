//! Catalog queries and filters.

use rust_decimal::Decimal;

use bazaar_core::Product;

/// Parameters for `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    /// Encoded query string, without the leading `?`. Empty for the default
    /// query.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            serializer.append_pair("search", search);
        }
        if let Some(category) = self.category.as_deref().filter(|s| !s.is_empty()) {
            serializer.append_pair("category", category);
        }
        if let Some(page) = self.page {
            serializer.append_pair("page", &page.to_string());
        }
        if let Some(limit) = self.limit {
            serializer.append_pair("limit", &limit.to_string());
        }
        serializer.finish()
    }
}

/// Product filter. `None` fields match everything ("All").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    pub product_type: Option<String>,
    pub color: Option<String>,
    pub min_rating: Option<f64>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    /// Whether a product passes every set criterion.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let name = self.name.as_deref().is_none_or(|q| {
            product
                .name
                .to_lowercase()
                .contains(&q.to_lowercase())
        });
        let product_type = self
            .product_type
            .as_deref()
            .is_none_or(|t| product.product_type.as_deref() == Some(t));
        let color = self
            .color
            .as_deref()
            .is_none_or(|c| product.color.as_deref() == Some(c));
        // Unrated products never pass a rating threshold
        let rating = self
            .min_rating
            .is_none_or(|min| product.rating.is_some_and(|r| r >= min));
        let amount = product.price.amount();
        let min_price = self.min_price.is_none_or(|min| amount >= min);
        let max_price = self.max_price.is_none_or(|max| amount <= max);

        name && product_type && color && rating && min_price && max_price
    }

    /// Apply the filter to a list.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }

    /// Query string for `GET /products/filter`. The server filters on type,
    /// color and price only.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if let Some(product_type) = self.product_type.as_deref() {
            serializer.append_pair("type", product_type);
        }
        if let Some(color) = self.color.as_deref() {
            serializer.append_pair("color", color);
        }
        if let Some(min) = self.min_price {
            serializer.append_pair("minPrice", &min.to_string());
        }
        if let Some(max) = self.max_price {
            serializer.append_pair("maxPrice", &max.to_string());
        }
        serializer.finish()
    }
}

/// Distinct option values for building filter controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub product_types: Vec<String>,
    pub colors: Vec<String>,
    /// Whole-star floors of the ratings present.
    pub ratings: Vec<u8>,
}

impl FilterOptions {
    /// Collect sorted, distinct options from a product list.
    #[must_use]
    pub fn from_products(products: &[Product]) -> Self {
        let mut product_types: Vec<String> = products
            .iter()
            .filter_map(|p| p.product_type.clone())
            .collect();
        product_types.sort();
        product_types.dedup();

        let mut colors: Vec<String> = products.iter().filter_map(|p| p.color.clone()).collect();
        colors.sort();
        colors.dedup();

        let mut ratings: Vec<u8> = products
            .iter()
            .filter_map(|p| p.rating)
            .filter(|r| r.is_finite() && *r >= 0.0)
            .map(|r| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let floor = r.floor().min(f64::from(u8::MAX)) as u8;
                floor
            })
            .collect();
        ratings.sort_unstable();
        ratings.dedup();

        Self {
            product_types,
            colors,
            ratings,
        }
    }
}
