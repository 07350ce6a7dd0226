//! Catalog reads and their cache.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;

use secrecy::SecretString;

use bazaar_client::{CatalogError, FilterOptions, LoginCredentials, ProductFilter, ProductQuery};
use bazaar_core::{ProductId, UserRole};
use bazaar_integration_tests::{MockBackend, SELLER_EMAIL, SELLER_PASSWORD};

#[tokio::test]
async fn test_list_products_is_cached() {
    let backend = MockBackend::start().await.unwrap();
    let catalog = backend.catalog().unwrap();
    let query = ProductQuery::default();

    let first = catalog.list_products(&query).await.unwrap();
    let second = catalog.list_products(&query).await.unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(backend.request_count("GET /products"), 1);

    catalog.invalidate_all().await;
    catalog.list_products(&query).await.unwrap();
    assert_eq!(backend.request_count("GET /products"), 2);
}

#[tokio::test]
async fn test_get_product() {
    let backend = MockBackend::start().await.unwrap();
    let catalog = backend.catalog().unwrap();

    let product = catalog.get_product(&ProductId::new("p2")).await.unwrap();
    assert_eq!(product.name, "Notebook");
    assert_eq!(product.price.amount(), Decimal::new(450, 2));
    assert_eq!(product.stock, 2);
    assert_eq!(product.seller.unwrap().name, "Grace's Goods");

    catalog.get_product(&ProductId::new("p2")).await.unwrap();
    assert_eq!(backend.request_count("GET /products/:id"), 1);

    catalog.invalidate_product(&ProductId::new("p2")).await;
    catalog.get_product(&ProductId::new("p2")).await.unwrap();
    assert_eq!(backend.request_count("GET /products/:id"), 2);
}

#[tokio::test]
async fn test_unknown_product() {
    let backend = MockBackend::start().await.unwrap();
    let catalog = backend.catalog().unwrap();

    assert!(matches!(
        catalog.get_product(&ProductId::new("missing")).await,
        Err(CatalogError::NotFound(id)) if id.as_str() == "missing"
    ));
}

#[tokio::test]
async fn test_local_filtering_of_listed_products() {
    let backend = MockBackend::start().await.unwrap();
    let catalog = backend.catalog().unwrap();
    let products = catalog
        .list_products(&ProductQuery::default())
        .await
        .unwrap();

    let filter = ProductFilter {
        max_price: Some(Decimal::new(2000, 2)),
        ..ProductFilter::default()
    };
    let cheap: Vec<&str> = filter
        .apply(&products)
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(cheap, vec!["p1", "p2"]);

    let options = FilterOptions::from_products(&products);
    assert_eq!(options.colors, vec!["White".to_string()]);
}

#[tokio::test]
async fn test_seller_products() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();
    storefront
        .login(&LoginCredentials {
            email: SELLER_EMAIL.to_string(),
            password: SecretString::from(SELLER_PASSWORD),
            role: UserRole::Seller,
        })
        .await
        .unwrap();
    let catalog = backend.catalog_for(&storefront);

    let products = catalog.seller_products().await.unwrap();
    let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);

    // Never cached
    catalog.seller_products().await.unwrap();
    assert_eq!(backend.request_count("GET /products/seller/getproduct"), 2);
}

#[tokio::test]
async fn test_seller_products_refused_for_buyers() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.buyer().await.unwrap();
    let catalog = backend.catalog_for(&storefront);

    assert!(matches!(
        catalog.seller_products().await,
        Err(CatalogError::Http(_))
    ));
}

#[tokio::test]
async fn test_product_reviews() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.buyer().await.unwrap();
    let catalog = backend.catalog_for(&storefront);

    let reviews = catalog.product_reviews(&ProductId::new("p1")).await.unwrap();
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0].reviewer, "Ada");
    assert_eq!(reviews[0].comment, "Bright and sturdy");
    assert_eq!(reviews[1].reviewer, "Linus");

    assert!(
        catalog
            .product_reviews(&ProductId::new("p2"))
            .await
            .unwrap()
            .is_empty()
    );
    assert!(matches!(
        catalog.product_reviews(&ProductId::new("missing")).await,
        Err(CatalogError::NotFound(id)) if id.as_str() == "missing"
    ));
}
