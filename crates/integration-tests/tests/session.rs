//! Login, session restore and logout.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use bazaar_client::{Gateway, LoginCredentials, MemoryCartStorage, Registration, SyncError};
use bazaar_core::{ProductId, UserRole};
use bazaar_integration_tests::{
    BUYER_EMAIL, BUYER_ID, MockBackend, SELLER_EMAIL, SELLER_PASSWORD, buyer_credentials,
};

#[tokio::test]
async fn test_login_loads_cart_and_wishlist() {
    let backend = MockBackend::start().await.unwrap();
    backend.seed_cart(BUYER_ID, &[("p1", 2), ("p2", 1)]);
    let storefront = backend.storefront().unwrap();

    let user = storefront.login(&buyer_credentials()).await.unwrap();

    assert_eq!(user.id.as_str(), BUYER_ID);
    assert_eq!(user.email, BUYER_EMAIL);
    assert!(!user.is_seller());
    let state = storefront.store().snapshot();
    assert!(state.session.is_authenticated());
    assert_eq!(state.cart_count(), 3);
    assert_eq!(backend.request_count("GET /cart"), 1);
    assert_eq!(backend.request_count("GET /wishlist"), 1);
}

#[tokio::test]
async fn test_seller_login() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();

    let credentials = LoginCredentials {
        email: SELLER_EMAIL.to_string(),
        password: SecretString::from(SELLER_PASSWORD),
        role: UserRole::Seller,
    };
    storefront.login(&credentials).await.unwrap();

    assert!(storefront.store().snapshot().session.is_seller());
}

#[tokio::test]
async fn test_wrong_password_is_a_validation_error() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();
    let credentials = LoginCredentials {
        password: SecretString::from("wrong"),
        ..buyer_credentials()
    };

    let err = storefront.login(&credentials).await.unwrap_err();

    assert!(matches!(err, SyncError::Validation(_)));
    assert_eq!(err.user_message(), "Invalid email or password");
    assert!(!storefront.store().is_authenticated());
    assert!(!storefront.gateway().has_token());
}

#[tokio::test]
async fn test_restore_session_from_token() {
    let backend = MockBackend::start().await.unwrap();
    backend.seed_cart(BUYER_ID, &[("p1", 1)]);
    let first = backend.buyer().await.unwrap();
    let token = first.gateway().api().current_token().unwrap();

    let mut config = backend.config();
    config.api_token = Some(SecretString::from(token.expose_secret()));
    let second = backend
        .storefront_with(&config, Arc::new(MemoryCartStorage::new()))
        .unwrap();
    let user = second.restore_session().await.unwrap().unwrap();

    assert_eq!(user.id.as_str(), BUYER_ID);
    assert_eq!(second.store().cart_count(), 1);
}

#[tokio::test]
async fn test_restore_without_token_is_signed_out() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();

    assert!(storefront.restore_session().await.unwrap().is_none());
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_restore_with_revoked_token_ends_session() {
    let backend = MockBackend::start().await.unwrap();
    let first = backend.buyer().await.unwrap();
    let token = first.gateway().api().current_token().unwrap();
    backend.revoke_sessions();

    let mut config = backend.config();
    config.api_token = Some(token);
    let second = backend
        .storefront_with(&config, Arc::new(MemoryCartStorage::new()))
        .unwrap();

    assert!(matches!(
        second.restore_session().await,
        Err(SyncError::Unauthorized)
    ));
    assert!(!second.gateway().has_token());
}

#[tokio::test]
async fn test_logout_clears_local_state() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.buyer().await.unwrap();
    storefront.add_item(&ProductId::new("p1"), 1).await.unwrap();
    storefront
        .add_to_wishlist(&ProductId::new("p2"))
        .await
        .unwrap();

    storefront.logout().await;

    let state = storefront.store().snapshot();
    assert!(!state.session.is_authenticated());
    assert!(state.cart.items.is_empty());
    assert!(state.wishlist.items.is_empty());
    assert!(!storefront.gateway().has_token());
    assert_eq!(backend.request_count("POST /auth/logout"), 1);
    // The server keeps the cart for the next login
    assert_eq!(backend.server_cart(BUYER_ID).len(), 1);
}

#[tokio::test]
async fn test_logout_survives_server_failure() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.buyer().await.unwrap();

    backend.fail_next(axum::http::StatusCode::SERVICE_UNAVAILABLE);
    storefront.logout().await;

    assert!(!storefront.store().is_authenticated());
}

fn registration(email: &str, password: &str) -> Registration {
    Registration {
        name: "Margaret".to_string(),
        email: email.to_string(),
        password: SecretString::from(password),
        role: UserRole::Buyer,
    }
}

#[tokio::test]
async fn test_register_then_login() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();
    let new_account = registration("margaret@example.com", "hamilton");

    let registered = storefront.register(&new_account).await.unwrap();

    assert!(registered.is_none());
    assert!(!storefront.store().is_authenticated());

    let credentials = LoginCredentials {
        email: new_account.email.clone(),
        password: SecretString::from("hamilton"),
        role: UserRole::Buyer,
    };
    let user = storefront.login(&credentials).await.unwrap();
    assert_eq!(user.name, "Margaret");
    assert_eq!(storefront.store().cart_count(), 0);
}

#[tokio::test]
async fn test_register_with_token_signs_in() {
    let backend = MockBackend::start().await.unwrap();
    backend.set_register_issues_token(true);
    let storefront = backend.storefront().unwrap();

    let user = storefront
        .register(&registration("margaret@example.com", "hamilton"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(user.email, "margaret@example.com");
    assert!(storefront.store().is_authenticated());
    assert!(storefront.gateway().has_token());
    assert_eq!(backend.request_count("GET /cart"), 1);
}

#[tokio::test]
async fn test_register_short_password_sends_nothing() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();

    let err = storefront
        .register(&registration("margaret@example.com", "12345"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Validation(_)));
    assert_eq!(err.user_message(), "Password must be at least 6 characters long");
    assert_eq!(backend.request_count("POST /auth/register"), 0);
}

#[tokio::test]
async fn test_register_existing_email_shows_server_message() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();

    let err = storefront
        .register(&registration(BUYER_EMAIL, "long enough"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Api { status: 400, .. }));
    assert_eq!(err.user_message(), "User already exists");
    assert!(!storefront.store().is_authenticated());
}
