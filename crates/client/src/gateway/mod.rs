//! Remote cart, wishlist, payment and auth gateway.
//!
//! Pure request/response mapping: every method takes simple inputs and
//! returns the server payload untouched. Normalizing the (historically
//! several) payload shapes is the store's job, so call sites never change
//! when the backend's response format does.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::instrument;

use bazaar_core::{CheckoutSessionId, ProductId, UserId, UserRole};

use crate::checkout::CheckoutRequest;
use crate::http::{ApiClient, HttpError};

/// Email/password login.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct LoginCredentials {
    pub email: String,
    pub password: SecretString,
    pub role: UserRole,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

impl LoginCredentials {
    fn to_body(&self) -> Value {
        json!({
            "email": self.email,
            "password": self.password.expose_secret(),
            "role": self.role,
        })
    }
}

/// New account details.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub role: UserRole,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

impl Registration {
    /// Shortest password the backend accepts.
    pub const MIN_PASSWORD_LEN: usize = 6;

    fn to_body(&self) -> Value {
        json!({
            "name": self.name,
            "email": self.email,
            "password": self.password.expose_secret(),
            "role": self.role,
        })
    }
}

/// Storefront REST resources used by the synchronization layer.
#[trait_variant::make(Gateway: Send)]
pub trait LocalGateway {
    /// `GET /cart`
    async fn fetch_cart(&self) -> Result<Value, HttpError>;

    /// `POST /cart/add`
    async fn add_to_cart(&self, product_id: &ProductId, qty: u32) -> Result<Value, HttpError>;

    /// `POST /cart/remove`
    async fn remove_from_cart(&self, product_id: &ProductId) -> Result<Value, HttpError>;

    /// `POST /cart/update`; the server removes the line when `qty` is 0.
    async fn update_cart_quantity(
        &self,
        product_id: &ProductId,
        qty: u32,
    ) -> Result<Value, HttpError>;

    /// `POST /cart/clear`
    async fn clear_cart(&self) -> Result<Value, HttpError>;

    /// `GET /wishlist/:userId`
    async fn fetch_wishlist(&self, user_id: &UserId) -> Result<Value, HttpError>;

    /// `POST /wishlist/add`
    async fn add_to_wishlist(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Value, HttpError>;

    /// `POST /wishlist/remove`
    async fn remove_from_wishlist(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Value, HttpError>;

    /// `POST /payments/create-checkout-session`
    async fn create_checkout_session(&self, request: &CheckoutRequest)
    -> Result<Value, HttpError>;

    /// `GET /payments/session/:sessionId`
    async fn fetch_payment_session(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Value, HttpError>;

    /// `POST /auth/login` (public)
    async fn login(&self, credentials: &LoginCredentials) -> Result<Value, HttpError>;

    /// `POST /auth/register` (public)
    async fn register(&self, registration: &Registration) -> Result<Value, HttpError>;

    /// `GET /auth/getMe`
    async fn current_user(&self) -> Result<Value, HttpError>;

    /// `POST /auth/logout`
    async fn logout(&self) -> Result<Value, HttpError>;

    /// Accept a token issued by [`LocalGateway::login`] for later calls.
    fn store_token(&self, token: SecretString);

    /// Forget the held token.
    fn forget_token(&self);

    /// Whether a usable token is held.
    fn has_token(&self) -> bool;
}

/// [`Gateway`] backed by the storefront REST API.
#[derive(Debug, Clone)]
pub struct RestGateway {
    api: ApiClient,
}

impl RestGateway {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }
}

impl Gateway for RestGateway {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<Value, HttpError> {
        self.api.get("cart").await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_to_cart(&self, product_id: &ProductId, qty: u32) -> Result<Value, HttpError> {
        let body = json!({ "productId": product_id, "qty": qty });
        self.api.post("cart/add", Some(&body)).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove_from_cart(&self, product_id: &ProductId) -> Result<Value, HttpError> {
        let body = json!({ "productId": product_id });
        self.api.post("cart/remove", Some(&body)).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn update_cart_quantity(
        &self,
        product_id: &ProductId,
        qty: u32,
    ) -> Result<Value, HttpError> {
        let body = json!({ "productId": product_id, "qty": qty });
        self.api.post("cart/update", Some(&body)).await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<Value, HttpError> {
        self.api.post("cart/clear", None).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn fetch_wishlist(&self, user_id: &UserId) -> Result<Value, HttpError> {
        let path = format!("wishlist/{}", urlencoding::encode(user_id.as_str()));
        self.api.get(&path).await
    }

    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    async fn add_to_wishlist(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Value, HttpError> {
        let body = json!({ "userId": user_id, "productId": product_id });
        self.api.post("wishlist/add", Some(&body)).await
    }

    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    async fn remove_from_wishlist(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Value, HttpError> {
        let body = json!({ "userId": user_id, "productId": product_id });
        self.api.post("wishlist/remove", Some(&body)).await
    }

    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<Value, HttpError> {
        let body = serde_json::to_value(request)?;
        self.api
            .post("payments/create-checkout-session", Some(&body))
            .await
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn fetch_payment_session(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Value, HttpError> {
        let path = format!(
            "payments/session/{}",
            urlencoding::encode(session_id.as_str())
        );
        self.api.get(&path).await
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login(&self, credentials: &LoginCredentials) -> Result<Value, HttpError> {
        self.api
            .public_post("auth/login", &credentials.to_body())
            .await
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn register(&self, registration: &Registration) -> Result<Value, HttpError> {
        self.api
            .public_post("auth/register", &registration.to_body())
            .await
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<Value, HttpError> {
        self.api.get("auth/getMe").await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<Value, HttpError> {
        self.api.post("auth/logout", None).await
    }

    fn store_token(&self, token: SecretString) {
        self.api.set_token(crate::http::AuthToken::issued_now(token));
    }

    fn forget_token(&self) {
        self.api.clear_token();
    }

    fn has_token(&self) -> bool {
        self.api.has_valid_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_credentials_debug_redacts_password() {
        let credentials = LoginCredentials {
            email: "ada@example.com".to_string(),
            password: SecretString::from("hunter2-but-longer"),
            role: UserRole::Buyer,
        };
        let debug_output = format!("{credentials:?}");
        assert!(debug_output.contains("ada@example.com"));
        assert!(!debug_output.contains("hunter2-but-longer"));
    }

    #[test]
    fn test_login_body_shape() {
        let credentials = LoginCredentials {
            email: "ada@example.com".to_string(),
            password: SecretString::from("pw"),
            role: UserRole::Seller,
        };
        let body = credentials.to_body();
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["password"], "pw");
        assert_eq!(body["role"], "seller");
    }

    #[test]
    fn test_registration_debug_redacts_password() {
        let registration = Registration {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: SecretString::from("hunter2-but-longer"),
            role: UserRole::Buyer,
        };
        let debug_output = format!("{registration:?}");
        assert!(debug_output.contains("Ada"));
        assert!(!debug_output.contains("hunter2-but-longer"));
        assert_eq!(registration.to_body()["name"], "Ada");
        assert_eq!(registration.to_body()["role"], "buyer");
    }
}
