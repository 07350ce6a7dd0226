//! Session lifecycle.

use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{info, instrument, warn};

use bazaar_core::{User, UserId, UserRole};

use super::Storefront;
use crate::error::{SyncError, set_sentry_user};
use crate::gateway::{Gateway, LoginCredentials, Registration};
use crate::http::HttpError;
use crate::store::Action;

impl<G: Gateway> Storefront<G> {
    /// Sign in, then load the user's cart and wishlist.
    ///
    /// A failure to load the cart or wishlist does not fail the login.
    ///
    /// # Errors
    ///
    /// `Validation` for rejected credentials, `Malformed` if no user can be
    /// read from the response, or any gateway failure.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<User, SyncError> {
        const OP: &str = "login";
        let payload = match self.gateway.login(credentials).await {
            Ok(payload) => payload,
            Err(HttpError::Unauthorized { .. }) => {
                return Err(self.fail(
                    OP,
                    SyncError::Validation("Invalid email or password".to_string()),
                ));
            }
            Err(e) => return Err(self.fail(OP, e.into())),
        };

        self.adopt_token(&payload);
        let user = match user_from_payload(&payload) {
            Some(user) => user,
            None => self.current_user(OP).await?,
        };
        self.begin_session(user.clone());
        info!(user_id = %user.id, "Logged in");

        if let Err(e) = self.start_session().await {
            warn!(error = %e, "Session started without a fresh cart or wishlist");
        }
        Ok(user)
    }

    /// Create an account.
    ///
    /// Backends that answer with a token sign the new user in directly, and
    /// the user is returned. Otherwise `Ok(None)`: the caller logs in next.
    ///
    /// # Errors
    ///
    /// `Validation` for a short password (no request is sent), or any
    /// gateway failure. A 4xx carries the backend's message.
    #[instrument(skip_all, fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<Option<User>, SyncError> {
        const OP: &str = "register";
        let password_len = registration.password.expose_secret().chars().count();
        if password_len < Registration::MIN_PASSWORD_LEN {
            return Err(SyncError::Validation(format!(
                "Password must be at least {} characters long",
                Registration::MIN_PASSWORD_LEN
            )));
        }

        let payload = self
            .gateway
            .register(registration)
            .await
            .map_err(|e| self.fail(OP, e.into()))?;
        info!("Account created");

        if !self.adopt_token(&payload) {
            return Ok(None);
        }
        let user = match user_from_payload(&payload) {
            Some(user) => user,
            None => self.current_user(OP).await?,
        };
        self.begin_session(user.clone());
        if let Err(e) = self.start_session().await {
            warn!(error = %e, "Session started without a fresh cart or wishlist");
        }
        Ok(Some(user))
    }

    /// Resume a session from a held credential. `Ok(None)` without one.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if the credential is rejected (the session is ended),
    /// or any gateway failure.
    #[instrument(skip_all)]
    pub async fn restore_session(&self) -> Result<Option<User>, SyncError> {
        const OP: &str = "restore_session";
        if !self.gateway.has_token() {
            return Ok(None);
        }

        let user = self.current_user(OP).await?;
        self.begin_session(user.clone());
        self.start_session().await?;
        Ok(Some(user))
    }

    /// Load the cart and the wishlist. A no-op when nobody is signed in.
    ///
    /// # Errors
    ///
    /// The first failure of the two loads; the other is still attempted.
    pub async fn start_session(&self) -> Result<(), SyncError> {
        if !self.store.is_authenticated() {
            return Ok(());
        }
        let cart = self.fetch_cart().await;
        let wishlist = self.fetch_wishlist().await;
        cart.and(wishlist)
    }

    /// Sign out. The server call is best effort; local state is always
    /// cleared.
    #[instrument(skip_all)]
    pub async fn logout(&self) {
        if (self.store.is_authenticated() || self.gateway.has_token())
            && let Err(e) = self.gateway.logout().await
        {
            warn!(error = %e, "Server logout failed, clearing local session anyway");
        }
        self.end_session_locally();
        info!("Logged out");
    }

    async fn current_user(&self, operation: &'static str) -> Result<User, SyncError> {
        let payload = self
            .gateway
            .current_user()
            .await
            .map_err(|e| self.fail(operation, e.into()))?;
        user_from_payload(&payload).ok_or_else(|| {
            self.fail(
                operation,
                SyncError::Malformed("no user in response".to_string()),
            )
        })
    }

    /// Hold the token from an auth response, if it carries one.
    fn adopt_token(&self, payload: &Value) -> bool {
        let token = payload
            .get("token")
            .or_else(|| payload.get("accessToken"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());
        if let Some(token) = token {
            self.gateway.store_token(SecretString::from(token));
        }
        token.is_some()
    }

    fn begin_session(&self, user: User) {
        set_sentry_user(&user.id, Some(user.email.as_str()));
        self.store.dispatch(Action::SetUser(user));
    }
}

/// Read a user from `{ user: {...} }` or a bare user object.
fn user_from_payload(payload: &Value) -> Option<User> {
    let obj = payload
        .get("user")
        .filter(|u| u.is_object())
        .unwrap_or(payload)
        .as_object()?;

    let id = obj
        .get("_id")
        .or_else(|| obj.get("id"))
        .and_then(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })?;

    let role = obj
        .get("role")
        .and_then(Value::as_str)
        .map_or(UserRole::Buyer, |r| {
            UserRole::from_str(r).unwrap_or_else(|e| {
                warn!(error = %e, "Unknown role, treating as buyer");
                UserRole::Buyer
            })
        });

    Some(User {
        id: UserId::new(id),
        name: obj
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        email: obj
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        role,
    })
}
