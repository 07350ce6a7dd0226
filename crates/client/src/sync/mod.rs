//! Synchronization orchestrator.
//!
//! One network call per user intent. The server's response is authoritative
//! and replaces the matching store slice wholesale; nothing is applied
//! optimistically. Every failure is caught here, reported, and returned as a
//! [`SyncError`] with the store left at its last known good state.

mod locks;
mod session;
mod wishlist;

pub use locks::ProductLocks;

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, instrument};

use bazaar_core::{CartItem, CheckoutSessionId, OrderId, ProductId, User};

use crate::checkout::{CheckoutHandoff, CheckoutRequest, PaymentSession};
use crate::config::ClientConfig;
use crate::error::{SyncError, add_breadcrumb, clear_sentry_user};
use crate::gateway::Gateway;
use crate::http::HttpError;
use crate::store::{Action, PendingKey, Store};

/// Orchestrator behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Issue mutations of the same product one at a time instead of letting
    /// the last response win.
    pub serialize_per_product: bool,
}

impl SyncOptions {
    #[must_use]
    pub const fn from_config(config: &ClientConfig) -> Self {
        Self {
            serialize_per_product: config.serialize_per_product,
        }
    }
}

/// Callback URLs handed to the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutUrls {
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            success_url: config.checkout_success_url(),
            cancel_url: config.checkout_cancel_url(),
        }
    }
}

/// Marks a [`PendingKey`] for as long as it lives.
struct PendingGuard<'a> {
    store: &'a Store,
    key: PendingKey,
}

impl<'a> PendingGuard<'a> {
    fn begin(store: &'a Store, key: PendingKey) -> Self {
        store.dispatch(Action::BeginPending(key.clone()));
        Self { store, key }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.store.dispatch(Action::EndPending(self.key.clone()));
    }
}

/// Cart, wishlist, checkout and session operations against a [`Gateway`].
pub struct Storefront<G> {
    gateway: G,
    store: Store,
    checkout_urls: CheckoutUrls,
    locks: Option<ProductLocks>,
}

impl<G> std::fmt::Debug for Storefront<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("store", &self.store)
            .field("checkout_urls", &self.checkout_urls)
            .field("serialize_per_product", &self.locks.is_some())
            .finish_non_exhaustive()
    }
}

impl<G: Gateway> Storefront<G> {
    #[must_use]
    pub fn new(
        gateway: G,
        store: Store,
        checkout_urls: CheckoutUrls,
        options: SyncOptions,
    ) -> Self {
        Self {
            gateway,
            store,
            checkout_urls,
            locks: options.serialize_per_product.then(ProductLocks::new),
        }
    }

    #[must_use]
    pub fn from_config(gateway: G, store: Store, config: &ClientConfig) -> Self {
        Self::new(
            gateway,
            store,
            CheckoutUrls::from_config(config),
            SyncOptions::from_config(config),
        )
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add `qty` units of a product.
    ///
    /// # Errors
    ///
    /// `LoginRequired`, `Validation` for a zero quantity, `OutOfStock` when
    /// the line is already at its known stock, or any gateway failure.
    #[instrument(skip_all, fields(product_id = %product_id, qty))]
    pub async fn add_item(&self, product_id: &ProductId, qty: u32) -> Result<(), SyncError> {
        const OP: &str = "add_item";
        self.require_user().map_err(|e| self.fail(OP, e))?;
        if qty == 0 {
            return Err(self.fail(
                OP,
                SyncError::Validation("Quantity must be at least 1".to_string()),
            ));
        }

        let _lock = self.lock(product_id).await;
        if let Some(line) = self.cart_line(product_id) {
            let requested = u64::from(line.quantity) + u64::from(qty);
            if line.at_stock_ceiling() || line.would_exceed_stock(requested) {
                return Err(self.fail(OP, out_of_stock(&line, requested)));
            }
        }

        let _pending = self.pending(PendingKey::Cart(product_id.clone()));
        let payload = self
            .gateway
            .add_to_cart(product_id, qty)
            .await
            .map_err(|e| self.fail(OP, e.into()))?;
        self.store
            .replace_cart(&payload)
            .map_err(|e| self.fail(OP, e.into()))?;

        add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
        Ok(())
    }

    /// Remove a product's line. Removing an absent product succeeds.
    ///
    /// # Errors
    ///
    /// `LoginRequired` or a gateway failure other than not-found.
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: &ProductId) -> Result<(), SyncError> {
        const OP: &str = "remove_item";
        self.require_user().map_err(|e| self.fail(OP, e))?;

        let _lock = self.lock(product_id).await;
        let _pending = self.pending(PendingKey::Cart(product_id.clone()));
        match self.gateway.remove_from_cart(product_id).await {
            Ok(payload) => self
                .store
                .replace_cart(&payload)
                .map_err(|e| self.fail(OP, e.into()))?,
            Err(HttpError::NotFound(message)) => {
                debug!(%message, "Line already absent on the server");
                let remaining = self.store.read(|s| {
                    s.cart
                        .items
                        .iter()
                        .filter(|i| &i.product_id != product_id)
                        .cloned()
                        .collect::<Vec<_>>()
                });
                self.store.dispatch(Action::ReplaceCart(remaining));
            }
            Err(e) => return Err(self.fail(OP, e.into())),
        }

        add_breadcrumb("cart", "Removed item", Some(&[("product_id", product_id.as_str())]));
        Ok(())
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// `LoginRequired`, `OutOfStock` when `qty` is above the line's known
    /// stock, `Validation` for quantities that do not fit the wire format, or
    /// any gateway failure.
    #[instrument(skip_all, fields(product_id = %product_id, qty))]
    pub async fn update_quantity(&self, product_id: &ProductId, qty: i64) -> Result<(), SyncError> {
        const OP: &str = "update_quantity";
        if qty <= 0 {
            return self.remove_item(product_id).await;
        }
        self.require_user().map_err(|e| self.fail(OP, e))?;
        let wire_qty = u32::try_from(qty).map_err(|_| {
            self.fail(OP, SyncError::Validation("Quantity is too large".to_string()))
        })?;

        let _lock = self.lock(product_id).await;
        if let Some(line) = self.cart_line(product_id)
            && line.would_exceed_stock(u64::from(wire_qty))
        {
            return Err(self.fail(OP, out_of_stock(&line, u64::from(wire_qty))));
        }

        let _pending = self.pending(PendingKey::Cart(product_id.clone()));
        let payload = self
            .gateway
            .update_cart_quantity(product_id, wire_qty)
            .await
            .map_err(|e| self.fail(OP, e.into()))?;
        self.store
            .replace_cart(&payload)
            .map_err(|e| self.fail(OP, e.into()))?;
        Ok(())
    }

    /// One more unit; adds the product if it is not in the cart.
    ///
    /// # Errors
    ///
    /// See [`Self::add_item`] and [`Self::update_quantity`].
    pub async fn increment(&self, product_id: &ProductId) -> Result<(), SyncError> {
        match self.cart_line(product_id) {
            Some(line) => {
                self.update_quantity(product_id, i64::from(line.quantity) + 1)
                    .await
            }
            None => self.add_item(product_id, 1).await,
        }
    }

    /// One unit less; the last unit removes the line. No-op when absent.
    ///
    /// # Errors
    ///
    /// See [`Self::update_quantity`].
    pub async fn decrement(&self, product_id: &ProductId) -> Result<(), SyncError> {
        match self.cart_line(product_id) {
            Some(line) => {
                self.update_quantity(product_id, i64::from(line.quantity) - 1)
                    .await
            }
            None => Ok(()),
        }
    }

    /// Clear the server cart and adopt whatever it answers with.
    ///
    /// # Errors
    ///
    /// `LoginRequired` or any gateway failure.
    #[instrument(skip_all)]
    pub async fn clear_cart(&self) -> Result<(), SyncError> {
        const OP: &str = "clear_cart";
        self.require_user().map_err(|e| self.fail(OP, e))?;

        let _pending = self.pending(PendingKey::CartClear);
        let payload = self
            .gateway
            .clear_cart()
            .await
            .map_err(|e| self.fail(OP, e.into()))?;
        self.store
            .replace_cart(&payload)
            .map_err(|e| self.fail(OP, e.into()))
    }

    /// Replace the local cart with the server's.
    ///
    /// # Errors
    ///
    /// `LoginRequired` or any gateway failure.
    #[instrument(skip_all)]
    pub async fn fetch_cart(&self) -> Result<(), SyncError> {
        const OP: &str = "fetch_cart";
        self.require_user().map_err(|e| self.fail(OP, e))?;

        let _pending = self.pending(PendingKey::CartFetch);
        let payload = self
            .gateway
            .fetch_cart()
            .await
            .map_err(|e| self.fail(OP, e.into()))?;
        self.store
            .replace_cart(&payload)
            .map_err(|e| self.fail(OP, e.into()))
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Create a payment session for the current cart.
    ///
    /// The cart is not modified, whatever the outcome.
    ///
    /// # Errors
    ///
    /// `LoginRequired`, `Validation` for an empty cart,
    /// `InvalidCheckoutResponse`, or any gateway failure.
    #[instrument(skip_all, fields(order_id = ?order_id))]
    pub async fn checkout(&self, order_id: Option<OrderId>) -> Result<CheckoutHandoff, SyncError> {
        const OP: &str = "checkout";
        let user = self.require_user().map_err(|e| self.fail(OP, e))?;

        let items = self.store.read(|s| s.cart.items.clone());
        if items.is_empty() {
            return Err(self.fail(OP, SyncError::Validation("Your cart is empty".to_string())));
        }

        let request = CheckoutRequest::from_cart(
            &items,
            Some(user.id),
            order_id,
            self.checkout_urls.success_url.clone(),
            self.checkout_urls.cancel_url.clone(),
        );

        let _pending = self.pending(PendingKey::Checkout);
        add_breadcrumb("checkout", "Creating checkout session", None);
        let payload = self
            .gateway
            .create_checkout_session(&request)
            .await
            .map_err(|e| self.fail(OP, e.into()))?;

        CheckoutHandoff::from_response(&payload)
            .ok_or_else(|| self.fail(OP, SyncError::InvalidCheckoutResponse))
    }

    /// Look up a payment session after the provider redirects back.
    ///
    /// # Errors
    ///
    /// `Malformed` if the session has no id, or any gateway failure.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn payment_session(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<PaymentSession, SyncError> {
        const OP: &str = "payment_session";
        let payload = self
            .gateway
            .fetch_payment_session(session_id)
            .await
            .map_err(|e| self.fail(OP, e.into()))?;
        PaymentSession::from_response(&payload).ok_or_else(|| {
            self.fail(OP, SyncError::Malformed("payment session without id".to_string()))
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_user(&self) -> Result<User, SyncError> {
        self.store
            .read(|s| s.session.user.clone())
            .ok_or(SyncError::LoginRequired)
    }

    fn cart_line(&self, product_id: &ProductId) -> Option<CartItem> {
        self.store.read(|s| s.cart_item(product_id).cloned())
    }

    fn pending(&self, key: PendingKey) -> PendingGuard<'_> {
        PendingGuard::begin(&self.store, key)
    }

    async fn lock(&self, product_id: &ProductId) -> Option<OwnedMutexGuard<()>> {
        match &self.locks {
            Some(locks) => Some(locks.acquire(product_id).await),
            None => None,
        }
    }

    /// Report a failure. A rejected credential ends the session first.
    fn fail(&self, operation: &'static str, err: SyncError) -> SyncError {
        if matches!(err, SyncError::Unauthorized) {
            self.end_session_locally();
        }
        err.report(operation);
        err
    }

    /// Drop the credential, the user, the cart (and its persisted copy) and
    /// the wishlist.
    fn end_session_locally(&self) {
        self.gateway.forget_token();
        self.store.dispatch(Action::ClearUser);
        self.store.dispatch(Action::ClearCart);
        self.store.dispatch(Action::ClearWishlist);
        clear_sentry_user();
    }
}

fn out_of_stock(line: &CartItem, requested: u64) -> SyncError {
    SyncError::OutOfStock {
        product_id: line.product_id.clone(),
        requested,
        ceiling: line.stock_ceiling,
    }
}
