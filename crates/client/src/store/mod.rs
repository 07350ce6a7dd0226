//! Local state store.
//!
//! A single, explicitly passed container for the session, cart and wishlist
//! slices. State changes go through [`Action`]s applied by the pure
//! [`reduce`] function; [`Store::dispatch`] applies them, notifies
//! subscribers and writes cart changes through to durable storage.

mod normalize;
mod persistence;

pub use normalize::{
    CartPayload, MalformedPayload, WishlistPayload, normalize_cart, normalize_wishlist,
};
pub use persistence::{CART_KEY, CartStorage, FileCartStorage, MemoryCartStorage, StorageError};

pub(crate) use normalize::{decimal_value, price_value, seller_value};

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use bazaar_core::{CartItem, Price, ProductId, User, WishlistItem};

/// Signed-in user, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
}

impl SessionState {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Non-buyer roles get the seller switch.
    #[must_use]
    pub fn is_seller(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_seller)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub items: Vec<CartItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WishlistState {
    pub items: Vec<WishlistItem>,
}

/// An in-flight operation, so the matching control can be disabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PendingKey {
    Cart(ProductId),
    CartClear,
    CartFetch,
    Wishlist(ProductId),
    WishlistFetch,
    Checkout,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    pub session: SessionState,
    pub cart: CartState,
    pub wishlist: WishlistState,
    /// In-flight operations per key; the same key may be entered twice.
    pub pending: HashMap<PendingKey, u32>,
}

impl StoreState {
    /// Sum of quantities.
    #[must_use]
    pub fn cart_count(&self) -> u64 {
        self.cart.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    #[must_use]
    pub fn wishlist_count(&self) -> usize {
        self.wishlist.items.len()
    }

    /// Sum of `quantity × unit_price`.
    #[must_use]
    pub fn cart_total(&self) -> Price {
        Price::sum(self.cart.items.iter().map(CartItem::line_total))
    }

    #[must_use]
    pub fn is_pending(&self, key: &PendingKey) -> bool {
        self.pending.contains_key(key)
    }

    #[must_use]
    pub fn cart_item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.cart.items.iter().find(|i| &i.product_id == product_id)
    }

    #[must_use]
    pub fn in_wishlist(&self, product_id: &ProductId) -> bool {
        self.wishlist
            .items
            .iter()
            .any(|i| &i.product_id == product_id)
    }
}

/// State transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetUser(User),
    ClearUser,
    ReplaceCart(Vec<CartItem>),
    ClearCart,
    ReplaceWishlist(Vec<WishlistItem>),
    MergeWishlistItem(WishlistItem),
    RemoveWishlistItem(ProductId),
    ClearWishlist,
    BeginPending(PendingKey),
    EndPending(PendingKey),
}

impl Action {
    const fn touches_cart(&self) -> bool {
        matches!(self, Self::ReplaceCart(_) | Self::ClearCart)
    }
}

/// Apply an action to the state. No I/O.
pub fn reduce(state: &mut StoreState, action: Action) {
    match action {
        Action::SetUser(user) => state.session.user = Some(user),
        Action::ClearUser => state.session.user = None,
        Action::ReplaceCart(items) => {
            state.cart.items = dedup_by_product(items, |i| &i.product_id);
        }
        Action::ClearCart => state.cart.items.clear(),
        Action::ReplaceWishlist(items) => {
            state.wishlist.items = dedup_by_product(items, |i| &i.product_id);
        }
        Action::MergeWishlistItem(item) => {
            if let Some(existing) = state
                .wishlist
                .items
                .iter_mut()
                .find(|i| i.product_id == item.product_id)
            {
                merge_wishlist_item(existing, item);
            } else {
                state.wishlist.items.push(item);
            }
        }
        Action::RemoveWishlistItem(product_id) => {
            state.wishlist.items.retain(|i| i.product_id != product_id);
        }
        Action::ClearWishlist => state.wishlist.items.clear(),
        Action::BeginPending(key) => {
            *state.pending.entry(key).or_insert(0) += 1;
        }
        Action::EndPending(key) => {
            if let Some(count) = state.pending.get_mut(&key) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    state.pending.remove(&key);
                }
            }
        }
    }
}

/// Newer fields win; fields the newer entry lacks are kept.
fn merge_wishlist_item(existing: &mut WishlistItem, newer: WishlistItem) {
    if newer.name.is_some() {
        existing.name = newer.name;
    }
    if newer.image.is_some() {
        existing.image = newer.image;
    }
    if newer.price.is_some() {
        existing.price = newer.price;
    }
    if newer.stock.is_some() {
        existing.stock = newer.stock;
    }
}

/// One entry per product: first position, last values.
fn dedup_by_product<T>(items: Vec<T>, key: impl Fn(&T) -> &ProductId) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    let mut positions: HashMap<ProductId, usize> = HashMap::new();
    for item in items {
        if let Some(&pos) = positions.get(key(&item)) {
            if let Some(slot) = out.get_mut(pos) {
                *slot = item;
            }
        } else {
            positions.insert(key(&item).clone(), out.len());
            out.push(item);
        }
    }
    out
}

/// Shared handle to the state container.
///
/// Cheaply cloneable; clones observe and mutate the same state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: watch::Sender<StoreState>,
    storage: Arc<dyn CartStorage>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// An empty store writing the cart through to `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn CartStorage>) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            inner: Arc::new(StoreInner { state, storage }),
        }
    }

    /// A store whose cart is seeded from `storage`.
    ///
    /// An unreadable store starts empty.
    #[must_use]
    pub fn restore(storage: Arc<dyn CartStorage>) -> Self {
        let items = match storage.load() {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to load persisted cart, starting empty");
                Vec::new()
            }
        };
        debug!(items = items.len(), "Restored cart");

        let state = StoreState {
            cart: CartState {
                items: dedup_by_product(items, |i| &i.product_id),
            },
            ..StoreState::default()
        };
        let (state, _) = watch::channel(state);
        Self {
            inner: Arc::new(StoreInner { state, storage }),
        }
    }

    /// Apply an action and notify subscribers.
    pub fn dispatch(&self, action: Action) {
        let touches_cart = action.touches_cart();
        self.inner.state.send_modify(|state| reduce(state, action));
        if touches_cart {
            self.persist_cart_locally();
        }
    }

    /// Receive a notification after every dispatch.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.inner.state.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> StoreState {
        self.inner.state.borrow().clone()
    }

    /// Read the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    // =========================================================================
    // Server replacements
    // =========================================================================

    /// Replace the cart with a server payload.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` for an unrecognized shape; the cart is left
    /// unchanged.
    pub fn replace_cart(&self, payload: &Value) -> Result<(), MalformedPayload> {
        let items = normalize_cart(payload)?;
        debug!(items = items.len(), "Replacing cart");
        self.dispatch(Action::ReplaceCart(items));
        Ok(())
    }

    /// Apply a wishlist payload: lists replace, single products and bare ids
    /// merge. The classified payload is returned so callers can handle
    /// [`WishlistPayload::Empty`].
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` for an unrecognized shape; the wishlist is
    /// left unchanged.
    pub fn replace_wishlist(&self, payload: &Value) -> Result<WishlistPayload, MalformedPayload> {
        let payload = normalize_wishlist(payload)?;
        match &payload {
            WishlistPayload::Items(items) => {
                debug!(items = items.len(), "Replacing wishlist");
                self.dispatch(Action::ReplaceWishlist(items.clone()));
            }
            WishlistPayload::Single(item) => {
                self.dispatch(Action::MergeWishlistItem(item.clone()));
            }
            WishlistPayload::Id(product_id) => {
                self.dispatch(Action::MergeWishlistItem(WishlistItem::bare(product_id.clone())));
            }
            WishlistPayload::Empty => {}
        }
        Ok(payload)
    }

    pub fn clear_cart(&self) {
        self.dispatch(Action::ClearCart);
    }

    pub fn clear_wishlist(&self) {
        self.dispatch(Action::ClearWishlist);
    }

    /// Write the cart slice to durable storage. Failures are logged only.
    pub fn persist_cart_locally(&self) {
        let items = self.read(|s| s.cart.items.clone());
        let result = if items.is_empty() {
            self.inner.storage.clear()
        } else {
            self.inner.storage.save(&items)
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist cart");
        }
    }

    // =========================================================================
    // Derived values
    // =========================================================================

    #[must_use]
    pub fn cart_count(&self) -> u64 {
        self.read(StoreState::cart_count)
    }

    #[must_use]
    pub fn wishlist_count(&self) -> usize {
        self.read(StoreState::wishlist_count)
    }

    #[must_use]
    pub fn cart_total(&self) -> Price {
        self.read(StoreState::cart_total)
    }

    #[must_use]
    pub fn is_pending(&self, key: &PendingKey) -> bool {
        self.read(|s| s.is_pending(key))
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read(|s| s.session.is_authenticated())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use bazaar_core::{SellerRef, UserId, UserRole};
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    fn item(id: &str, quantity: u32, cents: i64) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: id.to_string(),
            image: None,
            unit_price: Price::new(Decimal::new(cents, 2)).unwrap(),
            quantity,
            stock_ceiling: 10,
            seller: SellerRef::unknown(),
        }
    }

    fn memory_store() -> (Store, Arc<MemoryCartStorage>) {
        let storage = Arc::new(MemoryCartStorage::new());
        (Store::new(storage.clone()), storage)
    }

    #[test]
    fn test_derived_values() {
        let mut state = StoreState::default();
        reduce(
            &mut state,
            Action::ReplaceCart(vec![item("p1", 2, 1000), item("p2", 3, 250)]),
        );
        assert_eq!(state.cart_count(), 5);
        assert_eq!(state.cart_total().amount(), Decimal::new(2750, 2));
        assert_eq!(state.wishlist_count(), 0);
    }

    #[test]
    fn test_replace_cart_dedups() {
        let mut state = StoreState::default();
        reduce(
            &mut state,
            Action::ReplaceCart(vec![item("p1", 1, 100), item("p1", 4, 100)]),
        );
        assert_eq!(state.cart.items.len(), 1);
        assert_eq!(state.cart.items[0].quantity, 4);
    }

    #[test]
    fn test_pending_keys() {
        let mut state = StoreState::default();
        let key = PendingKey::Cart(ProductId::new("p1"));
        reduce(&mut state, Action::BeginPending(key.clone()));
        reduce(&mut state, Action::BeginPending(key.clone()));
        assert!(state.is_pending(&key));
        assert!(!state.is_pending(&PendingKey::Checkout));
        reduce(&mut state, Action::EndPending(key.clone()));
        assert!(state.is_pending(&key));
        reduce(&mut state, Action::EndPending(key.clone()));
        assert!(!state.is_pending(&key));
        reduce(&mut state, Action::EndPending(key.clone()));
        assert!(state.pending.is_empty());
    }

    #[test]
    fn test_session_actions() {
        let mut state = StoreState::default();
        reduce(
            &mut state,
            Action::SetUser(User {
                id: UserId::new("u1"),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                role: UserRole::Seller,
            }),
        );
        assert!(state.session.is_authenticated());
        assert!(state.session.is_seller());
        reduce(&mut state, Action::ClearUser);
        assert!(!state.session.is_authenticated());
    }

    #[test]
    fn test_merge_wishlist_item_keeps_known_fields() {
        let mut state = StoreState::default();
        reduce(
            &mut state,
            Action::ReplaceWishlist(vec![WishlistItem {
                product_id: ProductId::new("p1"),
                name: Some("Lamp".to_string()),
                image: None,
                price: None,
                stock: Some(3),
            }]),
        );
        reduce(
            &mut state,
            Action::MergeWishlistItem(WishlistItem {
                product_id: ProductId::new("p1"),
                name: Some("Desk lamp".to_string()),
                image: None,
                price: None,
                stock: None,
            }),
        );
        assert_eq!(state.wishlist.items.len(), 1);
        assert_eq!(state.wishlist.items[0].name.as_deref(), Some("Desk lamp"));
        assert_eq!(state.wishlist.items[0].stock, Some(3));
    }

    #[test]
    fn test_replace_cart_writes_through() {
        let (store, storage) = memory_store();
        store
            .replace_cart(&json!({ "cart": { "cartItems": [
                { "product": { "_id": "p1", "name": "Lamp" }, "qty": 2, "price": 5 }
            ] } }))
            .unwrap();

        let persisted = storage.snapshot().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].quantity, 2);
        assert_eq!(store.cart_count(), 2);

        store.clear_cart();
        assert!(storage.snapshot().is_none());
        assert_eq!(store.cart_count(), 0);
    }

    #[test]
    fn test_malformed_cart_leaves_state_unchanged() {
        let (store, _) = memory_store();
        store.replace_cart(&json!([{ "productId": "p1", "qty": 1 }])).unwrap();
        let before = store.snapshot();

        assert!(store.replace_cart(&json!({ "unexpected": true })).is_err());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_wishlist_dedup_across_shapes() {
        let (store, _) = memory_store();

        store
            .replace_wishlist(&json!([
                { "_id": "p1", "name": "one" },
                { "_id": "p2", "name": "two" }
            ]))
            .unwrap();
        store
            .replace_wishlist(&json!({ "wishlist": [
                { "_id": "p2", "name": "two v2" },
                { "_id": "p3", "name": "three" }
            ] }))
            .unwrap();
        store
            .replace_wishlist(&json!({ "_id": "p4", "name": "four" }))
            .unwrap();

        let state = store.snapshot();
        let ids: Vec<_> = state
            .wishlist
            .items
            .iter()
            .map(|i| i.product_id.as_str())
            .collect();
        assert_eq!(ids, vec!["p2", "p3", "p4"]);
        assert_eq!(state.wishlist.items[0].name.as_deref(), Some("two v2"));
    }

    #[test]
    fn test_wishlist_is_not_persisted() {
        let (store, storage) = memory_store();
        store.replace_wishlist(&json!(["p1"])).unwrap();
        assert!(storage.snapshot().is_none());
    }

    #[test]
    fn test_restore_reads_persisted_cart() {
        let storage = Arc::new(MemoryCartStorage::with_items(vec![
            item("p1", 1, 100),
            item("p2", 2, 200),
        ]));
        let store = Store::restore(storage);
        assert_eq!(store.cart_count(), 3);
        assert_eq!(store.cart_total().amount(), Decimal::new(500, 2));
    }

    #[test]
    fn test_total_of_oversized_prices_does_not_panic() {
        let (store, _) = memory_store();
        store
            .replace_cart(&json!([
                { "productId": "p1", "qty": 2, "price": "79228162514264337593543950335" },
                { "productId": "p2", "qty": 1, "price": "1" },
            ]))
            .unwrap();
        assert_eq!(store.cart_count(), 3);
        assert_eq!(store.cart_total().amount(), Decimal::MAX);
    }

    #[tokio::test]
    async fn test_subscribers_are_notified() {
        let (store, _) = memory_store();
        let mut rx = store.subscribe();

        store.dispatch(Action::ReplaceCart(vec![item("p1", 1, 100)]));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().cart_count(), 1);
    }
}
