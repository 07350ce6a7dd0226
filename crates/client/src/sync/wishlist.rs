//! Wishlist operations.

use tracing::{debug, instrument};

use bazaar_core::{ProductId, WishlistItem};

use super::Storefront;
use crate::error::SyncError;
use crate::gateway::Gateway;
use crate::store::{Action, PendingKey, WishlistPayload, normalize_wishlist};

impl<G: Gateway> Storefront<G> {
    /// Replace the local wishlist with the server's.
    ///
    /// # Errors
    ///
    /// `LoginRequired`, `Malformed` for an unrecognized payload, or any
    /// gateway failure.
    #[instrument(skip_all)]
    pub async fn fetch_wishlist(&self) -> Result<(), SyncError> {
        const OP: &str = "fetch_wishlist";
        let user = self.require_user().map_err(|e| self.fail(OP, e))?;

        let _pending = self.pending(PendingKey::WishlistFetch);
        let payload = self
            .gateway
            .fetch_wishlist(&user.id)
            .await
            .map_err(|e| self.fail(OP, e.into()))?;
        let items = normalize_wishlist(&payload)
            .map_err(|e| self.fail(OP, e.into()))?
            .into_items();
        debug!(items = items.len(), "Replacing wishlist");
        self.store.dispatch(Action::ReplaceWishlist(items));
        Ok(())
    }

    /// Add a product to the wishlist.
    ///
    /// # Errors
    ///
    /// `LoginRequired`, `Malformed`, or any gateway failure.
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub async fn add_to_wishlist(&self, product_id: &ProductId) -> Result<(), SyncError> {
        const OP: &str = "add_to_wishlist";
        let user = self.require_user().map_err(|e| self.fail(OP, e))?;

        let _lock = self.lock(product_id).await;
        let _pending = self.pending(PendingKey::Wishlist(product_id.clone()));
        let payload = self
            .gateway
            .add_to_wishlist(&user.id, product_id)
            .await
            .map_err(|e| self.fail(OP, e.into()))?;

        let applied = self
            .store
            .replace_wishlist(&payload)
            .map_err(|e| self.fail(OP, e.into()))?;
        if applied == WishlistPayload::Empty {
            debug!("Empty wishlist response, recording the product locally");
            self.store
                .dispatch(Action::MergeWishlistItem(WishlistItem::bare(product_id.clone())));
        }
        Ok(())
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// `LoginRequired`, `Malformed`, or any gateway failure.
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub async fn remove_from_wishlist(&self, product_id: &ProductId) -> Result<(), SyncError> {
        const OP: &str = "remove_from_wishlist";
        let user = self.require_user().map_err(|e| self.fail(OP, e))?;

        let _lock = self.lock(product_id).await;
        let _pending = self.pending(PendingKey::Wishlist(product_id.clone()));
        let payload = self
            .gateway
            .remove_from_wishlist(&user.id, product_id)
            .await
            .map_err(|e| self.fail(OP, e.into()))?;

        // The remove endpoint answers with the updated list, the removed
        // product or just its id
        let action = match normalize_wishlist(&payload).map_err(|e| self.fail(OP, e.into()))? {
            WishlistPayload::Items(items) => Action::ReplaceWishlist(items),
            WishlistPayload::Single(item) => Action::RemoveWishlistItem(item.product_id),
            WishlistPayload::Id(removed) => Action::RemoveWishlistItem(removed),
            WishlistPayload::Empty => Action::RemoveWishlistItem(product_id.clone()),
        };
        self.store.dispatch(action);
        Ok(())
    }

    /// Add the product if absent, remove it otherwise. Returns whether the
    /// product is wishlisted afterwards.
    ///
    /// # Errors
    ///
    /// See [`Self::add_to_wishlist`] and [`Self::remove_from_wishlist`].
    pub async fn toggle_wishlist(&self, product_id: &ProductId) -> Result<bool, SyncError> {
        if self.store.read(|s| s.in_wishlist(product_id)) {
            self.remove_from_wishlist(product_id).await?;
        } else {
            self.add_to_wishlist(product_id).await?;
        }
        Ok(self.store.read(|s| s.in_wishlist(product_id)))
    }
}
