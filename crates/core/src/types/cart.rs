//! Cart line items.

use serde::{Deserialize, Serialize};

use super::id::{ProductId, SellerId};
use super::price::Price;
use super::status::LineStatus;

/// Denormalized seller information copied onto a cart line at sync time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerRef {
    pub id: Option<SellerId>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub status: LineStatus,
}

impl SellerRef {
    /// Placeholder used when the server sends no seller information.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            id: None,
            name: "Unknown".to_string(),
            email: String::new(),
            status: LineStatus::Cart,
        }
    }
}

impl Default for SellerRef {
    fn default() -> Self {
        Self::unknown()
    }
}

/// A single line of the cart.
///
/// `quantity` is always at least 1 while the line exists; a line whose
/// quantity drops to zero is removed, never kept at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: Price,
    pub quantity: u32,
    /// Advisory upper bound from the catalog at the last sync. `0` means the
    /// server did not report stock and no local limit applies.
    pub stock_ceiling: u32,
    #[serde(default)]
    pub seller: SellerRef,
}

impl CartItem {
    /// `quantity × unit_price`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }

    /// Whether one more unit would go past the known stock.
    #[must_use]
    pub const fn at_stock_ceiling(&self) -> bool {
        self.stock_ceiling > 0 && self.quantity >= self.stock_ceiling
    }

    #[must_use]
    pub fn would_exceed_stock(&self, quantity: u64) -> bool {
        self.stock_ceiling > 0 && quantity > u64::from(self.stock_ceiling)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn item(quantity: u32, stock_ceiling: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new("p1"),
            name: "Mug".to_string(),
            image: None,
            unit_price: Price::new(Decimal::new(250, 2)).unwrap(),
            quantity,
            stock_ceiling,
            seller: SellerRef::unknown(),
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(item(3, 5).line_total().amount(), Decimal::new(750, 2));
    }

    #[test]
    fn test_stock_ceiling_checks() {
        assert!(item(2, 2).at_stock_ceiling());
        assert!(!item(1, 2).at_stock_ceiling());
        assert!(item(2, 2).would_exceed_stock(3));
        assert!(!item(2, 2).would_exceed_stock(2));
        assert!(!item(9, 0).at_stock_ceiling());
        assert!(!item(9, 0).would_exceed_stock(100));
    }

    #[test]
    fn test_unknown_seller_defaults() {
        let seller = SellerRef::unknown();
        assert_eq!(seller.name, "Unknown");
        assert!(seller.id.is_none());
        assert_eq!(seller.status, LineStatus::Cart);
    }
}
