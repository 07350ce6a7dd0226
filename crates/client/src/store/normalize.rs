//! Normalization boundary for server payloads.
//!
//! The backend has returned the cart and the wishlist in several
//! incompatible shapes over time. Each payload is first classified into a
//! tagged union of known shapes; an unrecognized top-level shape is refused
//! as a whole, while an unrecognized *entry* is dropped so that one bad line
//! cannot corrupt the rest of the view.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use bazaar_core::{CartItem, LineStatus, Price, ProductId, SellerId, SellerRef, WishlistItem};

/// A payload whose top-level shape matches none of the known formats.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedPayload {
    #[error("unrecognized cart payload: {0}")]
    Cart(String),
    #[error("unrecognized wishlist payload: {0}")]
    Wishlist(String),
}

// =============================================================================
// Cart
// =============================================================================

/// Known cart payload shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CartPayload<'a> {
    /// `{ cart: { cartItems: [...] } }` and its relatives.
    Wrapped(&'a [Value]),
    /// A bare list of line entries.
    Flat(&'a [Value]),
    /// `null`, `{ cart: null }` or an explicitly empty cart.
    Empty,
}

impl<'a> CartPayload<'a> {
    /// Classify a raw cart payload.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload::Cart` for shapes that are not a cart.
    pub fn classify(value: &'a Value) -> Result<Self, MalformedPayload> {
        match value {
            Value::Null => Ok(Self::Empty),
            Value::Array(entries) => Ok(Self::Flat(entries)),
            Value::Object(obj) => {
                if let Some(inner) = obj.get("cart") {
                    return match inner {
                        Value::Null => Ok(Self::Empty),
                        Value::Array(entries) => Ok(Self::Wrapped(entries)),
                        Value::Object(cart) => {
                            cart_lines(cart).map(Self::Wrapped).ok_or_else(|| {
                                MalformedPayload::Cart(describe(inner))
                            })
                        }
                        other => Err(MalformedPayload::Cart(describe(other))),
                    };
                }
                cart_lines(obj)
                    .map(Self::Wrapped)
                    .ok_or_else(|| MalformedPayload::Cart(describe(value)))
            }
            other => Err(MalformedPayload::Cart(describe(other))),
        }
    }

    fn entries(self) -> &'a [Value] {
        match self {
            Self::Wrapped(entries) | Self::Flat(entries) => entries,
            Self::Empty => &[],
        }
    }
}

/// Line list of a cart object. A cart object with neither key is an empty
/// cart only when it is explicitly empty (`{}`), otherwise unrecognized.
fn cart_lines(cart: &Map<String, Value>) -> Option<&[Value]> {
    for key in ["cartItems", "items"] {
        match cart.get(key) {
            Some(Value::Array(entries)) => return Some(entries),
            Some(Value::Null) => return Some(&[][..]),
            Some(_) => return None,
            None => {}
        }
    }
    cart.is_empty().then_some(&[][..])
}

/// Map a raw cart payload to deduplicated cart lines.
///
/// Entries without a product identity, or whose quantity is not a positive
/// number, are dropped. A duplicated identity keeps the position of its first
/// occurrence and the values of its last.
///
/// # Errors
///
/// Returns `MalformedPayload::Cart` if the top-level shape is unrecognized.
pub fn normalize_cart(value: &Value) -> Result<Vec<CartItem>, MalformedPayload> {
    let payload = CartPayload::classify(value)?;

    let mut items: Vec<CartItem> = Vec::new();
    let mut positions: HashMap<ProductId, usize> = HashMap::new();

    for (index, entry) in payload.entries().iter().enumerate() {
        let Some(item) = cart_entry(entry) else {
            warn!(index, entry = %describe(entry), "Dropping unrecognized cart entry");
            continue;
        };
        if let Some(&pos) = positions.get(&item.product_id) {
            if let Some(slot) = items.get_mut(pos) {
                *slot = item;
            }
        } else {
            positions.insert(item.product_id.clone(), items.len());
            items.push(item);
        }
    }

    Ok(items)
}

fn cart_entry(entry: &Value) -> Option<CartItem> {
    let obj = entry.as_object()?;
    let product = obj.get("product");
    let product_obj = product.and_then(Value::as_object);

    let product_id = product_obj
        .and_then(identity_of)
        .or_else(|| product.and_then(id_value))
        .or_else(|| obj.get("productId").and_then(id_value))?;

    let quantity = obj
        .get("qty")
        .or_else(|| obj.get("quantity"))
        .and_then(decimal_value)
        .and_then(|q| q.trunc().to_u32())
        .unwrap_or(0);
    if quantity == 0 {
        return None;
    }

    let name = product_first(obj, product_obj, "name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let image = product_first(obj, product_obj, "image")
        .and_then(Value::as_str)
        .map(String::from);
    let unit_price = entry_first(obj, product_obj, "price").map_or_else(Price::zero, price_value);
    let stock_ceiling = entry_first(obj, product_obj, "stock")
        .and_then(decimal_value)
        .and_then(|s| s.trunc().to_u32())
        .unwrap_or(0);

    let mut seller = obj
        .get("seller")
        .filter(|v| !v.is_null())
        .or_else(|| product_obj.and_then(|p| p.get("seller")))
        .and_then(seller_value)
        .unwrap_or_else(SellerRef::unknown);
    seller.status = obj
        .get("seller")
        .and_then(|s| s.get("status"))
        .or_else(|| obj.get("status"))
        .and_then(Value::as_str)
        .map_or(LineStatus::Cart, line_status);

    Some(CartItem {
        product_id,
        name,
        image,
        unit_price,
        quantity,
        stock_ceiling,
        seller,
    })
}

/// Display fields come from the embedded product when present.
fn product_first<'a>(
    entry: &'a Map<String, Value>,
    product: Option<&'a Map<String, Value>>,
    key: &str,
) -> Option<&'a Value> {
    product
        .and_then(|p| p.get(key))
        .filter(|v| !v.is_null())
        .or_else(|| entry.get(key))
}

/// Line-level values (price, stock) override the product's.
fn entry_first<'a>(
    entry: &'a Map<String, Value>,
    product: Option<&'a Map<String, Value>>,
    key: &str,
) -> Option<&'a Value> {
    entry
        .get(key)
        .filter(|v| !v.is_null())
        .or_else(|| product.and_then(|p| p.get(key)))
}

pub(crate) fn seller_value(value: &Value) -> Option<SellerRef> {
    match value {
        Value::Object(obj) => Some(SellerRef {
            id: identity_value(obj).map(SellerId::new),
            name: obj
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            email: obj
                .get("email")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            status: LineStatus::Cart,
        }),
        other => id_string(other).map(|id| SellerRef {
            id: Some(SellerId::new(id)),
            ..SellerRef::unknown()
        }),
    }
}

fn line_status(raw: &str) -> LineStatus {
    LineStatus::from_str(raw).unwrap_or_else(|e| {
        warn!(error = %e, "Unknown line status, treating as cart");
        LineStatus::Cart
    })
}

// =============================================================================
// Wishlist
// =============================================================================

/// Known wishlist payload shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WishlistPayload {
    /// A full list (bare array or wrapped); replaces the wishlist.
    Items(Vec<WishlistItem>),
    /// One product; merged into the wishlist (or removed, on the remove path).
    Single(WishlistItem),
    /// A bare id string. The remove endpoint answers with the removed id.
    Id(ProductId),
    /// No usable body.
    Empty,
}

/// Classify and normalize a raw wishlist payload.
///
/// # Errors
///
/// Returns `MalformedPayload::Wishlist` if the top-level shape is unrecognized.
pub fn normalize_wishlist(value: &Value) -> Result<WishlistPayload, MalformedPayload> {
    match value {
        Value::Null => Ok(WishlistPayload::Empty),
        Value::Array(entries) => Ok(WishlistPayload::Items(wishlist_entries(entries))),
        Value::String(_) | Value::Number(_) => id_value(value)
            .map(WishlistPayload::Id)
            .ok_or_else(|| MalformedPayload::Wishlist(describe(value))),
        Value::Object(obj) => {
            if let Some(inner) = obj.get("wishlist") {
                return match inner {
                    Value::Null => Ok(WishlistPayload::Items(Vec::new())),
                    Value::Array(entries) => Ok(WishlistPayload::Items(wishlist_entries(entries))),
                    Value::Object(list) => list_of(list)
                        .map(|entries| WishlistPayload::Items(wishlist_entries(entries)))
                        .ok_or_else(|| MalformedPayload::Wishlist(describe(inner))),
                    other => Err(MalformedPayload::Wishlist(describe(other))),
                };
            }
            if let Some(entries) = list_of(obj) {
                return Ok(WishlistPayload::Items(wishlist_entries(entries)));
            }
            wishlist_entry(value)
                .map(WishlistPayload::Single)
                .ok_or_else(|| MalformedPayload::Wishlist(describe(value)))
        }
        Value::Bool(_) => Err(MalformedPayload::Wishlist(describe(value))),
    }
}

impl WishlistPayload {
    /// Read the payload as a complete wishlist.
    #[must_use]
    pub fn into_items(self) -> Vec<WishlistItem> {
        match self {
            Self::Items(items) => items,
            Self::Single(item) => vec![item],
            Self::Id(product_id) => vec![WishlistItem::bare(product_id)],
            Self::Empty => Vec::new(),
        }
    }
}

fn list_of(obj: &Map<String, Value>) -> Option<&[Value]> {
    ["products", "items"]
        .into_iter()
        .find_map(|key| obj.get(key).and_then(Value::as_array))
        .map(Vec::as_slice)
}

/// Deduplicate by identity; most recent data for an id wins.
fn wishlist_entries(entries: &[Value]) -> Vec<WishlistItem> {
    let mut items: Vec<WishlistItem> = Vec::new();
    let mut positions: HashMap<ProductId, usize> = HashMap::new();

    for (index, entry) in entries.iter().enumerate() {
        let Some(item) = wishlist_entry(entry) else {
            warn!(index, entry = %describe(entry), "Dropping unrecognized wishlist entry");
            continue;
        };
        if let Some(&pos) = positions.get(&item.product_id) {
            if let Some(slot) = items.get_mut(pos) {
                *slot = item;
            }
        } else {
            positions.insert(item.product_id.clone(), items.len());
            items.push(item);
        }
    }

    items
}

fn wishlist_entry(entry: &Value) -> Option<WishlistItem> {
    if let Some(id) = id_value(entry) {
        return Some(WishlistItem::bare(id));
    }

    let outer = entry.as_object()?;
    let obj = outer
        .get("product")
        .and_then(Value::as_object)
        .unwrap_or(outer);
    let product_id = identity_of(obj)
        .or_else(|| outer.get("product").and_then(id_value))
        .or_else(|| outer.get("productId").and_then(id_value))?;

    Some(WishlistItem {
        product_id,
        name: obj.get("name").and_then(Value::as_str).map(String::from),
        image: obj.get("image").and_then(Value::as_str).map(String::from),
        price: obj.get("price").filter(|v| !v.is_null()).map(price_value),
        stock: obj
            .get("stock")
            .and_then(decimal_value)
            .and_then(|s| s.trunc().to_u32()),
    })
}

// =============================================================================
// Scalar coercion
// =============================================================================

/// `_id` takes precedence over `id`.
fn identity_value(obj: &Map<String, Value>) -> Option<String> {
    obj.get("_id")
        .and_then(id_string)
        .or_else(|| obj.get("id").and_then(id_string))
}

fn identity_of(obj: &Map<String, Value>) -> Option<ProductId> {
    identity_value(obj).map(ProductId::new)
}

fn id_value(value: &Value) -> Option<ProductId> {
    id_string(value).map(ProductId::new)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers and numeric strings.
pub(crate) fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Absent, malformed or negative prices coerce to zero.
pub(crate) fn price_value(value: &Value) -> Price {
    decimal_value(value)
        .and_then(|amount| Price::new(amount).ok())
        .unwrap_or_else(|| {
            warn!(value = %describe(value), "Unusable price, defaulting to 0");
            Price::zero()
        })
}

fn describe(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 120 {
        format!("{}…", text.chars().take(120).collect::<String>())
    } else {
        text
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    fn line(id: &str, qty: u32, price: f64) -> Value {
        json!({
            "product": {
                "_id": id,
                "name": format!("Product {id}"),
                "image": "img.png",
                "price": price,
                "stock": 5,
            },
            "qty": qty,
            "price": price,
        })
    }

    #[test]
    fn test_nested_and_flat_shapes_normalize_identically() {
        let nested = json!({ "cart": { "cartItems": [line("p1", 2, 9.5)] } });
        let flat = json!([line("p1", 2, 9.5)]);

        let a = normalize_cart(&nested).unwrap();
        let b = normalize_cart(&flat).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].product_id, ProductId::new("p1"));
        assert_eq!(a[0].quantity, 2);
        assert_eq!(a[0].unit_price.amount(), Decimal::new(95, 1));
        assert_eq!(a[0].stock_ceiling, 5);
        assert_eq!(a[0].name, "Product p1");
    }

    #[test]
    fn test_other_known_cart_shapes() {
        for payload in [
            json!({ "cart": { "items": [line("p1", 1, 1.0)] } }),
            json!({ "cart": [line("p1", 1, 1.0)] }),
            json!({ "cartItems": [line("p1", 1, 1.0)] }),
        ] {
            assert_eq!(normalize_cart(&payload).unwrap().len(), 1, "{payload}");
        }
    }

    #[test]
    fn test_empty_cart_shapes() {
        for payload in [
            Value::Null,
            json!({ "cart": null }),
            json!({ "cart": {} }),
            json!({ "cart": { "cartItems": [] } }),
            json!([]),
        ] {
            assert!(normalize_cart(&payload).unwrap().is_empty(), "{payload}");
        }
    }

    #[test]
    fn test_unrecognized_cart_shape_is_refused() {
        assert!(matches!(
            normalize_cart(&json!({ "status": "ok" })),
            Err(MalformedPayload::Cart(_))
        ));
        assert!(normalize_cart(&json!("cart")).is_err());
        assert!(normalize_cart(&json!({ "cart": { "cartItems": "nope" } })).is_err());
    }

    #[test]
    fn test_malformed_entries_are_dropped() {
        let payload = json!([
            line("p1", 1, 3.0),
            { "qty": 2 },
            "garbage",
            { "productId": "p2", "qty": 0 },
            line("p3", 1, 4.0),
        ]);
        let items = normalize_cart(&payload).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
    }

    #[test]
    fn test_numeric_coercion() {
        let payload = json!([
            { "productId": "p1", "qty": "3", "price": "12.50", "stock": "7", "name": "Mug" },
            { "productId": 42, "quantity": 1.0, "price": "n/a" },
        ]);
        let items = normalize_cart(&payload).unwrap();
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].unit_price.amount(), Decimal::new(1250, 2));
        assert_eq!(items[0].stock_ceiling, 7);
        assert_eq!(items[1].product_id, ProductId::new("42"));
        assert_eq!(items[1].unit_price, Price::zero());
        assert_eq!(items[1].stock_ceiling, 0);
    }

    #[test]
    fn test_duplicate_identities_collapse() {
        let payload = json!([line("p1", 1, 2.0), line("p2", 1, 2.0), line("p1", 4, 2.0)]);
        let items = normalize_cart(&payload).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_id, ProductId::new("p1"));
        assert_eq!(items[0].quantity, 4);
    }

    #[test]
    fn test_seller_fallbacks() {
        let payload = json!([
            {
                "productId": "p1", "qty": 1,
                "seller": {
                    "_id": "s1", "name": "Ada", "email": "ada@example.com", "status": "shipped"
                }
            },
            {
                "product": { "id": "p2", "seller": { "id": "s2", "name": "Bob" } },
                "qty": 1
            },
            { "product": { "_id": "p3", "seller": "s3" }, "qty": 1 },
            { "productId": "p4", "qty": 1 },
        ]);
        let items = normalize_cart(&payload).unwrap();

        assert_eq!(items[0].seller.id, Some(SellerId::new("s1")));
        assert_eq!(items[0].seller.status, LineStatus::Shipped);
        assert_eq!(items[1].seller.name, "Bob");
        assert_eq!(items[1].seller.status, LineStatus::Cart);
        assert_eq!(items[2].seller.id, Some(SellerId::new("s3")));
        assert_eq!(items[2].seller.name, "Unknown");
        assert_eq!(items[3].seller, SellerRef::unknown());
    }

    #[test]
    fn test_entry_price_preferred_over_product_price() {
        let payload = json!([{ "product": { "_id": "p1", "price": 10 }, "price": 8, "qty": 1 }]);
        let items = normalize_cart(&payload).unwrap();
        assert_eq!(items[0].unit_price.amount(), Decimal::new(8, 0));
    }

    #[test]
    fn test_wishlist_shapes() {
        let p1 = json!({ "_id": "p1", "name": "Lamp", "price": 20 });
        let p2 = json!({ "id": "p2", "name": "Rug" });

        assert!(matches!(
            normalize_wishlist(&json!([p1.clone(), "p3"])).unwrap(),
            WishlistPayload::Items(items) if items.len() == 2 && items[1].is_bare()
        ));
        assert!(matches!(
            normalize_wishlist(&json!({ "wishlist": [p2] })).unwrap(),
            WishlistPayload::Items(items) if items[0].product_id.as_str() == "p2"
        ));
        assert!(matches!(
            normalize_wishlist(&json!({ "wishlist": { "products": [p1.clone()] } })).unwrap(),
            WishlistPayload::Items(items) if items.len() == 1
        ));
        assert!(matches!(
            normalize_wishlist(&p1).unwrap(),
            WishlistPayload::Single(item) if item.name.as_deref() == Some("Lamp")
        ));
        assert_eq!(
            normalize_wishlist(&json!("p9")).unwrap(),
            WishlistPayload::Id(ProductId::new("p9"))
        );
        assert_eq!(normalize_wishlist(&Value::Null).unwrap(), WishlistPayload::Empty);
    }

    #[test]
    fn test_wishlist_entry_forms() {
        let payload = json!([
            { "product": { "_id": "p1", "name": "Lamp" } },
            { "productId": "p2" },
            "p3",
            { "name": "no identity" },
        ]);
        let WishlistPayload::Items(items) = normalize_wishlist(&payload).unwrap() else {
            panic!("expected items");
        };
        let ids: Vec<_> = items.iter().map(|i| i.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_wishlist_dedup_keeps_latest_data() {
        let payload = json!([
            { "_id": "p1", "name": "Old" },
            { "_id": "p1", "name": "New" },
        ]);
        let WishlistPayload::Items(items) = normalize_wishlist(&payload).unwrap() else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name.as_deref(), Some("New"));
    }

    #[test]
    fn test_unrecognized_wishlist_shape() {
        assert!(normalize_wishlist(&json!({ "ok": true })).is_err());
        assert!(normalize_wishlist(&json!(true)).is_err());
        assert!(normalize_wishlist(&json!({ "wishlist": 5 })).is_err());
    }
}
