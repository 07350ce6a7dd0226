//! Checkout handoff to the payment provider.
//!
//! The client assembles a checkout payload from the current cart, posts it to
//! the payment gateway, and gets back either a redirect URL or a provider
//! session id (plus publishable key) for the provider's client library.

use serde::Serialize;
use serde_json::Value;
use url::Url;

use bazaar_core::{CartItem, CheckoutSessionId, OrderId, PaymentStatus, Price, SellerRef, UserId};

/// One checkout line, as the payment gateway expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutLineItem {
    pub id: String,
    pub name: String,
    pub qty: u32,
    /// Per-unit price as a two-decimal string.
    pub price: String,
    pub seller: SellerRef,
}

impl From<&CartItem> for CheckoutLineItem {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.product_id.to_string(),
            name: item.name.clone(),
            qty: item.quantity.max(1),
            price: item.unit_price.to_fixed_2(),
            seller: item.seller.clone(),
        }
    }
}

/// Body of `POST /payments/create-checkout-session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutRequest {
    #[must_use]
    pub fn from_cart(
        items: &[CartItem],
        user_id: Option<UserId>,
        order_id: Option<OrderId>,
        success_url: String,
        cancel_url: String,
    ) -> Self {
        Self {
            items: items.iter().map(CheckoutLineItem::from).collect(),
            user_id,
            order_id,
            success_url,
            cancel_url,
        }
    }
}

/// Where to send the user to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutHandoff {
    /// Hosted checkout page.
    Redirect(Url),
    /// Session to open with the provider's client library.
    ProviderSession {
        session_id: CheckoutSessionId,
        publishable_key: String,
    },
}

impl CheckoutHandoff {
    /// Interpret the gateway response. `None` for anything unrecognized.
    #[must_use]
    pub fn from_response(payload: &Value) -> Option<Self> {
        if let Some(url) = payload
            .get("url")
            .and_then(Value::as_str)
            .and_then(|s| Url::parse(s).ok())
        {
            return Some(Self::Redirect(url));
        }

        let session_id = payload.get("sessionId").and_then(Value::as_str)?;
        let publishable_key = payload.get("publishableKey").and_then(Value::as_str)?;
        if session_id.is_empty() || publishable_key.is_empty() {
            return None;
        }
        Some(Self::ProviderSession {
            session_id: CheckoutSessionId::new(session_id),
            publishable_key: publishable_key.to_string(),
        })
    }
}

/// A purchased line as reported by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLine {
    pub description: String,
    pub quantity: u32,
    pub amount_total: Option<Price>,
}

/// Payment provider session shown on the checkout-success page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub id: CheckoutSessionId,
    pub payment_status: Option<PaymentStatus>,
    pub customer_email: Option<String>,
    pub amount_total: Option<Price>,
    pub line_items: Vec<PaymentLine>,
}

impl PaymentSession {
    /// Parse a provider session object. Amounts arrive in minor units.
    #[must_use]
    pub fn from_response(payload: &Value) -> Option<Self> {
        let id = payload.get("id").and_then(Value::as_str)?;

        let payment_status = payload
            .get("payment_status")
            .cloned()
            .and_then(|v| serde_json::from_value::<PaymentStatus>(v).ok());

        let customer_email = payload
            .pointer("/customer_details/email")
            .and_then(Value::as_str)
            .or_else(|| payload.get("customer_email").and_then(Value::as_str))
            .map(String::from);

        let amount_total = payload
            .get("amount_total")
            .and_then(Value::as_u64)
            .or_else(|| payload.pointer("/total_details/amount").and_then(Value::as_u64))
            .map(Price::from_minor_units);

        let line_items = payload
            .pointer("/line_items/data")
            .and_then(Value::as_array)
            .map(|lines| lines.iter().filter_map(parse_payment_line).collect())
            .unwrap_or_default();

        Some(Self {
            id: CheckoutSessionId::new(id),
            payment_status,
            customer_email,
            amount_total,
            line_items,
        })
    }

    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == Some(PaymentStatus::Paid)
    }
}

fn parse_payment_line(line: &Value) -> Option<PaymentLine> {
    let description = line
        .get("description")
        .and_then(Value::as_str)
        .or_else(|| line.pointer("/price/product/name").and_then(Value::as_str))?
        .to_string();
    let quantity = line
        .get("quantity")
        .and_then(Value::as_u64)
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(1);
    let amount_total = line
        .get("amount_total")
        .and_then(Value::as_u64)
        .map(Price::from_minor_units)
        .or_else(|| {
            let unit = line.pointer("/price/unit_amount").and_then(Value::as_u64)?;
            Some(Price::from_minor_units(unit).times(quantity))
        });

    Some(PaymentLine {
        description,
        quantity,
        amount_total,
    })
}
