//! Terminal output.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use serde_json::{Value, json};

use bazaar_client::{CheckoutHandoff, PaymentSession, StoreState};
use bazaar_core::Product;

use super::{CliError, Context};

pub fn failure(err: &CliError) {
    eprintln!("error: {}", err.user_message());
}

pub fn cart(ctx: &Context, state: &StoreState) -> Result<(), CliError> {
    if ctx.json {
        let body = json!({
            "items": state.cart.items,
            "count": state.cart_count(),
            "total": state.cart_total().to_fixed_2(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if state.cart.items.is_empty() {
        println!("Your cart is empty");
        return Ok(());
    }
    for item in &state.cart.items {
        println!(
            "{:<26} {:<32} {:>3} x {:>10} = {:>10}",
            item.product_id,
            item.name,
            item.quantity,
            item.unit_price.display(),
            item.line_total().display(),
        );
    }
    println!(
        "{} item(s), total {}",
        state.cart_count(),
        state.cart_total().display()
    );
    Ok(())
}

pub fn wishlist(ctx: &Context, state: &StoreState) -> Result<(), CliError> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&state.wishlist.items)?);
        return Ok(());
    }

    if state.wishlist.items.is_empty() {
        println!("Your wishlist is empty");
        return Ok(());
    }
    for item in &state.wishlist.items {
        let price = item
            .price
            .map_or_else(|| "-".to_string(), |p| p.display());
        println!(
            "{:<26} {:<32} {:>10}",
            item.product_id,
            item.name.as_deref().unwrap_or("(unnamed)"),
            price
        );
    }
    Ok(())
}

pub fn products(ctx: &Context, products: &[&Product]) -> Result<(), CliError> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(products)?);
        return Ok(());
    }

    for product in products {
        let rating = product
            .rating
            .map_or_else(|| "-".to_string(), |r| format!("{r:.1}"));
        println!(
            "{:<26} {:<32} {:>10}  stock {:>4}  rating {:>3}",
            product.id,
            product.name,
            product.price.display(),
            product.stock,
            rating
        );
    }
    println!("{} product(s)", products.len());
    Ok(())
}

pub fn product(ctx: &Context, product: &Product) -> Result<(), CliError> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(product)?);
        return Ok(());
    }

    println!("{} ({})", product.name, product.id);
    println!("  price:  {}", product.price.display());
    println!("  stock:  {}", product.stock);
    if let Some(product_type) = &product.product_type {
        println!("  type:   {product_type}");
    }
    if let Some(color) = &product.color {
        println!("  color:  {color}");
    }
    if let Some(seller) = &product.seller {
        println!("  seller: {}", seller.name);
    }
    if let Some(description) = &product.description {
        println!();
        println!("{description}");
    }
    Ok(())
}

pub fn handoff(ctx: &Context, handoff: &CheckoutHandoff) -> Result<(), CliError> {
    let body = match handoff {
        CheckoutHandoff::Redirect(url) => json!({ "url": url.as_str() }),
        CheckoutHandoff::ProviderSession {
            session_id,
            publishable_key,
        } => json!({ "sessionId": session_id, "publishableKey": publishable_key }),
    };
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match handoff {
        CheckoutHandoff::Redirect(url) => println!("Continue to payment: {url}"),
        CheckoutHandoff::ProviderSession { session_id, .. } => {
            println!("Payment session created: {session_id}");
        }
    }
    Ok(())
}

pub fn payment_session(ctx: &Context, session: &PaymentSession) -> Result<(), CliError> {
    if ctx.json {
        let lines: Vec<Value> = session
            .line_items
            .iter()
            .map(|line| {
                json!({
                    "description": line.description,
                    "quantity": line.quantity,
                    "amountTotal": line.amount_total.map(|p| p.to_fixed_2()),
                })
            })
            .collect();
        let body = json!({
            "id": session.id,
            "paymentStatus": session.payment_status,
            "customerEmail": session.customer_email,
            "amountTotal": session.amount_total.map(|p| p.to_fixed_2()),
            "lineItems": lines,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let status = session
        .payment_status
        .map_or_else(|| "unknown".to_string(), |s| s.to_string());
    println!("Session {} ({status})", session.id);
    if let Some(email) = &session.customer_email {
        println!("  customer: {email}");
    }
    for line in &session.line_items {
        let amount = line
            .amount_total
            .map_or_else(|| "-".to_string(), |p| p.display());
        println!("  {:>3} x {:<32} {:>10}", line.quantity, line.description, amount);
    }
    if let Some(total) = session.amount_total {
        println!("  total: {}", total.display());
    }
    Ok(())
}

pub fn raw(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn message(ctx: &Context, text: &str) {
    if !ctx.json {
        println!("{text}");
    }
}
