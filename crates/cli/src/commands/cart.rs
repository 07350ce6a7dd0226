//! Cart commands.
//!
//! Every command resumes the session first, so the cart shown is the
//! server's.

use bazaar_core::ProductId;

use super::{CliError, Context, output};

pub async fn show(ctx: &Context) -> Result<(), CliError> {
    ctx.signed_in().await?;
    output::cart(ctx, &ctx.storefront.store().snapshot())
}

pub async fn add(ctx: &Context, product_id: &str, qty: u32) -> Result<(), CliError> {
    ctx.signed_in().await?;
    ctx.storefront
        .add_item(&ProductId::new(product_id), qty)
        .await?;
    output::cart(ctx, &ctx.storefront.store().snapshot())
}

pub async fn remove(ctx: &Context, product_id: &str) -> Result<(), CliError> {
    ctx.signed_in().await?;
    ctx.storefront
        .remove_item(&ProductId::new(product_id))
        .await?;
    output::cart(ctx, &ctx.storefront.store().snapshot())
}

pub async fn update(ctx: &Context, product_id: &str, qty: i64) -> Result<(), CliError> {
    ctx.signed_in().await?;
    ctx.storefront
        .update_quantity(&ProductId::new(product_id), qty)
        .await?;
    output::cart(ctx, &ctx.storefront.store().snapshot())
}

pub async fn increment(ctx: &Context, product_id: &str) -> Result<(), CliError> {
    ctx.signed_in().await?;
    ctx.storefront
        .increment(&ProductId::new(product_id))
        .await?;
    output::cart(ctx, &ctx.storefront.store().snapshot())
}

pub async fn decrement(ctx: &Context, product_id: &str) -> Result<(), CliError> {
    ctx.signed_in().await?;
    ctx.storefront
        .decrement(&ProductId::new(product_id))
        .await?;
    output::cart(ctx, &ctx.storefront.store().snapshot())
}

pub async fn clear(ctx: &Context) -> Result<(), CliError> {
    ctx.signed_in().await?;
    ctx.storefront.clear_cart().await?;
    output::cart(ctx, &ctx.storefront.store().snapshot())
}
