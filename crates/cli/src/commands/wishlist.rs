//! Wishlist commands.

use bazaar_core::ProductId;

use super::{CliError, Context, output};

pub async fn show(ctx: &Context) -> Result<(), CliError> {
    ctx.signed_in().await?;
    output::wishlist(ctx, &ctx.storefront.store().snapshot())
}

pub async fn add(ctx: &Context, product_id: &str) -> Result<(), CliError> {
    ctx.signed_in().await?;
    ctx.storefront
        .add_to_wishlist(&ProductId::new(product_id))
        .await?;
    output::wishlist(ctx, &ctx.storefront.store().snapshot())
}

pub async fn remove(ctx: &Context, product_id: &str) -> Result<(), CliError> {
    ctx.signed_in().await?;
    ctx.storefront
        .remove_from_wishlist(&ProductId::new(product_id))
        .await?;
    output::wishlist(ctx, &ctx.storefront.store().snapshot())
}

pub async fn toggle(ctx: &Context, product_id: &str) -> Result<(), CliError> {
    ctx.signed_in().await?;
    let wishlisted = ctx
        .storefront
        .toggle_wishlist(&ProductId::new(product_id))
        .await?;
    output::message(
        ctx,
        if wishlisted {
            "Added to wishlist"
        } else {
            "Removed from wishlist"
        },
    );
    output::wishlist(ctx, &ctx.storefront.store().snapshot())
}
