//! Catalog commands.

use bazaar_client::{ProductFilter, ProductQuery};
use bazaar_core::ProductId;

use super::{CliError, Context, output};

/// List products. The type/color/price part of the filter is sent to the
/// server's filter endpoint when set; the rating threshold is applied
/// locally.
pub async fn list(
    ctx: &Context,
    query: &ProductQuery,
    filter: &ProductFilter,
) -> Result<(), CliError> {
    let server_side = filter.product_type.is_some()
        || filter.color.is_some()
        || filter.min_price.is_some()
        || filter.max_price.is_some();

    let products = if server_side {
        ctx.signed_in().await?;
        ctx.catalog.filter_products(filter).await?
    } else {
        ctx.catalog.list_products(query).await?
    };

    output::products(ctx, &filter.apply(&products))
}

pub async fn get(ctx: &Context, product_id: &str) -> Result<(), CliError> {
    let product = ctx.catalog.get_product(&ProductId::new(product_id)).await?;
    output::product(ctx, &product)
}

pub async fn reports(ctx: &Context) -> Result<(), CliError> {
    ctx.signed_in().await?;
    let report = ctx.catalog.seller_reports().await?;
    output::raw(&report)
}
