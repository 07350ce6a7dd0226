//! Checkout commands.

use bazaar_core::{CheckoutSessionId, OrderId};

use super::{CliError, Context, output};

pub async fn checkout(ctx: &Context, order_id: Option<&str>) -> Result<(), CliError> {
    ctx.signed_in().await?;
    let handoff = ctx.storefront.checkout(order_id.map(OrderId::new)).await?;
    output::handoff(ctx, &handoff)
}

pub async fn payment_session(ctx: &Context, session_id: &str) -> Result<(), CliError> {
    if session_id.trim().is_empty() {
        return Err(CliError::InvalidArgument("session id is empty".to_string()));
    }
    // A token is optional here; send it when one is configured
    let _ = ctx.storefront.restore_session().await;
    let session = ctx
        .storefront
        .payment_session(&CheckoutSessionId::new(session_id))
        .await?;
    output::payment_session(ctx, &session)
}
