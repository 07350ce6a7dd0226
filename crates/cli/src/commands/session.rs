//! Login and logout.

use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

use bazaar_client::{LoginCredentials, Registration};
use bazaar_core::UserRole;

use super::{CliError, Context, output};

/// Sign in and print the token to export as `BAZAAR_API_TOKEN`.
pub async fn login(
    ctx: &Context,
    email: String,
    password: String,
    role: &str,
) -> Result<(), CliError> {
    let role = UserRole::from_str(role).map_err(CliError::InvalidArgument)?;
    let credentials = LoginCredentials {
        email,
        password: SecretString::from(password),
        role,
    };

    let user = ctx.storefront.login(&credentials).await?;
    output::message(ctx, &format!("Logged in as {} ({})", user.name, user.email));

    match ctx.storefront.gateway().api().current_token() {
        Some(token) => output::raw(&serde_json::json!({
            "token": token.expose_secret(),
        })),
        None => {
            output::message(ctx, "The server did not issue a bearer token");
            Ok(())
        }
    }
}

/// Create an account. Signs in too when the server issues a token.
pub async fn register(
    ctx: &Context,
    name: String,
    email: String,
    password: String,
    role: &str,
) -> Result<(), CliError> {
    let registration = Registration {
        name,
        email,
        password: SecretString::from(password),
        role: UserRole::from_str(role).map_err(CliError::InvalidArgument)?,
    };

    match ctx.storefront.register(&registration).await? {
        Some(user) => output::message(ctx, &format!("Registered and logged in as {}", user.email)),
        None => output::message(
            ctx,
            &format!("Registered {}, log in to continue", registration.email),
        ),
    }
    Ok(())
}

pub async fn logout(ctx: &Context) {
    if ctx.config.api_token.is_some() {
        let _ = ctx.storefront.restore_session().await;
    }
    ctx.storefront.logout().await;
    output::message(ctx, "Logged out");
}
