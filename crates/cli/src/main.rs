//! Bazaar CLI - drive the storefront client against a live backend.
//!
//! # Usage
//!
//! ```bash
//! # Sign in and print a token to export as BAZAAR_API_TOKEN
//! bazaar login -e ada@example.com
//!
//! # Cart
//! bazaar cart show
//! bazaar cart add 64f1c0ffee --qty 2
//! bazaar cart update 64f1c0ffee 0
//!
//! # Browse the catalog
//! bazaar products list --type Electronics --min-rating 4
//!
//! # Start a checkout
//! bazaar checkout
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and change the cart
//! - `wishlist` - Show and change the wishlist
//! - `products` - Read the public catalog
//! - `checkout` - Create a payment session for the cart
//! - `payment-session` - Look up a payment session
//! - `login` / `logout` - Manage the session

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bazaar_client::ClientConfig;

mod commands;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar storefront client")]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show and change the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Read the public catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Create a payment session for the current cart
    Checkout {
        /// Existing order to pay for
        #[arg(long)]
        order_id: Option<String>,
    },
    /// Look up a payment session after checkout
    PaymentSession {
        /// Provider session id
        session_id: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "BAZAAR_PASSWORD", hide_env_values = true)]
        password: String,

        /// Account role (`buyer`, `seller`)
        #[arg(short, long, default_value = "buyer")]
        role: String,
    },
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "BAZAAR_PASSWORD", hide_env_values = true)]
        password: String,

        /// Account role (`buyer`, `seller`, `admin`)
        #[arg(short, long, default_value = "buyer")]
        role: String,
    },
    /// Sign out and forget the local cart
    Logout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show,
    /// Add a product
    Add {
        product_id: String,
        #[arg(short, long, default_value_t = 1)]
        qty: u32,
    },
    /// Remove a product
    Remove { product_id: String },
    /// Set a product's quantity (0 or less removes it)
    Update {
        product_id: String,
        #[arg(allow_negative_numbers = true)]
        qty: i64,
    },
    /// One more unit
    Increment { product_id: String },
    /// One unit less
    Decrement { product_id: String },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Print the wishlist
    Show,
    /// Add a product
    Add { product_id: String },
    /// Remove a product
    Remove { product_id: String },
    /// Add or remove a product
    Toggle { product_id: String },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products, optionally filtered
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        /// Product type
        #[arg(long = "type")]
        product_type: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        min_rating: Option<f64>,
        #[arg(long)]
        max_price: Option<rust_decimal::Decimal>,
    },
    /// Show one product
    Get { product_id: String },
    /// Seller sales report (raw)
    Reports,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration is needed for Sentry, which must start before tracing
    let config = ClientConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_client=info,bazaar_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "Command failed");
        commands::output::failure(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CliError> {
    let ctx = Context::new(config, cli.json)?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx).await?,
            CartAction::Add { product_id, qty } => {
                commands::cart::add(&ctx, &product_id, qty).await?;
            }
            CartAction::Remove { product_id } => commands::cart::remove(&ctx, &product_id).await?,
            CartAction::Update { product_id, qty } => {
                commands::cart::update(&ctx, &product_id, qty).await?;
            }
            CartAction::Increment { product_id } => {
                commands::cart::increment(&ctx, &product_id).await?;
            }
            CartAction::Decrement { product_id } => {
                commands::cart::decrement(&ctx, &product_id).await?;
            }
            CartAction::Clear => commands::cart::clear(&ctx).await?,
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Show => commands::wishlist::show(&ctx).await?,
            WishlistAction::Add { product_id } => {
                commands::wishlist::add(&ctx, &product_id).await?;
            }
            WishlistAction::Remove { product_id } => {
                commands::wishlist::remove(&ctx, &product_id).await?;
            }
            WishlistAction::Toggle { product_id } => {
                commands::wishlist::toggle(&ctx, &product_id).await?;
            }
        },
        Commands::Products { action } => match action {
            ProductsAction::List {
                search,
                category,
                page,
                limit,
                product_type,
                color,
                min_rating,
                max_price,
            } => {
                let query = bazaar_client::ProductQuery {
                    search,
                    category,
                    page,
                    limit,
                };
                let filter = bazaar_client::ProductFilter {
                    product_type,
                    color,
                    min_rating,
                    max_price,
                    ..Default::default()
                };
                commands::products::list(&ctx, &query, &filter).await?;
            }
            ProductsAction::Get { product_id } => commands::products::get(&ctx, &product_id).await?,
            ProductsAction::Reports => commands::products::reports(&ctx).await?,
        },
        Commands::Checkout { order_id } => {
            commands::checkout::checkout(&ctx, order_id.as_deref()).await?;
        }
        Commands::PaymentSession { session_id } => {
            commands::checkout::payment_session(&ctx, &session_id).await?;
        }
        Commands::Register {
            name,
            email,
            password,
            role,
        } => commands::session::register(&ctx, name, email, password, &role).await?,
        Commands::Login {
            email,
            password,
            role,
        } => commands::session::login(&ctx, email, password, &role).await?,
        Commands::Logout => commands::session::logout(&ctx).await,
    }
    Ok(())
}
