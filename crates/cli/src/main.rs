//! Indian Flavour CLI - storefront and admin panel for the catering service.
//!
//! # Usage
//!
//! ```bash
//! # Browse the menu
//! flavour products
//!
//! # Sign in and build a cart
//! flavour login -e asha@example.com -p 'secret'
//! flavour cart add 5f1c1b2e-8d0e-4a7f-9a51-0a4c1f3e2b10
//! flavour cart inc 5f1c1b2e-8d0e-4a7f-9a51-0a4c1f3e2b10
//!
//! # Place the order
//! flavour checkout --address "12 MG Road, Pune" --contact "+91 98200 00000"
//!
//! # Admin panel
//! flavour admin dashboard
//! flavour admin orders status <order-id> completed
//! ```
//!
//! # Environment Variables
//!
//! - `FLAVOUR_BACKEND_URL` / `FLAVOUR_BACKEND_ANON_KEY` - hosted backend
//! - `FLAVOUR_STATE_DIR` - where the cart and session are saved
//! - `SENTRY_DSN` - optional error tracking
//! - `RUST_LOG` - log filter (logs go to stderr)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use indian_flavour_core::{OrderId, OrderStatus, ProductId};
use indian_flavour_storefront::AppState;
use indian_flavour_storefront::config::StorefrontConfig;
use indian_flavour_storefront::error::AppError;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "flavour")]
#[command(author, version, about = "Indian Flavour catering storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Display name
        #[arg(short, long)]
        name: String,
    },
    /// Sign out and forget the saved session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List the menu
    Products,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Place an order for the cart
    Checkout {
        /// Delivery address
        #[arg(long)]
        address: String,

        /// Contact phone number
        #[arg(long)]
        contact: String,

        /// Notes for the delivery driver
        #[arg(long)]
        instructions: Option<String>,
    },
    /// List your orders
    Orders,
    /// View or edit your profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
    /// Admin panel
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add one of a product
    Add { product_id: ProductId },
    /// Remove a product entirely
    Remove { product_id: ProductId },
    /// Set a product's quantity (0 removes it)
    Set { product_id: ProductId, quantity: u32 },
    /// Increase a product's quantity by one
    Inc { product_id: ProductId },
    /// Decrease a product's quantity by one
    Dec { product_id: ProductId },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the profile
    Show,
    /// Change the display name (blank clears it)
    SetName { name: String },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Order, revenue and customer totals
    Dashboard,
    /// Manage products
    Products {
        #[command(subcommand)]
        action: AdminProductAction,
    },
    /// Manage orders
    Orders {
        #[command(subcommand)]
        action: AdminOrderAction,
    },
}

#[derive(Subcommand)]
enum AdminProductAction {
    /// List all products
    List,
    /// Add a product
    Create {
        #[command(flatten)]
        fields: commands::admin::ProductFields,
    },
    /// Replace a product's details
    Update {
        id: ProductId,

        #[command(flatten)]
        fields: commands::admin::ProductFields,
    },
    /// Delete a product
    Delete { id: ProductId },
}

#[derive(Subcommand)]
enum AdminOrderAction {
    /// List all orders with customers and items
    List,
    /// Change an order's status
    Status { id: OrderId, status: OrderStatus },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
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
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            output::failure(&AppError::from(e).user_message());
            return ExitCode::from(2);
        }
    };

    // Sentry must be up before the subscriber so the layer has a client
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr; stdout is for command output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "indian_flavour_storefront=info,indian_flavour_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Return instead of exiting so the Sentry guard flushes on drop
    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            output::failure(&e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), AppError> {
    let state = AppState::new(config)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&state, &email, &password).await?;
        }
        Commands::Register {
            email,
            password,
            name,
        } => commands::account::register(&state, &email, &password, &name).await?,
        Commands::Logout => commands::account::logout(&state).await?,
        Commands::Whoami => commands::account::whoami(&state).await?,
        Commands::Products => commands::shop::products(&state).await?,
        Commands::Cart { action } => match action.unwrap_or(CartAction::Show) {
            CartAction::Show => commands::shop::show_cart(&state).await?,
            CartAction::Add { product_id } => commands::shop::add(&state, product_id).await?,
            CartAction::Remove { product_id } => {
                commands::shop::remove(&state, product_id).await?;
            }
            CartAction::Set {
                product_id,
                quantity,
            } => commands::shop::set_quantity(&state, product_id, quantity).await?,
            CartAction::Inc { product_id } => {
                commands::shop::increment(&state, product_id).await?;
            }
            CartAction::Dec { product_id } => {
                commands::shop::decrement(&state, product_id).await?;
            }
            CartAction::Clear => commands::shop::clear(&state).await?,
        },
        Commands::Checkout {
            address,
            contact,
            instructions,
        } => {
            commands::shop::checkout(&state, &address, &contact, instructions.as_deref()).await?;
        }
        Commands::Orders => commands::account::orders(&state).await?,
        Commands::Profile { action } => match action.unwrap_or(ProfileAction::Show) {
            ProfileAction::Show => commands::account::profile(&state).await?,
            ProfileAction::SetName { name } => commands::account::set_name(&state, &name).await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Dashboard => commands::admin::dashboard(&state).await?,
            AdminAction::Products { action } => match action {
                AdminProductAction::List => commands::admin::list_products(&state).await?,
                AdminProductAction::Create { fields } => {
                    commands::admin::create_product(&state, &fields).await?;
                }
                AdminProductAction::Update { id, fields } => {
                    commands::admin::update_product(&state, id, &fields).await?;
                }
                AdminProductAction::Delete { id } => {
                    commands::admin::delete_product(&state, id).await?;
                }
            },
            AdminAction::Orders { action } => match action {
                AdminOrderAction::List => commands::admin::list_orders(&state).await?,
                AdminOrderAction::Status { id, status } => {
                    commands::admin::update_order_status(&state, id, status).await?;
                }
            },
        },
    }
    Ok(())
}
