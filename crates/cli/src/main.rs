//! Craftify CLI - a terminal client for the Craftify marketplace.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password from CRAFTIFY_PASSWORD or the first line of stdin)
//! craftify login -u maker
//!
//! # Browse and buy
//! craftify items
//! craftify cart add 7 -q 2
//! craftify cart show
//! craftify cart remove 3
//! craftify cart remove --item 7
//! craftify checkout --name "Ada" --address "1 Loom Lane" --city Portland \
//!     --state OR --zip 97201 --country US --card-expiry 12/29
//!
//! # Selling
//! craftify sell create --name "Walnut bowl" --price 24.50 -q 3
//! craftify sell list
//! craftify sell edit 9 --name "Walnut bowl" --price 22.00
//! craftify sell delete 9
//!
//! # Other makers
//! craftify users list --page 2
//! craftify users show 5
//! craftify users comment 5 "Lovely glaze"
//!
//! # History and account
//! craftify orders --days 60
//! craftify profile show
//! craftify logout
//! craftify delete-account --yes
//! ```
//!
//! # Environment Variables
//!
//! See `craftify_client::config` for the client settings. Additionally:
//! - `CRAFTIFY_PASSWORD` - Password for `login` and `signup`
//! - `CRAFTIFY_CARD_NUMBER` / `CRAFTIFY_CARD_CVC` - Card details for `checkout`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::error::Error;

use clap::{Parser, Subcommand};
use craftify_client::{ClientConfig, ClientError};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod render;

use commands::{CheckoutArgs, ItemArgs, LineSelector, ProfileArgs, SignUpArgs};

#[derive(Parser)]
#[command(name = "craftify")]
#[command(author, version, about = "Craftify marketplace client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with a username and password
    Login {
        /// Account username
        #[arg(short, long)]
        username: String,

        /// Account password
        #[arg(long, env = "CRAFTIFY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and forget the stored credential
    Logout,
    /// Show who is signed in
    Whoami,
    /// Create an account and sign in with it
    Signup(SignUpArgs),
    /// Browse items for sale
    Items {
        /// Show one item in detail
        #[arg(long)]
        id: Option<i64>,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the cart
    Checkout(CheckoutArgs),
    /// List recent orders
    Orders {
        /// Window in days (30, 60 or 90)
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// View or edit the profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Manage your own listings
    Sell {
        #[command(subcommand)]
        action: SellAction,
    },
    /// Browse other users and their profile comments
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Delete the signed-in account and sign out
    DeleteAccount {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add an item
    Add {
        /// Item ID
        item: i64,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a cart line (the bracketed ID in `cart show`)
    Remove {
        /// Cart line ID
        #[arg(required_unless_present = "item")]
        line: Option<i64>,

        /// Remove the line holding this item instead
        #[arg(long, conflicts_with = "line")]
        item: Option<i64>,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the profile
    Show,
    /// Update profile fields
    Update(ProfileArgs),
}

#[derive(Subcommand)]
enum SellAction {
    /// List your items
    List,
    /// Put a new item up for sale
    Create(ItemArgs),
    /// Replace an item's details
    Edit {
        /// Item ID
        id: i64,

        #[command(flatten)]
        item: ItemArgs,
    },
    /// Take an item off sale
    Delete {
        /// Item ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// One page of the user directory
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// A user's profile and the comments left on it
    Show {
        /// User ID
        id: i64,
    },
    /// Comment on a user's profile
    Comment {
        /// User ID
        id: i64,

        text: String,
    },
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

    Some(guard)
}

/// Route tracing levels to Sentry: warnings and errors become events,
/// info and debug become breadcrumbs.
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

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().with_writer(std::io::stderr).init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output on stdout stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "craftify_client=info,craftify_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn Error>> = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        if needs_login(e.as_ref()) {
            tracing::error!("Please log in with `craftify login -u <username>` and try again");
        }
        std::process::exit(1);
    }
}

/// Whether a command failed for want of a signed-in user.
fn needs_login(error: &(dyn Error + 'static)) -> bool {
    error
        .downcast_ref::<ClientError>()
        .is_some_and(ClientError::requires_login)
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), Box<dyn Error>> {
    let app = commands::start(config).await?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Login { username, password } => {
            commands::account::login(&app, &mut out, &username, password).await?;
        }
        Commands::Logout => commands::account::logout(&app, &mut out).await?,
        Commands::Whoami => commands::account::whoami(&app, &mut out)?,
        Commands::Signup(args) => commands::account::sign_up(&app, &mut out, args).await?,
        Commands::Items { id } => commands::catalog::items(&app, &mut out, id).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&app, &mut out)?,
            CartAction::Add { item, quantity } => {
                commands::cart::add(&app, &mut out, item, quantity).await?;
            }
            CartAction::Remove { line, item } => {
                let selector = match (line, item) {
                    (_, Some(item)) => LineSelector::Item(item),
                    (Some(line), None) => LineSelector::Line(line),
                    (None, None) => return Err("Give a cart line ID or --item".into()),
                };
                commands::cart::remove(&app, &mut out, selector).await?;
            }
        },
        Commands::Checkout(args) => commands::cart::checkout(&app, &mut out, args).await?,
        Commands::Orders { days } => commands::orders::list(&app, &mut out, days).await?,
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::account::profile(&app, &mut out).await?,
            ProfileAction::Update(args) => {
                commands::account::update_profile(&app, &mut out, args).await?;
            }
        },
        Commands::Sell { action } => match action {
            SellAction::List => commands::seller::list(&app, &mut out).await?,
            SellAction::Create(args) => commands::seller::create(&app, &mut out, args).await?,
            SellAction::Edit { id, item } => {
                commands::seller::edit(&app, &mut out, id, item).await?;
            }
            SellAction::Delete { id } => commands::seller::delete(&app, &mut out, id).await?,
        },
        Commands::Users { action } => match action {
            UsersAction::List { page } => commands::community::list(&app, &mut out, page).await?,
            UsersAction::Show { id } => commands::community::show(&app, &mut out, id).await?,
            UsersAction::Comment { id, text } => {
                commands::community::comment(&app, &mut out, id, &text).await?;
            }
        },
        Commands::DeleteAccount { yes } => {
            commands::account::delete_account(&app, &mut out, yes).await?;
        }
    }
    Ok(())
}
