//! Command implementations.
//!
//! Each command reads store snapshots and renders them; none of them keeps
//! its own copy of cart or session state.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod community;
pub mod orders;
pub mod seller;

use std::error::Error;

use craftify_client::{ClientConfig, ClientError, FileTokenStore, HttpMarketplace, Storefront};

pub use account::{ProfileArgs, SignUpArgs};
pub use cart::{CheckoutArgs, LineSelector};
pub use seller::ItemArgs;

/// The storefront as the CLI runs it.
pub type App = Storefront<FileTokenStore, HttpMarketplace>;

/// Result type for command handlers.
pub type CommandResult = Result<(), Box<dyn Error>>;

/// Build the storefront and restore any stored session.
pub async fn start(config: &ClientConfig) -> Result<App, ClientError> {
    let app = Storefront::from_config(config)?;
    app.start().await;
    Ok(app)
}

/// Turn a failed store operation into a command error carrying the message
/// the store recorded.
fn store_failure(error: Option<String>, fallback: &str) -> Box<dyn Error> {
    error.unwrap_or_else(|| fallback.to_string()).into()
}
