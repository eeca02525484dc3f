//! Craftify marketplace client library.
//!
//! Client-side state for the Craftify marketplace: who is signed in, what is
//! in the cart, and the catalog and order history around them. The remote
//! REST API is the source of truth; the stores here only ever hold a value
//! the server confirmed.
//!
//! # Architecture
//!
//! - [`token`] - Persists the bearer credential and decodes its identity claim
//! - [`session`] - Single source of truth for "who is logged in"
//! - [`cart`] - Server-confirmed view of the signed-in user's cart
//! - [`orders`] - Order history for the signed-in user
//! - [`catalog`] - Item listings, cached in memory
//! - [`storefront`] - Owns the stores and coordinates them on session changes
//! - [`api`] - The remote API seam and its `reqwest` implementation
//!
//! Views consume store snapshots through `tokio::sync::watch` receivers and
//! never keep a second copy of cart or session state.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod orders;
mod pending;
pub mod session;
pub mod storefront;
pub mod token;

pub use api::{ApiError, HttpMarketplace, MarketplaceApi};
pub use cart::{Cart, CartError, CartItem, CartLine, CartState, CartStore};
pub use catalog::Catalog;
pub use checkout::{Address, CheckoutRequest, PaymentCard};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, Result};
pub use orders::{OrderHistory, OrderHistoryState, OrderWindow};
pub use session::{SessionError, SessionManager, SessionPhase, SessionState};
pub use storefront::Storefront;
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore, decode_identity};
