//! Marketplace REST API seam.
//!
//! # Architecture
//!
//! - [`MarketplaceApi`] is the transport collaborator the stores talk to
//! - [`HttpMarketplace`] implements it over `reqwest`
//! - The server is the source of truth - stores never patch state ahead of
//!   a confirmed response
//!
//! # Endpoints
//!
//! | Operation          | Route                        |
//! |--------------------|------------------------------|
//! | login              | `POST login/`                |
//! | sign up            | `POST signup/`               |
//! | fetch cart         | `GET cart/`                  |
//! | add to cart        | `POST cart/add/{item}/`      |
//! | remove cart line   | `DELETE cart/items/{line}/`  |
//! | clear cart         | `DELETE cart/`               |
//! | list / get items   | `GET items/`, `GET items/{id}/` |
//! | create item        | `POST items/`                |
//! | edit / delete item | `PUT`/`DELETE items/{id}/`   |
//! | checkout           | `POST checkout/`             |
//! | order history      | `GET orders/?days=N`         |
//! | profile            | `GET`/`PUT user/{id}/`       |
//! | profile comments   | `GET`/`POST user/{id}/comments/` |
//! | user directory     | `GET users/?page=N`          |
//! | delete account     | `DELETE users/{id}/`         |
//!
//! No timeout or retry policy lives here beyond what the transport is
//! configured with; a failed call surfaces immediately as an [`ApiError`].

mod http;
pub mod types;

pub use http::HttpMarketplace;
pub use types::*;

use std::future::Future;

use craftify_core::{CartLineId, Credential, ItemId, UserId};
use secrecy::SecretString;
use thiserror::Error;

use crate::checkout::CheckoutRequest;
use crate::orders::OrderWindow;

/// Errors that can occur when talking to the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request URL could not be built.
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    /// The credential was missing, expired or rejected.
    #[error("Not authorized, please log in again")]
    Unauthorized,

    /// The server answered with a non-success status.
    #[error("Server returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response was JSON, but not in any shape we understand.
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// The remote marketplace API, as seen by the client stores.
///
/// Every method maps to one request. Cart endpoints return the raw JSON
/// value because the server is inconsistent about whether a cart is an
/// object or a single-element list; [`crate::cart::Cart::from_payload`]
/// normalizes it.
pub trait MarketplaceApi: Send + Sync {
    /// Configure the bearer credential attached to every later request, or
    /// drop it with `None`.
    fn authorize(&self, credential: Option<Credential>);

    /// Exchange a username and password for a credential.
    fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<Credential, ApiError>> + Send;

    /// Register a new account and receive its credential.
    fn sign_up(&self, form: &SignUp) -> impl Future<Output = Result<Credential, ApiError>> + Send;

    /// Fetch the signed-in user's cart.
    fn fetch_cart(&self) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send;

    /// Add `quantity` units of an item and return the updated cart.
    fn add_to_cart(
        &self,
        item_id: ItemId,
        quantity: u32,
    ) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send;

    /// Remove one cart line.
    fn remove_cart_line(
        &self,
        line_id: CartLineId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Empty the cart.
    fn clear_cart(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// List all items for sale.
    fn list_items(&self) -> impl Future<Output = Result<Vec<Item>, ApiError>> + Send;

    /// Get one item.
    fn get_item(&self, item_id: ItemId) -> impl Future<Output = Result<Item, ApiError>> + Send;

    /// List a new item for sale.
    fn create_item(&self, draft: &ItemDraft)
    -> impl Future<Output = Result<Item, ApiError>> + Send;

    /// Replace an item's editable fields.
    fn update_item(
        &self,
        item_id: ItemId,
        draft: &ItemDraft,
    ) -> impl Future<Output = Result<Item, ApiError>> + Send;

    /// Take an item off sale.
    fn delete_item(&self, item_id: ItemId) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Place an order for the current cart.
    fn checkout(
        &self,
        request: &CheckoutRequest,
    ) -> impl Future<Output = Result<Order, ApiError>> + Send;

    /// List orders placed within a time window.
    fn list_orders(
        &self,
        window: OrderWindow,
    ) -> impl Future<Output = Result<Vec<Order>, ApiError>> + Send;

    /// Get a user's profile.
    fn get_profile(&self, user_id: &UserId)
    -> impl Future<Output = Result<Profile, ApiError>> + Send;

    /// Update a user's profile.
    fn update_profile(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<Profile, ApiError>> + Send;

    /// Comments left on a user's profile.
    fn list_comments(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<Comment>, ApiError>> + Send;

    /// Leave a comment on a user's profile.
    fn post_comment(
        &self,
        user_id: &UserId,
        text: &str,
    ) -> impl Future<Output = Result<Comment, ApiError>> + Send;

    /// One page of the user directory, counting from 1.
    fn list_users(&self, page: u32) -> impl Future<Output = Result<UserPage, ApiError>> + Send;

    /// Delete an account.
    fn delete_user(&self, user_id: &UserId) -> impl Future<Output = Result<(), ApiError>> + Send;
}
