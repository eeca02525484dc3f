//! Cart store.
//!
//! Holds the client's view of the server cart. Every change to the cart is
//! the result of a confirmed server response: nothing is patched locally
//! ahead of the server.
//!
//! # Concurrency
//!
//! Overlapping calls are not serialized. Two `fetch_cart` calls in flight
//! race, and whichever response resolves last overwrites the state. A
//! response that arrives after the session has ended or changed user is
//! discarded. `loading` stays set until the last fetch in flight resolves,
//! discarded or not.

mod model;

pub use model::{Cart, CartItem, CartLine};

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use craftify_core::{CartLineId, ItemId, UserId};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, MarketplaceApi, Order};
use crate::checkout::CheckoutRequest;
use crate::error::add_breadcrumb;
use crate::pending::InFlight;
use crate::session::SessionState;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// No signed-in user.
    #[error("Please log in to use the cart")]
    NotAuthenticated,

    /// The request failed or returned something unusable.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Snapshot of the cart as seen by views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub cart: Cart,
    pub loading: bool,
    /// Message from the last failed cart operation.
    pub error: Option<String>,
}

/// Cart store gated on the session.
pub struct CartStore<A> {
    api: Arc<A>,
    session: watch::Receiver<SessionState>,
    state: watch::Sender<CartState>,
    fetches: AtomicUsize,
}

impl<A: MarketplaceApi> CartStore<A> {
    /// Create an empty cart store gated on the given session.
    pub fn new(api: Arc<A>, session: watch::Receiver<SessionState>) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            api,
            session,
            state,
            fetches: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.state.borrow().clone()
    }

    /// Subscribe to cart changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    fn current_user(&self) -> Option<UserId> {
        self.session.borrow().user_id().cloned()
    }

    fn is_current(&self, user: &UserId) -> bool {
        self.current_user().as_ref() == Some(user)
    }

    /// Reload the cart from the server.
    ///
    /// Resolves immediately without touching state when nobody is signed in.
    /// On failure the previous cart is kept and the error recorded.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) {
        let Some(user) = self.current_user() else {
            debug!("Skipping cart fetch, no signed-in user");
            return;
        };

        let in_flight = InFlight::start(&self.fetches);
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let result = self.api.fetch_cart().await.and_then(Cart::from_payload);
        let loading = in_flight.others_running();

        if !self.is_current(&user) {
            debug!("Discarding cart response for a session that has ended");
            self.state.send_if_modified(|state| {
                let changed = state.loading != loading;
                state.loading = loading;
                changed
            });
            return;
        }

        match result {
            Ok(cart) => {
                debug!(lines = cart.items.len(), total = %cart.total_price, "Cart loaded");
                self.state.send_modify(|state| {
                    state.cart = cart;
                    state.loading = loading;
                });
            }
            Err(e) => {
                warn!(error = %e, "Failed to load cart");
                self.state.send_modify(|state| {
                    state.error = Some(e.to_string());
                    state.loading = loading;
                });
            }
        }
    }

    /// Add units of an item, replacing the cart with the server's answer.
    ///
    /// Returns whether the item was added. On failure the cart is unchanged
    /// and the error is recorded.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn add_to_cart(&self, item_id: ItemId, quantity: u32) -> bool {
        self.clear_error();

        if quantity == 0 {
            return self.fail(CartError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        let Some(user) = self.current_user() else {
            return self.fail(CartError::NotAuthenticated);
        };

        let result = self
            .api
            .add_to_cart(item_id, quantity)
            .await
            .and_then(Cart::from_payload);

        if !self.is_current(&user) {
            debug!("Discarding add-to-cart response for a session that has ended");
            return false;
        }

        match result {
            Ok(cart) => {
                add_breadcrumb(
                    "cart",
                    "Added item to cart",
                    Some(&[
                        ("item_id", item_id.to_string().as_str()),
                        ("quantity", quantity.to_string().as_str()),
                    ]),
                );
                self.state.send_modify(|state| state.cart = cart);
                true
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Remove one cart line, then reload the cart.
    ///
    /// `line_id` is the cart-line ID, not the item ID. `None` is rejected
    /// without a request.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, line_id: Option<CartLineId>) -> bool {
        self.clear_error();

        let Some(line_id) = line_id else {
            return self.fail(CartError::Validation(
                "Cannot remove an item without its cart line id".to_string(),
            ));
        };
        if self.current_user().is_none() {
            return self.fail(CartError::NotAuthenticated);
        }

        if let Err(e) = self.api.remove_cart_line(line_id).await {
            return self.fail(e.into());
        }

        add_breadcrumb(
            "cart",
            "Removed line from cart",
            Some(&[("line_id", line_id.to_string().as_str())]),
        );
        self.fetch_cart().await;
        true
    }

    /// Place an order for the current cart.
    ///
    /// After the server confirms the order the server cart is emptied and
    /// reloaded. Failures before confirmation leave the cart untouched.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for blank fields or an empty cart,
    /// `CartError::NotAuthenticated` without a session, and `CartError::Api`
    /// when the order is rejected.
    #[instrument(skip(self, request))]
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<Order, CartError> {
        self.clear_error();

        request
            .validate()
            .map_err(|message| self.record(CartError::Validation(message)))?;
        if self.current_user().is_none() {
            return Err(self.record(CartError::NotAuthenticated));
        }
        if self.state.borrow().cart.is_empty() {
            return Err(self.record(CartError::Validation("Your cart is empty".to_string())));
        }

        let order = self
            .api
            .checkout(request)
            .await
            .map_err(|e| self.record(e.into()))?;

        info!(order_id = %order.id, total = %order.total(), "Order placed");
        add_breadcrumb(
            "cart",
            "Checked out",
            Some(&[("order_id", order.id.to_string().as_str())]),
        );

        if let Err(e) = self.api.clear_cart().await {
            warn!(error = %e, "Order placed but the server cart could not be emptied");
        }
        self.fetch_cart().await;

        Ok(order)
    }

    /// Reset to the empty cart.
    pub(crate) fn clear(&self) {
        self.state.send_replace(CartState::default());
    }

    fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    fn fail(&self, err: CartError) -> bool {
        self.record(err);
        false
    }

    /// Log a failure and publish its message as the cart error.
    fn record(&self, err: CartError) -> CartError {
        warn!(error = %err, "Cart operation failed");
        self.state
            .send_modify(|state| state.error = Some(err.to_string()));
        err
    }
}
