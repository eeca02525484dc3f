//! Order history store.
//!
//! Lists orders placed by the signed-in user within a recent window. Gated
//! on the session the same way the cart is.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use craftify_core::UserId;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::api::{MarketplaceApi, Order};
use crate::pending::InFlight;
use crate::session::SessionState;

/// How far back the order history reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OrderWindow {
    #[default]
    Last30Days,
    Last60Days,
    Last90Days,
}

impl OrderWindow {
    /// Window length in days.
    #[must_use]
    pub const fn days(self) -> u32 {
        match self {
            Self::Last30Days => 30,
            Self::Last60Days => 60,
            Self::Last90Days => 90,
        }
    }
}

impl TryFrom<u32> for OrderWindow {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        match days {
            30 => Ok(Self::Last30Days),
            60 => Ok(Self::Last60Days),
            90 => Ok(Self::Last90Days),
            other => Err(format!("order window must be 30, 60 or 90 days, got {other}")),
        }
    }
}

impl fmt::Display for OrderWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "last {} days", self.days())
    }
}

/// Snapshot of the order history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderHistoryState {
    pub orders: Vec<Order>,
    pub loading: bool,
    pub error: Option<String>,
    pub window: OrderWindow,
}

/// Order history for the signed-in user.
pub struct OrderHistory<A> {
    api: Arc<A>,
    session: watch::Receiver<SessionState>,
    state: watch::Sender<OrderHistoryState>,
    fetches: AtomicUsize,
}

impl<A: MarketplaceApi> OrderHistory<A> {
    /// Create an empty history gated on the given session.
    pub fn new(api: Arc<A>, session: watch::Receiver<SessionState>) -> Self {
        let (state, _) = watch::channel(OrderHistoryState::default());
        Self {
            api,
            session,
            state,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> OrderHistoryState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OrderHistoryState> {
        self.state.subscribe()
    }

    fn current_user(&self) -> Option<UserId> {
        self.session.borrow().user_id().cloned()
    }

    /// Load orders placed within `window`.
    ///
    /// Does nothing when no user is signed in. On failure the previously
    /// loaded orders are kept and the error is recorded.
    #[instrument(skip(self), fields(days = window.days()))]
    pub async fn fetch(&self, window: OrderWindow) {
        let Some(user) = self.current_user() else {
            debug!("Skipping order fetch, no signed-in user");
            return;
        };

        let in_flight = InFlight::start(&self.fetches);
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
            state.window = window;
        });

        let result = self.api.list_orders(window).await;
        let loading = in_flight.others_running();

        if self.current_user().as_ref() != Some(&user) {
            debug!("Discarding order response for a session that has ended");
            self.state.send_if_modified(|state| {
                let changed = state.loading != loading;
                state.loading = loading;
                changed
            });
            return;
        }

        match result {
            Ok(orders) => {
                debug!(count = orders.len(), "Order history loaded");
                self.state.send_modify(|state| {
                    state.orders = orders;
                    state.loading = loading;
                });
            }
            Err(e) => {
                warn!(error = %e, "Failed to load order history");
                self.state.send_modify(|state| {
                    state.error = Some(e.to_string());
                    state.loading = loading;
                });
            }
        }
    }

    /// Drop all loaded orders.
    pub(crate) fn clear(&self) {
        self.state.send_replace(OrderHistoryState::default());
    }
}
