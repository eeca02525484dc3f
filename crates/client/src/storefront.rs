//! Storefront coordinator.
//!
//! Owns the session, cart, order history and catalog and is the only place
//! where one store reacts to another. Session transitions are applied here:
//!
//! | Session transition                | Effect on other stores             |
//! |-----------------------------------|------------------------------------|
//! | anything -> `Authenticated(u)`    | exactly one cart fetch             |
//! | `Authenticated(a)` -> `Authenticated(b)` | cart and orders cleared, then one cart fetch |
//! | anything -> not authenticated     | cart and orders cleared, no fetch  |
//!
//! [`Storefront::session`] hands out a read-only view. Signing in and out
//! only happens through the methods here.

use std::sync::Arc;

use craftify_core::{CartLineId, Credential, ItemId, SellerId, UserId};
use secrecy::SecretString;
use tracing::{debug, info, instrument};

use crate::api::{
    ApiError, Comment, HttpMarketplace, Item, ItemDraft, MarketplaceApi, Order, Profile,
    ProfileUpdate, SignUp, UserPage,
};
use crate::cart::{CartState, CartStore};
use crate::catalog::Catalog;
use crate::checkout::CheckoutRequest;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result, add_breadcrumb};
use crate::orders::{OrderHistory, OrderHistoryState, OrderWindow};
use crate::session::{SessionError, SessionManager, SessionPhase, SessionState};
use crate::token::{FileTokenStore, TokenStore};

/// The marketplace client: every store, wired together.
pub struct Storefront<S, A> {
    api: Arc<A>,
    session: SessionManager<S, A>,
    cart: CartStore<A>,
    orders: OrderHistory<A>,
    catalog: Catalog<A>,
}

impl Storefront<FileTokenStore, HttpMarketplace> {
    /// Build a storefront talking HTTP and persisting the credential to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api = HttpMarketplace::new(config)?;
        Ok(Self::new(
            FileTokenStore::new(config.token_path.clone()),
            Arc::new(api),
            config,
        ))
    }
}

impl<S: TokenStore, A: MarketplaceApi> Storefront<S, A> {
    /// Wire the stores around one shared API client.
    pub fn new(store: S, api: Arc<A>, config: &ClientConfig) -> Self {
        let session = SessionManager::new(store, Arc::clone(&api));
        let cart = CartStore::new(Arc::clone(&api), session.subscribe());
        let orders = OrderHistory::new(Arc::clone(&api), session.subscribe());
        let catalog = Catalog::new(Arc::clone(&api), config.catalog_cache_ttl);

        Self {
            api,
            session,
            cart,
            orders,
            catalog,
        }
    }

    /// Read-only view of the session: snapshots and change notifications.
    pub const fn session(&self) -> &SessionManager<S, A> {
        &self.session
    }

    pub const fn cart(&self) -> &CartStore<A> {
        &self.cart
    }

    pub const fn orders(&self) -> &OrderHistory<A> {
        &self.orders
    }

    pub const fn catalog(&self) -> &Catalog<A> {
        &self.catalog
    }

    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.session.snapshot()
    }

    #[must_use]
    pub fn cart_state(&self) -> CartState {
        self.cart.snapshot()
    }

    #[must_use]
    pub fn order_state(&self) -> OrderHistoryState {
        self.orders.snapshot()
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Restore any persisted session and load the cart if signed in.
    #[instrument(skip(self))]
    pub async fn start(&self) -> SessionPhase {
        let before = self.session.phase();
        self.session.initialize();
        self.apply_transition(&before).await
    }

    /// Adopt a credential issued by the server.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnidentifiableCredential` if the credential
    /// carries no identity. The session is then signed out again.
    #[instrument(skip(self, credential))]
    pub async fn login(&self, credential: Credential) -> Result<UserId> {
        let before = self.session.phase();
        let result = self.session.login(credential);
        self.settle_login(&before, result).await
    }

    /// Sign in with a username and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the login or the credential
    /// carries no identity.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, username: &str, password: &SecretString) -> Result<UserId> {
        let before = self.session.phase();
        let result = self.session.sign_in(username, password).await;
        self.settle_login(&before, result).await
    }

    /// Register an account and sign in with it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for blank required fields, otherwise
    /// the errors of [`Self::sign_in`].
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn sign_up(&self, form: &SignUp) -> Result<UserId> {
        let missing = form.missing_fields();
        if !missing.is_empty() {
            return Err(ClientError::Validation(format!(
                "Please fill in all required fields: {}",
                missing.join(", ")
            )));
        }

        let before = self.session.phase();
        let result = self.session.sign_up(form).await;
        self.settle_login(&before, result).await
    }

    /// Sign out and drop every user-scoped store.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let before = self.session.phase();
        self.session.logout();
        self.apply_transition(&before).await;
    }

    async fn settle_login(
        &self,
        before: &SessionPhase,
        result: std::result::Result<UserId, SessionError>,
    ) -> Result<UserId> {
        if let Err(SessionError::UnidentifiableCredential) = &result {
            self.session
                .force_logout(&SessionError::UnidentifiableCredential.to_string());
        }
        self.apply_transition(before).await;
        result.map_err(ClientError::from)
    }

    /// React to the session moving from `before` to its current phase.
    async fn apply_transition(&self, before: &SessionPhase) -> SessionPhase {
        let after = self.session.phase();

        match (before, &after) {
            (SessionPhase::Authenticated(old), SessionPhase::Authenticated(new)) if old == new => {
                debug!("Session unchanged");
            }
            (SessionPhase::Authenticated(_), SessionPhase::Authenticated(_)) => {
                debug!("Session switched user, reloading cart");
                self.cart.clear();
                self.orders.clear();
                self.cart.fetch_cart().await;
            }
            (_, SessionPhase::Authenticated(_)) => {
                debug!("Session became authenticated, loading cart");
                self.cart.fetch_cart().await;
            }
            _ => {
                debug!(phase = ?after, "No authenticated session, clearing user stores");
                self.cart.clear();
                self.orders.clear();
            }
        }

        after
    }

    /// The signed-in user, or why there is none.
    ///
    /// This is the "redirect to login" check for views that need a session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::SessionInitializing` before [`Self::start`] has
    /// run and `ClientError::NotAuthenticated` when nobody is signed in.
    pub fn require_session(&self) -> Result<UserId> {
        let state = self.session.snapshot();
        if state.initializing() {
            return Err(ClientError::SessionInitializing);
        }
        state.user_id().cloned().ok_or(ClientError::NotAuthenticated)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Reload the cart. Does nothing without a session.
    pub async fn fetch_cart(&self) {
        self.cart.fetch_cart().await;
    }

    /// Add units of an item to the cart.
    pub async fn add_to_cart(&self, item_id: ItemId, quantity: u32) -> bool {
        self.cart.add_to_cart(item_id, quantity).await
    }

    /// Remove a cart line by its line ID.
    pub async fn remove_from_cart(&self, line_id: Option<CartLineId>) -> bool {
        self.cart.remove_from_cart(line_id).await
    }

    /// Place an order for the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is incomplete, nobody is signed in,
    /// the cart is empty or the server rejects the order.
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<Order> {
        Ok(self.cart.checkout(request).await?)
    }

    // =========================================================================
    // Orders and profile
    // =========================================================================

    /// Load the order history for a window.
    pub async fn fetch_orders(&self, window: OrderWindow) {
        self.orders.fetch(window).await;
    }

    /// Load the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<Profile> {
        let user = self.require_session()?;
        self.user_profile(&user).await
    }

    /// Update the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for an empty update,
    /// `ClientError::NotAuthenticated` without a session, or the API error.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile> {
        let user = self.require_session()?;
        if update.is_empty() {
            return Err(ClientError::Validation("Nothing to update".to_string()));
        }
        Ok(self.api.update_profile(&user, update).await?)
    }

    // =========================================================================
    // Selling
    // =========================================================================

    /// Items the signed-in user has listed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or the API
    /// error if the listing cannot be loaded.
    #[instrument(skip(self))]
    pub async fn my_items(&self) -> Result<Vec<Item>> {
        let user = self.require_session()?;
        let Some(seller) = user.as_numeric().map(SellerId::new) else {
            debug!(user_id = %user, "Account id is not numeric, no listing can match it");
            return Ok(Vec::new());
        };
        Ok(self.catalog.items_by_seller(seller).await?)
    }

    /// List a new item for sale.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session,
    /// `ClientError::Validation` for a bad draft, or the API error.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_item(&self, draft: &ItemDraft) -> Result<Item> {
        self.require_session()?;
        draft.validate().map_err(ClientError::Validation)?;

        let item = self.catalog.create_item(draft).await?;
        add_breadcrumb(
            "catalog",
            "Listed item",
            Some(&[("item_id", item.id.to_string().as_str())]),
        );
        Ok(item)
    }

    /// Edit one of the signed-in user's items.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_item`].
    #[instrument(skip(self, draft), fields(item_id = %item_id))]
    pub async fn update_item(&self, item_id: ItemId, draft: &ItemDraft) -> Result<Item> {
        self.require_session()?;
        draft.validate().map_err(ClientError::Validation)?;

        let item = self.catalog.update_item(item_id, draft).await?;
        add_breadcrumb(
            "catalog",
            "Edited item",
            Some(&[("item_id", item_id.to_string().as_str())]),
        );
        Ok(item)
    }

    /// Take one of the signed-in user's items off sale.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or the API
    /// error.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_item(&self, item_id: ItemId) -> Result<()> {
        self.require_session()?;

        self.catalog.delete_item(item_id).await?;
        add_breadcrumb(
            "catalog",
            "Deleted item",
            Some(&[("item_id", item_id.to_string().as_str())]),
        );
        Ok(())
    }

    // =========================================================================
    // Community
    // =========================================================================

    /// Any user's public profile. No session needed.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn user_profile(&self, user_id: &UserId) -> Result<Profile> {
        Ok(self.api.get_profile(user_id).await?)
    }

    /// Comments on a user's profile. A profile nobody has commented on yet
    /// may answer 404; that is an empty list.
    ///
    /// # Errors
    ///
    /// Returns any other API error.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn comments(&self, user_id: &UserId) -> Result<Vec<Comment>> {
        match self.api.list_comments(user_id).await {
            Ok(comments) => Ok(comments),
            Err(ApiError::Status { status: 404, .. }) => {
                debug!("No comments on this profile");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Leave a comment on a user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session,
    /// `ClientError::Validation` for a blank comment, or the API error.
    #[instrument(skip(self, text), fields(user_id = %user_id))]
    pub async fn post_comment(&self, user_id: &UserId, text: &str) -> Result<Comment> {
        self.require_session()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::Validation("Comment cannot be empty".to_string()));
        }
        Ok(self.api.post_comment(user_id, text).await?)
    }

    /// One page of the user directory. Pages count from 1.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for page 0, or the API error.
    #[instrument(skip(self))]
    pub async fn users(&self, page: u32) -> Result<UserPage> {
        if page == 0 {
            return Err(ClientError::Validation("Pages are numbered from 1".to_string()));
        }
        Ok(self.api.list_users(page).await?)
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Delete the signed-in account, then sign out the same way
    /// [`Self::logout`] does.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or the API
    /// error. The session is kept when the server refuses.
    #[instrument(skip(self))]
    pub async fn delete_account(&self) -> Result<()> {
        let user = self.require_session()?;
        self.api.delete_user(&user).await?;
        info!(user_id = %user, "Account deleted");

        self.logout().await;
        self.catalog.invalidate_all().await;
        Ok(())
    }
}
