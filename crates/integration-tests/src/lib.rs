//! Integration test support for the Craftify client.
//!
//! Provides [`FakeMarketplace`], a scripted in-memory implementation of
//! [`MarketplaceApi`] that records every call, serves queued replies per
//! endpoint, and can hold a reply back behind a [`Gate`] until the test
//! releases it. Gates make response ordering deterministic, which is how the
//! overlapping-fetch scenarios are reproduced.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p craftify-integration-tests
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use craftify_client::api::{
    Comment, Item, ItemDraft, Order, Profile, ProfileUpdate, SignUp, UserPage,
};
use craftify_client::{
    Address, ApiError, CheckoutRequest, ClientConfig, MarketplaceApi, MemoryTokenStore,
    OrderWindow, PaymentCard, Storefront,
};
use craftify_core::{CartLineId, Credential, ItemId, UserId};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::oneshot;

/// The storefront wired to the fake API and an inspectable token store.
pub type TestStorefront = Storefront<Arc<MemoryTokenStore>, FakeMarketplace>;

// =============================================================================
// Scripted replies
// =============================================================================

/// Remote endpoints, for scripting and counting calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    SignUp,
    FetchCart,
    AddToCart,
    RemoveCartLine,
    ClearCart,
    ListItems,
    GetItem,
    CreateItem,
    UpdateItem,
    DeleteItem,
    Checkout,
    ListOrders,
    GetProfile,
    UpdateProfile,
    ListComments,
    PostComment,
    ListUsers,
    DeleteUser,
}

/// A scripted failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Unauthorized,
    Status(u16),
}

impl From<Failure> for ApiError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Unauthorized => Self::Unauthorized,
            Failure::Status(status) => Self::Status {
                status,
                body: "scripted failure".to_string(),
            },
        }
    }
}

type Outcome = Result<Value, Failure>;

enum Reply {
    Ready(Outcome),
    Gated(oneshot::Receiver<Outcome>),
}

/// A reply held back until the test releases it.
pub struct Gate {
    sender: oneshot::Sender<Outcome>,
}

impl Gate {
    /// Let the held request complete with `body`.
    pub fn release(self, body: Value) {
        let _ = self.sender.send(Ok(body));
    }

    /// Let the held request fail.
    pub fn fail(self, failure: Failure) {
        let _ = self.sender.send(Err(failure));
    }
}

/// One recorded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub endpoint: Endpoint,
    pub args: Value,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    replies: HashMap<Endpoint, VecDeque<Reply>>,
    bearer: Option<String>,
}

/// Scripted in-memory marketplace API.
#[derive(Default)]
pub struct FakeMarketplace {
    state: Mutex<FakeState>,
}

impl FakeMarketplace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, endpoint: Endpoint, reply: Reply) {
        self.state()
            .replies
            .entry(endpoint)
            .or_default()
            .push_back(reply);
    }

    /// Queue a successful reply.
    pub fn reply(&self, endpoint: Endpoint, body: Value) {
        self.push(endpoint, Reply::Ready(Ok(body)));
    }

    /// Queue a failed reply.
    pub fn fail(&self, endpoint: Endpoint, failure: Failure) {
        self.push(endpoint, Reply::Ready(Err(failure)));
    }

    /// Queue a reply that is held until the returned gate is released.
    #[must_use]
    pub fn gate(&self, endpoint: Endpoint) -> Gate {
        let (sender, receiver) = oneshot::channel();
        self.push(endpoint, Reply::Gated(receiver));
        Gate { sender }
    }

    /// Every request made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Number of requests made to one endpoint.
    #[must_use]
    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }

    /// The bearer credential currently configured, if any.
    #[must_use]
    pub fn bearer(&self) -> Option<String> {
        self.state().bearer.clone()
    }

    /// Wait until at least `n` requests reached `endpoint`.
    pub async fn wait_for_calls(&self, endpoint: Endpoint, n: usize) {
        while self.count(endpoint) < n {
            tokio::task::yield_now().await;
        }
    }

    async fn respond<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        args: Value,
    ) -> Result<T, ApiError> {
        let reply = {
            let mut state = self.state();
            state.calls.push(Call { endpoint, args });
            state
                .replies
                .get_mut(&endpoint)
                .and_then(VecDeque::pop_front)
        };

        let outcome = match reply {
            Some(Reply::Ready(outcome)) => outcome,
            Some(Reply::Gated(receiver)) => receiver.await.unwrap_or(Err(Failure::Status(599))),
            None => default_outcome(endpoint),
        };

        let body = outcome.map_err(ApiError::from)?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Unscripted deletes succeed; anything else is a 404.
const fn default_outcome(endpoint: Endpoint) -> Outcome {
    match endpoint {
        Endpoint::RemoveCartLine
        | Endpoint::ClearCart
        | Endpoint::DeleteItem
        | Endpoint::DeleteUser => Ok(Value::Null),
        _ => Err(Failure::Status(404)),
    }
}

impl MarketplaceApi for FakeMarketplace {
    fn authorize(&self, credential: Option<Credential>) {
        self.state().bearer = credential.map(|c| c.expose().to_string());
    }

    async fn login(
        &self,
        username: &str,
        _password: &SecretString,
    ) -> Result<Credential, ApiError> {
        let body: Value = self
            .respond(Endpoint::Login, json!({ "username": username }))
            .await?;
        token_from(&body)
    }

    async fn sign_up(&self, form: &SignUp) -> Result<Credential, ApiError> {
        let body: Value = self
            .respond(
                Endpoint::SignUp,
                json!({ "username": form.username, "email": form.email }),
            )
            .await?;
        token_from(&body)
    }

    async fn fetch_cart(&self) -> Result<Value, ApiError> {
        self.respond(Endpoint::FetchCart, Value::Null).await
    }

    async fn add_to_cart(&self, item_id: ItemId, quantity: u32) -> Result<Value, ApiError> {
        self.respond(
            Endpoint::AddToCart,
            json!({ "item_id": item_id, "quantity": quantity }),
        )
        .await
    }

    async fn remove_cart_line(&self, line_id: CartLineId) -> Result<(), ApiError> {
        self.respond(Endpoint::RemoveCartLine, json!({ "line_id": line_id }))
            .await
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        self.respond(Endpoint::ClearCart, Value::Null).await
    }

    async fn list_items(&self) -> Result<Vec<Item>, ApiError> {
        self.respond(Endpoint::ListItems, Value::Null).await
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Item, ApiError> {
        self.respond(Endpoint::GetItem, json!({ "item_id": item_id }))
            .await
    }

    async fn create_item(&self, draft: &ItemDraft) -> Result<Item, ApiError> {
        let body = serde_json::to_value(draft)?;
        self.respond(Endpoint::CreateItem, body).await
    }

    async fn update_item(&self, item_id: ItemId, draft: &ItemDraft) -> Result<Item, ApiError> {
        self.respond(
            Endpoint::UpdateItem,
            json!({ "item_id": item_id, "draft": draft }),
        )
        .await
    }

    async fn delete_item(&self, item_id: ItemId) -> Result<(), ApiError> {
        self.respond(Endpoint::DeleteItem, json!({ "item_id": item_id }))
            .await
    }

    async fn checkout(&self, request: &CheckoutRequest) -> Result<Order, ApiError> {
        let body = serde_json::to_value(request)?;
        self.respond(Endpoint::Checkout, body).await
    }

    async fn list_orders(&self, window: OrderWindow) -> Result<Vec<Order>, ApiError> {
        self.respond(Endpoint::ListOrders, json!({ "days": window.days() }))
            .await
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Profile, ApiError> {
        self.respond(Endpoint::GetProfile, json!({ "user_id": user_id }))
            .await
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, ApiError> {
        self.respond(
            Endpoint::UpdateProfile,
            json!({ "user_id": user_id, "update": update }),
        )
        .await
    }

    async fn list_comments(&self, user_id: &UserId) -> Result<Vec<Comment>, ApiError> {
        self.respond(Endpoint::ListComments, json!({ "user_id": user_id }))
            .await
    }

    async fn post_comment(&self, user_id: &UserId, text: &str) -> Result<Comment, ApiError> {
        self.respond(
            Endpoint::PostComment,
            json!({ "user_id": user_id, "comment": text }),
        )
        .await
    }

    async fn list_users(&self, page: u32) -> Result<UserPage, ApiError> {
        self.respond(Endpoint::ListUsers, json!({ "page": page }))
            .await
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<(), ApiError> {
        self.respond(Endpoint::DeleteUser, json!({ "user_id": user_id }))
            .await
    }
}

fn token_from(body: &Value) -> Result<Credential, ApiError> {
    body.get("access")
        .and_then(Value::as_str)
        .map(Credential::new)
        .ok_or_else(|| ApiError::UnexpectedShape("login reply without access token".to_string()))
}

// =============================================================================
// Fixtures
// =============================================================================

/// A structurally valid credential carrying `claims` in its payload.
#[must_use]
pub fn token_with(claims: &Value) -> String {
    format!(
        "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

/// A credential identifying numeric user `id`.
#[must_use]
pub fn token_for(id: i64) -> String {
    token_with(&json!({ "user_id": id, "exp": 4_102_444_800_i64 }))
}

/// Login reply body carrying a credential.
#[must_use]
pub fn login_reply(token: &str) -> Value {
    json!({ "access": token, "refresh": "unused" })
}

/// A cart line as the server sends it.
#[must_use]
pub fn cart_line(line_id: i64, item_id: i64, price: i64, quantity: u32) -> Value {
    json!({
        "id": line_id,
        "item": {
            "id": item_id,
            "name": format!("Item {item_id}"),
            "price": price,
            "seller": 1
        },
        "quantity": quantity
    })
}

/// A cart object as the server sends it, without declared totals.
#[must_use]
pub fn cart_body(lines: &[Value]) -> Value {
    json!({ "id": 1, "user": 1, "items": lines })
}

/// An item listing entry.
#[must_use]
pub fn item_body(id: i64, price: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Item {id}"),
        "description": "Handmade",
        "price": price,
        "quantity": 4,
        "seller": 2,
        "seller_username": "maker"
    })
}

/// A filled-in checkout request.
#[must_use]
pub fn checkout_request() -> CheckoutRequest {
    let address = Address {
        name: "Ada Lovelace".to_string(),
        address: "1 Loom Lane".to_string(),
        city: "Portland".to_string(),
        state: "OR".to_string(),
        zip: "97201".to_string(),
        country: "US".to_string(),
    };
    CheckoutRequest {
        billing: address.clone(),
        shipping: address,
        payment: PaymentCard {
            card_number: SecretString::from("4242424242424242".to_string()),
            card_expiry: "12/29".to_string(),
            card_cvc: SecretString::from("123".to_string()),
        },
    }
}

/// Build a storefront over the fake API with an in-memory token store.
///
/// # Panics
///
/// Panics if the fixed test URL does not parse.
#[must_use]
#[allow(clippy::expect_used)]
pub fn storefront(api: &Arc<FakeMarketplace>, tokens: &Arc<MemoryTokenStore>) -> TestStorefront {
    let config =
        ClientConfig::for_api_url("http://127.0.0.1:8000/api/").expect("test URL is valid");
    Storefront::new(Arc::clone(tokens), Arc::clone(api), &config)
}

/// A storefront that has started with a stored session for user `id`, with
/// the initial cart fetch answered by `cart`.
pub async fn signed_in_storefront(
    id: i64,
    cart: Value,
) -> (TestStorefront, Arc<FakeMarketplace>, Arc<MemoryTokenStore>) {
    let api = Arc::new(FakeMarketplace::new());
    let tokens = Arc::new(MemoryTokenStore::with_token(token_for(id)));
    api.reply(Endpoint::FetchCart, cart);

    let app = storefront(&api, &tokens);
    app.start().await;
    (app, api, tokens)
}

