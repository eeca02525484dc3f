//! Cart store synchronization against the server.
//!
//! Run with: cargo test -p craftify-integration-tests

use std::sync::Arc;

use craftify_client::{
    CartError, CartStore, ClientError, MemoryTokenStore, SessionPhase, SessionState,
};
use craftify_core::{CartLineId, Credential, ItemId, UserId};
use craftify_integration_tests::{
    Endpoint, FakeMarketplace, Failure, cart_body, cart_line, checkout_request,
    signed_in_storefront, storefront, token_for,
};
use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::watch;

// ============================================================================
// Fetch
// ============================================================================

#[tokio::test]
async fn test_fetch_while_anonymous_changes_nothing() {
    let api = Arc::new(FakeMarketplace::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let app = storefront(&api, &tokens);
    app.start().await;
    let before = app.cart_state();

    app.fetch_cart().await;

    assert_eq!(app.cart_state(), before);
    assert!(!app.cart_state().loading);
    assert_eq!(api.count(Endpoint::FetchCart), 0);
}

#[tokio::test]
async fn test_fetch_recomputes_missing_totals() {
    let (app, _api, _tokens) = signed_in_storefront(
        1,
        cart_body(&[cart_line(1, 7, 10, 2), cart_line(2, 8, 5, 3)]),
    )
    .await;

    let cart = app.cart_state().cart;
    assert_eq!(cart.total_price, Decimal::new(35, 0));
    assert_eq!(cart.items[0].line_total, Decimal::new(20, 0));
    assert_eq!(cart.items[1].line_total, Decimal::new(15, 0));
}

#[tokio::test]
async fn test_fetch_trusts_server_total() {
    let mut body = cart_body(&[cart_line(1, 7, 10, 2), cart_line(2, 8, 5, 3)]);
    body["total_price"] = json!("35.00");
    let (app, _api, _tokens) = signed_in_storefront(1, body).await;

    assert_eq!(app.cart_state().cart.total_price, Decimal::new(3500, 2));
}

#[tokio::test]
async fn test_fetch_normalizes_singleton_and_empty_lists() {
    let (app, api, _tokens) =
        signed_in_storefront(1, json!([cart_body(&[cart_line(1, 7, 10, 1)])])).await;
    assert_eq!(app.cart_state().cart.items.len(), 1);

    api.reply(Endpoint::FetchCart, json!([]));
    app.fetch_cart().await;
    let state = app.cart_state();
    assert!(state.cart.is_empty());
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_cart() {
    let (app, api, _tokens) =
        signed_in_storefront(1, cart_body(&[cart_line(1, 7, 10, 2)])).await;
    let before = app.cart_state().cart;

    api.fail(Endpoint::FetchCart, Failure::Status(502));
    app.fetch_cart().await;

    let state = app.cart_state();
    assert_eq!(state.cart, before);
    assert!(!state.loading);
    assert_eq!(
        state.error.as_deref(),
        Some("Server returned 502: scripted failure")
    );
}

#[tokio::test]
async fn test_unexpected_shape_is_an_error_not_a_cart() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;

    api.reply(Endpoint::FetchCart, json!("cart"));
    app.fetch_cart().await;

    let state = app.cart_state();
    assert!(state.cart.is_empty());
    assert!(state.error.expect("error recorded").contains("Unexpected response shape"));
}

#[tokio::test]
async fn test_fetch_sets_loading_while_in_flight() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;
    let gate = api.gate(Endpoint::FetchCart);
    let mut cart = app.cart().subscribe();

    let driver = async {
        cart.wait_for(|state| state.loading)
            .await
            .expect("cart published");
        gate.release(cart_body(&[cart_line(1, 7, 10, 1)]));
    };
    tokio::join!(app.fetch_cart(), driver);

    let state = app.cart_state();
    assert!(!state.loading);
    assert_eq!(state.cart.items.len(), 1);
}

#[tokio::test]
async fn test_overlapping_fetches_last_response_wins() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;
    let first = api.gate(Endpoint::FetchCart);
    let second = api.gate(Endpoint::FetchCart);
    let mut cart = app.cart().subscribe();

    let driver = async {
        api.wait_for_calls(Endpoint::FetchCart, 3).await;

        // Second request resolves first
        second.release(cart_body(&[cart_line(2, 8, 5, 4)]));
        cart.wait_for(|state| state.cart.total_price == Decimal::new(20, 0))
            .await
            .expect("cart published");

        // First request resolves last and overwrites
        first.release(cart_body(&[cart_line(1, 7, 10, 1)]));
    };
    tokio::join!(app.fetch_cart(), app.fetch_cart(), driver);

    let state = app.cart_state();
    assert_eq!(state.cart.total_price, Decimal::new(10, 0));
    assert_eq!(state.cart.items[0].item.id, ItemId::new(7));
}

#[tokio::test]
async fn test_response_after_logout_is_discarded() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;
    let gate = api.gate(Endpoint::FetchCart);

    let driver = async {
        api.wait_for_calls(Endpoint::FetchCart, 2).await;
        app.logout().await;
        gate.release(cart_body(&[cart_line(1, 7, 10, 1)]));
    };
    tokio::join!(app.fetch_cart(), driver);

    assert!(app.cart_state().cart.is_empty());
    assert!(!app.cart_state().loading);
}

fn signed_in_as(id: i64) -> SessionState {
    SessionState {
        phase: SessionPhase::Authenticated(UserId::Numeric(id)),
        error: None,
    }
}

#[tokio::test]
async fn test_response_for_previous_user_settles_loading() {
    let api = Arc::new(FakeMarketplace::new());
    let (session, session_rx) = watch::channel(signed_in_as(1));
    let cart = CartStore::new(Arc::clone(&api), session_rx);
    let gate = api.gate(Endpoint::FetchCart);

    let driver = async {
        api.wait_for_calls(Endpoint::FetchCart, 1).await;
        session.send_replace(signed_in_as(2));
        gate.release(cart_body(&[cart_line(1, 7, 10, 1)]));
    };
    tokio::join!(cart.fetch_cart(), driver);

    let state = cart.snapshot();
    assert!(state.cart.is_empty());
    assert!(!state.loading);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_user_switch_mid_fetch_shows_new_users_cart() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;
    let stale = api.gate(Endpoint::FetchCart);
    let mut cart = app.cart().subscribe();

    let driver = async {
        api.wait_for_calls(Endpoint::FetchCart, 2).await;
        api.reply(Endpoint::FetchCart, cart_body(&[cart_line(9, 8, 5, 2)]));
        app.login(Credential::new(token_for(2)))
            .await
            .expect("second user signs in");

        // Still waiting on the first user's request
        assert!(cart.borrow_and_update().loading);
        stale.release(cart_body(&[cart_line(1, 7, 10, 1)]));
    };
    tokio::join!(app.fetch_cart(), driver);

    let state = app.cart_state();
    assert!(!state.loading);
    assert_eq!(state.cart.items.len(), 1);
    assert_eq!(state.cart.items[0].item.id, ItemId::new(8));
    assert_eq!(state.cart.total_price, Decimal::new(10, 0));
}

// ============================================================================
// Add
// ============================================================================

#[tokio::test]
async fn test_add_replaces_cart_with_server_answer() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;

    // Server totals disagree with quantity x price; the server wins
    let mut body = cart_body(&[cart_line(5, 7, 10, 2)]);
    body["items"][0]["line_total"] = json!("18.00");
    body["total_price"] = json!("18.00");
    api.reply(Endpoint::AddToCart, body);

    assert!(app.add_to_cart(ItemId::new(7), 2).await);

    let state = app.cart_state();
    assert!(state.error.is_none());
    assert_eq!(state.cart.items[0].line_total, Decimal::new(1800, 2));
    assert_eq!(state.cart.total_price, Decimal::new(1800, 2));
    assert_eq!(
        api.calls().last().expect("add recorded").args,
        json!({ "item_id": 7, "quantity": 2 })
    );
    // Add answers with the cart, no follow-up fetch
    assert_eq!(api.count(Endpoint::FetchCart), 1);
}

#[tokio::test]
async fn test_add_zero_quantity_is_rejected_locally() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;

    assert!(!app.add_to_cart(ItemId::new(7), 0).await);
    assert!(app.cart_state().error.is_some());
    assert_eq!(api.count(Endpoint::AddToCart), 0);
}

#[tokio::test]
async fn test_add_failure_leaves_cart_untouched() {
    let (app, api, _tokens) =
        signed_in_storefront(1, cart_body(&[cart_line(1, 7, 10, 2)])).await;
    let before = app.cart_state().cart;
    api.fail(Endpoint::AddToCart, Failure::Status(400));

    assert!(!app.add_to_cart(ItemId::new(8), 1).await);

    let state = app.cart_state();
    assert_eq!(state.cart, before);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn test_add_while_anonymous_makes_no_request() {
    let api = Arc::new(FakeMarketplace::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let app = storefront(&api, &tokens);
    app.start().await;

    assert!(!app.add_to_cart(ItemId::new(7), 1).await);
    assert_eq!(
        app.cart_state().error.as_deref(),
        Some("Please log in to use the cart")
    );
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_next_operation_clears_previous_error() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;
    assert!(!app.add_to_cart(ItemId::new(7), 0).await);
    assert!(app.cart_state().error.is_some());

    api.reply(Endpoint::AddToCart, cart_body(&[cart_line(1, 7, 10, 1)]));
    assert!(app.add_to_cart(ItemId::new(7), 1).await);
    assert!(app.cart_state().error.is_none());
}

// ============================================================================
// Remove
// ============================================================================

#[tokio::test]
async fn test_remove_without_line_id_makes_no_request() {
    let (app, api, _tokens) =
        signed_in_storefront(1, cart_body(&[cart_line(3, 7, 10, 2)])).await;
    let calls_before = api.calls().len();

    assert!(!app.remove_from_cart(None).await);

    assert!(app.cart_state().error.is_some());
    assert_eq!(api.calls().len(), calls_before);
    assert_eq!(app.cart_state().cart.items.len(), 1);
}

#[tokio::test]
async fn test_remove_refetches_cart() {
    let (app, api, _tokens) = signed_in_storefront(
        1,
        cart_body(&[cart_line(3, 7, 10, 2), cart_line(4, 8, 5, 3)]),
    )
    .await;
    api.reply(Endpoint::FetchCart, cart_body(&[cart_line(4, 8, 5, 3)]));

    assert!(app.remove_from_cart(Some(CartLineId::new(3))).await);

    let endpoints: Vec<Endpoint> = api.calls().iter().map(|call| call.endpoint).collect();
    assert_eq!(
        endpoints,
        vec![
            Endpoint::FetchCart,
            Endpoint::RemoveCartLine,
            Endpoint::FetchCart
        ]
    );
    assert_eq!(api.calls()[1].args, json!({ "line_id": 3 }));

    let cart = app.cart_state().cart;
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total_price, Decimal::new(15, 0));
}

#[tokio::test]
async fn test_failed_remove_does_not_refetch() {
    let (app, api, _tokens) =
        signed_in_storefront(1, cart_body(&[cart_line(3, 7, 10, 2)])).await;
    api.fail(Endpoint::RemoveCartLine, Failure::Status(404));

    assert!(!app.remove_from_cart(Some(CartLineId::new(3))).await);

    assert_eq!(api.count(Endpoint::FetchCart), 1);
    assert_eq!(app.cart_state().cart.items.len(), 1);
    assert!(app.cart_state().error.is_some());
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_checkout_places_order_and_empties_cart() {
    let (app, api, _tokens) =
        signed_in_storefront(1, cart_body(&[cart_line(3, 7, 10, 2)])).await;
    api.reply(
        Endpoint::Checkout,
        json!({
            "id": 77,
            "created_at": "2024-06-01T10:00:00Z",
            "items": [{"name": "Item 7", "quantity": 2, "price": "10.00"}],
            "total_amount": "20.00"
        }),
    );
    api.reply(Endpoint::FetchCart, json!([]));

    let order = app.checkout(&checkout_request()).await.expect("order placed");

    assert_eq!(order.id.as_i64(), 77);
    assert_eq!(order.total(), Decimal::new(20, 0));
    assert!(app.cart_state().cart.is_empty());

    let calls = api.calls();
    let endpoints: Vec<Endpoint> = calls.iter().map(|call| call.endpoint).collect();
    assert_eq!(
        endpoints,
        vec![
            Endpoint::FetchCart,
            Endpoint::Checkout,
            Endpoint::ClearCart,
            Endpoint::FetchCart
        ]
    );
    assert_eq!(calls[1].args["payment"]["cardCVC"], "123");
    assert_eq!(calls[1].args["shipping"]["city"], "Portland");
}

#[tokio::test]
async fn test_checkout_rejects_blank_fields_locally() {
    let (app, api, _tokens) =
        signed_in_storefront(1, cart_body(&[cart_line(3, 7, 10, 2)])).await;
    let mut request = checkout_request();
    request.billing.zip = String::new();

    let err = app.checkout(&request).await.expect_err("zip missing");

    assert!(matches!(err, ClientError::Cart(CartError::Validation(_))));
    assert!(err.to_string().contains("billing.zip"));
    assert_eq!(api.count(Endpoint::Checkout), 0);
}

#[tokio::test]
async fn test_checkout_with_empty_cart_is_rejected() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;

    let err = app.checkout(&checkout_request()).await.expect_err("empty cart");

    assert!(matches!(err, ClientError::Cart(CartError::Validation(_))));
    assert_eq!(api.count(Endpoint::Checkout), 0);
}

#[tokio::test]
async fn test_failed_checkout_keeps_cart() {
    let (app, api, _tokens) =
        signed_in_storefront(1, cart_body(&[cart_line(3, 7, 10, 2)])).await;
    api.fail(Endpoint::Checkout, Failure::Status(402));

    let err = app.checkout(&checkout_request()).await.expect_err("declined");

    assert!(matches!(err, ClientError::Cart(CartError::Api(_))));
    let state = app.cart_state();
    assert_eq!(state.cart.items.len(), 1);
    assert!(state.error.is_some());
    assert_eq!(api.count(Endpoint::ClearCart), 0);
}

#[tokio::test]
async fn test_checkout_error_is_published_as_returned() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;
    let mut cart = app.cart().subscribe();
    cart.borrow_and_update();

    let err = app.checkout(&checkout_request()).await.expect_err("empty cart");

    assert!(cart.has_changed().expect("cart alive"));
    let published = cart.borrow_and_update().error.clone();
    assert_eq!(published.as_deref(), Some(err.to_string().as_str()));
    assert_eq!(published.as_deref(), Some("Your cart is empty"));
    assert!(!cart.has_changed().expect("cart alive"));
    assert_eq!(api.count(Endpoint::Checkout), 0);
}
