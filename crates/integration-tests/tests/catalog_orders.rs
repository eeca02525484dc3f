//! Catalog caching, seller listings, order history, profile and community
//! scenarios.
//!
//! Run with: cargo test -p craftify-integration-tests

use std::sync::Arc;

use craftify_client::api::{ItemDraft, ProfileUpdate};
use craftify_client::{ClientError, MemoryTokenStore, OrderWindow};
use craftify_core::{ItemId, UserId};
use craftify_integration_tests::{
    Endpoint, FakeMarketplace, Failure, item_body, signed_in_storefront, storefront,
};
use rust_decimal::Decimal;
use serde_json::json;

fn order_body(id: i64, total: &str) -> serde_json::Value {
    json!({
        "id": id,
        "created_at": "2024-06-01T10:00:00Z",
        "items": [{"name": "Walnut bowl", "quantity": 1, "price": total}],
        "total_amount": total
    })
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_catalog_browsing_needs_no_session() {
    let api = Arc::new(FakeMarketplace::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let app = storefront(&api, &tokens);
    app.start().await;
    api.reply(
        Endpoint::ListItems,
        json!([item_body(7, "24.50"), item_body(8, "12.00")]),
    );

    let items = app.catalog().list_items().await.expect("items listed");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].price, Decimal::new(2450, 2));
    assert!(api.bearer().is_none());
}

#[tokio::test]
async fn test_catalog_serves_repeat_reads_from_cache() {
    let api = Arc::new(FakeMarketplace::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let app = storefront(&api, &tokens);
    api.reply(Endpoint::ListItems, json!([item_body(7, "24.50")]));

    app.catalog().list_items().await.expect("items listed");
    app.catalog().list_items().await.expect("items listed");
    let item = app.catalog().get_item(ItemId::new(7)).await.expect("item");

    assert_eq!(item.name, "Item 7");
    assert_eq!(api.count(Endpoint::ListItems), 1);
    assert_eq!(api.count(Endpoint::GetItem), 0);
}

#[tokio::test]
async fn test_catalog_invalidation_refetches() {
    let api = Arc::new(FakeMarketplace::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let app = storefront(&api, &tokens);
    api.reply(Endpoint::GetItem, item_body(7, "24.50"));
    api.reply(Endpoint::GetItem, item_body(7, "20.00"));

    app.catalog().get_item(ItemId::new(7)).await.expect("item");
    app.catalog().invalidate_item(ItemId::new(7)).await;
    let item = app.catalog().get_item(ItemId::new(7)).await.expect("item");

    assert_eq!(item.price, Decimal::new(20, 0));
    assert_eq!(api.count(Endpoint::GetItem), 2);

    app.catalog().invalidate_all().await;
    let err = app
        .catalog()
        .get_item(ItemId::new(7))
        .await
        .expect_err("nothing scripted");
    assert!(err.to_string().contains("404"));
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn test_orders_require_session() {
    let api = Arc::new(FakeMarketplace::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let app = storefront(&api, &tokens);
    app.start().await;

    app.fetch_orders(OrderWindow::Last30Days).await;

    assert!(app.order_state().orders.is_empty());
    assert_eq!(api.count(Endpoint::ListOrders), 0);
}

#[tokio::test]
async fn test_orders_load_for_window() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;
    api.reply(
        Endpoint::ListOrders,
        json!([order_body(1, "24.50"), order_body(2, "12.00")]),
    );

    app.fetch_orders(OrderWindow::Last60Days).await;

    let state = app.order_state();
    assert_eq!(state.orders.len(), 2);
    assert_eq!(state.window, OrderWindow::Last60Days);
    assert!(!state.loading);
    assert_eq!(
        api.calls().last().expect("orders recorded").args,
        json!({ "days": 60 })
    );
}

#[tokio::test]
async fn test_failed_order_fetch_keeps_previous_orders() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;
    api.reply(Endpoint::ListOrders, json!([order_body(1, "24.50")]));
    app.fetch_orders(OrderWindow::Last30Days).await;

    api.fail(Endpoint::ListOrders, Failure::Status(500));
    app.fetch_orders(OrderWindow::Last90Days).await;

    let state = app.order_state();
    assert_eq!(state.orders.len(), 1);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn test_logout_clears_orders() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;
    api.reply(Endpoint::ListOrders, json!([order_body(1, "24.50")]));
    app.fetch_orders(OrderWindow::Last30Days).await;
    assert_eq!(app.order_state().orders.len(), 1);

    app.logout().await;

    assert!(app.order_state().orders.is_empty());
}

// ============================================================================
// Profile
// ============================================================================

#[tokio::test]
async fn test_profile_requires_session() {
    let api = Arc::new(FakeMarketplace::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let app = storefront(&api, &tokens);
    app.start().await;

    let err = app.profile().await.expect_err("not signed in");

    assert!(matches!(err, ClientError::NotAuthenticated));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_profile_loads_for_signed_in_user() {
    let (app, api, _tokens) = signed_in_storefront(5, json!([])).await;
    api.reply(
        Endpoint::GetProfile,
        json!({"id": 5, "username": "maker", "email": "maker@example.com", "bio": null}),
    );

    let profile = app.profile().await.expect("profile");

    assert_eq!(profile.username, "maker");
    assert_eq!(
        api.calls().last().expect("profile recorded").args,
        json!({ "user_id": 5 })
    );
}

#[tokio::test]
async fn test_profile_update_sends_only_changed_fields() {
    let (app, api, _tokens) = signed_in_storefront(5, json!([])).await;
    api.reply(
        Endpoint::UpdateProfile,
        json!({"id": 5, "username": "maker", "bio": "Woodworker"}),
    );

    let update = ProfileUpdate {
        bio: Some("Woodworker".to_string()),
        ..ProfileUpdate::default()
    };
    let profile = app.update_profile(&update).await.expect("updated");

    assert_eq!(profile.bio.as_deref(), Some("Woodworker"));
    assert_eq!(
        api.calls().last().expect("update recorded").args,
        json!({ "user_id": 5, "update": { "bio": "Woodworker" } })
    );
}

#[tokio::test]
async fn test_empty_profile_update_is_rejected() {
    let (app, api, _tokens) = signed_in_storefront(5, json!([])).await;

    let err = app
        .update_profile(&ProfileUpdate::default())
        .await
        .expect_err("nothing to update");

    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(api.count(Endpoint::UpdateProfile), 0);
}

// ============================================================================
// Seller listings
// ============================================================================

fn mug() -> ItemDraft {
    ItemDraft::new("Mug", Decimal::new(1200, 2))
}

#[tokio::test]
async fn test_listing_requires_session() {
    let api = Arc::new(FakeMarketplace::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let app = storefront(&api, &tokens);
    app.start().await;

    let err = app.create_item(&mug()).await.expect_err("anonymous");

    assert!(err.requires_login());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_draft_is_rejected_locally() {
    let (app, api, _tokens) = signed_in_storefront(2, json!([])).await;
    let draft = ItemDraft::new("  ", Decimal::ONE);

    let err = app.create_item(&draft).await.expect_err("no name");

    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(api.count(Endpoint::CreateItem), 0);
}

#[tokio::test]
async fn test_new_listing_shows_on_next_browse() {
    let (app, api, _tokens) = signed_in_storefront(2, json!([])).await;
    api.reply(Endpoint::ListItems, json!([item_body(7, "24.50")]));
    app.catalog().list_items().await.expect("first listing");

    api.reply(Endpoint::CreateItem, item_body(9, "12.00"));
    api.reply(
        Endpoint::ListItems,
        json!([item_body(7, "24.50"), item_body(9, "12.00")]),
    );
    let item = app.create_item(&mug()).await.expect("listed");
    let items = app.catalog().list_items().await.expect("second listing");

    assert_eq!(item.id, ItemId::new(9));
    assert_eq!(items.len(), 2);
    assert_eq!(api.count(Endpoint::ListItems), 2);
    let created = api
        .calls()
        .into_iter()
        .find(|call| call.endpoint == Endpoint::CreateItem)
        .expect("create recorded");
    assert_eq!(created.args["name"], "Mug");
    assert_eq!(created.args["price"], "12.00");
}

#[tokio::test]
async fn test_edit_refreshes_cached_detail() {
    let (app, api, _tokens) = signed_in_storefront(2, json!([])).await;
    api.reply(Endpoint::GetItem, item_body(7, "24.50"));
    app.catalog().get_item(ItemId::new(7)).await.expect("detail");

    api.reply(Endpoint::UpdateItem, item_body(7, "30.00"));
    api.reply(Endpoint::GetItem, item_body(7, "30.00"));
    let mut draft = mug();
    draft.price = Decimal::new(30, 0);
    app.update_item(ItemId::new(7), &draft).await.expect("edited");
    let item = app.catalog().get_item(ItemId::new(7)).await.expect("detail");

    assert_eq!(item.price, Decimal::new(30, 0));
    assert_eq!(api.count(Endpoint::GetItem), 2);
}

#[tokio::test]
async fn test_failed_delete_keeps_cached_listing() {
    let (app, api, _tokens) = signed_in_storefront(2, json!([])).await;
    api.reply(Endpoint::ListItems, json!([item_body(7, "24.50")]));
    app.catalog().list_items().await.expect("listing");
    api.fail(Endpoint::DeleteItem, Failure::Status(403));

    app.delete_item(ItemId::new(7)).await.expect_err("refused");
    app.catalog().list_items().await.expect("cached listing");

    assert_eq!(api.count(Endpoint::ListItems), 1);
}

#[tokio::test]
async fn test_delete_drops_item_from_cache() {
    let (app, api, _tokens) = signed_in_storefront(2, json!([])).await;
    api.reply(Endpoint::ListItems, json!([item_body(7, "24.50")]));
    app.catalog().list_items().await.expect("listing");

    api.reply(Endpoint::ListItems, json!([]));
    app.delete_item(ItemId::new(7)).await.expect("deleted");
    let items = app.catalog().list_items().await.expect("listing");

    assert!(items.is_empty());
    assert_eq!(api.count(Endpoint::ListItems), 2);
}

#[tokio::test]
async fn test_my_items_are_the_sellers_own() {
    let (app, api, _tokens) = signed_in_storefront(2, json!([])).await;
    let mut someone_else = item_body(8, "5.00");
    someone_else["seller"] = json!(3);
    api.reply(
        Endpoint::ListItems,
        json!([item_body(7, "24.50"), someone_else, item_body(9, "12.00")]),
    );

    let mine = app.my_items().await.expect("listing");

    let ids: Vec<ItemId> = mine.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![ItemId::new(7), ItemId::new(9)]);
}

// ============================================================================
// Community
// ============================================================================

#[tokio::test]
async fn test_uncommented_profile_has_no_comments() {
    let api = Arc::new(FakeMarketplace::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let app = storefront(&api, &tokens);
    app.start().await;

    let comments = app.comments(&UserId::Numeric(5)).await.expect("404 is empty");

    assert!(comments.is_empty());
}

#[tokio::test]
async fn test_comment_server_errors_surface() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;
    api.fail(Endpoint::ListComments, Failure::Status(500));

    let err = app.comments(&UserId::Numeric(5)).await.expect_err("server error");

    assert!(matches!(err, ClientError::Api(_)));
}

#[tokio::test]
async fn test_comments_list_in_server_order() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;
    api.reply(
        Endpoint::ListComments,
        json!([
            {"id": 1, "comment": "Lovely glaze", "user_name": "ada"},
            {"id": 2, "text": "Fast shipping"}
        ]),
    );

    let comments = app.comments(&UserId::Numeric(5)).await.expect("comments");

    let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["Lovely glaze", "Fast shipping"]);
    assert_eq!(api.calls().last().expect("recorded").args, json!({ "user_id": 5 }));
}

#[tokio::test]
async fn test_posting_comment_trims_and_requires_text() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;

    let err = app
        .post_comment(&UserId::Numeric(5), "   ")
        .await
        .expect_err("blank");
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(api.count(Endpoint::PostComment), 0);

    api.reply(Endpoint::PostComment, json!({"id": 3, "comment": "Great"}));
    let comment = app
        .post_comment(&UserId::Numeric(5), "  Great ")
        .await
        .expect("posted");

    assert_eq!(comment.text, "Great");
    assert_eq!(
        api.calls().last().expect("recorded").args,
        json!({ "user_id": 5, "comment": "Great" })
    );
}

#[tokio::test]
async fn test_posting_comment_requires_session() {
    let api = Arc::new(FakeMarketplace::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let app = storefront(&api, &tokens);
    app.start().await;

    let err = app
        .post_comment(&UserId::Numeric(5), "Great")
        .await
        .expect_err("anonymous");

    assert!(err.requires_login());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_user_directory_pages_from_one() {
    let (app, api, _tokens) = signed_in_storefront(1, json!([])).await;

    let err = app.users(0).await.expect_err("page 0");
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(api.count(Endpoint::ListUsers), 0);

    api.reply(
        Endpoint::ListUsers,
        json!({
            "count": 41,
            "next": "http://127.0.0.1:8000/api/users/?page=3",
            "previous": "http://127.0.0.1:8000/api/users/?page=1",
            "results": [{"id": 21, "username": "ada"}]
        }),
    );
    let page = app.users(2).await.expect("page 2");

    assert_eq!(page.total_pages(), 3);
    assert_eq!(page.results[0].username, "ada");
    assert_eq!(api.calls().last().expect("recorded").args, json!({ "page": 2 }));
}
