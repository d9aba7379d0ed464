//! End-to-end tests for the order lifecycle over HTTP:
//! placement with server-side pricing, visibility rules, and
//! administrator status transitions.

mod common;

use axum::http::Method;
use common::{decimal_of, response_json, TestApp, ALICE, BOB};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn small_cart() -> Value {
    json!({
        "items": [
            {"product_name": "Linen shirt", "product_price": "1000.00", "quantity": 2},
            {"product_name": "Wool scarf", "product_price": "500.00", "quantity": 1}
        ],
        "shipping_address": "12 Elm Street, Springfield"
    })
}

async fn place_order(app: &TestApp, token: &str, payload: Value) -> Value {
    let response = app
        .request(Method::POST, "/api/v1/orders", Some(token), Some(payload))
        .await;
    assert_eq!(response.status(), 201);
    response_json(response).await
}

// ==================== Service endpoints ====================

#[tokio::test]
async fn status_and_health_report_ok() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");

    let response = app.request(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}

// ==================== Order placement ====================

#[tokio::test]
async fn placing_an_order_prices_it_server_side() {
    let app = TestApp::new().await;
    let token = app.customer_token(ALICE);

    let body = place_order(&app, &token, small_cart()).await;
    let data = &body["data"];

    assert_eq!(body["success"], true);
    assert_eq!(decimal_of(&data["subtotal"]), dec!(2500));
    assert_eq!(decimal_of(&data["discount"]), dec!(0));
    assert_eq!(decimal_of(&data["shipping"]), dec!(30));
    assert_eq!(decimal_of(&data["total"]), dec!(2530));
    assert_eq!(data["status"], "pending");
    assert_eq!(data["user_id"], ALICE);
    assert_eq!(data["customer_name"], "Alice Doe");
    assert_eq!(data["customer_email"], "alice@example.com");
    assert_eq!(data["items"].as_array().unwrap().len(), 2);
    assert!(data["order_number"]
        .as_str()
        .unwrap()
        .starts_with("ORD-"));
}

#[tokio::test]
async fn carts_over_the_threshold_get_the_discount() {
    let app = TestApp::new().await;
    let token = app.customer_token(ALICE);

    let payload = json!({
        "items": [
            {"product_name": "Leather jacket", "product_price": "2000.00", "quantity": 2}
        ]
    });

    let body = place_order(&app, &token, payload).await;
    let data = &body["data"];

    assert_eq!(decimal_of(&data["subtotal"]), dec!(4000));
    assert_eq!(decimal_of(&data["discount"]), dec!(400));
    assert_eq!(decimal_of(&data["shipping"]), dec!(30));
    assert_eq!(decimal_of(&data["total"]), dec!(3630));
}

#[tokio::test]
async fn client_supplied_aggregates_are_ignored() {
    let app = TestApp::new().await;
    let token = app.customer_token(ALICE);

    // A tampered cart claims everything is free.
    let payload = json!({
        "items": [
            {"product_name": "Linen shirt", "product_price": "1000.00", "quantity": 2,
             "subtotal": "0.01"}
        ],
        "subtotal": "0.00",
        "shipping": "0.00",
        "discount": "2000.00",
        "total": "0.00"
    });

    let body = place_order(&app, &token, payload).await;
    let data = &body["data"];

    assert_eq!(decimal_of(&data["subtotal"]), dec!(2000));
    assert_eq!(decimal_of(&data["discount"]), dec!(0));
    assert_eq!(decimal_of(&data["total"]), dec!(2030));
    assert_eq!(decimal_of(&data["items"][0]["subtotal"]), dec!(2000));
}

#[tokio::test]
async fn empty_carts_are_rejected() {
    let app = TestApp::new().await;
    let token = app.customer_token(ALICE);

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({"items": []})),
        )
        .await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn overflowing_amounts_are_rejected_as_invalid() {
    let app = TestApp::new().await;
    let token = app.customer_token(ALICE);

    // Largest representable decimal; doubling it cannot be priced.
    let payload = json!({
        "items": [
            {"product_name": "Linen shirt",
             "product_price": "79228162514264337593543950335",
             "quantity": 2}
        ]
    });

    let response = app
        .request(Method::POST, "/api/v1/orders", Some(&token), Some(payload))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn item_descriptors_round_trip() {
    let app = TestApp::new().await;
    let token = app.customer_token(ALICE);

    let payload = json!({
        "items": [
            {"product_id": 42, "product_name": "Linen shirt", "product_price": "59.90",
             "quantity": 1, "size": "M", "color": "navy"}
        ]
    });

    let body = place_order(&app, &token, payload).await;
    let item = &body["data"]["items"][0];

    assert_eq!(item["product_id"], 42);
    assert_eq!(item["size"], "M");
    assert_eq!(item["color"], "navy");
    assert_eq!(decimal_of(&item["subtotal"]), dec!(59.90));
}

// ==================== Authentication ====================

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let app = TestApp::new().await;

    for (method, uri) in [
        (Method::GET, "/api/v1/orders"),
        (Method::GET, "/api/v1/orders/1"),
    ] {
        let response = app.request(method, uri, None, None).await;
        assert_eq!(response.status(), 401);
    }

    let response = app
        .request(Method::POST, "/api/v1/orders", None, Some(small_cart()))
        .await;
    assert_eq!(response.status(), 401);
}

// ==================== Visibility ====================

#[tokio::test]
async fn owners_can_read_their_orders_and_reads_are_idempotent() {
    let app = TestApp::new().await;
    let token = app.customer_token(ALICE);

    let created = place_order(&app, &token, small_cart()).await;
    let order_id = created["data"]["order_id"].as_i64().unwrap();

    let first = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(first.status(), 200);
    let first = response_json(first).await;

    let second = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            Some(&token),
            None,
        )
        .await;
    let second = response_json(second).await;

    assert_eq!(first["data"], second["data"]);
}

#[tokio::test]
async fn strangers_cannot_read_foreign_orders() {
    let app = TestApp::new().await;

    let created = place_order(&app, &app.customer_token(ALICE), small_cart()).await;
    let order_id = created["data"]["order_id"].as_i64().unwrap();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            Some(&app.customer_token(BOB)),
            None,
        )
        .await;
    assert_eq!(response.status(), 403);

    // Administrators may read anything
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            Some(&app.admin_token()),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn missing_orders_are_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/orders/4242",
            Some(&app.admin_token()),
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
}

// ==================== Listing ====================

#[tokio::test]
async fn listing_scopes_non_admins_to_their_own_orders() {
    let app = TestApp::new().await;

    place_order(&app, &app.customer_token(ALICE), small_cart()).await;
    place_order(&app, &app.customer_token(BOB), small_cart()).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/orders",
            Some(&app.customer_token(ALICE)),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let orders = body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["user_id"], ALICE);

    // Asking for somebody else's orders is forbidden for non-admins
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders?user_id={BOB}"),
            Some(&app.customer_token(ALICE)),
            None,
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn admins_list_everything_with_filters() {
    let app = TestApp::new().await;

    place_order(&app, &app.customer_token(ALICE), small_cart()).await;
    place_order(&app, &app.customer_token(BOB), small_cart()).await;

    let response = app
        .request(Method::GET, "/api/v1/orders", Some(&app.admin_token()), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders?user_id={BOB}"),
            Some(&app.admin_token()),
            None,
        )
        .await;
    let body = response_json(response).await;
    let orders = body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["user_id"], BOB);

    let response = app
        .request(
            Method::GET,
            "/api/v1/orders?status=completed",
            Some(&app.admin_token()),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn listing_with_an_unknown_status_filter_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/orders?status=shipped",
            Some(&app.admin_token()),
            None,
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn lists_are_newest_first() {
    let app = TestApp::new().await;
    let token = app.customer_token(ALICE);

    place_order(&app, &token, small_cart()).await;
    place_order(&app, &token, small_cart()).await;

    let response = app
        .request(Method::GET, "/api/v1/orders", Some(&token), None)
        .await;
    let body = response_json(response).await;
    let orders = body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 2);

    let newest = orders[0]["created_at"].as_str().unwrap();
    let oldest = orders[1]["created_at"].as_str().unwrap();
    assert!(newest >= oldest);
}

// ==================== Status transitions ====================

async fn set_status(app: &TestApp, token: &str, order_id: i64, status: &str) -> (u16, Value) {
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/status"),
            Some(token),
            Some(json!({"status": status})),
        )
        .await;
    let status_code = response.status().as_u16();
    let body = response_json(response).await;
    (status_code, body)
}

#[tokio::test]
async fn admins_walk_orders_through_the_lifecycle() {
    let app = TestApp::new().await;
    let admin = app.admin_token();

    let created = place_order(&app, &app.customer_token(ALICE), small_cart()).await;
    let order_id = created["data"]["order_id"].as_i64().unwrap();

    let (code, body) = set_status(&app, &admin, order_id, "processing").await;
    assert_eq!(code, 200);
    assert_eq!(body["data"]["status"], "processing");

    let (code, body) = set_status(&app, &admin, order_id, "completed").await;
    assert_eq!(code, 200);
    assert_eq!(body["data"]["status"], "completed");

    // A subsequent read observes the terminal status
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            Some(&admin),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "completed");
}

#[tokio::test]
async fn disallowed_transitions_are_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token();

    let created = place_order(&app, &app.customer_token(ALICE), small_cart()).await;
    let order_id = created["data"]["order_id"].as_i64().unwrap();

    // Cannot skip straight to completed
    let (code, _) = set_status(&app, &admin, order_id, "completed").await;
    assert_eq!(code, 400);

    let (code, _) = set_status(&app, &admin, order_id, "processing").await;
    assert_eq!(code, 200);
    let (code, _) = set_status(&app, &admin, order_id, "completed").await;
    assert_eq!(code, 200);

    // Terminal states do not revert
    let (code, _) = set_status(&app, &admin, order_id, "processing").await;
    assert_eq!(code, 400);
}

#[tokio::test]
async fn reapplying_the_current_status_is_a_noop() {
    let app = TestApp::new().await;
    let admin = app.admin_token();

    let created = place_order(&app, &app.customer_token(ALICE), small_cart()).await;
    let order_id = created["data"]["order_id"].as_i64().unwrap();

    let (code, body) = set_status(&app, &admin, order_id, "pending").await;
    assert_eq!(code, 200);
    assert_eq!(body["data"]["status"], "pending");
}

#[tokio::test]
async fn cancellation_accepts_both_spellings() {
    let app = TestApp::new().await;
    let admin = app.admin_token();

    let created = place_order(&app, &app.customer_token(ALICE), small_cart()).await;
    let order_id = created["data"]["order_id"].as_i64().unwrap();

    let (code, body) = set_status(&app, &admin, order_id, "canceled").await;
    assert_eq!(code, 200);
    assert_eq!(body["data"]["status"], "cancelled");
}

#[tokio::test]
async fn non_admins_cannot_change_status() {
    let app = TestApp::new().await;
    let owner = app.customer_token(ALICE);

    let created = place_order(&app, &owner, small_cart()).await;
    let order_id = created["data"]["order_id"].as_i64().unwrap();

    let (code, _) = set_status(&app, &owner, order_id, "processing").await;
    assert_eq!(code, 403);

    // And the status is unchanged afterwards
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            Some(&owner),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "pending");
}

#[tokio::test]
async fn unknown_statuses_and_missing_orders_are_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token();

    let created = place_order(&app, &app.customer_token(ALICE), small_cart()).await;
    let order_id = created["data"]["order_id"].as_i64().unwrap();

    let (code, _) = set_status(&app, &admin, order_id, "shipped").await;
    assert_eq!(code, 400);

    let (code, _) = set_status(&app, &admin, 4242, "processing").await;
    assert_eq!(code, 404);
}
