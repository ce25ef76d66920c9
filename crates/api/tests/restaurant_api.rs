//! Subscriptions, payments, carts, orders and the Telegram webhook.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{
    body_json, delete_auth, get_auth, post_auth, post_json_auth, user_with_token, WEBHOOK_SECRET,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

async fn create_plan(test: &common::TestApp, admin: &str, price_cents: i64) -> Value {
    let response = post_json_auth(
        test.app(),
        "/api/v1/subscription-plans",
        admin,
        json!({ "name": "Monthly", "price_cents": price_cents, "duration_days": 30 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn business_holds_one_active_subscription(pool: PgPool) {
    let (_, admin) = user_with_token(&pool, "root", "admin", None).await;
    let business = common::create_business(&pool, "pho").await;
    let test = common::build_test_app(pool);
    let plan = create_plan(&test, &admin, 1500).await;

    let body = json!({ "business_id": business.id, "plan_id": plan["id"] });
    let first = post_json_auth(test.app(), "/api/v1/subscriptions", &admin, body.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let subscription = body_json(first).await;
    assert_eq!(subscription["is_active"], true);

    let second = post_json_auth(test.app(), "/api/v1/subscriptions", &admin, body).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let usage = get_auth(
        test.app(),
        &format!("/api/v1/subscriptions/{}/usage", subscription["id"]),
        &admin,
    )
    .await;
    assert_eq!(usage.status(), StatusCode::OK);
    let usage = body_json(usage).await;
    assert_eq!(usage["is_expired"], false);
    assert!(usage["days_remaining"].as_i64().unwrap() >= 29);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn oversized_durations_are_rejected(pool: PgPool) {
    let (_, admin) = user_with_token(&pool, "root", "admin", None).await;
    let business = common::create_business(&pool, "bun").await;
    let test = common::build_test_app(pool);

    let plan = post_json_auth(
        test.app(),
        "/api/v1/subscription-plans",
        &admin,
        json!({ "name": "Forever", "price_cents": 100, "duration_days": 100_000_000 }),
    )
    .await;
    assert_eq!(plan.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(plan).await["code"], "VALIDATION_ERROR");

    let plan = create_plan(&test, &admin, 1500).await;
    let created = post_json_auth(
        test.app(),
        "/api/v1/subscriptions",
        &admin,
        json!({ "business_id": business.id, "plan_id": plan["id"] }),
    )
    .await;
    let subscription = body_json(created).await;

    let renew = post_json_auth(
        test.app(),
        &format!("/api/v1/subscriptions/{}/renew", subscription["id"]),
        &admin,
        json!({ "duration_days": 100_000_000 }),
    )
    .await;
    assert_eq!(renew.status(), StatusCode::BAD_REQUEST);

    let expiring = get_auth(
        test.app(),
        "/api/v1/subscriptions/expiring?days=9223372036854775807",
        &admin,
    )
    .await;
    assert_eq!(expiring.status(), StatusCode::BAD_REQUEST);

    // The original subscription is untouched.
    let usage = get_auth(
        test.app(),
        &format!("/api/v1/subscriptions/{}/usage", subscription["id"]),
        &admin,
    )
    .await;
    assert_eq!(body_json(usage).await["is_expired"], false);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn owner_sees_only_own_business(pool: PgPool) {
    let mine = common::create_business(&pool, "mine").await;
    let theirs = common::create_business(&pool, "theirs").await;
    let (_, owner) = user_with_token(&pool, "owner", "business_owner", Some(mine.id)).await;
    let test = common::build_test_app(pool);

    let own = get_auth(test.app(), &format!("/api/v1/businesses/{}", mine.id), &owner).await;
    assert_eq!(own.status(), StatusCode::OK);

    let other = get_auth(test.app(), &format!("/api/v1/businesses/{}", theirs.id), &owner).await;
    assert_eq!(other.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn payment_lifecycle(pool: PgPool) {
    let (_, admin) = user_with_token(&pool, "root", "admin", None).await;
    let business = common::create_business(&pool, "bbq").await;
    let test = common::build_test_app(pool);
    let plan = create_plan(&test, &admin, 2000).await;

    let response = post_json_auth(
        test.app(),
        "/api/v1/payments",
        &admin,
        json!({
            "business_id": business.id,
            "plan_id": plan["id"],
            "amount_cents": 2000,
            "method": "card",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let payment = body_json(response).await;
    assert_eq!(payment["status_id"], 1);
    assert_eq!(payment["method"], "CARD");
    assert!(payment["reference_number"].as_str().unwrap().starts_with("PAY-"));

    let id = payment["id"].as_i64().unwrap();

    // Refund needs a completed payment.
    let early_refund = post_auth(test.app(), &format!("/api/v1/payments/{id}/refund"), &admin).await;
    assert_eq!(early_refund.status(), StatusCode::CONFLICT);

    let completed = post_auth(test.app(), &format!("/api/v1/payments/{id}/complete"), &admin).await;
    assert_eq!(completed.status(), StatusCode::OK);
    assert_eq!(body_json(completed).await["status_id"], 2);

    let refunded = post_auth(test.app(), &format!("/api/v1/payments/{id}/refund"), &admin).await;
    assert_eq!(refunded.status(), StatusCode::OK);
    assert_eq!(body_json(refunded).await["status_id"], 4);

    let after_refund = post_auth(test.app(), &format!("/api/v1/payments/{id}/fail"), &admin).await;
    assert_eq!(after_refund.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn payment_rejects_unknown_method(pool: PgPool) {
    let (_, admin) = user_with_token(&pool, "root", "admin", None).await;
    let business = common::create_business(&pool, "taco").await;
    let test = common::build_test_app(pool);
    let plan = create_plan(&test, &admin, 500).await;

    let response = post_json_auth(
        test.app(),
        "/api/v1/payments",
        &admin,
        json!({
            "business_id": business.id,
            "plan_id": plan["id"],
            "amount_cents": 500,
            "method": "seashells",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Carts and orders
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn checkout_flow(pool: PgPool) {
    let business = common::create_business(&pool, "noodles").await;
    let (_, owner) = user_with_token(&pool, "chef", "business_owner", Some(business.id)).await;
    let (_, customer) = user_with_token(&pool, "guest", "customer", None).await;
    let test = common::build_test_app(pool);

    let product = body_json(
        post_json_auth(
            test.app(),
            &format!("/api/v1/businesses/{}/products", business.id),
            &owner,
            json!({ "name": "Laksa", "price_cents": 1250 }),
        )
        .await,
    )
    .await;

    let cart_uri = format!("/api/v1/carts/{}/items", business.id);
    let item = json!({ "product_id": product["id"], "quantity": 2 });
    post_json_auth(test.app(), &cart_uri, &customer, item).await;
    let response = post_json_auth(
        test.app(),
        &cart_uri,
        &customer,
        json!({ "product_id": product["id"], "quantity": 1 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cart = body_json(response).await;
    assert_eq!(cart["item_count"], 3);
    assert_eq!(cart["subtotal_cents"], 3750);

    let response = post_json_auth(
        test.app(),
        "/api/v1/orders/checkout",
        &customer,
        json!({ "business_id": business.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = body_json(response).await;
    assert_eq!(order["status_id"], 1);
    assert_eq!(order["total_cents"], 3750);
    assert_eq!(order["payment_method"], "CASH");
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));

    // The cart was emptied by checkout.
    let again = post_json_auth(
        test.app(),
        "/api/v1/orders/checkout",
        &customer,
        json!({ "business_id": business.id }),
    )
    .await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);

    let id = order["id"].as_i64().unwrap();
    let skip = post_json_auth(
        test.app(),
        &format!("/api/v1/orders/{id}/status"),
        &owner,
        json!({ "status_id": 4 }),
    )
    .await;
    assert_eq!(skip.status(), StatusCode::CONFLICT);

    let confirm = post_json_auth(
        test.app(),
        &format!("/api/v1/orders/{id}/status"),
        &owner,
        json!({ "status_id": 2 }),
    )
    .await;
    assert_eq!(confirm.status(), StatusCode::OK);
    let confirmed = body_json(confirm).await;
    assert_eq!(confirmed["status_id"], 2);
    assert!(confirmed["confirmed_at"].is_string());

    let cancel = post_auth(test.app(), &format!("/api/v1/orders/{id}/cancel"), &customer).await;
    assert_eq!(cancel.status(), StatusCode::OK);
    assert_eq!(body_json(cancel).await["status_id"], 6);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn prices_and_fees_are_capped(pool: PgPool) {
    let business = common::create_business(&pool, "gold").await;
    let (_, owner) = user_with_token(&pool, "chef", "business_owner", Some(business.id)).await;
    let (_, customer) = user_with_token(&pool, "guest", "customer", None).await;
    let test = common::build_test_app(pool);
    let products_uri = format!("/api/v1/businesses/{}/products", business.id);

    let too_dear = post_json_auth(
        test.app(),
        &products_uri,
        &owner,
        json!({ "name": "Gold leaf", "price_cents": 100_000_001 }),
    )
    .await;
    assert_eq!(too_dear.status(), StatusCode::BAD_REQUEST);

    let negative = post_json_auth(
        test.app(),
        &products_uri,
        &owner,
        json!({ "name": "Refund", "price_cents": -1 }),
    )
    .await;
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

    let product = body_json(
        post_json_auth(
            test.app(),
            &products_uri,
            &owner,
            json!({ "name": "Tea", "price_cents": 300 }),
        )
        .await,
    )
    .await;
    post_json_auth(
        test.app(),
        &format!("/api/v1/carts/{}/items", business.id),
        &customer,
        json!({ "product_id": product["id"], "quantity": 1 }),
    )
    .await;

    let checkout = post_json_auth(
        test.app(),
        "/api/v1/orders/checkout",
        &customer,
        json!({ "business_id": business.id, "delivery_fee_cents": i64::MAX }),
    )
    .await;
    assert_eq!(checkout.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(checkout).await["code"], "VALIDATION_ERROR");

    // The rejected checkout left the cart in place.
    let checkout = post_json_auth(
        test.app(),
        "/api/v1/orders/checkout",
        &customer,
        json!({ "business_id": business.id, "delivery_fee_cents": 200 }),
    )
    .await;
    assert_eq!(checkout.status(), StatusCode::CREATED);
    assert_eq!(body_json(checkout).await["total_cents"], 500);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cart_quantity_is_capped(pool: PgPool) {
    let business = common::create_business(&pool, "cafe").await;
    let (_, owner) = user_with_token(&pool, "barista", "business_owner", Some(business.id)).await;
    let (_, customer) = user_with_token(&pool, "sipper", "customer", None).await;
    let test = common::build_test_app(pool);

    let product = body_json(
        post_json_auth(
            test.app(),
            &format!("/api/v1/businesses/{}/products", business.id),
            &owner,
            json!({ "name": "Latte", "price_cents": 450 }),
        )
        .await,
    )
    .await;

    let cart_uri = format!("/api/v1/carts/{}/items", business.id);
    let ok = post_json_auth(
        test.app(),
        &cart_uri,
        &customer,
        json!({ "product_id": product["id"], "quantity": 99 }),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);

    let over = post_json_auth(
        test.app(),
        &cart_uri,
        &customer,
        json!({ "product_id": product["id"], "quantity": 1 }),
    )
    .await;
    assert_eq!(over.status(), StatusCode::BAD_REQUEST);

    let cleared = delete_auth(test.app(), &format!("/api/v1/carts/{}", business.id), &customer).await;
    assert!(cleared.status().is_success());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pos_order_requires_guest_phone(pool: PgPool) {
    let business = common::create_business(&pool, "deli").await;
    let (_, owner) = user_with_token(&pool, "counter", "business_owner", Some(business.id)).await;
    let test = common::build_test_app(pool);

    let product = body_json(
        post_json_auth(
            test.app(),
            &format!("/api/v1/businesses/{}/products", business.id),
            &owner,
            json!({ "name": "Bagel", "price_cents": 300 }),
        )
        .await,
    )
    .await;

    let items = json!([{ "product_id": product["id"], "quantity": 2 }]);
    let missing = post_json_auth(
        test.app(),
        "/api/v1/orders/pos",
        &owner,
        json!({ "business_id": business.id, "items": items }),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let created = post_json_auth(
        test.app(),
        "/api/v1/orders/pos",
        &owner,
        json!({
            "business_id": business.id,
            "guest_phone": "+15550100",
            "delivery_fee_cents": 200,
            "items": items,
        }),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let order = body_json(created).await;
    assert_eq!(order["is_pos_order"], true);
    assert_eq!(order["total_cents"], 800);
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

async fn webhook(test: &common::TestApp, secret: &str, update: Value) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/telegram/webhook")
        .header("Content-Type", "application/json")
        .header("X-Telegram-Bot-Api-Secret-Token", secret)
        .body(Body::from(serde_json::to_vec(&update).unwrap()))
        .unwrap();
    test.app().oneshot(request).await.unwrap().status()
}

fn text_update(chat_id: i64, text: &str) -> Value {
    json!({
        "update_id": 1,
        "message": {
            "chat": { "id": chat_id },
            "from": { "id": 777, "first_name": "Ann" },
            "text": text,
        }
    })
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn webhook_rejects_bad_secret(pool: PgPool) {
    let test = common::build_test_app(pool);
    let status = webhook(&test, "wrong", text_update(42, "/start")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(test.sender.messages().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn link_code_binds_chat_to_business(pool: PgPool) {
    let business = common::create_business(&pool, "ramen").await;
    let (_, owner) = user_with_token(&pool, "tanaka", "business_owner", Some(business.id)).await;
    let test = common::build_test_app(pool.clone());

    let response = post_auth(
        test.app(),
        &format!("/api/v1/businesses/{}/telegram/link-code", business.id),
        &owner,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let code = body_json(response).await["code"].as_str().unwrap().to_string();

    let link = format!("/link {}", code.to_lowercase());
    assert_eq!(webhook(&test, WEBHOOK_SECRET, text_update(4242, &link)).await, StatusCode::OK);

    let linked = backoffice_db::repositories::BusinessRepo::find_by_id(&pool, business.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(linked.telegram_chat_id, Some(4242));

    let sent = test.sender.messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 4242);
    assert!(sent[0].1.contains("ramen kitchen"));

    // The code is single-use.
    assert_eq!(webhook(&test, WEBHOOK_SECRET, text_update(99, &link)).await, StatusCode::OK);
    assert!(test.sender.messages()[1].1.contains("invalid"));
}
