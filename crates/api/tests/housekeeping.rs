//! Access logging and the cleanup jobs behind it.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use backoffice_api::background::{access_log_cleanup, cart_cleanup};
use backoffice_db::models::access_log::AccessLog;
use backoffice_db::models::product::CreateProduct;
use backoffice_db::repositories::{AccessLogRepo, CartRepo, ProductRepo};
use common::{get, get_auth, user_with_token};
use sqlx::PgPool;

/// Rows are written off the request path, so wait for them to land.
async fn wait_for_logs(pool: &PgPool, expected: usize) -> Vec<AccessLog> {
    for _ in 0..50 {
        let rows = AccessLogRepo::recent(pool, None, 50).await.unwrap();
        if rows.len() >= expected {
            return rows;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {expected} access log rows");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn requests_are_access_logged(pool: PgPool) {
    let (admin, token) = user_with_token(&pool, "root", "admin", None).await;
    let test = common::build_test_app(pool.clone());

    let anonymous = get(test.app(), "/api/v1/subscriptions?page=1").await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    let signed_in = get_auth(test.app(), "/api/v1/subscriptions", &token).await;
    assert_eq!(signed_in.status(), StatusCode::OK);
    let health = get(test.app(), "/health").await;
    assert_eq!(health.status(), StatusCode::OK);

    let rows = wait_for_logs(&pool, 2).await;
    assert_eq!(rows.len(), 2, "health checks are not logged");

    let rejected = rows.iter().find(|r| r.status_code == 401).unwrap();
    assert_eq!(rejected.user_id, None);
    assert_eq!(rejected.http_method, "GET");
    assert_eq!(rejected.endpoint, "/api/v1/subscriptions");
    assert_eq!(rejected.query_string.as_deref(), Some("page=1"));
    assert_eq!(rejected.error_message.as_deref(), Some("HTTP 401 error"));
    assert!(rejected.request_id.is_some());

    let served = rows.iter().find(|r| r.status_code == 200).unwrap();
    assert_eq!(served.user_id, Some(admin.id));
    assert_eq!(served.user_role.as_deref(), Some("admin"));
    assert_eq!(served.error_message, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn access_log_retention_purges_old_rows(pool: PgPool) {
    let test = common::build_test_app(pool.clone());
    get(test.app(), "/api/v1/subscriptions").await;
    get(test.app(), "/api/v1/orders").await;
    wait_for_logs(&pool, 2).await;

    sqlx::query(
        "UPDATE access_logs SET created_at = NOW() - INTERVAL '120 days'
         WHERE endpoint = '/api/v1/orders'",
    )
    .execute(&pool)
    .await
    .unwrap();

    assert_eq!(access_log_cleanup::purge_once(&pool, 90).await, 1);
    let left = AccessLogRepo::recent(&pool, None, 10).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].endpoint, "/api/v1/subscriptions");

    // Nonsense retention is ignored rather than wiping the table.
    assert_eq!(access_log_cleanup::purge_once(&pool, i64::MAX).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cart_cleanup_removes_deleted_products(pool: PgPool) {
    let business = common::create_business(&pool, "snacks").await;
    let (customer, _) = user_with_token(&pool, "guest", "customer", None).await;
    let product = ProductRepo::create(
        &pool,
        business.id,
        &CreateProduct {
            name: "Spring rolls".to_string(),
            description: None,
            price_cents: 450,
            is_available: None,
        },
    )
    .await
    .unwrap();
    let cart = CartRepo::get_or_create(&pool, customer.id, business.id).await.unwrap();
    CartRepo::put_item(&pool, cart.id, product.id, 2).await.unwrap();

    assert_eq!(cart_cleanup::purge_unorderable(&pool).await, 0);
    assert_eq!(cart_cleanup::purge_stale(&pool).await, 0);

    ProductRepo::soft_delete(&pool, product.id).await.unwrap();
    assert_eq!(cart_cleanup::purge_unorderable(&pool).await, 1);
    assert!(CartRepo::lines(&pool, cart.id).await.unwrap().is_empty());
}
