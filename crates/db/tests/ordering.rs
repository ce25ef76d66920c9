//! Checkout snapshots cart lines into an order and empties the cart in the
//! same transaction; status changes are guarded by the expected status.

use backoffice_core::ordering::{ORDER_CONFIRMED, ORDER_PENDING, ORDER_PREPARING};
use backoffice_db::models::business::CreateBusiness;
use backoffice_db::models::order::{CreateOrder, CreateOrderItem};
use backoffice_db::models::product::{CreateProduct, UpdateProduct};
use backoffice_db::models::user::CreateUser;
use backoffice_db::repositories::{BusinessRepo, CartRepo, OrderRepo, ProductRepo, UserRepo};
use chrono::{Duration, Utc};
use sqlx::PgPool;

async fn seed(pool: &PgPool) -> (i64, i64, i64) {
    let role_id = UserRepo::role_id_by_name(pool, "customer").await.unwrap().unwrap();
    let customer = UserRepo::create(
        pool,
        &CreateUser {
            username: "dave".to_string(),
            email: "dave@example.com".to_string(),
            password_hash: "hash".to_string(),
            role_id,
            full_name: None,
            phone: None,
            business_id: None,
            class_id: None,
        },
    )
    .await
    .unwrap();
    let business = BusinessRepo::create(
        pool,
        &CreateBusiness {
            name: "Pho Place".to_string(),
            subdomain: "pho".to_string(),
            phone: None,
            address: None,
            description: None,
        },
    )
    .await
    .unwrap();
    let product = ProductRepo::create(
        pool,
        business.id,
        &CreateProduct {
            name: "Pho Bo".to_string(),
            description: None,
            price_cents: 850,
            is_available: None,
        },
    )
    .await
    .unwrap();
    (customer.id, business.id, product.id)
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cart_lines_follow_product_state(pool: PgPool) {
    let (customer_id, business_id, product_id) = seed(&pool).await;
    let cart = CartRepo::get_or_create(&pool, customer_id, business_id).await.unwrap();
    let again = CartRepo::get_or_create(&pool, customer_id, business_id).await.unwrap();
    assert_eq!(cart.id, again.id);

    CartRepo::put_item(&pool, cart.id, product_id, 2).await.unwrap();
    assert_eq!(CartRepo::quantity_of(&pool, cart.id, product_id).await.unwrap(), 2);

    ProductRepo::update(
        &pool,
        product_id,
        &UpdateProduct {
            is_available: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let lines = CartRepo::lines(&pool, cart.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert!(!lines[0].is_available);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_checkout_clears_cart_and_transitions_guarded(pool: PgPool) {
    let (customer_id, business_id, product_id) = seed(&pool).await;
    let cart = CartRepo::get_or_create(&pool, customer_id, business_id).await.unwrap();
    CartRepo::put_item(&pool, cart.id, product_id, 3).await.unwrap();

    let created = OrderRepo::create(
        &pool,
        &CreateOrder {
            order_number: "ORD-20261019-ABC123".to_string(),
            customer_id: Some(customer_id),
            business_id,
            guest_name: None,
            guest_phone: None,
            guest_location: None,
            customer_note: None,
            subtotal_cents: 2550,
            delivery_fee_cents: 0,
            payment_method: "CASH".to_string(),
            is_pos_order: false,
        },
        &[CreateOrderItem {
            product_id: Some(product_id),
            product_name: "Pho Bo".to_string(),
            unit_price_cents: 850,
            quantity: 3,
            line_total_cents: 2550,
        }],
        Some(cart.id),
    )
    .await
    .unwrap();

    assert_eq!(created.order.total_cents, 2550);
    assert_eq!(created.items[0].line_total_cents, 2550);
    assert!(CartRepo::lines(&pool, cart.id).await.unwrap().is_empty());

    let confirmed = OrderRepo::transition(&pool, created.order.id, ORDER_PENDING, ORDER_CONFIRMED, None)
        .await
        .unwrap()
        .unwrap();
    assert!(confirmed.confirmed_at.is_some());

    // Stale expectation: order is no longer PENDING.
    let stale = OrderRepo::transition(&pool, created.order.id, ORDER_PENDING, ORDER_PREPARING, None)
        .await
        .unwrap();
    assert!(stale.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cart_cleanup_drops_unorderable_and_stale_lines(pool: PgPool) {
    let (customer_id, business_id, product_id) = seed(&pool).await;
    let other = ProductRepo::create(
        &pool,
        business_id,
        &CreateProduct {
            name: "Bun Cha".to_string(),
            description: None,
            price_cents: 900,
            is_available: None,
        },
    )
    .await
    .unwrap();
    let cart = CartRepo::get_or_create(&pool, customer_id, business_id).await.unwrap();
    CartRepo::put_item(&pool, cart.id, product_id, 1).await.unwrap();
    CartRepo::put_item(&pool, cart.id, other.id, 2).await.unwrap();

    assert_eq!(CartRepo::purge_unorderable_lines(&pool).await.unwrap(), 0);

    ProductRepo::update(
        &pool,
        product_id,
        &UpdateProduct {
            is_available: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(CartRepo::purge_unorderable_lines(&pool).await.unwrap(), 1);
    let lines = CartRepo::lines(&pool, cart.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, other.id);

    // Fresh lines survive the weekly cutoff; everything is older than a future one.
    let week_ago = Utc::now() - Duration::days(7);
    assert_eq!(CartRepo::purge_stale_lines(&pool, week_ago).await.unwrap(), 0);
    let later = Utc::now() + Duration::minutes(1);
    assert_eq!(CartRepo::purge_stale_lines(&pool, later).await.unwrap(), 1);
    assert!(CartRepo::lines(&pool, cart.id).await.unwrap().is_empty());
}
