//! One-active-subscription rule, renewal chains, and the expiry queries the
//! sweep relies on.

use backoffice_db::models::business::CreateBusiness;
use backoffice_db::models::plan::CreatePlan;
use backoffice_db::models::subscription::{CreateSubscription, SubscriptionFilter};
use backoffice_db::repositories::{BusinessRepo, PlanRepo, SubscriptionRepo};
use backoffice_core::pagination::PageRequest;
use chrono::{Duration, Utc};
use sqlx::PgPool;

async fn seed(pool: &PgPool) -> (i64, i64) {
    let business = BusinessRepo::create(
        pool,
        &CreateBusiness {
            name: "Cafe".to_string(),
            subdomain: "cafe".to_string(),
            phone: None,
            address: None,
            description: None,
        },
    )
    .await
    .unwrap();
    let plan = PlanRepo::create(
        pool,
        &CreatePlan {
            name: "Monthly".to_string(),
            description: None,
            price_cents: 1250,
            duration_days: 30,
            visibility_id: None,
        },
    )
    .await
    .unwrap();
    (business.id, plan.id)
}

fn starting(business_id: i64, plan_id: i64, offset_days: i64) -> CreateSubscription {
    let start = Utc::now() + Duration::days(offset_days);
    CreateSubscription {
        business_id,
        plan_id,
        start_date: start,
        end_date: start + Duration::days(30),
        auto_renew: false,
        notes: None,
        renewed_from_id: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_second_active_subscription_rejected(pool: PgPool) {
    let (business_id, plan_id) = seed(&pool).await;
    SubscriptionRepo::create(&pool, &starting(business_id, plan_id, 0))
        .await
        .unwrap();

    let err = SubscriptionRepo::create(&pool, &starting(business_id, plan_id, 0))
        .await
        .unwrap_err();
    assert_eq!(
        err.as_database_error().and_then(|e| e.constraint()),
        Some("uq_subscriptions_active_business")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_replaces_lapsed_active_row(pool: PgPool) {
    let (business_id, plan_id) = seed(&pool).await;
    let lapsed = SubscriptionRepo::create(&pool, &starting(business_id, plan_id, -40))
        .await
        .unwrap();
    assert!(lapsed.is_active);

    let fresh = SubscriptionRepo::create(&pool, &starting(business_id, plan_id, 0))
        .await
        .unwrap();
    assert!(fresh.is_active);

    let old = SubscriptionRepo::find_by_id(&pool, lapsed.id).await.unwrap().unwrap();
    assert!(!old.is_active);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_renew_links_and_deactivates_previous(pool: PgPool) {
    let (business_id, plan_id) = seed(&pool).await;
    let first = SubscriptionRepo::create(&pool, &starting(business_id, plan_id, 0))
        .await
        .unwrap();

    let mut next = starting(business_id, plan_id, 30);
    next.renewed_from_id = Some(first.id);
    let second = SubscriptionRepo::renew(&pool, first.id, &next).await.unwrap();

    assert_eq!(second.renewed_from_id, Some(first.id));
    let first = SubscriptionRepo::find_by_id(&pool, first.id).await.unwrap().unwrap();
    assert!(!first.is_active);

    let active = SubscriptionRepo::find_active_for_business(&pool, business_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.subscription.id, second.id);
    assert_eq!(active.plan_name, "Monthly");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_expiring_and_expired_queries(pool: PgPool) {
    let (business_id, plan_id) = seed(&pool).await;
    // Started 26 days ago: ends in 4 days.
    let sub = SubscriptionRepo::create(&pool, &starting(business_id, plan_id, -26))
        .await
        .unwrap();

    let expiring = SubscriptionRepo::list_expiring(&pool, Utc::now() + Duration::days(7))
        .await
        .unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].subscription.id, sub.id);

    let none = SubscriptionRepo::list_expiring(&pool, Utc::now() + Duration::days(2))
        .await
        .unwrap();
    assert!(none.is_empty());
    assert!(SubscriptionRepo::list_expired_active(&pool).await.unwrap().is_empty());

    // The warning can only be claimed once per window.
    let since = Utc::now() - Duration::days(1);
    assert!(SubscriptionRepo::claim_expiry_warning(&pool, sub.id, since).await.unwrap());
    assert!(!SubscriptionRepo::claim_expiry_warning(&pool, sub.id, since).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_filters_and_analytics(pool: PgPool) {
    let (business_id, plan_id) = seed(&pool).await;
    SubscriptionRepo::create(&pool, &starting(business_id, plan_id, -40))
        .await
        .unwrap();

    let expired = SubscriptionRepo::list_expired_active(&pool).await.unwrap();
    assert_eq!(expired.len(), 1);

    let filter = SubscriptionFilter {
        business_id: Some(business_id),
        expired: Some(true),
        ..Default::default()
    };
    let page = SubscriptionRepo::list(&pool, &filter, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_elements, 1);

    let analytics = SubscriptionRepo::analytics(&pool, business_id).await.unwrap();
    assert_eq!(analytics.total_subscriptions, 1);
    assert_eq!(analytics.expired_subscriptions, 1);
    assert_eq!(analytics.total_days_subscribed, 30);
    assert_eq!(analytics.days_remaining, 0);
    assert_eq!(analytics.current_plan_name.as_deref(), Some("Monthly"));
}
