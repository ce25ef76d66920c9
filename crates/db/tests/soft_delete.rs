//! Soft-deleted rows disappear from lookups and lists, and unique
//! constraints only apply among live rows.

use assert_matches::assert_matches;
use backoffice_core::pagination::PageRequest;
use backoffice_db::models::business::CreateBusiness;
use backoffice_db::models::plan::CreatePlan;
use backoffice_db::models::user::{CreateUser, UserFilter};
use backoffice_db::repositories::{BusinessRepo, PlanRepo, UserRepo};
use sqlx::PgPool;

fn new_business(name: &str, subdomain: &str) -> CreateBusiness {
    CreateBusiness {
        name: name.to_string(),
        subdomain: subdomain.to_string(),
        phone: None,
        address: None,
        description: None,
    }
}

async fn new_user(pool: &PgPool, username: &str, role: &str) -> CreateUser {
    let role_id = UserRepo::role_id_by_name(pool, role).await.unwrap().unwrap();
    CreateUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "hash".to_string(),
        role_id,
        full_name: None,
        phone: None,
        business_id: None,
        class_id: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_deleted_user_hidden(pool: PgPool) {
    let input = new_user(&pool, "alice", "customer").await;
    let user = UserRepo::create(&pool, &input).await.unwrap();
    assert_eq!(user.role, "customer");

    assert!(UserRepo::soft_delete(&pool, user.id).await.unwrap());
    assert!(UserRepo::find_by_id(&pool, user.id).await.unwrap().is_none());
    assert!(UserRepo::find_by_username(&pool, "alice").await.unwrap().is_none());

    let page = UserRepo::list(&pool, &UserFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert!(page.items.iter().all(|u| u.id != user.id));

    // Second delete is a no-op.
    assert!(!UserRepo::soft_delete(&pool, user.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_username_reusable_after_soft_delete(pool: PgPool) {
    let input = new_user(&pool, "bob", "staff").await;
    let first = UserRepo::create(&pool, &input).await.unwrap();

    let duplicate = UserRepo::create(&pool, &input).await.unwrap_err();
    assert_matches!(&duplicate, sqlx::Error::Database(e) if e.constraint() == Some("uq_users_username"));

    UserRepo::soft_delete(&pool, first.id).await.unwrap();
    let second = UserRepo::create(&pool, &input).await.unwrap();
    assert_ne!(first.id, second.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_deleted_business_frees_subdomain(pool: PgPool) {
    let business = BusinessRepo::create(&pool, &new_business("Noodle House", "noodles"))
        .await
        .unwrap();

    let err = BusinessRepo::create(&pool, &new_business("Other", "noodles"))
        .await
        .unwrap_err();
    assert_eq!(
        err.as_database_error().and_then(|e| e.constraint()),
        Some("uq_businesses_subdomain")
    );

    assert!(BusinessRepo::soft_delete(&pool, business.id).await.unwrap());
    assert!(BusinessRepo::find_by_id(&pool, business.id).await.unwrap().is_none());
    assert!(BusinessRepo::find_by_subdomain(&pool, "noodles").await.unwrap().is_none());

    BusinessRepo::create(&pool, &new_business("Other", "noodles"))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_deleted_plan_excluded_from_catalogue(pool: PgPool) {
    let plan = PlanRepo::create(
        &pool,
        &CreatePlan {
            name: "Starter".to_string(),
            description: None,
            price_cents: 0,
            duration_days: 30,
            visibility_id: None,
        },
    )
    .await
    .unwrap();

    let before = PlanRepo::list(&pool, None, PageRequest::default()).await.unwrap();
    assert_eq!(before.total_elements, 1);

    PlanRepo::soft_delete(&pool, plan.id).await.unwrap();
    let after = PlanRepo::list(&pool, None, PageRequest::default()).await.unwrap();
    assert_eq!(after.total_elements, 0);
    assert!(PlanRepo::find_by_id(&pool, plan.id).await.unwrap().is_none());
}
