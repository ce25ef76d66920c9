//! Repository for the `subscription_plans` table.

use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::DbId;
use sqlx::PgPool;

use crate::models::plan::{CreatePlan, SubscriptionPlan, UpdatePlan};
use crate::models::status::{PlanVisibility, StatusId};

const COLUMNS: &str =
    "id, name, description, price_cents, duration_days, visibility_id, created_at, updated_at";

pub struct PlanRepo;

impl PlanRepo {
    pub async fn create(pool: &PgPool, input: &CreatePlan) -> Result<SubscriptionPlan, sqlx::Error> {
        let query = format!(
            "INSERT INTO subscription_plans (name, description, price_cents, duration_days, visibility_id)
             VALUES ($1, $2, $3, $4, COALESCE($5, $6))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubscriptionPlan>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.price_cents)
            .bind(input.duration_days)
            .bind(input.visibility_id)
            .bind(PlanVisibility::Public.id())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<SubscriptionPlan>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subscription_plans WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, SubscriptionPlan>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List live plans, cheapest first. `visibility_id` narrows to one
    /// visibility (the public catalogue passes `Public`).
    pub async fn list(
        pool: &PgPool,
        visibility_id: Option<StatusId>,
        page: PageRequest,
    ) -> Result<Page<SubscriptionPlan>, sqlx::Error> {
        let filter = "deleted_at IS NULL AND ($1::SMALLINT IS NULL OR visibility_id = $1)";
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM subscription_plans WHERE {filter}"
        ))
        .bind(visibility_id)
        .fetch_one(pool)
        .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM subscription_plans WHERE {filter}
             ORDER BY price_cents, duration_days, id LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, SubscriptionPlan>(&query)
            .bind(visibility_id)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePlan,
    ) -> Result<Option<SubscriptionPlan>, sqlx::Error> {
        let query = format!(
            "UPDATE subscription_plans SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price_cents = COALESCE($4, price_cents),
                duration_days = COALESCE($5, duration_days),
                visibility_id = COALESCE($6, visibility_id)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubscriptionPlan>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.price_cents)
            .bind(input.duration_days)
            .bind(input.visibility_id)
            .fetch_optional(pool)
            .await
    }

    /// Whether any live, active subscription is on this plan.
    pub async fn has_active_subscriptions(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM subscriptions
                WHERE plan_id = $1 AND is_active AND deleted_at IS NULL
             )",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE subscription_plans SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
