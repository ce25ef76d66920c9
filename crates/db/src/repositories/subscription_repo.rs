//! Repository for the `subscriptions` table.
//!
//! At most one live subscription per business may be active; the partial
//! unique index `uq_subscriptions_active_business` enforces it, and the
//! multi-step writes here run in transactions so the index never trips on
//! an intermediate state.

use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::business::BusinessAnalytics;
use crate::models::status::PaymentStatus;
use crate::models::subscription::{
    CreateSubscription, Subscription, SubscriptionDetail, SubscriptionFilter, UpdateSubscription,
};

const COLUMNS: &str = "id, business_id, plan_id, start_date, end_date, is_active, auto_renew, \
                       notes, renewed_from_id, last_expiry_warning_at, created_at, updated_at";

/// Columns for `subscriptions s JOIN subscription_plans p JOIN businesses b`.
const DETAIL_COLUMNS: &str = "s.id, s.business_id, s.plan_id, s.start_date, s.end_date, \
    s.is_active, s.auto_renew, s.notes, s.renewed_from_id, s.last_expiry_warning_at, \
    s.created_at, s.updated_at, p.name AS plan_name, b.name AS business_name";

const DETAIL_FROM: &str = "subscriptions s
    JOIN subscription_plans p ON p.id = s.plan_id
    JOIN businesses b ON b.id = s.business_id";

pub struct SubscriptionRepo;

impl SubscriptionRepo {
    /// Insert a subscription.
    ///
    /// Any active row for the same business whose end date has already
    /// passed is deactivated first, in the same transaction. A still-current
    /// active row is left alone and the insert fails on the unique index.
    pub async fn create(
        pool: &PgPool,
        input: &CreateSubscription,
    ) -> Result<Subscription, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE subscriptions SET is_active = false
             WHERE business_id = $1 AND is_active AND deleted_at IS NULL AND end_date < NOW()",
        )
        .bind(input.business_id)
        .execute(&mut *tx)
        .await?;

        let subscription = Self::insert(&mut tx, input).await?;
        tx.commit().await?;
        Ok(subscription)
    }

    /// Replace `previous_id` with a new subscription in one transaction.
    ///
    /// The previous row is deactivated and `input.renewed_from_id` should
    /// point at it.
    pub async fn renew(
        pool: &PgPool,
        previous_id: DbId,
        input: &CreateSubscription,
    ) -> Result<Subscription, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE subscriptions SET is_active = false WHERE id = $1")
            .bind(previous_id)
            .execute(&mut *tx)
            .await?;

        let subscription = Self::insert(&mut tx, input).await?;
        tx.commit().await?;
        Ok(subscription)
    }

    async fn insert(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: &CreateSubscription,
    ) -> Result<Subscription, sqlx::Error> {
        let query = format!(
            "INSERT INTO subscriptions
                (business_id, plan_id, start_date, end_date, auto_renew, notes, renewed_from_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(input.business_id)
            .bind(input.plan_id)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.auto_renew)
            .bind(&input.notes)
            .bind(input.renewed_from_id)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Subscription>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM subscriptions WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Subscription>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_detail(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<SubscriptionDetail>, sqlx::Error> {
        let query = format!(
            "SELECT {DETAIL_COLUMNS} FROM {DETAIL_FROM} WHERE s.id = $1 AND s.deleted_at IS NULL"
        );
        sqlx::query_as::<_, SubscriptionDetail>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &SubscriptionFilter,
        page: PageRequest,
    ) -> Result<Page<SubscriptionDetail>, sqlx::Error> {
        let conditions = "s.deleted_at IS NULL
            AND ($1::BIGINT IS NULL OR s.business_id = $1)
            AND ($2::BIGINT IS NULL OR s.plan_id = $2)
            AND ($3::BOOLEAN IS NULL OR s.is_active = $3)
            AND ($4::BOOLEAN IS NULL OR (s.end_date < NOW()) = $4)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {DETAIL_FROM} WHERE {conditions}"
        ))
        .bind(filter.business_id)
        .bind(filter.plan_id)
        .bind(filter.is_active)
        .bind(filter.expired)
        .fetch_one(pool)
        .await?;

        let query = format!(
            "SELECT {DETAIL_COLUMNS} FROM {DETAIL_FROM} WHERE {conditions}
             ORDER BY s.created_at DESC, s.id DESC LIMIT $5 OFFSET $6"
        );
        let items = sqlx::query_as::<_, SubscriptionDetail>(&query)
            .bind(filter.business_id)
            .bind(filter.plan_id)
            .bind(filter.is_active)
            .bind(filter.expired)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    /// The business's active subscription, if any. May be past its end date
    /// until the sweep deactivates it.
    pub async fn find_active_for_business(
        pool: &PgPool,
        business_id: DbId,
    ) -> Result<Option<SubscriptionDetail>, sqlx::Error> {
        let query = format!(
            "SELECT {DETAIL_COLUMNS} FROM {DETAIL_FROM}
             WHERE s.business_id = $1 AND s.is_active AND s.deleted_at IS NULL"
        );
        sqlx::query_as::<_, SubscriptionDetail>(&query)
            .bind(business_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSubscription,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!(
            "UPDATE subscriptions SET
                plan_id = COALESCE($2, plan_id),
                end_date = COALESCE($3, end_date),
                is_active = COALESCE($4, is_active),
                auto_renew = COALESCE($5, auto_renew),
                notes = COALESCE($6, notes)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(id)
            .bind(input.plan_id)
            .bind(input.end_date)
            .bind(input.is_active)
            .bind(input.auto_renew)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a subscription. The row is also deactivated so it stops
    /// counting against the one-active rule.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE subscriptions SET deleted_at = NOW(), is_active = false
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Active subscriptions ending between now and `until`, soonest first.
    pub async fn list_expiring(
        pool: &PgPool,
        until: Timestamp,
    ) -> Result<Vec<SubscriptionDetail>, sqlx::Error> {
        let query = format!(
            "SELECT {DETAIL_COLUMNS} FROM {DETAIL_FROM}
             WHERE s.is_active AND s.deleted_at IS NULL
               AND s.end_date >= NOW() AND s.end_date <= $1
             ORDER BY s.end_date, s.id"
        );
        sqlx::query_as::<_, SubscriptionDetail>(&query)
            .bind(until)
            .fetch_all(pool)
            .await
    }

    /// Active subscriptions whose end date has passed, oldest first.
    pub async fn list_expired_active(
        pool: &PgPool,
    ) -> Result<Vec<SubscriptionDetail>, sqlx::Error> {
        let query = format!(
            "SELECT {DETAIL_COLUMNS} FROM {DETAIL_FROM}
             WHERE s.is_active AND s.deleted_at IS NULL AND s.end_date < NOW()
             ORDER BY s.end_date, s.id"
        );
        sqlx::query_as::<_, SubscriptionDetail>(&query)
            .fetch_all(pool)
            .await
    }

    /// Stamp the expiry warning time, but only if no warning went out since
    /// `not_since`. Returns `true` when this call claimed the warning.
    pub async fn claim_expiry_warning(
        pool: &PgPool,
        id: DbId,
        not_since: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE subscriptions SET last_expiry_warning_at = NOW()
             WHERE id = $1
               AND (last_expiry_warning_at IS NULL OR last_expiry_warning_at < $2)",
        )
        .bind(id)
        .bind(not_since)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Subscription totals for one business.
    pub async fn analytics(
        pool: &PgPool,
        business_id: DbId,
    ) -> Result<BusinessAnalytics, sqlx::Error> {
        sqlx::query_as::<_, BusinessAnalytics>(
            "SELECT $1::BIGINT AS business_id,
                    COUNT(*) AS total_subscriptions,
                    COUNT(*) FILTER (WHERE s.is_active) AS active_subscriptions,
                    COUNT(*) FILTER (WHERE s.end_date < NOW()) AS expired_subscriptions,
                    COALESCE(SUM(FLOOR(EXTRACT(EPOCH FROM s.end_date - s.start_date) / 86400)), 0)::BIGINT
                        AS total_days_subscribed,
                    (SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM payments
                     WHERE business_id = $1 AND status_id = $2 AND deleted_at IS NULL)
                        AS total_paid_cents,
                    (SELECT p.name FROM subscriptions a
                     JOIN subscription_plans p ON p.id = a.plan_id
                     WHERE a.business_id = $1 AND a.is_active AND a.deleted_at IS NULL)
                        AS current_plan_name,
                    COALESCE((SELECT GREATEST(FLOOR(EXTRACT(EPOCH FROM a.end_date - NOW()) / 86400), 0)
                              FROM subscriptions a
                              WHERE a.business_id = $1 AND a.is_active AND a.deleted_at IS NULL), 0)::BIGINT
                        AS days_remaining
             FROM subscriptions s
             WHERE s.business_id = $1 AND s.deleted_at IS NULL",
        )
        .bind(business_id)
        .bind(PaymentStatus::Completed.id())
        .fetch_one(pool)
        .await
    }
}
