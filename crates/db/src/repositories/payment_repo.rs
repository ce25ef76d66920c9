//! Repository for the `payments` table.

use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::DbId;
use sqlx::PgPool;

use crate::models::payment::{CreatePayment, Payment, PaymentFilter, UpdatePayment};
use crate::models::status::{PaymentStatus, StatusId};

const COLUMNS: &str = "id, business_id, plan_id, subscription_id, amount_cents, method, status_id, \
                       reference_number, notes, paid_at, created_by, created_at, updated_at";

pub struct PaymentRepo;

impl PaymentRepo {
    /// Insert a payment. A payment created as completed gets `paid_at = NOW()`.
    pub async fn create(pool: &PgPool, input: &CreatePayment) -> Result<Payment, sqlx::Error> {
        let query = format!(
            "INSERT INTO payments
                (business_id, plan_id, subscription_id, amount_cents, method, status_id,
                 reference_number, notes, created_by, paid_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                     CASE WHEN $6 = $10 THEN NOW() END)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(input.business_id)
            .bind(input.plan_id)
            .bind(input.subscription_id)
            .bind(input.amount_cents)
            .bind(&input.method)
            .bind(input.status_id)
            .bind(&input.reference_number)
            .bind(&input.notes)
            .bind(input.created_by)
            .bind(PaymentStatus::Completed.id())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payments WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> Result<Page<Payment>, sqlx::Error> {
        let conditions = "deleted_at IS NULL
            AND ($1::BIGINT IS NULL OR business_id = $1)
            AND ($2::BIGINT IS NULL OR subscription_id = $2)
            AND ($3::SMALLINT IS NULL OR status_id = $3)
            AND ($4::TEXT IS NULL OR method = $4)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM payments WHERE {conditions}"))
                .bind(filter.business_id)
                .bind(filter.subscription_id)
                .bind(filter.status_id)
                .bind(&filter.method)
                .fetch_one(pool)
                .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM payments WHERE {conditions}
             ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
        );
        let items = sqlx::query_as::<_, Payment>(&query)
            .bind(filter.business_id)
            .bind(filter.subscription_id)
            .bind(filter.status_id)
            .bind(&filter.method)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePayment,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "UPDATE payments SET
                amount_cents = COALESCE($2, amount_cents),
                method = COALESCE($3, method),
                notes = COALESCE($4, notes)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(input.amount_cents)
            .bind(&input.method)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    /// Move a payment from `from` to `to`. Completing stamps `paid_at`.
    ///
    /// Returns `None` when the row is missing or no longer in `from`.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: StatusId,
        to: StatusId,
        note: Option<&str>,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "UPDATE payments SET
                status_id = $3,
                paid_at = CASE WHEN $3 = $5 THEN NOW() ELSE paid_at END,
                notes = CASE WHEN $4::TEXT IS NULL THEN notes
                             WHEN notes IS NULL THEN $4
                             ELSE notes || E'\\n' || $4 END
             WHERE id = $1 AND status_id = $2 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(note)
            .bind(PaymentStatus::Completed.id())
            .fetch_optional(pool)
            .await
    }

    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE payments SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
