//! Repository for the `businesses` table.

use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::DbId;
use sqlx::PgPool;

use crate::models::business::{Business, CreateBusiness, UpdateBusiness};
use crate::models::status::StatusId;

const COLUMNS: &str = "id, name, subdomain, subdomain_status_id, phone, address, description, \
                       telegram_chat_id, telegram_link_code, notes, created_at, updated_at";

pub struct BusinessRepo;

impl BusinessRepo {
    pub async fn create(pool: &PgPool, input: &CreateBusiness) -> Result<Business, sqlx::Error> {
        let query = format!(
            "INSERT INTO businesses (name, subdomain, phone, address, description)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Business>(&query)
            .bind(&input.name)
            .bind(&input.subdomain)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Business>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM businesses WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Business>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_subdomain(
        pool: &PgPool,
        subdomain: &str,
    ) -> Result<Option<Business>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM businesses WHERE subdomain = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Business>(&query)
            .bind(subdomain)
            .fetch_optional(pool)
            .await
    }

    /// List live businesses, optionally filtered by a name/subdomain search
    /// term and subdomain status.
    pub async fn list(
        pool: &PgPool,
        search: Option<&str>,
        subdomain_status_id: Option<StatusId>,
        page: PageRequest,
    ) -> Result<Page<Business>, sqlx::Error> {
        let filter = "deleted_at IS NULL
            AND ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%' OR subdomain ILIKE '%' || $1 || '%')
            AND ($2::SMALLINT IS NULL OR subdomain_status_id = $2)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM businesses WHERE {filter}"))
                .bind(search)
                .bind(subdomain_status_id)
                .fetch_one(pool)
                .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM businesses WHERE {filter}
             ORDER BY name, id LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, Business>(&query)
            .bind(search)
            .bind(subdomain_status_id)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateBusiness,
    ) -> Result<Option<Business>, sqlx::Error> {
        let query = format!(
            "UPDATE businesses SET
                name = COALESCE($2, name),
                subdomain = COALESCE($3, subdomain),
                subdomain_status_id = COALESCE($4, subdomain_status_id),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                description = COALESCE($7, description),
                notes = COALESCE($8, notes)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Business>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.subdomain)
            .bind(input.subdomain_status_id)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(&input.description)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE businesses SET deleted_at = NOW(), telegram_link_code = NULL
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set or clear the Telegram chat that receives this business's notifications.
    pub async fn set_telegram_chat(
        pool: &PgPool,
        id: DbId,
        chat_id: Option<i64>,
    ) -> Result<Option<Business>, sqlx::Error> {
        let query = format!(
            "UPDATE businesses SET telegram_chat_id = $2
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Business>(&query)
            .bind(id)
            .bind(chat_id)
            .fetch_optional(pool)
            .await
    }

    /// Store a fresh one-time link code, replacing any previous one.
    pub async fn set_link_code(pool: &PgPool, id: DbId, code: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE businesses SET telegram_link_code = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(code)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Consume a link code: binds `chat_id` to the matching business and
    /// clears the code so it cannot be reused.
    pub async fn claim_link_code(
        pool: &PgPool,
        code: &str,
        chat_id: i64,
    ) -> Result<Option<Business>, sqlx::Error> {
        let query = format!(
            "UPDATE businesses SET telegram_chat_id = $2, telegram_link_code = NULL
             WHERE telegram_link_code = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Business>(&query)
            .bind(code)
            .bind(chat_id)
            .fetch_optional(pool)
            .await
    }

    /// Businesses bound to a Telegram chat.
    pub async fn find_by_chat_id(
        pool: &PgPool,
        chat_id: i64,
    ) -> Result<Vec<Business>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM businesses
             WHERE telegram_chat_id = $1 AND deleted_at IS NULL ORDER BY id"
        );
        sqlx::query_as::<_, Business>(&query)
            .bind(chat_id)
            .fetch_all(pool)
            .await
    }

    /// Clear the Telegram binding for every business linked to `chat_id`.
    pub async fn unlink_chat(pool: &PgPool, chat_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE businesses SET telegram_chat_id = NULL
             WHERE telegram_chat_id = $1 AND deleted_at IS NULL",
        )
        .bind(chat_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Live businesses together with whether each holds a current subscription
    /// (active and not past its end date).
    pub async fn list_subdomain_states(
        pool: &PgPool,
    ) -> Result<Vec<(DbId, StatusId, bool)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT b.id, b.subdomain_status_id,
                    EXISTS (
                        SELECT 1 FROM subscriptions s
                        WHERE s.business_id = b.id AND s.is_active
                          AND s.deleted_at IS NULL AND s.end_date >= NOW()
                    ) AS has_active
             FROM businesses b
             WHERE b.deleted_at IS NULL
             ORDER BY b.id",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn set_subdomain_status(
        pool: &PgPool,
        id: DbId,
        status_id: StatusId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE businesses SET subdomain_status_id = $2
             WHERE id = $1 AND deleted_at IS NULL AND subdomain_status_id <> $2",
        )
        .bind(id)
        .bind(status_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
