//! Repository for the `classes` table.

use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::DbId;
use sqlx::PgPool;

use crate::models::class::{Class, CreateClass, UpdateClass};

const COLUMNS: &str = "id, code, name, academic_year, created_at, updated_at";

pub struct ClassRepo;

impl ClassRepo {
    pub async fn create(pool: &PgPool, input: &CreateClass) -> Result<Class, sqlx::Error> {
        let query = format!(
            "INSERT INTO classes (code, name, academic_year) VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Class>(&query)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.academic_year)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Class>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM classes WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Class>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, page: PageRequest) -> Result<Page<Class>, sqlx::Error> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM classes WHERE deleted_at IS NULL")
                .fetch_one(pool)
                .await?;
        let query = format!(
            "SELECT {COLUMNS} FROM classes WHERE deleted_at IS NULL
             ORDER BY code LIMIT $1 OFFSET $2"
        );
        let items = sqlx::query_as::<_, Class>(&query)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateClass,
    ) -> Result<Option<Class>, sqlx::Error> {
        let query = format!(
            "UPDATE classes SET
                code = COALESCE($2, code),
                name = COALESCE($3, name),
                academic_year = COALESCE($4, academic_year)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Class>(&query)
            .bind(id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.academic_year)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a class. Refused (returns `false`) while live schedules
    /// still reference it.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE classes SET deleted_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
               AND NOT EXISTS (
                   SELECT 1 FROM schedules WHERE class_id = $1 AND deleted_at IS NULL
               )",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
