//! Repository for the `users` table.
//!
//! Every read joins `roles` so callers get the role name without a second
//! query. Soft-deleted users are invisible to all lookups.

use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::user::{CreateUser, StudentSummary, UpdateUser, User, UserFilter};

/// Column list for `users u JOIN roles r`.
const COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.role_id, r.name AS role, \
    u.full_name, u.phone, u.business_id, u.class_id, u.is_active, u.last_login_at, \
    u.failed_login_count, u.locked_until, u.created_at, u.updated_at, u.deleted_at";

const FROM: &str = "users u JOIN roles r ON r.id = u.role_id";

const FILTER: &str = "u.deleted_at IS NULL
    AND ($1::TEXT IS NULL OR r.name = $1)
    AND ($2::BIGINT IS NULL OR u.business_id = $2)
    AND ($3::BIGINT IS NULL OR u.class_id = $3)
    AND ($4::TEXT IS NULL OR u.username ILIKE '%' || $4 || '%'
         OR u.email ILIKE '%' || $4 || '%'
         OR COALESCE(u.full_name, '') ILIKE '%' || $4 || '%')";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row with its role name.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "WITH u AS (
                INSERT INTO users (username, email, password_hash, role_id, full_name, phone,
                                   business_id, class_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
             )
             SELECT {COLUMNS} FROM u JOIN roles r ON r.id = u.role_id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(input.role_id)
            .bind(&input.full_name)
            .bind(&input.phone)
            .bind(input.business_id)
            .bind(input.class_id)
            .fetch_one(pool)
            .await
    }

    /// Find a live user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM {FROM} WHERE u.id = $1 AND u.deleted_at IS NULL");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a live user by username (case-sensitive).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {FROM} WHERE u.username = $1 AND u.deleted_at IS NULL"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// List live users matching `filter`, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, sqlx::Error> {
        let count_query = format!("SELECT COUNT(*) FROM {FROM} WHERE {FILTER}");
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&filter.role)
            .bind(filter.business_id)
            .bind(filter.class_id)
            .bind(&filter.search)
            .fetch_one(pool)
            .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM {FROM} WHERE {FILTER}
             ORDER BY u.created_at DESC, u.id DESC
             LIMIT $5 OFFSET $6"
        );
        let items = sqlx::query_as::<_, User>(&query)
            .bind(&filter.role)
            .bind(filter.business_id)
            .bind(filter.class_id)
            .bind(&filter.search)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    /// Update a user. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "WITH u AS (
                UPDATE users SET
                    username = COALESCE($2, username),
                    email = COALESCE($3, email),
                    role_id = COALESCE($4, role_id),
                    full_name = COALESCE($5, full_name),
                    phone = COALESCE($6, phone),
                    business_id = COALESCE($7, business_id),
                    class_id = COALESCE($8, class_id),
                    is_active = COALESCE($9, is_active)
                WHERE id = $1 AND deleted_at IS NULL
                RETURNING *
             )
             SELECT {COLUMNS} FROM u JOIN roles r ON r.id = u.role_id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.username)
            .bind(&input.email)
            .bind(input.role_id)
            .bind(&input.full_name)
            .bind(&input.phone)
            .bind(input.business_id)
            .bind(input.class_id)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a user and deactivate the account.
    ///
    /// Returns `true` if the row was updated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), is_active = false
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Increment the failed login counter, locking the account until
    /// `lock_until` once the counter reaches `max_attempts`.
    ///
    /// Returns the new counter value.
    pub async fn record_failed_login(
        pool: &PgPool,
        id: DbId,
        max_attempts: i32,
        lock_until: Timestamp,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE users SET
                failed_login_count = failed_login_count + 1,
                locked_until = CASE WHEN failed_login_count + 1 >= $2 THEN $3 ELSE locked_until END
             WHERE id = $1
             RETURNING failed_login_count",
        )
        .bind(id)
        .bind(max_attempts)
        .bind(lock_until)
        .fetch_one(pool)
        .await
    }

    /// Record a successful login: reset `failed_login_count` to 0, clear `locked_until`,
    /// and set `last_login_at` to now.
    pub async fn record_successful_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                failed_login_count = 0,
                locked_until = NULL,
                last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Replace a user's password hash and clear any lockout.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, failed_login_count = 0, locked_until = NULL
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Resolve a role name to its id.
    pub async fn role_id_by_name(pool: &PgPool, name: &str) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Whether any live, active admin account exists.
    pub async fn admin_exists(pool: &PgPool) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM users u JOIN roles r ON r.id = u.role_id
                WHERE r.name = 'admin' AND u.deleted_at IS NULL AND u.is_active
             )",
        )
        .fetch_one(pool)
        .await
    }

    /// Active students enrolled in a class, ordered by name.
    pub async fn list_students_in_class(
        pool: &PgPool,
        class_id: DbId,
    ) -> Result<Vec<StudentSummary>, sqlx::Error> {
        sqlx::query_as::<_, StudentSummary>(
            "SELECT u.id, u.username, u.full_name, u.email, u.class_id
             FROM users u JOIN roles r ON r.id = u.role_id
             WHERE u.class_id = $1 AND r.name = 'student'
               AND u.deleted_at IS NULL AND u.is_active
             ORDER BY COALESCE(u.full_name, u.username), u.id",
        )
        .bind(class_id)
        .fetch_all(pool)
        .await
    }
}
