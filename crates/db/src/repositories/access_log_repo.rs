//! Repository for `access_logs`.

use backoffice_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::access_log::{AccessLog, CreateAccessLog};

const COLUMNS: &str = "id, user_id, user_role, http_method, endpoint, query_string, ip_address, \
    user_agent, request_id, status_code, response_time_ms, error_message, created_at";

pub struct AccessLogRepo;

impl AccessLogRepo {
    pub async fn insert(pool: &PgPool, entry: &CreateAccessLog) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO access_logs
                (user_id, user_role, http_method, endpoint, query_string, ip_address,
                 user_agent, request_id, status_code, response_time_ms, error_message)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(entry.user_id)
        .bind(&entry.user_role)
        .bind(&entry.http_method)
        .bind(&entry.endpoint)
        .bind(&entry.query_string)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(&entry.request_id)
        .bind(entry.status_code)
        .bind(entry.response_time_ms)
        .bind(&entry.error_message)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Most recent entries first, optionally for one user.
    pub async fn recent(
        pool: &PgPool,
        user_id: Option<DbId>,
        limit: i64,
    ) -> Result<Vec<AccessLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM access_logs
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, AccessLog>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Delete entries written before `cutoff`. Returns the number removed.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM access_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
