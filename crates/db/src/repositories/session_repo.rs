//! Repository for the `user_sessions` table (refresh tokens).
//!
//! Only SHA-256 hashes of refresh tokens are stored. A session is usable
//! while it is not revoked and `expires_at` is in the future.

use backoffice_core::types::DbId;
use sqlx::PgPool;

use crate::models::session::{CreateSession, UserSession};

const COLUMNS: &str = "id, user_id, refresh_token_hash, expires_at, is_revoked, \
                       user_agent, ip_address, created_at, updated_at";

pub struct SessionRepo;

impl SessionRepo {
    /// Open a session for a fresh login.
    pub async fn create(pool: &PgPool, input: &CreateSession) -> Result<UserSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions (user_id, refresh_token_hash, expires_at, user_agent, ip_address)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(input.user_id)
            .bind(&input.refresh_token_hash)
            .bind(input.expires_at)
            .bind(&input.user_agent)
            .bind(&input.ip_address)
            .fetch_one(pool)
            .await
    }

    /// Look up a usable session by refresh token hash.
    pub async fn find_active(pool: &PgPool, hash: &str) -> Result<Option<UserSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE refresh_token_hash = $1 AND NOT is_revoked AND expires_at > NOW()"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Swap a refresh token for a new one.
    ///
    /// The old session is revoked and the new one inserted in a single
    /// transaction. Returns `None` (and changes nothing) when the old token
    /// was already revoked or expired, so a replayed token cannot mint a
    /// second session.
    pub async fn rotate(
        pool: &PgPool,
        old_hash: &str,
        replacement: &CreateSession,
    ) -> Result<Option<UserSession>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let revoked: Option<DbId> = sqlx::query_scalar(
            "UPDATE user_sessions SET is_revoked = true
             WHERE refresh_token_hash = $1 AND user_id = $2
               AND NOT is_revoked AND expires_at > NOW()
             RETURNING id",
        )
        .bind(old_hash)
        .bind(replacement.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if revoked.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let query = format!(
            "INSERT INTO user_sessions (user_id, refresh_token_hash, expires_at, user_agent, ip_address)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let session = sqlx::query_as::<_, UserSession>(&query)
            .bind(replacement.user_id)
            .bind(&replacement.refresh_token_hash)
            .bind(replacement.expires_at)
            .bind(&replacement.user_agent)
            .bind(&replacement.ip_address)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(session))
    }

    /// Revoke sessions for a user. With `hash` only that session is revoked,
    /// otherwise every open session is. Returns the number revoked.
    pub async fn revoke_for_user(
        pool: &PgPool,
        user_id: DbId,
        hash: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_revoked = true
             WHERE user_id = $1 AND NOT is_revoked
               AND ($2::TEXT IS NULL OR refresh_token_hash = $2)",
        )
        .bind(user_id)
        .bind(hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Purge sessions that can never be used again.
    pub async fn purge_dead(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM user_sessions WHERE is_revoked OR expires_at < NOW()")
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
