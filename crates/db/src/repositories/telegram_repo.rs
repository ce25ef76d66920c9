//! Repository for the `telegram_sessions` table.

use sqlx::PgPool;

use crate::models::telegram::{TelegramSession, TouchTelegramSession};

const COLUMNS: &str = "id, telegram_user_id, chat_id, username, first_name, last_name, user_id, \
                       notifications_enabled, total_interactions, last_activity, \
                       created_at, updated_at";

pub struct TelegramRepo;

impl TelegramRepo {
    /// Record an inbound update from a Telegram user: creates the session on
    /// first contact, otherwise refreshes profile fields and bumps the
    /// interaction counter.
    pub async fn touch(
        pool: &PgPool,
        input: &TouchTelegramSession,
    ) -> Result<TelegramSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO telegram_sessions
                (telegram_user_id, chat_id, username, first_name, last_name, total_interactions)
             VALUES ($1, $2, $3, $4, $5, 1)
             ON CONFLICT (telegram_user_id) DO UPDATE SET
                chat_id = EXCLUDED.chat_id,
                username = EXCLUDED.username,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                total_interactions = telegram_sessions.total_interactions + 1,
                last_activity = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TelegramSession>(&query)
            .bind(input.telegram_user_id)
            .bind(input.chat_id)
            .bind(&input.username)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_telegram_user(
        pool: &PgPool,
        telegram_user_id: i64,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM telegram_sessions WHERE telegram_user_id = $1");
        sqlx::query_as::<_, TelegramSession>(&query)
            .bind(telegram_user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_notifications(
        pool: &PgPool,
        telegram_user_id: i64,
        enabled: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE telegram_sessions SET notifications_enabled = $2 WHERE telegram_user_id = $1",
        )
        .bind(telegram_user_id)
        .bind(enabled)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether the chat has notifications muted. Unknown chats are not muted.
    pub async fn chat_muted(pool: &PgPool, chat_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM telegram_sessions WHERE chat_id = $1 AND NOT notifications_enabled
             )",
        )
        .bind(chat_id)
        .fetch_one(pool)
        .await
    }
}
