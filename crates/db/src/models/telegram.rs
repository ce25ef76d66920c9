use backoffice_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `telegram_sessions` table: one per Telegram user that
/// has talked to the bot.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TelegramSession {
    pub id: DbId,
    pub telegram_user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_id: Option<DbId>,
    pub notifications_enabled: bool,
    pub total_interactions: i32,
    pub last_activity: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Fields refreshed on every inbound update.
#[derive(Debug, Clone)]
pub struct TouchTelegramSession {
    pub telegram_user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}
