//! Message thread and message models.

use backoffice_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `message_threads` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageThread {
    pub id: DbId,
    pub business_id: DbId,
    pub subject: String,
    pub is_system: bool,
    pub created_by: Option<DbId>,
    pub last_message_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Thread list entry with unread count for the viewing user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ThreadSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub thread: MessageThread,
    pub message_count: i64,
    pub unread_count: i64,
}

/// A row from the `messages` table. `sender_id` is `None` for system messages.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub thread_id: DbId,
    pub sender_id: Option<DbId>,
    pub content: String,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadWithMessages {
    #[serde(flatten)]
    pub thread: MessageThread,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone)]
pub struct CreateThread {
    pub business_id: DbId,
    pub subject: String,
    pub is_system: bool,
    pub created_by: Option<DbId>,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadFilter {
    pub business_id: Option<DbId>,
    #[serde(default)]
    pub unread_only: bool,
}
