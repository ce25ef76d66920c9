//! Repository for `message_threads` and `messages`.
//!
//! A message is unread for a viewer when someone else sent it and
//! `read_at` is still null. System messages (no sender) count as unread
//! for everyone until read.

use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::DbId;
use sqlx::PgPool;

use crate::models::message::{
    CreateThread, Message, MessageThread, ThreadFilter, ThreadSummary,
};

const THREAD_COLUMNS: &str =
    "id, business_id, subject, is_system, created_by, last_message_at, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, thread_id, sender_id, content, read_at, created_at";

pub struct MessageRepo;

impl MessageRepo {
    /// Open a thread with its first message.
    pub async fn create_thread(
        pool: &PgPool,
        input: &CreateThread,
    ) -> Result<MessageThread, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO message_threads (business_id, subject, is_system, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {THREAD_COLUMNS}"
        );
        let thread = sqlx::query_as::<_, MessageThread>(&query)
            .bind(input.business_id)
            .bind(&input.subject)
            .bind(input.is_system)
            .bind(input.created_by)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO messages (thread_id, sender_id, content) VALUES ($1, $2, $3)")
            .bind(thread.id)
            .bind(input.created_by)
            .bind(&input.content)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(thread)
    }

    pub async fn find_thread(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MessageThread>, sqlx::Error> {
        let query = format!(
            "SELECT {THREAD_COLUMNS} FROM message_threads WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, MessageThread>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Threads visible under `filter`, most recently active first, with
    /// unread counts relative to `viewer_id`.
    pub async fn list_threads(
        pool: &PgPool,
        filter: &ThreadFilter,
        viewer_id: DbId,
        page: PageRequest,
    ) -> Result<Page<ThreadSummary>, sqlx::Error> {
        let unread = "(SELECT COUNT(*) FROM messages m
                       WHERE m.thread_id = t.id AND m.read_at IS NULL
                         AND (m.sender_id IS NULL OR m.sender_id <> $2))";
        let conditions = format!(
            "t.deleted_at IS NULL
             AND ($1::BIGINT IS NULL OR t.business_id = $1)
             AND (NOT $3 OR {unread} > 0)"
        );

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM message_threads t WHERE {conditions}"
        ))
        .bind(filter.business_id)
        .bind(viewer_id)
        .bind(filter.unread_only)
        .fetch_one(pool)
        .await?;

        let query = format!(
            "SELECT t.id, t.business_id, t.subject, t.is_system, t.created_by, t.last_message_at,
                    t.created_at, t.updated_at,
                    (SELECT COUNT(*) FROM messages m WHERE m.thread_id = t.id) AS message_count,
                    {unread} AS unread_count
             FROM message_threads t
             WHERE {conditions}
             ORDER BY t.last_message_at DESC, t.id DESC
             LIMIT $4 OFFSET $5"
        );
        let items = sqlx::query_as::<_, ThreadSummary>(&query)
            .bind(filter.business_id)
            .bind(viewer_id)
            .bind(filter.unread_only)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    /// Messages of a thread in chronological order.
    pub async fn messages(pool: &PgPool, thread_id: DbId) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE thread_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(thread_id)
            .fetch_all(pool)
            .await
    }

    /// Append a reply and bump the thread's `last_message_at`.
    pub async fn add_message(
        pool: &PgPool,
        thread_id: DbId,
        sender_id: Option<DbId>,
        content: &str,
    ) -> Result<Message, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO messages (thread_id, sender_id, content) VALUES ($1, $2, $3)
             RETURNING {MESSAGE_COLUMNS}"
        );
        let message = sqlx::query_as::<_, Message>(&query)
            .bind(thread_id)
            .bind(sender_id)
            .bind(content)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE message_threads SET last_message_at = $2 WHERE id = $1")
            .bind(thread_id)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Mark every message in the thread not sent by `viewer_id` as read.
    pub async fn mark_read(
        pool: &PgPool,
        thread_id: DbId,
        viewer_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE messages SET read_at = NOW()
             WHERE thread_id = $1 AND read_at IS NULL
               AND (sender_id IS NULL OR sender_id <> $2)",
        )
        .bind(thread_id)
        .bind(viewer_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete_thread(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE message_threads SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
