//! Handlers for `/message-threads`: the owner inbox.
//!
//! Owners see threads of their own business; admins see all and can write
//! to any business. System threads come from the notification dispatcher.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::DbId;
use backoffice_db::models::message::{
    CreateThread, Message, MessageThread, ThreadFilter, ThreadSummary, ThreadWithMessages,
};
use backoffice_db::repositories::{BusinessRepo, MessageRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireBusinessOwner};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateThreadRequest {
    pub business_id: DbId,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReplyRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ThreadListParams {
    pub business_id: Option<DbId>,
    #[serde(default)]
    pub unread_only: bool,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub thread_id: DbId,
    pub marked_read: u64,
}

async fn find_thread(state: &AppState, id: DbId) -> AppResult<MessageThread> {
    MessageRepo::find_thread(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("MessageThread", id))
}

/// POST /api/v1/message-threads
pub async fn create_thread(
    State(state): State<AppState>,
    RequireBusinessOwner(user): RequireBusinessOwner,
    Json(input): Json<CreateThreadRequest>,
) -> AppResult<(StatusCode, Json<ThreadWithMessages>)> {
    input.validate()?;
    user.ensure_business_manager(input.business_id)?;
    BusinessRepo::find_by_id(&state.pool, input.business_id)
        .await?
        .ok_or(AppError::not_found("Business", input.business_id))?;

    let thread = MessageRepo::create_thread(
        &state.pool,
        &CreateThread {
            business_id: input.business_id,
            subject: input.subject.trim().to_string(),
            is_system: false,
            created_by: Some(user.user_id),
            content: input.content,
        },
    )
    .await?;
    let messages = MessageRepo::messages(&state.pool, thread.id).await?;

    tracing::info!(thread_id = thread.id, business_id = thread.business_id, "Thread opened");
    Ok((StatusCode::CREATED, Json(ThreadWithMessages { thread, messages })))
}

/// GET /api/v1/message-threads
pub async fn list_threads(
    State(state): State<AppState>,
    RequireBusinessOwner(user): RequireBusinessOwner,
    Query(params): Query<ThreadListParams>,
) -> AppResult<Json<DataResponse<Page<ThreadSummary>>>> {
    let business_id = if user.is_admin() {
        params.business_id
    } else {
        let own = user
            .business_id
            .ok_or_else(|| AppError::forbidden("You are not attached to a business"))?;
        if let Some(requested) = params.business_id {
            user.ensure_business(requested)?;
        }
        Some(own)
    };

    let filter = ThreadFilter {
        business_id,
        unread_only: params.unread_only,
    };
    let page = PageRequest::new(params.page, params.size);
    let threads = MessageRepo::list_threads(&state.pool, &filter, user.user_id, page).await?;
    Ok(Json(DataResponse::new(threads)))
}

/// GET /api/v1/message-threads/{id}
pub async fn get_thread(
    State(state): State<AppState>,
    RequireBusinessOwner(user): RequireBusinessOwner,
    Path(id): Path<DbId>,
) -> AppResult<Json<ThreadWithMessages>> {
    let thread = find_thread(&state, id).await?;
    user.ensure_business(thread.business_id)?;
    let messages = MessageRepo::messages(&state.pool, id).await?;
    Ok(Json(ThreadWithMessages { thread, messages }))
}

/// POST /api/v1/message-threads/{id}/messages
pub async fn add_message(
    State(state): State<AppState>,
    RequireBusinessOwner(user): RequireBusinessOwner,
    Path(id): Path<DbId>,
    Json(input): Json<ReplyRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    input.validate()?;
    let thread = find_thread(&state, id).await?;
    user.ensure_business(thread.business_id)?;
    let message = MessageRepo::add_message(&state.pool, id, Some(user.user_id), &input.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /api/v1/message-threads/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    RequireBusinessOwner(user): RequireBusinessOwner,
    Path(id): Path<DbId>,
) -> AppResult<Json<MarkReadResponse>> {
    let thread = find_thread(&state, id).await?;
    user.ensure_business(thread.business_id)?;
    let marked_read = MessageRepo::mark_read(&state.pool, id, user.user_id).await?;
    Ok(Json(MarkReadResponse {
        thread_id: id,
        marked_read,
    }))
}

/// DELETE /api/v1/message-threads/{id}
pub async fn delete_thread(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !MessageRepo::soft_delete_thread(&state.pool, id).await? {
        return Err(AppError::not_found("MessageThread", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
