//! Handlers for `/businesses`.
//!
//! Admins manage every business. Owners read and edit their own, link its
//! Telegram chat, and read its subscription data.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::business::{normalize_subdomain, validate_subdomain};
use backoffice_core::codes::{random_code, LINK_CODE_LEN};
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::DbId;
use backoffice_db::models::business::{Business, BusinessAnalytics, CreateBusiness, UpdateBusiness};
use backoffice_db::models::status::{StatusId, SubdomainStatus};
use backoffice_db::models::subscription::{SubscriptionDetail, SubscriptionFilter};
use backoffice_db::repositories::{BusinessRepo, SubscriptionRepo};
use backoffice_events::{event_types, PlatformEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth, RequireBusinessOwner};
use crate::query::PageParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBusinessRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub subdomain: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBusinessRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub subdomain: Option<String>,
    pub subdomain_status_id: Option<StatusId>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BusinessListParams {
    pub search: Option<String>,
    pub subdomain_status_id: Option<StatusId>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChatRequest {
    /// `null` unlinks the chat.
    pub chat_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LinkCodeResponse {
    pub business_id: DbId,
    pub code: String,
    pub instructions: String,
}

fn checked_subdomain(raw: &str) -> AppResult<String> {
    let subdomain = normalize_subdomain(raw);
    validate_subdomain(&subdomain).map_err(AppError::validation)?;
    Ok(subdomain)
}

async fn load(state: &AppState, id: DbId) -> AppResult<Business> {
    BusinessRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Business", id))
}

/// POST /api/v1/businesses
pub async fn create_business(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateBusinessRequest>,
) -> AppResult<(StatusCode, Json<Business>)> {
    input.validate()?;
    let subdomain = checked_subdomain(&input.subdomain)?;

    let business = BusinessRepo::create(
        &state.pool,
        &CreateBusiness {
            name: input.name.trim().to_string(),
            subdomain,
            phone: input.phone,
            address: input.address,
            description: input.description,
        },
    )
    .await?;

    tracing::info!(business_id = business.id, subdomain = %business.subdomain, "Business created");
    state.event_bus.publish(
        PlatformEvent::new(event_types::BUSINESS_CREATED)
            .with_source("business", business.id)
            .with_business(business.id)
            .with_actor(Some(admin.user_id))
            .with_payload(json!({ "business_name": business.name })),
    );
    Ok((StatusCode::CREATED, Json(business)))
}

/// GET /api/v1/businesses
///
/// Admins see every business; owners see only their own.
pub async fn list_businesses(
    State(state): State<AppState>,
    RequireBusinessOwner(user): RequireBusinessOwner,
    Query(params): Query<BusinessListParams>,
) -> AppResult<Json<DataResponse<Page<Business>>>> {
    let page = PageRequest::new(params.page, params.size);
    if !user.is_admin() {
        let own = match user.business_id {
            Some(id) => BusinessRepo::find_by_id(&state.pool, id).await?.into_iter().collect(),
            None => Vec::new(),
        };
        let total = own.len() as i64;
        return Ok(Json(DataResponse::new(page.wrap(own, total))));
    }

    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let businesses =
        BusinessRepo::list(&state.pool, search, params.subdomain_status_id, page).await?;
    Ok(Json(DataResponse::new(businesses)))
}

/// GET /api/v1/businesses/{id}
pub async fn get_business(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<Business>> {
    user.ensure_business(id)?;
    Ok(Json(load(&state, id).await?))
}

/// PUT /api/v1/businesses/{id}
///
/// Owners may change contact details; subdomain, status and notes are
/// admin-only.
pub async fn update_business(
    State(state): State<AppState>,
    RequireBusinessOwner(user): RequireBusinessOwner,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateBusinessRequest>,
) -> AppResult<Json<Business>> {
    input.validate()?;
    user.ensure_business_manager(id)?;
    if !user.is_admin()
        && (input.subdomain.is_some() || input.subdomain_status_id.is_some() || input.notes.is_some())
    {
        return Err(AppError::forbidden(
            "Only an admin may change the subdomain, its status or notes",
        ));
    }
    if let Some(status) = input.subdomain_status_id {
        if SubdomainStatus::from_id(status).is_none() {
            return Err(AppError::validation(format!("Invalid subdomain status id {status}")));
        }
    }
    let subdomain = input.subdomain.as_deref().map(checked_subdomain).transpose()?;

    let business = BusinessRepo::update(
        &state.pool,
        id,
        &UpdateBusiness {
            name: input.name.map(|n| n.trim().to_string()),
            subdomain,
            subdomain_status_id: input.subdomain_status_id,
            phone: input.phone,
            address: input.address,
            description: input.description,
            notes: input.notes,
        },
    )
    .await?
    .ok_or(AppError::not_found("Business", id))?;
    Ok(Json(business))
}

/// DELETE /api/v1/businesses/{id}
pub async fn delete_business(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !BusinessRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Business", id));
    }
    tracing::info!(business_id = id, "Business deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/businesses/{id}/telegram
pub async fn set_telegram_chat(
    State(state): State<AppState>,
    RequireBusinessOwner(user): RequireBusinessOwner,
    Path(id): Path<DbId>,
    Json(input): Json<TelegramChatRequest>,
) -> AppResult<Json<Business>> {
    user.ensure_business_manager(id)?;
    let business = BusinessRepo::set_telegram_chat(&state.pool, id, input.chat_id)
        .await?
        .ok_or(AppError::not_found("Business", id))?;
    tracing::info!(business_id = id, linked = input.chat_id.is_some(), "Telegram chat updated");
    Ok(Json(business))
}

/// POST /api/v1/businesses/{id}/telegram/link-code
///
/// Issues a one-time code the owner sends to the bot as `/link <code>`.
pub async fn issue_link_code(
    State(state): State<AppState>,
    RequireBusinessOwner(user): RequireBusinessOwner,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<LinkCodeResponse>)> {
    user.ensure_business_manager(id)?;
    let code = random_code(LINK_CODE_LEN);
    if !BusinessRepo::set_link_code(&state.pool, id, &code).await? {
        return Err(AppError::not_found("Business", id));
    }
    Ok((
        StatusCode::CREATED,
        Json(LinkCodeResponse {
            business_id: id,
            instructions: format!("Send /link {code} to the bot from the chat to link."),
            code,
        }),
    ))
}

/// GET /api/v1/businesses/{id}/subscription
pub async fn current_subscription(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<SubscriptionDetail>> {
    user.ensure_business(id)?;
    load(&state, id).await?;
    SubscriptionRepo::find_active_for_business(&state.pool, id)
        .await?
        .map(Json)
        .ok_or(AppError::not_found("Active subscription for business", id))
}

/// GET /api/v1/businesses/{id}/subscriptions
pub async fn subscription_history(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<SubscriptionDetail>>>> {
    user.ensure_business(id)?;
    let filter = SubscriptionFilter {
        business_id: Some(id),
        ..Default::default()
    };
    let history = SubscriptionRepo::list(&state.pool, &filter, params.request()).await?;
    Ok(Json(DataResponse::new(history)))
}

/// GET /api/v1/businesses/{id}/analytics
pub async fn analytics(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BusinessAnalytics>>> {
    user.ensure_business(id)?;
    load(&state, id).await?;
    let analytics = SubscriptionRepo::analytics(&state.pool, id).await?;
    Ok(Json(DataResponse::new(analytics)))
}
