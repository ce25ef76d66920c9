//! Handlers for `/subscriptions`. Lifecycle rules live in
//! [`SubscriptionService`]; these only parse input and pick the caller.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::subscription::{BulkAction, BulkSummary, ExpirySummary};
use backoffice_core::types::DbId;
use backoffice_db::models::subscription::{
    Subscription, SubscriptionDetail, SubscriptionFilter, SubscriptionUsage,
};
use backoffice_db::repositories::SubscriptionRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::response::DataResponse;
use crate::services::subscriptions::NewSubscription;
use crate::services::SubscriptionService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub business_id: DbId,
    pub plan_id: DbId,
    #[serde(default)]
    pub auto_renew: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub auto_renew: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RenewRequest {
    pub plan_id: Option<DbId>,
    pub duration_days: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub immediate: bool,
}

#[derive(Debug, Deserialize)]
pub struct SuspendRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtendRequest {
    pub days: i64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    pub plan_id: DbId,
    #[serde(default)]
    pub immediate: bool,
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub action: String,
    pub subscription_ids: Vec<DbId>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionListParams {
    pub business_id: Option<DbId>,
    pub plan_id: Option<DbId>,
    pub is_active: Option<bool>,
    pub expired: Option<bool>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringParams {
    pub days: Option<i64>,
}

/// Largest batch accepted by the bulk endpoint.
const MAX_BULK_IDS: usize = 500;

/// POST /api/v1/subscriptions
pub async fn create_subscription(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateSubscriptionRequest>,
) -> AppResult<(StatusCode, Json<Subscription>)> {
    let subscription = SubscriptionService::from_state(&state)
        .create(
            NewSubscription {
                business_id: input.business_id,
                plan_id: input.plan_id,
                auto_renew: input.auto_renew,
                notes: input.notes,
            },
            Some(admin.user_id),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// GET /api/v1/subscriptions
pub async fn list_subscriptions(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<SubscriptionListParams>,
) -> AppResult<Json<DataResponse<Page<SubscriptionDetail>>>> {
    let filter = SubscriptionFilter {
        business_id: params.business_id,
        plan_id: params.plan_id,
        is_active: params.is_active,
        expired: params.expired,
    };
    let page = PageRequest::new(params.page, params.size);
    let subscriptions = SubscriptionRepo::list(&state.pool, &filter, page).await?;
    Ok(Json(DataResponse::new(subscriptions)))
}

/// GET /api/v1/subscriptions/{id}
///
/// Owners may read subscriptions of their own business.
pub async fn get_subscription(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<SubscriptionDetail>> {
    let detail = SubscriptionService::from_state(&state).get(id).await?;
    user.ensure_business(detail.subscription.business_id)?;
    Ok(Json(detail))
}

/// PUT /api/v1/subscriptions/{id}
pub async fn update_subscription(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSubscriptionRequest>,
) -> AppResult<Json<Subscription>> {
    let updated = SubscriptionService::from_state(&state)
        .update(id, input.auto_renew, input.notes, Some(admin.user_id))
        .await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/subscriptions/{id}
pub async fn delete_subscription(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    SubscriptionService::from_state(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/subscriptions/{id}/renew
pub async fn renew_subscription(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    input: Option<Json<RenewRequest>>,
) -> AppResult<(StatusCode, Json<Subscription>)> {
    let Json(input) = input.unwrap_or_default();
    let renewed = SubscriptionService::from_state(&state)
        .renew(id, input.plan_id, input.duration_days, Some(admin.user_id))
        .await?;
    Ok((StatusCode::CREATED, Json(renewed)))
}

/// POST /api/v1/subscriptions/{id}/cancel
pub async fn cancel_subscription(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    input: Option<Json<CancelRequest>>,
) -> AppResult<Json<Subscription>> {
    let Json(input) = input.unwrap_or_default();
    let cancelled = SubscriptionService::from_state(&state)
        .cancel(id, input.immediate, Some(admin.user_id))
        .await?;
    Ok(Json(cancelled))
}

/// POST /api/v1/subscriptions/{id}/suspend
pub async fn suspend_subscription(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<SuspendRequest>,
) -> AppResult<Json<Subscription>> {
    let suspended = SubscriptionService::from_state(&state)
        .suspend(id, &input.reason, Some(admin.user_id))
        .await?;
    Ok(Json(suspended))
}

/// POST /api/v1/subscriptions/{id}/reactivate
pub async fn reactivate_subscription(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<Subscription>> {
    let reactivated = SubscriptionService::from_state(&state)
        .reactivate(id, Some(admin.user_id))
        .await?;
    Ok(Json(reactivated))
}

/// POST /api/v1/subscriptions/{id}/extend
pub async fn extend_subscription(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<ExtendRequest>,
) -> AppResult<Json<Subscription>> {
    let extended = SubscriptionService::from_state(&state)
        .extend(id, input.days, &input.reason, Some(admin.user_id))
        .await?;
    Ok(Json(extended))
}

/// POST /api/v1/subscriptions/{id}/change-plan
pub async fn change_plan(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<ChangePlanRequest>,
) -> AppResult<Json<Subscription>> {
    let changed = SubscriptionService::from_state(&state)
        .change_plan(id, input.plan_id, input.immediate, Some(admin.user_id))
        .await?;
    Ok(Json(changed))
}

/// GET /api/v1/subscriptions/{id}/usage
pub async fn usage(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SubscriptionUsage>>> {
    let usage = SubscriptionService::from_state(&state).usage(id).await?;
    user.ensure_business(usage.business_id)?;
    Ok(Json(DataResponse::new(usage)))
}

/// GET /api/v1/subscriptions/expiring?days=7
pub async fn expiring(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<ExpiringParams>,
) -> AppResult<Json<DataResponse<Vec<SubscriptionDetail>>>> {
    let days = params.days.unwrap_or(state.config.expiry_warning_days);
    let subscriptions = SubscriptionService::from_state(&state).expiring(days).await?;
    Ok(Json(DataResponse::new(subscriptions)))
}

/// GET /api/v1/subscriptions/expired
pub async fn expired(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<SubscriptionDetail>>>> {
    let subscriptions = SubscriptionService::from_state(&state).expired().await?;
    Ok(Json(DataResponse::new(subscriptions)))
}

/// POST /api/v1/subscriptions/process-expired
///
/// Runs the same pass as the background sweep, on demand.
pub async fn process_expired(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> AppResult<Json<DataResponse<ExpirySummary>>> {
    let summary = SubscriptionService::from_state(&state)
        .process_expired(Some(admin.user_id))
        .await?;
    Ok(Json(DataResponse::new(summary)))
}

/// POST /api/v1/subscriptions/bulk
pub async fn bulk(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<BulkRequest>,
) -> AppResult<Json<DataResponse<BulkSummary>>> {
    let action: BulkAction = input.action.parse().map_err(AppError::validation)?;
    if input.subscription_ids.is_empty() {
        return Err(AppError::validation("subscription_ids must not be empty"));
    }
    if input.subscription_ids.len() > MAX_BULK_IDS {
        return Err(AppError::validation(format!(
            "At most {MAX_BULK_IDS} subscriptions per bulk request"
        )));
    }

    let summary = SubscriptionService::from_state(&state)
        .bulk(
            action,
            &input.subscription_ids,
            input.reason.as_deref(),
            Some(admin.user_id),
        )
        .await;
    Ok(Json(DataResponse::new(summary)))
}
