//! Handlers for `/subscription-plans`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::subscription::validate_duration_days;
use backoffice_core::types::{Cents, DbId};
use backoffice_db::models::plan::{CreatePlan, PlanResponse, UpdatePlan};
use backoffice_db::models::status::{PlanVisibility, StatusId};
use backoffice_db::repositories::PlanRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::query::PageParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price_cents: Cents,
    #[validate(range(min = 1))]
    pub duration_days: i32,
    pub visibility_id: Option<StatusId>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePlanRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price_cents: Option<Cents>,
    #[validate(range(min = 1))]
    pub duration_days: Option<i32>,
    pub visibility_id: Option<StatusId>,
}

#[derive(Debug, Deserialize)]
pub struct PlanListParams {
    pub visibility_id: Option<StatusId>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

fn check_duration(duration_days: Option<i32>) -> AppResult<()> {
    match duration_days {
        Some(days) => validate_duration_days(days).map_err(AppError::validation),
        None => Ok(()),
    }
}

fn check_visibility(visibility_id: Option<StatusId>) -> AppResult<()> {
    match visibility_id {
        Some(id) if PlanVisibility::from_id(id).is_none() => Err(AppError::validation(format!(
            "Invalid plan visibility id {id}"
        ))),
        _ => Ok(()),
    }
}

/// POST /api/v1/subscription-plans
pub async fn create_plan(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreatePlanRequest>,
) -> AppResult<(StatusCode, Json<PlanResponse>)> {
    input.validate()?;
    check_duration(Some(input.duration_days))?;
    check_visibility(input.visibility_id)?;
    let plan = PlanRepo::create(
        &state.pool,
        &CreatePlan {
            name: input.name.trim().to_string(),
            description: input.description,
            price_cents: input.price_cents,
            duration_days: input.duration_days,
            visibility_id: input.visibility_id,
        },
    )
    .await?;
    tracing::info!(plan_id = plan.id, name = %plan.name, "Subscription plan created");
    Ok((StatusCode::CREATED, Json(plan.into())))
}

/// GET /api/v1/subscription-plans
pub async fn list_plans(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PlanListParams>,
) -> AppResult<Json<DataResponse<Page<PlanResponse>>>> {
    let page = PageRequest::new(params.page, params.size);
    let plans = PlanRepo::list(&state.pool, params.visibility_id, page).await?;
    Ok(Json(DataResponse::new(plans.map(PlanResponse::from))))
}

/// GET /api/v1/subscription-plans/public
pub async fn list_public_plans(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<PlanResponse>>>> {
    let plans =
        PlanRepo::list(&state.pool, Some(PlanVisibility::Public.id()), params.request()).await?;
    Ok(Json(DataResponse::new(plans.map(PlanResponse::from))))
}

/// GET /api/v1/subscription-plans/{id}
pub async fn get_plan(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<PlanResponse>> {
    let plan = PlanRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|p| user.is_admin() || p.visibility_id == PlanVisibility::Public.id())
        .ok_or(AppError::not_found("SubscriptionPlan", id))?;
    Ok(Json(plan.into()))
}

/// PUT /api/v1/subscription-plans/{id}
pub async fn update_plan(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePlanRequest>,
) -> AppResult<Json<PlanResponse>> {
    input.validate()?;
    check_duration(input.duration_days)?;
    check_visibility(input.visibility_id)?;
    let plan = PlanRepo::update(
        &state.pool,
        id,
        &UpdatePlan {
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
            price_cents: input.price_cents,
            duration_days: input.duration_days,
            visibility_id: input.visibility_id,
        },
    )
    .await?
    .ok_or(AppError::not_found("SubscriptionPlan", id))?;
    Ok(Json(plan.into()))
}

/// DELETE /api/v1/subscription-plans/{id}
///
/// Refused while any active subscription still uses the plan.
pub async fn delete_plan(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if PlanRepo::has_active_subscriptions(&state.pool, id).await? {
        return Err(AppError::conflict(
            "Cannot delete a plan that has active subscriptions",
        ));
    }
    if !PlanRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("SubscriptionPlan", id));
    }
    tracing::info!(plan_id = id, "Subscription plan deleted");
    Ok(StatusCode::NO_CONTENT)
}
