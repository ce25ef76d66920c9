//! Handlers for `/payments`. Admin only.
//!
//! Payments move PENDING -> COMPLETED | FAILED and COMPLETED -> REFUNDED.
//! Each transition is a guarded update, so a concurrent change to the same
//! payment surfaces as 409 rather than a lost write.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::codes::payment_reference;
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::payment::{normalize_method, state_machine};
use backoffice_core::types::{Cents, DbId};
use backoffice_db::models::payment::{CreatePayment, Payment, PaymentFilter, UpdatePayment};
use backoffice_db::models::status::{PaymentStatus, StatusId};
use backoffice_db::repositories::{BusinessRepo, PaymentRepo, PlanRepo, SubscriptionRepo};
use backoffice_events::{event_types, PlatformEvent};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub business_id: DbId,
    pub plan_id: DbId,
    pub subscription_id: Option<DbId>,
    #[validate(range(min = 1))]
    pub amount_cents: Cents,
    pub method: String,
    #[validate(length(min = 1, max = 50))]
    pub reference_number: Option<String>,
    pub status_id: Option<StatusId>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePaymentRequest {
    #[validate(range(min = 1))]
    pub amount_cents: Option<Cents>,
    pub method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransitionRequest {
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentListParams {
    pub business_id: Option<DbId>,
    pub subscription_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    pub method: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// POST /api/v1/payments
pub async fn create_payment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    input.validate()?;
    let method = normalize_method(&input.method).map_err(AppError::validation)?;
    let status_id = input.status_id.unwrap_or(PaymentStatus::Pending.id());
    if PaymentStatus::from_id(status_id).is_none() {
        return Err(AppError::validation(format!("Invalid payment status id {status_id}")));
    }

    BusinessRepo::find_by_id(&state.pool, input.business_id)
        .await?
        .ok_or(AppError::not_found("Business", input.business_id))?;
    PlanRepo::find_by_id(&state.pool, input.plan_id)
        .await?
        .ok_or(AppError::not_found("SubscriptionPlan", input.plan_id))?;
    if let Some(subscription_id) = input.subscription_id {
        let subscription = SubscriptionRepo::find_by_id(&state.pool, subscription_id)
            .await?
            .ok_or(AppError::not_found("Subscription", subscription_id))?;
        if subscription.business_id != input.business_id {
            return Err(AppError::validation(
                "Subscription does not belong to this business",
            ));
        }
    }

    let reference_number = match input.reference_number {
        Some(r) if !r.trim().is_empty() => r.trim().to_string(),
        _ => payment_reference(Utc::now()),
    };

    let payment = PaymentRepo::create(
        &state.pool,
        &CreatePayment {
            business_id: input.business_id,
            plan_id: Some(input.plan_id),
            subscription_id: input.subscription_id,
            amount_cents: input.amount_cents,
            method,
            status_id,
            reference_number,
            notes: input.notes,
            created_by: Some(admin.user_id),
        },
    )
    .await?;

    tracing::info!(
        payment_id = payment.id,
        business_id = payment.business_id,
        amount_cents = payment.amount_cents,
        reference = %payment.reference_number,
        "Payment recorded"
    );
    if payment.status_id == PaymentStatus::Completed.id() {
        publish_completed(&state, &payment, admin.user_id);
    }
    Ok((StatusCode::CREATED, Json(payment)))
}

/// GET /api/v1/payments
pub async fn list_payments(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PaymentListParams>,
) -> AppResult<Json<DataResponse<Page<Payment>>>> {
    let method = params
        .method
        .as_deref()
        .map(normalize_method)
        .transpose()
        .map_err(AppError::validation)?;
    let filter = PaymentFilter {
        business_id: params.business_id,
        subscription_id: params.subscription_id,
        status_id: params.status_id,
        method,
    };
    let page = PageRequest::new(params.page, params.size);
    let payments = PaymentRepo::list(&state.pool, &filter, page).await?;
    Ok(Json(DataResponse::new(payments)))
}

/// GET /api/v1/payments/{id}
pub async fn get_payment(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<Payment>> {
    let payment = PaymentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Payment", id))?;
    Ok(Json(payment))
}

/// PUT /api/v1/payments/{id}
pub async fn update_payment(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePaymentRequest>,
) -> AppResult<Json<Payment>> {
    input.validate()?;
    let method = input
        .method
        .as_deref()
        .map(normalize_method)
        .transpose()
        .map_err(AppError::validation)?;
    let payment = PaymentRepo::update(
        &state.pool,
        id,
        &UpdatePayment {
            amount_cents: input.amount_cents,
            method,
            notes: input.notes,
        },
    )
    .await?
    .ok_or(AppError::not_found("Payment", id))?;
    Ok(Json(payment))
}

/// DELETE /api/v1/payments/{id}
pub async fn delete_payment(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !PaymentRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Payment", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/payments/{id}/complete
pub async fn complete_payment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    input: Option<Json<TransitionRequest>>,
) -> AppResult<Json<Payment>> {
    let Json(input) = input.unwrap_or_default();
    let payment = transition(&state, id, PaymentStatus::Completed, input.note).await?;
    publish_completed(&state, &payment, admin.user_id);
    Ok(Json(payment))
}

/// POST /api/v1/payments/{id}/fail
pub async fn fail_payment(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    input: Option<Json<TransitionRequest>>,
) -> AppResult<Json<Payment>> {
    let Json(input) = input.unwrap_or_default();
    transition(&state, id, PaymentStatus::Failed, input.note)
        .await
        .map(Json)
}

/// POST /api/v1/payments/{id}/refund
pub async fn refund_payment(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    input: Option<Json<TransitionRequest>>,
) -> AppResult<Json<Payment>> {
    let Json(input) = input.unwrap_or_default();
    transition(&state, id, PaymentStatus::Refunded, input.note)
        .await
        .map(Json)
}

async fn transition(
    state: &AppState,
    id: DbId,
    to: PaymentStatus,
    note: Option<String>,
) -> AppResult<Payment> {
    let current = PaymentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Payment", id))?;
    state_machine::validate_transition(current.status_id, to.id()).map_err(AppError::conflict)?;

    let note = note.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let updated = PaymentRepo::transition(&state.pool, id, current.status_id, to.id(), note)
        .await?
        .ok_or_else(|| AppError::conflict("Payment status changed concurrently; reload and retry"))?;

    tracing::info!(payment_id = id, from = current.status_id, to = to.id(), "Payment status changed");
    Ok(updated)
}

fn publish_completed(state: &AppState, payment: &Payment, actor: DbId) {
    state.event_bus.publish(
        PlatformEvent::new(event_types::PAYMENT_COMPLETED)
            .with_source("payment", payment.id)
            .with_business(payment.business_id)
            .with_actor(Some(actor))
            .with_payload(json!({
                "amount_cents": payment.amount_cents,
                "reference_number": payment.reference_number,
            })),
    );
}
