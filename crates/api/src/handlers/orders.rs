//! Handlers for `/orders`.
//!
//! Customers check out their own cart and may cancel while the kitchen has
//! not started. Owners and restaurant staff run the status machine for
//! their business and ring up guest orders at the counter (POS).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::codes::order_number;
use backoffice_core::ordering::{
    customer_can_cancel, line_total, order_total, state_machine, subtotal, validate_price,
    validate_quantity, MSG_EMPTY_CART, MSG_GUEST_PHONE_REQUIRED,
};
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::payment::normalize_method;
use backoffice_core::roles::{ROLE_BUSINESS_OWNER, ROLE_CUSTOMER, ROLE_STAFF};
use backoffice_core::types::{Cents, DbId};
use backoffice_db::models::order::{
    CreateOrder, CreateOrderItem, Order, OrderFilter, OrderWithItems,
};
use backoffice_db::models::status::{OrderStatus, StatusId};
use backoffice_db::repositories::{BusinessRepo, CartRepo, OrderRepo, ProductRepo};
use backoffice_events::{event_types, PlatformEvent};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_PAYMENT_METHOD: &str = "CASH";

/// Snapshot one product line, rejecting totals that do not fit in cents.
fn order_line(
    product_id: DbId,
    product_name: String,
    unit_price_cents: Cents,
    quantity: i32,
) -> AppResult<CreateOrderItem> {
    Ok(CreateOrderItem {
        product_id: Some(product_id),
        product_name,
        unit_price_cents,
        quantity,
        line_total_cents: line_total(unit_price_cents, quantity).map_err(AppError::validation)?,
    })
}

/// Subtotal of `items`, checked so that adding the delivery fee cannot overflow.
fn checked_subtotal(items: &[CreateOrderItem], delivery_fee_cents: Cents) -> AppResult<Cents> {
    validate_price(delivery_fee_cents).map_err(AppError::validation)?;
    let subtotal_cents = subtotal(items.iter().map(|i| (i.unit_price_cents, i.quantity)))
        .map_err(AppError::validation)?;
    order_total(subtotal_cents, delivery_fee_cents).map_err(AppError::validation)?;
    Ok(subtotal_cents)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub business_id: DbId,
    #[validate(length(max = 500))]
    pub customer_note: Option<String>,
    pub payment_method: Option<String>,
    #[validate(range(min = 0))]
    pub delivery_fee_cents: Option<Cents>,
}

#[derive(Debug, Deserialize)]
pub struct PosItem {
    pub product_id: DbId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PosOrderRequest {
    pub business_id: DbId,
    #[validate(length(max = 100))]
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    #[validate(length(max = 255))]
    pub guest_location: Option<String>,
    #[validate(length(max = 500))]
    pub customer_note: Option<String>,
    pub payment_method: Option<String>,
    #[validate(range(min = 0))]
    pub delivery_fee_cents: Option<Cents>,
    pub items: Vec<PosItem>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status_id: StatusId,
    pub business_note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub business_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// Owners and restaurant staff of `business_id`, or admins.
fn ensure_operator(user: &AuthUser, business_id: DbId) -> AppResult<()> {
    let works_there = user.has_any_role(&[ROLE_BUSINESS_OWNER, ROLE_STAFF])
        && user.business_id == Some(business_id);
    if user.is_admin() || works_there {
        Ok(())
    } else {
        Err(AppError::forbidden("You cannot manage orders for this business"))
    }
}

/// Customers see their own orders; everyone else goes through
/// [`ensure_operator`].
fn ensure_can_view(user: &AuthUser, order: &Order) -> AppResult<()> {
    if order.customer_id == Some(user.user_id) {
        return Ok(());
    }
    ensure_operator(user, order.business_id)
}

fn checked_method(raw: Option<&str>) -> AppResult<String> {
    normalize_method(raw.unwrap_or(DEFAULT_PAYMENT_METHOD)).map_err(AppError::validation)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn publish_placed(state: &AppState, order: &Order, actor: DbId) {
    state.event_bus.publish(
        PlatformEvent::new(event_types::ORDER_PLACED)
            .with_source("order", order.id)
            .with_business(order.business_id)
            .with_actor(Some(actor))
            .with_payload(json!({
                "order_number": order.order_number,
                "total_cents": order.total_cents,
                "is_pos_order": order.is_pos_order,
            })),
    );
}

/// POST /api/v1/orders/checkout
///
/// Turns the caller's cart for `business_id` into an order. Item names and
/// prices are snapshotted; the cart is emptied in the same transaction.
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<OrderWithItems>)> {
    input.validate()?;
    let payment_method = checked_method(input.payment_method.as_deref())?;

    let cart = CartRepo::find(&state.pool, user.user_id, input.business_id)
        .await?
        .ok_or_else(|| AppError::validation(MSG_EMPTY_CART))?;
    let lines = CartRepo::lines(&state.pool, cart.id).await?;
    if lines.is_empty() {
        return Err(AppError::validation(MSG_EMPTY_CART));
    }

    let unavailable: Vec<&str> = lines
        .iter()
        .filter(|l| !l.is_available)
        .map(|l| l.product_name.as_str())
        .collect();
    if !unavailable.is_empty() {
        return Err(AppError::validation(format!(
            "Some products are no longer available: {}",
            unavailable.join(", ")
        )));
    }

    let items = lines
        .iter()
        .map(|l| order_line(l.product_id, l.product_name.clone(), l.unit_price_cents, l.quantity))
        .collect::<AppResult<Vec<_>>>()?;
    let delivery_fee_cents = input.delivery_fee_cents.unwrap_or(0);
    let subtotal_cents = checked_subtotal(&items, delivery_fee_cents)?;

    let header = CreateOrder {
        order_number: order_number(Utc::now()),
        customer_id: Some(user.user_id),
        business_id: input.business_id,
        guest_name: None,
        guest_phone: None,
        guest_location: None,
        customer_note: trimmed(input.customer_note),
        subtotal_cents,
        delivery_fee_cents,
        payment_method,
        is_pos_order: false,
    };
    let created = OrderRepo::create(&state.pool, &header, &items, Some(cart.id)).await?;

    tracing::info!(
        order_id = created.order.id,
        order_number = %created.order.order_number,
        business_id = created.order.business_id,
        total_cents = created.order.total_cents,
        "Order placed from cart"
    );
    publish_placed(&state, &created.order, user.user_id);
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/v1/orders/pos
pub async fn create_pos_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<PosOrderRequest>,
) -> AppResult<(StatusCode, Json<OrderWithItems>)> {
    input.validate()?;
    ensure_operator(&user, input.business_id)?;

    let guest_phone =
        trimmed(input.guest_phone).ok_or_else(|| AppError::validation(MSG_GUEST_PHONE_REQUIRED))?;
    let payment_method = checked_method(input.payment_method.as_deref())?;
    if input.items.is_empty() {
        return Err(AppError::validation("Order must contain at least one item"));
    }
    BusinessRepo::find_by_id(&state.pool, input.business_id)
        .await?
        .ok_or(AppError::not_found("Business", input.business_id))?;

    let mut items = Vec::with_capacity(input.items.len());
    for line in &input.items {
        validate_quantity(line.quantity).map_err(AppError::validation)?;
        let product = ProductRepo::find_by_id(&state.pool, line.product_id)
            .await?
            .filter(|p| p.business_id == input.business_id)
            .ok_or(AppError::not_found("Product", line.product_id))?;
        if !product.is_available {
            return Err(AppError::validation(format!(
                "Product '{}' is not available",
                product.name
            )));
        }
        items.push(order_line(
            product.id,
            product.name,
            product.price_cents,
            line.quantity,
        )?);
    }
    let delivery_fee_cents = input.delivery_fee_cents.unwrap_or(0);
    let subtotal_cents = checked_subtotal(&items, delivery_fee_cents)?;

    let header = CreateOrder {
        order_number: order_number(Utc::now()),
        customer_id: None,
        business_id: input.business_id,
        guest_name: trimmed(input.guest_name),
        guest_phone: Some(guest_phone),
        guest_location: trimmed(input.guest_location),
        customer_note: trimmed(input.customer_note),
        subtotal_cents,
        delivery_fee_cents,
        payment_method,
        is_pos_order: true,
    };
    let created = OrderRepo::create(&state.pool, &header, &items, None).await?;

    tracing::info!(
        order_id = created.order.id,
        order_number = %created.order.order_number,
        business_id = created.order.business_id,
        "POS order created"
    );
    publish_placed(&state, &created.order, user.user_id);
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/orders
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<OrderListParams>,
) -> AppResult<Json<DataResponse<Page<Order>>>> {
    let filter = if user.is_admin() {
        OrderFilter {
            business_id: params.business_id,
            customer_id: None,
            status_id: params.status_id,
        }
    } else if user.role == ROLE_CUSTOMER {
        OrderFilter {
            business_id: params.business_id,
            customer_id: Some(user.user_id),
            status_id: params.status_id,
        }
    } else {
        let business_id = user
            .business_id
            .filter(|_| user.has_any_role(&[ROLE_BUSINESS_OWNER, ROLE_STAFF]))
            .ok_or_else(|| AppError::forbidden("You are not attached to a business"))?;
        OrderFilter {
            business_id: Some(business_id),
            customer_id: None,
            status_id: params.status_id,
        }
    };

    let page = PageRequest::new(params.page, params.size);
    let orders = OrderRepo::list(&state.pool, &filter, page).await?;
    Ok(Json(DataResponse::new(orders)))
}

/// GET /api/v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<OrderWithItems>> {
    let order = OrderRepo::find_with_items(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Order", id))?;
    ensure_can_view(&user, &order.order)?;
    Ok(Json(order))
}

/// POST /api/v1/orders/{id}/status
pub async fn change_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
    Json(input): Json<StatusChangeRequest>,
) -> AppResult<Json<Order>> {
    let order = OrderRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Order", id))?;
    ensure_operator(&user, order.business_id)?;
    if OrderStatus::from_id(input.status_id).is_none() {
        return Err(AppError::validation(format!(
            "Invalid order status id {}",
            input.status_id
        )));
    }

    let note = trimmed(input.business_note);
    let updated = transition(&state, &order, input.status_id, note.as_deref()).await?;
    publish_status_changed(&state, &order, &updated, user.user_id);
    Ok(Json(updated))
}

/// POST /api/v1/orders/{id}/cancel
///
/// Customer-side cancel. Allowed while the order is Pending or Confirmed.
pub async fn cancel_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<Order>> {
    let order = OrderRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|o| o.customer_id == Some(user.user_id))
        .ok_or(AppError::not_found("Order", id))?;
    if !customer_can_cancel(order.status_id) {
        return Err(AppError::conflict(
            "Order can no longer be cancelled; the business has started preparing it",
        ));
    }

    let updated = transition(&state, &order, OrderStatus::Cancelled.id(), None).await?;
    publish_status_changed(&state, &order, &updated, user.user_id);
    Ok(Json(updated))
}

/// POST /api/v1/orders/{id}/paid
pub async fn mark_paid(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<Order>> {
    let order = OrderRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Order", id))?;
    ensure_operator(&user, order.business_id)?;
    let updated = OrderRepo::mark_paid(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Order", id))?;
    tracing::info!(order_id = id, "Order marked paid");
    Ok(Json(updated))
}

async fn transition(
    state: &AppState,
    order: &Order,
    to: StatusId,
    business_note: Option<&str>,
) -> AppResult<Order> {
    state_machine::validate_transition(order.status_id, to).map_err(AppError::conflict)?;
    let updated = OrderRepo::transition(&state.pool, order.id, order.status_id, to, business_note)
        .await?
        .ok_or_else(|| AppError::conflict("Order status changed concurrently; reload and retry"))?;
    tracing::info!(order_id = order.id, from = order.status_id, to, "Order status changed");
    Ok(updated)
}

fn publish_status_changed(state: &AppState, before: &Order, after: &Order, actor: DbId) {
    state.event_bus.publish(
        PlatformEvent::new(event_types::ORDER_STATUS_CHANGED)
            .with_source("order", after.id)
            .with_business(after.business_id)
            .with_actor(Some(actor))
            .with_payload(json!({
                "order_number": after.order_number,
                "total_cents": after.total_cents,
                "from_status_id": before.status_id,
                "to_status_id": after.status_id,
            })),
    );
}
