//! Handlers for the caller's shopping carts under `/carts`.
//!
//! Each signed-in user has at most one cart per business. Lines store only
//! product and quantity; prices are read from the live menu every time.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::ordering::validate_quantity;
use backoffice_core::types::DbId;
use backoffice_db::models::cart::CartView;
use backoffice_db::repositories::{BusinessRepo, CartRepo, ProductRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAuth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: DbId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    /// 0 removes the line.
    pub quantity: i32,
}

async fn cart_view(state: &AppState, user_id: DbId, business_id: DbId) -> AppResult<CartView> {
    let cart = CartRepo::get_or_create(&state.pool, user_id, business_id).await?;
    let items = CartRepo::lines(&state.pool, cart.id).await?;
    CartView::new(cart, items).map_err(AppError::validation)
}

/// GET /api/v1/carts/{business_id}
pub async fn get_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(business_id): Path<DbId>,
) -> AppResult<Json<CartView>> {
    BusinessRepo::find_by_id(&state.pool, business_id)
        .await?
        .ok_or(AppError::not_found("Business", business_id))?;
    cart_view(&state, user.user_id, business_id).await.map(Json)
}

/// POST /api/v1/carts/{business_id}/items
///
/// Adding a product already in the cart increases that line's quantity.
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(business_id): Path<DbId>,
    Json(input): Json<AddItemRequest>,
) -> AppResult<Json<CartView>> {
    validate_quantity(input.quantity).map_err(AppError::validation)?;

    let product = ProductRepo::find_by_id(&state.pool, input.product_id)
        .await?
        .filter(|p| p.business_id == business_id)
        .ok_or(AppError::not_found("Product", input.product_id))?;
    if !product.is_available {
        return Err(AppError::validation(format!(
            "Product '{}' is not available",
            product.name
        )));
    }

    let cart = CartRepo::get_or_create(&state.pool, user.user_id, business_id).await?;
    let existing = CartRepo::quantity_of(&state.pool, cart.id, product.id).await?;
    let quantity = existing + input.quantity;
    validate_quantity(quantity).map_err(AppError::validation)?;
    CartRepo::put_item(&state.pool, cart.id, product.id, quantity).await?;

    tracing::debug!(cart_id = cart.id, product_id = product.id, quantity, "Cart line updated");
    cart_view(&state, user.user_id, business_id).await.map(Json)
}

/// PUT /api/v1/carts/items/{item_id}
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<DbId>,
    Json(input): Json<SetQuantityRequest>,
) -> AppResult<Json<CartView>> {
    let line = CartRepo::find_line_for_user(&state.pool, item_id, user.user_id)
        .await?
        .ok_or(AppError::not_found("CartItem", item_id))?;

    if input.quantity == 0 {
        CartRepo::remove_line(&state.pool, item_id).await?;
    } else {
        validate_quantity(input.quantity).map_err(AppError::validation)?;
        CartRepo::set_line_quantity(&state.pool, item_id, input.quantity).await?;
    }

    let view = view_for_cart(&state, line.cart_id).await?;
    Ok(Json(view))
}

/// DELETE /api/v1/carts/items/{item_id}
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<DbId>,
) -> AppResult<StatusCode> {
    CartRepo::find_line_for_user(&state.pool, item_id, user.user_id)
        .await?
        .ok_or(AppError::not_found("CartItem", item_id))?;
    CartRepo::remove_line(&state.pool, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/carts/{business_id}
pub async fn clear_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(business_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if let Some(cart) = CartRepo::find(&state.pool, user.user_id, business_id).await? {
        let removed = CartRepo::clear(&state.pool, cart.id).await?;
        tracing::debug!(cart_id = cart.id, removed, "Cart cleared");
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn view_for_cart(state: &AppState, cart_id: DbId) -> AppResult<CartView> {
    let cart = CartRepo::find_by_id(&state.pool, cart_id)
        .await?
        .ok_or(AppError::not_found("Cart", cart_id))?;
    let items = CartRepo::lines(&state.pool, cart.id).await?;
    CartView::new(cart, items).map_err(AppError::validation)
}
