//! Handlers for a business menu under `/businesses/{business_id}/products`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::ordering::validate_price;
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::{Cents, DbId};
use backoffice_db::models::product::{CreateProduct, Product, UpdateProduct};
use backoffice_db::repositories::{BusinessRepo, ProductRepo};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAuth, RequireBusinessOwner};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price_cents: Cents,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price_cents: Option<Cents>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ProductListParams {
    #[serde(default)]
    pub available_only: bool,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// Load a product and make sure it sits on this business's menu.
async fn find_on_menu(state: &AppState, business_id: DbId, id: DbId) -> AppResult<Product> {
    ProductRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|p| p.business_id == business_id)
        .ok_or(AppError::not_found("Product", id))
}

/// POST /api/v1/businesses/{business_id}/products
pub async fn create_product(
    State(state): State<AppState>,
    RequireBusinessOwner(user): RequireBusinessOwner,
    Path(business_id): Path<DbId>,
    Json(input): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<Product>)> {
    input.validate()?;
    validate_price(input.price_cents).map_err(AppError::validation)?;
    user.ensure_business_manager(business_id)?;
    BusinessRepo::find_by_id(&state.pool, business_id)
        .await?
        .ok_or(AppError::not_found("Business", business_id))?;

    let product = ProductRepo::create(
        &state.pool,
        business_id,
        &CreateProduct {
            name: input.name.trim().to_string(),
            description: input.description,
            price_cents: input.price_cents,
            is_available: input.is_available,
        },
    )
    .await?;
    tracing::info!(product_id = product.id, business_id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/v1/businesses/{business_id}/products
///
/// Any signed-in user may browse a menu.
pub async fn list_products(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(business_id): Path<DbId>,
    Query(params): Query<ProductListParams>,
) -> AppResult<Json<DataResponse<Page<Product>>>> {
    let page = PageRequest::new(params.page, params.size);
    let products =
        ProductRepo::list_for_business(&state.pool, business_id, params.available_only, page)
            .await?;
    Ok(Json(DataResponse::new(products)))
}

/// GET /api/v1/businesses/{business_id}/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path((business_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<Product>> {
    find_on_menu(&state, business_id, id).await.map(Json)
}

/// PUT /api/v1/businesses/{business_id}/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    RequireBusinessOwner(user): RequireBusinessOwner,
    Path((business_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateProductRequest>,
) -> AppResult<Json<Product>> {
    input.validate()?;
    if let Some(price) = input.price_cents {
        validate_price(price).map_err(AppError::validation)?;
    }
    user.ensure_business_manager(business_id)?;
    find_on_menu(&state, business_id, id).await?;

    let product = ProductRepo::update(
        &state.pool,
        id,
        &UpdateProduct {
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
            price_cents: input.price_cents,
            is_available: input.is_available,
        },
    )
    .await?
    .ok_or(AppError::not_found("Product", id))?;
    Ok(Json(product))
}

/// DELETE /api/v1/businesses/{business_id}/products/{id}
///
/// Soft delete. Order history keeps its snapshot of the product.
pub async fn delete_product(
    State(state): State<AppState>,
    RequireBusinessOwner(user): RequireBusinessOwner,
    Path((business_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    user.ensure_business_manager(business_id)?;
    find_on_menu(&state, business_id, id).await?;
    if !ProductRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Product", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
