//! Handlers for `/admin/users`. Every route requires [`RequireAdmin`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::roles::validate_role;
use backoffice_core::types::DbId;
use backoffice_db::models::user::{CreateUser, UpdateUser, UserFilter, UserResponse};
use backoffice_db::repositories::{SessionRepo, UserRepo};
use serde::Deserialize;
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub role: String,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub business_id: Option<DbId>,
    pub class_id: Option<DbId>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<String>,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub business_id: Option<DbId>,
    pub class_id: Option<DbId>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub role: Option<String>,
    pub business_id: Option<DbId>,
    pub class_id: Option<DbId>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

async fn resolve_role(state: &AppState, role: &str) -> AppResult<DbId> {
    validate_role(role).map_err(AppError::validation)?;
    UserRepo::role_id_by_name(&state.pool, role)
        .await?
        .ok_or_else(|| AppError::validation(format!("Role '{role}' is not available")))
}

/// POST /api/v1/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    input.validate()?;
    validate_password_strength(&input.password).map_err(AppError::validation)?;
    let role_id = resolve_role(&state, &input.role).await?;
    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            password_hash,
            role_id,
            full_name: input.full_name,
            phone: input.phone,
            business_id: input.business_id,
            class_id: input.class_id,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, role = %user.role, created_by = admin.user_id, "User created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<UserListParams>,
) -> AppResult<Json<DataResponse<Page<UserResponse>>>> {
    let filter = UserFilter {
        role: params.role,
        business_id: params.business_id,
        class_id: params.class_id,
        search: params.search.filter(|s| !s.trim().is_empty()),
    };
    let page = PageRequest::new(params.page, params.size);
    let users = UserRepo::list(&state.pool, &filter, page).await?;
    Ok(Json(DataResponse::new(users.map(UserResponse::from))))
}

/// GET /api/v1/admin/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("User", id))?;
    Ok(Json(user.into()))
}

/// PUT /api/v1/admin/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    input.validate()?;
    let role_id = match input.role.as_deref() {
        Some(role) => Some(resolve_role(&state, role).await?),
        None => None,
    };

    let user = UserRepo::update(
        &state.pool,
        id,
        &UpdateUser {
            username: input.username.map(|u| u.trim().to_string()),
            email: input.email.map(|e| e.trim().to_lowercase()),
            role_id,
            full_name: input.full_name,
            phone: input.phone,
            business_id: input.business_id,
            class_id: input.class_id,
            is_active: input.is_active,
        },
    )
    .await?
    .ok_or(AppError::not_found("User", id))?;

    if !user.is_active {
        SessionRepo::revoke_for_user(&state.pool, user.id, None).await?;
    }
    Ok(Json(user.into()))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Soft delete. Admins cannot delete themselves.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(AppError::BadRequest("You cannot delete your own account".into()));
    }
    if !UserRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("User", id));
    }
    SessionRepo::revoke_for_user(&state.pool, id, None).await?;
    tracing::info!(user_id = id, deleted_by = admin.user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/users/{id}/reset-password
///
/// Sets a new password, clears any lockout and signs the user out everywhere.
pub async fn reset_password(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    validate_password_strength(&input.new_password).map_err(AppError::validation)?;
    let password_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    if !UserRepo::update_password(&state.pool, id, &password_hash).await? {
        return Err(AppError::not_found("User", id));
    }
    SessionRepo::revoke_for_user(&state.pool, id, None).await?;
    tracing::info!(user_id = id, reset_by = admin.user_id, "Password reset");
    Ok(StatusCode::NO_CONTENT)
}
