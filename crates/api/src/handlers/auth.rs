//! Handlers for `/auth`: login, refresh, logout, registration and the
//! caller's own profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::error::CoreError;
use backoffice_core::roles::ROLE_CUSTOMER;
use backoffice_db::models::session::CreateSession;
use backoffice_db::models::user::{CreateUser, User, UserResponse};
use backoffice_db::repositories::{SessionRepo, UserRepo};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Failed logins in a row before the account is locked.
const MAX_FAILED_ATTEMPTS: i32 = 5;

const LOCK_DURATION_MINS: i64 = 15;

const MSG_BAD_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = UserRepo::find_by_username(&state.pool, input.username.trim())
        .await?
        .ok_or_else(|| unauthorized(MSG_BAD_CREDENTIALS))?;

    if !user.is_active {
        return Err(AppError::forbidden("Account is deactivated"));
    }
    if user.locked_until.is_some_and(|until| until > Utc::now()) {
        return Err(AppError::forbidden(
            "Account is temporarily locked. Try again later.",
        ));
    }

    let valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !valid {
        let lock_until = Utc::now() + Duration::minutes(LOCK_DURATION_MINS);
        let failures =
            UserRepo::record_failed_login(&state.pool, user.id, MAX_FAILED_ATTEMPTS, lock_until)
                .await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            tracing::warn!(user_id = user.id, failures, "Account locked after failed logins");
        }
        return Err(unauthorized(MSG_BAD_CREDENTIALS));
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    let (refresh_token, refresh_hash) = generate_refresh_token();
    SessionRepo::create(&state.pool, &new_session(&state, user.id, refresh_hash)).await?;
    issue(&state, user, refresh_token).map(Json)
}

/// POST /api/v1/auth/refresh
///
/// Exchanges a refresh token for a new pair. The presented token is consumed;
/// presenting it again fails.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let old_hash = hash_refresh_token(input.refresh_token.trim());
    let session = SessionRepo::find_active(&state.pool, &old_hash)
        .await?
        .ok_or_else(|| unauthorized("Invalid or expired refresh token"))?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| unauthorized("User no longer exists"))?;
    if !user.is_active {
        return Err(AppError::forbidden("Account is deactivated"));
    }

    let (refresh_token, refresh_hash) = generate_refresh_token();
    SessionRepo::rotate(&state.pool, &old_hash, &new_session(&state, user.id, refresh_hash))
        .await?
        .ok_or_else(|| unauthorized("Invalid or expired refresh token"))?;

    issue(&state, user, refresh_token).map(Json)
}

/// POST /api/v1/auth/logout
///
/// Revokes every session of the caller.
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> AppResult<StatusCode> {
    let revoked = SessionRepo::revoke_for_user(&state.pool, user.user_id, None).await?;
    tracing::info!(user_id = user.user_id, revoked, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<UserResponse>> {
    let found = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or(AppError::not_found("User", user.user_id))?;
    Ok(Json(found.into()))
}

/// POST /api/v1/auth/register
///
/// Public sign-up. Accounts created here are always customers.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    input.validate()?;
    validate_password_strength(&input.password).map_err(AppError::validation)?;

    let role_id = UserRepo::role_id_by_name(&state.pool, ROLE_CUSTOMER)
        .await?
        .ok_or_else(|| AppError::InternalError("customer role is not seeded".into()))?;
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
            business_id: None,
            class_id: None,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "Customer registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

fn new_session(state: &AppState, user_id: backoffice_core::types::DbId, hash: String) -> CreateSession {
    CreateSession {
        user_id,
        refresh_token_hash: hash,
        expires_at: Utc::now() + Duration::days(state.config.jwt.refresh_token_expiry_days),
        user_agent: None,
        ip_address: None,
    }
}

fn issue(state: &AppState, user: User, refresh_token: String) -> AppResult<AuthResponse> {
    let access_token =
        generate_access_token(user.id, &user.role, user.business_id, &state.config.jwt)
            .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in: state.config.jwt.access_expiry_secs(),
        user: user.into(),
    })
}
