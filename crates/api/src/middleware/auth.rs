//! Bearer-token extractor.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use backoffice_core::error::CoreError;
use backoffice_core::roles::{ROLE_ADMIN, ROLE_BUSINESS_OWNER, ROLE_STAFF, ROLE_TEACHER};
use backoffice_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Caller identity taken from a valid access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub role: String,
    /// Restaurant the caller belongs to, if any.
    pub business_id: Option<DbId>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.contains(&self.role.as_str())
    }

    /// Admin, staff or teacher.
    pub fn is_school_staff(&self) -> bool {
        self.has_any_role(&[ROLE_ADMIN, ROLE_STAFF, ROLE_TEACHER])
    }

    /// Admins see every business; everyone else only the one on their token.
    pub fn can_access_business(&self, business_id: DbId) -> bool {
        self.is_admin() || self.business_id == Some(business_id)
    }

    /// Reject unless [`can_access_business`](Self::can_access_business).
    pub fn ensure_business(&self, business_id: DbId) -> Result<(), AppError> {
        if self.can_access_business(business_id) {
            Ok(())
        } else {
            Err(AppError::forbidden("You do not have access to this business"))
        }
    }

    /// Owners of a business, or admins.
    pub fn ensure_business_manager(&self, business_id: DbId) -> Result<(), AppError> {
        let owns = self.role == ROLE_BUSINESS_OWNER && self.business_id == Some(business_id);
        if self.is_admin() || owns {
            Ok(())
        } else {
            Err(AppError::forbidden("Only the business owner may do this"))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token.trim(), &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
            business_id: claims.business_id,
        })
    }
}
