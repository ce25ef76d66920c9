//! Role-gated extractors.
//!
//! Each wraps [`AuthUser`] and answers 403 when the caller's role is not in
//! its allow-list:
//!
//! | Extractor              | Roles                           |
//! |------------------------|---------------------------------|
//! | `RequireAuth`          | any                             |
//! | `RequireAdmin`         | admin                           |
//! | `RequireStaff`         | admin, staff                    |
//! | `RequireTeacher`       | admin, staff, teacher           |
//! | `RequireBusinessOwner` | admin, business_owner           |
//! | `RequireStudent`       | student                         |

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use backoffice_core::roles::{
    ROLE_ADMIN, ROLE_BUSINESS_OWNER, ROLE_STAFF, ROLE_STUDENT, ROLE_TEACHER,
};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

macro_rules! role_extractor {
    ($(#[$meta:meta])* $name:ident, [$($role:expr),+], $message:literal) => {
        $(#[$meta])*
        pub struct $name(pub AuthUser);

        impl FromRequestParts<AppState> for $name {
            type Rejection = AppError;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &AppState,
            ) -> Result<Self, Self::Rejection> {
                let user = AuthUser::from_request_parts(parts, state).await?;
                if !user.has_any_role(&[$($role),+]) {
                    return Err(AppError::forbidden($message));
                }
                Ok($name(user))
            }
        }
    };
}

/// Any authenticated caller, named for readability in handler signatures.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        AuthUser::from_request_parts(parts, state).await.map(RequireAuth)
    }
}

role_extractor!(RequireAdmin, [ROLE_ADMIN], "Admin role required");

role_extractor!(
    /// School office staff.
    RequireStaff,
    [ROLE_ADMIN, ROLE_STAFF],
    "Staff or Admin role required"
);

role_extractor!(
    RequireTeacher,
    [ROLE_ADMIN, ROLE_STAFF, ROLE_TEACHER],
    "Teacher, Staff or Admin role required"
);

role_extractor!(
    /// Restaurant management. Handlers still scope owners to their business.
    RequireBusinessOwner,
    [ROLE_ADMIN, ROLE_BUSINESS_OWNER],
    "Business owner or Admin role required"
);

role_extractor!(RequireStudent, [ROLE_STUDENT], "Student role required");
