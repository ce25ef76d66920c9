//! User entity model and DTOs.

use backoffice_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash. Use [`UserResponse`] for API output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: DbId,
    /// Role name joined from `roles`.
    pub role: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub business_id: Option<DbId>,
    pub class_id: Option<DbId>,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub username: String,
    pub email: String,
    /// Resolved role name (e.g. `"admin"`, `"student"`).
    pub role: String,
    pub role_id: DbId,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub business_id: Option<DbId>,
    pub class_id: Option<DbId>,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            role_id: user.role_id,
            full_name: user.full_name,
            phone: user.phone,
            business_id: user.business_id,
            class_id: user.class_id,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// Compact student listing used by class rosters.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentSummary {
    pub id: DbId,
    pub username: String,
    pub full_name: Option<String>,
    pub email: String,
    pub class_id: Option<DbId>,
}

/// DTO for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: DbId,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub business_id: Option<DbId>,
    pub class_id: Option<DbId>,
}

/// DTO for updating an existing user. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role_id: Option<DbId>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub business_id: Option<DbId>,
    pub class_id: Option<DbId>,
    pub is_active: Option<bool>,
}

/// List filters for `GET /admin/users`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<String>,
    pub business_id: Option<DbId>,
    pub class_id: Option<DbId>,
    /// Case-insensitive match on username, email, or full name.
    pub search: Option<String>,
}
