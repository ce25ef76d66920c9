//! First-run admin account creation.

use backoffice_core::roles::ROLE_ADMIN;
use backoffice_db::models::user::CreateUser;
use backoffice_db::repositories::UserRepo;
use backoffice_db::DbPool;

use crate::auth::password::hash_password;
use crate::config::AdminBootstrap;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Role '{0}' is missing from seed data")]
    MissingRole(&'static str),

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

/// Create the configured admin account unless an active admin already exists.
///
/// Returns `true` when an account was created.
pub async fn ensure_admin(
    pool: &DbPool,
    admin: &Option<AdminBootstrap>,
) -> Result<bool, BootstrapError> {
    let Some(admin) = admin else {
        return Ok(false);
    };

    if UserRepo::admin_exists(pool).await? {
        tracing::debug!("Admin account present, skipping bootstrap");
        return Ok(false);
    }

    let role_id = UserRepo::role_id_by_name(pool, ROLE_ADMIN)
        .await?
        .ok_or(BootstrapError::MissingRole(ROLE_ADMIN))?;

    let password_hash =
        hash_password(&admin.password).map_err(|e| BootstrapError::Hash(e.to_string()))?;

    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password_hash,
            role_id,
            full_name: None,
            phone: None,
            business_id: None,
            class_id: None,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "Bootstrap admin created");
    Ok(true)
}
