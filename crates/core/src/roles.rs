//! Well-known role name constants.
//!
//! These must match the seed data in `20261001000000_create_lookup_tables.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_BUSINESS_OWNER: &str = "business_owner";
pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_STAFF: &str = "staff";
pub const ROLE_TEACHER: &str = "teacher";
pub const ROLE_STUDENT: &str = "student";

/// Every role the platform knows about.
pub const ALL_ROLES: &[&str] = &[
    ROLE_ADMIN,
    ROLE_BUSINESS_OWNER,
    ROLE_CUSTOMER,
    ROLE_STAFF,
    ROLE_TEACHER,
    ROLE_STUDENT,
];

/// Validate that `role` is one of [`ALL_ROLES`].
pub fn validate_role(role: &str) -> Result<(), String> {
    if ALL_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(format!(
            "Invalid role '{role}'. Must be one of: {}",
            ALL_ROLES.join(", ")
        ))
    }
}
