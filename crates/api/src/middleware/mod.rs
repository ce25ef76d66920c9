//! Request extractors for authentication and role checks.
//!
//! - [`auth::AuthUser`] decodes the Bearer access token.
//! - [`rbac`] wraps it in role-gated extractors such as
//!   [`rbac::RequireAdmin`] and [`rbac::RequireTeacher`].
//! - [`access_log::record`] is a router layer, not an extractor.

pub mod access_log;
pub mod auth;
pub mod rbac;
