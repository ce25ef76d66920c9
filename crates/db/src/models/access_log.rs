//! HTTP access log rows.

use backoffice_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccessLog {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub user_role: Option<String>,
    pub http_method: String,
    pub endpoint: String,
    pub query_string: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub status_code: i32,
    pub response_time_ms: i64,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
}

/// One request as seen by the access-log middleware.
#[derive(Debug, Clone)]
pub struct CreateAccessLog {
    pub user_id: Option<DbId>,
    pub user_role: Option<String>,
    pub http_method: String,
    pub endpoint: String,
    pub query_string: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub status_code: i32,
    pub response_time_ms: i64,
    pub error_message: Option<String>,
}
