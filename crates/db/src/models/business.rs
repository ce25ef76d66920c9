//! Business (restaurant tenant) model and DTOs.

use backoffice_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `businesses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Business {
    pub id: DbId,
    pub name: String,
    pub subdomain: String,
    pub subdomain_status_id: StatusId,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub telegram_chat_id: Option<i64>,
    #[serde(skip_serializing)]
    pub telegram_link_code: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a business. `subdomain` must already be normalised.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBusiness {
    pub name: String,
    pub subdomain: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
}

/// DTO for updating a business. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBusiness {
    pub name: Option<String>,
    pub subdomain: Option<String>,
    pub subdomain_status_id: Option<StatusId>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

/// Subscription analytics for one business.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BusinessAnalytics {
    pub business_id: DbId,
    pub total_subscriptions: i64,
    pub active_subscriptions: i64,
    pub expired_subscriptions: i64,
    pub total_days_subscribed: i64,
    pub total_paid_cents: i64,
    pub current_plan_name: Option<String>,
    pub days_remaining: i64,
}
