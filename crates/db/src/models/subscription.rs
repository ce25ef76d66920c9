//! Subscription model, DTOs, and filter parameters.

use backoffice_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `subscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subscription {
    pub id: DbId,
    pub business_id: DbId,
    pub plan_id: DbId,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub is_active: bool,
    pub auto_renew: bool,
    pub notes: Option<String>,
    pub renewed_from_id: Option<DbId>,
    pub last_expiry_warning_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert DTO. Dates are computed by the caller from the plan.
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub business_id: DbId,
    pub plan_id: DbId,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub auto_renew: bool,
    pub notes: Option<String>,
    pub renewed_from_id: Option<DbId>,
}

/// Partial update applied with COALESCE semantics.
#[derive(Debug, Clone, Default)]
pub struct UpdateSubscription {
    pub plan_id: Option<DbId>,
    pub end_date: Option<Timestamp>,
    pub is_active: Option<bool>,
    pub auto_renew: Option<bool>,
    pub notes: Option<String>,
}

/// List filters for `GET /subscriptions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionFilter {
    pub business_id: Option<DbId>,
    pub plan_id: Option<DbId>,
    pub is_active: Option<bool>,
    /// `true` only rows past their end date, `false` only rows not yet ended.
    pub expired: Option<bool>,
}

/// Subscription joined with its plan and business names.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubscriptionDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub subscription: Subscription,
    pub plan_name: String,
    pub business_name: String,
}

/// Usage snapshot for one subscription.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionUsage {
    pub subscription_id: DbId,
    pub business_id: DbId,
    pub plan_name: String,
    pub pricing_display: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub days_remaining: i64,
    pub is_active: bool,
    pub is_expired: bool,
    pub auto_renew: bool,
}
