//! Subscription plan model and DTOs.

use backoffice_core::subscription::pricing_display;
use backoffice_core::types::{Cents, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `subscription_plans` table.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionPlan {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: Cents,
    pub duration_days: i32,
    pub visibility_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Plan as returned by the API, with derived pricing fields.
#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: Cents,
    pub duration_days: i32,
    pub visibility_id: StatusId,
    pub is_free: bool,
    pub pricing_display: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<SubscriptionPlan> for PlanResponse {
    fn from(plan: SubscriptionPlan) -> Self {
        Self {
            is_free: plan.price_cents == 0,
            pricing_display: pricing_display(plan.price_cents, plan.duration_days),
            id: plan.id,
            name: plan.name,
            description: plan.description,
            price_cents: plan.price_cents,
            duration_days: plan.duration_days,
            visibility_id: plan.visibility_id,
            created_at: plan.created_at,
            updated_at: plan.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlan {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: Cents,
    pub duration_days: i32,
    /// Defaults to public.
    pub visibility_id: Option<StatusId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlan {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<Cents>,
    pub duration_days: Option<i32>,
    pub visibility_id: Option<StatusId>,
}
