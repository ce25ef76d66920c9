//! Payment model and DTOs.

use backoffice_core::types::{Cents, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `payments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: DbId,
    pub business_id: DbId,
    pub plan_id: Option<DbId>,
    pub subscription_id: Option<DbId>,
    pub amount_cents: Cents,
    pub method: String,
    pub status_id: StatusId,
    pub reference_number: String,
    pub notes: Option<String>,
    pub paid_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert DTO. `method` and `reference_number` are already normalised.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub business_id: DbId,
    pub plan_id: Option<DbId>,
    pub subscription_id: Option<DbId>,
    pub amount_cents: Cents,
    pub method: String,
    pub status_id: StatusId,
    pub reference_number: String,
    pub notes: Option<String>,
    pub created_by: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePayment {
    pub amount_cents: Option<Cents>,
    pub method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFilter {
    pub business_id: Option<DbId>,
    pub subscription_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    pub method: Option<String>,
}
