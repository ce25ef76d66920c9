//! Order and order item models.

use backoffice_core::types::{Cents, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `orders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: DbId,
    pub order_number: String,
    pub customer_id: Option<DbId>,
    pub business_id: DbId,
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_location: Option<String>,
    pub status_id: StatusId,
    pub customer_note: Option<String>,
    pub business_note: Option<String>,
    pub subtotal_cents: Cents,
    pub delivery_fee_cents: Cents,
    pub total_cents: Cents,
    pub payment_method: String,
    pub is_paid: bool,
    pub is_pos_order: bool,
    pub confirmed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `order_items` table. Name and price are snapshots.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: DbId,
    pub order_id: DbId,
    pub product_id: Option<DbId>,
    pub product_name: String,
    pub unit_price_cents: Cents,
    pub quantity: i32,
    pub line_total_cents: Cents,
    pub created_at: Timestamp,
}

/// Order with its items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Insert DTO for an order header.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub order_number: String,
    pub customer_id: Option<DbId>,
    pub business_id: DbId,
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_location: Option<String>,
    pub customer_note: Option<String>,
    pub subtotal_cents: Cents,
    pub delivery_fee_cents: Cents,
    pub payment_method: String,
    pub is_pos_order: bool,
}

/// One line to snapshot into `order_items`.
#[derive(Debug, Clone)]
pub struct CreateOrderItem {
    pub product_id: Option<DbId>,
    pub product_name: String,
    pub unit_price_cents: Cents,
    pub quantity: i32,
    pub line_total_cents: Cents,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub business_id: Option<DbId>,
    pub customer_id: Option<DbId>,
    pub status_id: Option<StatusId>,
}
