//! Shopping cart models.

use backoffice_core::types::{Cents, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `carts` table. One per (customer, business).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Cart {
    pub id: DbId,
    pub user_id: DbId,
    pub business_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A cart line joined with the current product data.
///
/// Prices are never stored on the cart; they always come from the product.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CartLine {
    pub id: DbId,
    pub cart_id: DbId,
    pub product_id: DbId,
    pub quantity: i32,
    pub product_name: String,
    pub unit_price_cents: Cents,
    /// False when the product was deleted or marked unavailable.
    pub is_available: bool,
}

/// Cart with its lines and computed totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart: Cart,
    pub items: Vec<CartLine>,
    pub item_count: i64,
    pub subtotal_cents: Cents,
    pub has_unavailable_items: bool,
}

impl CartView {
    /// Fails only when the subtotal does not fit in cents.
    pub fn new(cart: Cart, items: Vec<CartLine>) -> Result<Self, String> {
        let item_count = items.iter().map(|l| i64::from(l.quantity)).sum();
        let subtotal_cents = backoffice_core::ordering::subtotal(
            items
                .iter()
                .filter(|l| l.is_available)
                .map(|l| (l.unit_price_cents, l.quantity)),
        )?;
        let has_unavailable_items = items.iter().any(|l| !l.is_available);
        Ok(Self {
            cart,
            items,
            item_count,
            subtotal_cents,
            has_unavailable_items,
        })
    }
}
