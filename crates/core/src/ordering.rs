//! Cart and order rules: quantities, totals, and the order status machine.

use crate::types::Cents;

/// Order status IDs matching `order_statuses` seed data (1-based SMALLSERIAL).
pub const ORDER_PENDING: i16 = 1;
pub const ORDER_CONFIRMED: i16 = 2;
pub const ORDER_PREPARING: i16 = 3;
pub const ORDER_READY: i16 = 4;
pub const ORDER_DELIVERED: i16 = 5;
pub const ORDER_CANCELLED: i16 = 6;
pub const ORDER_REJECTED: i16 = 7;

/// Largest quantity of one product on a single cart line.
pub const MAX_LINE_QUANTITY: i32 = 99;

/// Upper bound for a product price and for a delivery fee.
pub const MAX_PRICE_CENTS: Cents = 100_000_000;

pub const MSG_EMPTY_CART: &str = "Cannot create order from empty cart";
pub const MSG_GUEST_PHONE_REQUIRED: &str = "Phone number is required for guest orders";
pub const MSG_TOTAL_TOO_LARGE: &str = "Order total is too large";

pub fn validate_quantity(quantity: i32) -> Result<(), String> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(format!(
            "Quantity must be between 1 and {MAX_LINE_QUANTITY}, got {quantity}"
        ));
    }
    Ok(())
}

/// Prices and delivery fees must fit `0..=MAX_PRICE_CENTS`.
pub fn validate_price(cents: Cents) -> Result<(), String> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(format!(
            "Amount must be between 0 and {MAX_PRICE_CENTS} cents, got {cents}"
        ));
    }
    Ok(())
}

pub fn line_total(unit_price_cents: Cents, quantity: i32) -> Result<Cents, String> {
    unit_price_cents
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| MSG_TOTAL_TOO_LARGE.to_string())
}

/// Sum of `(unit_price_cents, quantity)` lines.
pub fn subtotal<I>(lines: I) -> Result<Cents, String>
where
    I: IntoIterator<Item = (Cents, i32)>,
{
    lines.into_iter().try_fold(0, |acc: Cents, (price, qty)| {
        acc.checked_add(line_total(price, qty)?)
            .ok_or_else(|| MSG_TOTAL_TOO_LARGE.to_string())
    })
}

/// Subtotal plus delivery fee.
pub fn order_total(subtotal_cents: Cents, delivery_fee_cents: Cents) -> Result<Cents, String> {
    subtotal_cents
        .checked_add(delivery_fee_cents)
        .ok_or_else(|| MSG_TOTAL_TOO_LARGE.to_string())
}

/// Orders the customer may still cancel themselves.
pub fn customer_can_cancel(status_id: i16) -> bool {
    matches!(status_id, ORDER_PENDING | ORDER_CONFIRMED)
}

/// Whether a transition into `to` stamps `confirmed_at` / `completed_at`.
pub fn stamps_confirmed(to: i16) -> bool {
    to == ORDER_CONFIRMED
}

pub fn stamps_completed(to: i16) -> bool {
    to == ORDER_DELIVERED
}

pub mod state_machine {
    use super::*;

    /// Status IDs reachable from `from_status`.
    ///
    /// Delivered, Cancelled and Rejected are terminal.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            ORDER_PENDING => &[ORDER_CONFIRMED, ORDER_REJECTED, ORDER_CANCELLED],
            ORDER_CONFIRMED => &[ORDER_PREPARING, ORDER_CANCELLED],
            ORDER_PREPARING => &[ORDER_READY],
            ORDER_READY => &[ORDER_DELIVERED],
            _ => &[],
        }
    }

    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!(
                "Invalid order transition: {} -> {}",
                status_name(from),
                status_name(to)
            ))
        }
    }

    fn status_name(id: i16) -> &'static str {
        match id {
            ORDER_PENDING => "Pending",
            ORDER_CONFIRMED => "Confirmed",
            ORDER_PREPARING => "Preparing",
            ORDER_READY => "Ready",
            ORDER_DELIVERED => "Delivered",
            ORDER_CANCELLED => "Cancelled",
            ORDER_REJECTED => "Rejected",
            _ => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::state_machine::*;
    use super::*;

    #[test]
    fn quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(100).is_err());
    }

    #[test]
    fn subtotal_sums_lines() {
        assert_eq!(subtotal(vec![(250, 2), (1000, 1)]), Ok(1500));
        assert_eq!(subtotal(Vec::new()), Ok(0));
    }

    #[test]
    fn oversized_lines_are_rejected() {
        assert_eq!(
            line_total(i64::MAX / 50, MAX_LINE_QUANTITY),
            Err(MSG_TOTAL_TOO_LARGE.to_string())
        );
        assert!(subtotal(vec![(i64::MAX / 50, 99)]).is_err());
        assert!(subtotal(vec![(i64::MAX / 2, 1), (i64::MAX / 2, 1), (2, 1)]).is_err());
        assert_eq!(
            line_total(MAX_PRICE_CENTS, MAX_LINE_QUANTITY),
            Ok(9_900_000_000)
        );
    }

    #[test]
    fn price_bounds() {
        assert!(validate_price(0).is_ok());
        assert!(validate_price(MAX_PRICE_CENTS).is_ok());
        assert!(validate_price(-1).is_err());
        assert!(validate_price(MAX_PRICE_CENTS + 1).is_err());
    }

    #[test]
    fn order_total_adds_fee() {
        assert_eq!(order_total(1500, 250), Ok(1750));
        assert!(order_total(i64::MAX, 1).is_err());
    }

    #[test]
    fn happy_path_transitions() {
        assert!(can_transition(ORDER_PENDING, ORDER_CONFIRMED));
        assert!(can_transition(ORDER_CONFIRMED, ORDER_PREPARING));
        assert!(can_transition(ORDER_PREPARING, ORDER_READY));
        assert!(can_transition(ORDER_READY, ORDER_DELIVERED));
    }

    #[test]
    fn rejection_only_from_pending() {
        assert!(can_transition(ORDER_PENDING, ORDER_REJECTED));
        assert!(!can_transition(ORDER_CONFIRMED, ORDER_REJECTED));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        for status in [ORDER_DELIVERED, ORDER_CANCELLED, ORDER_REJECTED] {
            assert!(valid_transitions(status).is_empty());
        }
    }

    #[test]
    fn invalid_transition_message() {
        let err = validate_transition(ORDER_READY, ORDER_CANCELLED).unwrap_err();
        assert_eq!(err, "Invalid order transition: Ready -> Cancelled");
    }

    #[test]
    fn customer_cancel_window() {
        assert!(customer_can_cancel(ORDER_PENDING));
        assert!(customer_can_cancel(ORDER_CONFIRMED));
        assert!(!customer_can_cancel(ORDER_PREPARING));
    }

    #[test]
    fn timestamps_follow_status() {
        assert!(stamps_confirmed(ORDER_CONFIRMED));
        assert!(stamps_completed(ORDER_DELIVERED));
        assert!(!stamps_completed(ORDER_READY));
    }
}
