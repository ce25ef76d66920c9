//! Payment status constants and transitions.

/// Payment status IDs matching `payment_statuses` seed data (1-based SMALLSERIAL).
pub const PAYMENT_PENDING: i16 = 1;
pub const PAYMENT_COMPLETED: i16 = 2;
pub const PAYMENT_FAILED: i16 = 3;
pub const PAYMENT_REFUNDED: i16 = 4;

/// Accepted payment method codes.
pub const VALID_METHODS: &[&str] = &["CASH", "BANK_TRANSFER", "CARD", "WALLET", "OTHER"];

/// Validate and normalise a payment method code.
pub fn normalize_method(method: &str) -> Result<String, String> {
    let upper = method.trim().to_ascii_uppercase();
    if VALID_METHODS.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(format!(
            "Invalid payment method '{method}'. Must be one of: {}",
            VALID_METHODS.join(", ")
        ))
    }
}

pub mod state_machine {
    use super::*;

    /// Status IDs reachable from `from_status`.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            PAYMENT_PENDING => &[PAYMENT_COMPLETED, PAYMENT_FAILED],
            PAYMENT_COMPLETED => &[PAYMENT_REFUNDED],
            _ => &[],
        }
    }

    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if valid_transitions(from).contains(&to) {
            Ok(())
        } else {
            Err(format!(
                "Invalid payment transition: {} -> {}",
                status_name(from),
                status_name(to)
            ))
        }
    }

    fn status_name(id: i16) -> &'static str {
        match id {
            PAYMENT_PENDING => "Pending",
            PAYMENT_COMPLETED => "Completed",
            PAYMENT_FAILED => "Failed",
            PAYMENT_REFUNDED => "Refunded",
            _ => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::state_machine::*;
    use super::*;

    #[test]
    fn method_is_normalized() {
        assert_eq!(normalize_method(" card ").unwrap(), "CARD");
        assert!(normalize_method("bitcoin").is_err());
    }

    #[test]
    fn pending_can_complete_or_fail() {
        assert!(validate_transition(PAYMENT_PENDING, PAYMENT_COMPLETED).is_ok());
        assert!(validate_transition(PAYMENT_PENDING, PAYMENT_FAILED).is_ok());
    }

    #[test]
    fn only_completed_can_refund() {
        assert!(validate_transition(PAYMENT_COMPLETED, PAYMENT_REFUNDED).is_ok());
        assert!(validate_transition(PAYMENT_PENDING, PAYMENT_REFUNDED).is_err());
    }

    #[test]
    fn terminal_states_are_final() {
        assert!(valid_transitions(PAYMENT_FAILED).is_empty());
        assert!(valid_transitions(PAYMENT_REFUNDED).is_empty());
        let err = validate_transition(PAYMENT_REFUNDED, PAYMENT_COMPLETED).unwrap_err();
        assert_eq!(err, "Invalid payment transition: Refunded -> Completed");
    }
}
