//! Human-readable reference codes for payments, orders, and chat linking.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Characters used in random code suffixes (no `0/O` or `1/I` ambiguity).
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of the random suffix in payment and order references.
pub const REFERENCE_SUFFIX_LEN: usize = 6;

/// Length of a Telegram chat link code.
pub const LINK_CODE_LEN: usize = 8;

/// Generate `len` random characters from [`CODE_CHARSET`].
pub fn random_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// Build a dated reference such as `PAY-20261019-7KQ2MX`.
pub fn dated_reference(prefix: &str, at: DateTime<Utc>) -> String {
    format!(
        "{prefix}-{}-{}",
        at.format("%Y%m%d"),
        random_code(REFERENCE_SUFFIX_LEN)
    )
}

/// Payment reference number.
pub fn payment_reference(at: DateTime<Utc>) -> String {
    dated_reference("PAY", at)
}

/// Order number.
pub fn order_number(at: DateTime<Utc>) -> String {
    dated_reference("ORD", at)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn random_code_has_requested_length_and_charset() {
        let code = random_code(LINK_CODE_LEN);
        assert_eq!(code.len(), LINK_CODE_LEN);
        assert!(code.bytes().all(|b| CODE_CHARSET.contains(&b)));
    }

    #[test]
    fn payment_reference_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        let reference = payment_reference(at);
        assert!(reference.starts_with("PAY-20261019-"));
        assert_eq!(reference.len(), "PAY-20261019-".len() + REFERENCE_SUFFIX_LEN);
    }

    #[test]
    fn order_number_format() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        assert!(order_number(at).starts_with("ORD-20260102-"));
    }
}
