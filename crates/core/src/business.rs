//! Business subdomain rules.

/// Subdomain status IDs matching `subdomain_statuses` seed data.
pub const SUBDOMAIN_ACTIVE: i16 = 1;
pub const SUBDOMAIN_EXPIRED: i16 = 2;
pub const SUBDOMAIN_SUSPENDED: i16 = 3;

pub const SUBDOMAIN_MIN_LEN: usize = 3;
pub const SUBDOMAIN_MAX_LEN: usize = 63;

/// Subdomains that would collide with platform hosts.
const RESERVED_SUBDOMAINS: &[&str] = &["www", "api", "admin", "app", "mail"];

/// Validate a subdomain label: lowercase ASCII letters, digits and hyphens,
/// no leading or trailing hyphen.
pub fn validate_subdomain(subdomain: &str) -> Result<(), String> {
    let len = subdomain.len();
    if !(SUBDOMAIN_MIN_LEN..=SUBDOMAIN_MAX_LEN).contains(&len) {
        return Err(format!(
            "Subdomain must be between {SUBDOMAIN_MIN_LEN} and {SUBDOMAIN_MAX_LEN} characters"
        ));
    }
    if !subdomain
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(
            "Subdomain may only contain lowercase letters, digits, and hyphens".to_string(),
        );
    }
    if subdomain.starts_with('-') || subdomain.ends_with('-') {
        return Err("Subdomain must not start or end with a hyphen".to_string());
    }
    if RESERVED_SUBDOMAINS.contains(&subdomain) {
        return Err(format!("Subdomain '{subdomain}' is reserved"));
    }
    Ok(())
}

/// Normalise user input before validation.
pub fn normalize_subdomain(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Status the subdomain should move to given whether the business currently
/// holds an active subscription. `None` means leave it alone.
///
/// Suspended subdomains are an admin decision and are never changed here.
pub fn subdomain_sync_target(current: i16, has_active_subscription: bool) -> Option<i16> {
    match (current, has_active_subscription) {
        (SUBDOMAIN_ACTIVE, false) => Some(SUBDOMAIN_EXPIRED),
        (SUBDOMAIN_EXPIRED, true) => Some(SUBDOMAIN_ACTIVE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_labels() {
        assert!(validate_subdomain("noodle-house").is_ok());
        assert!(validate_subdomain("cafe42").is_ok());
    }

    #[test]
    fn rejects_bad_characters_and_hyphens() {
        assert!(validate_subdomain("Cafe").is_err());
        assert!(validate_subdomain("cafe_1").is_err());
        assert!(validate_subdomain("-cafe").is_err());
        assert!(validate_subdomain("cafe-").is_err());
    }

    #[test]
    fn rejects_length_and_reserved() {
        assert!(validate_subdomain("ab").is_err());
        assert!(validate_subdomain(&"a".repeat(64)).is_err());
        assert!(validate_subdomain("admin").unwrap_err().contains("reserved"));
    }

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize_subdomain("  Noodle-House "), "noodle-house");
    }

    #[test]
    fn sync_target_transitions() {
        assert_eq!(
            subdomain_sync_target(SUBDOMAIN_ACTIVE, false),
            Some(SUBDOMAIN_EXPIRED)
        );
        assert_eq!(
            subdomain_sync_target(SUBDOMAIN_EXPIRED, true),
            Some(SUBDOMAIN_ACTIVE)
        );
        assert_eq!(subdomain_sync_target(SUBDOMAIN_ACTIVE, true), None);
        assert_eq!(subdomain_sync_target(SUBDOMAIN_SUSPENDED, true), None);
        assert_eq!(subdomain_sync_target(SUBDOMAIN_SUSPENDED, false), None);
    }
}
