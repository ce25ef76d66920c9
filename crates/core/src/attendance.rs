//! Attendance QR sessions: code expiry, present/late classification,
//! finalization defaults, and attendance percentages.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// Attendance status IDs matching `attendance_statuses` seed data.
pub const ATTENDANCE_PRESENT: i16 = 1;
pub const ATTENDANCE_ABSENT: i16 = 2;
pub const ATTENDANCE_LATE: i16 = 3;
pub const ATTENDANCE_EXCUSED: i16 = 4;

/// Finalization status IDs matching `finalization_statuses` seed data.
pub const FINALIZATION_DRAFT: i16 = 1;
pub const FINALIZATION_FINAL: i16 = 2;

/// Attendance type IDs matching `attendance_types` seed data.
pub const ATTENDANCE_TYPE_QR: i16 = 1;
pub const ATTENDANCE_TYPE_MANUAL: i16 = 2;

/// How long a freshly issued QR code stays valid.
pub const QR_VALIDITY_MINUTES: i64 = 15;

/// Scans later than this after session start are recorded as late.
pub const LATE_AFTER_MINUTES: i64 = 10;

pub const MSG_INVALID_QR: &str = "Invalid or expired QR code";
pub const MSG_QR_EXPIRED: &str = "QR code has expired";
pub const MSG_REGENERATE_FINALIZED: &str = "Cannot regenerate QR code for finalized session";
pub const MSG_STUDENT_NOT_IN_SESSION: &str = "Student not found in this attendance session";
pub const MSG_SESSION_FINALIZED: &str = "Attendance session is already finalized";

/// Expiry timestamp for a QR code issued at `issued_at`.
pub fn qr_expiry(issued_at: DateTime<Utc>) -> DateTime<Utc> {
    issued_at + Duration::minutes(QR_VALIDITY_MINUTES)
}

/// A code is expired strictly after its expiry instant.
pub fn is_qr_expired(expiry: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > expiry
}

/// Combine a session date with the schedule's start time.
pub fn session_start(date: NaiveDate, start_time: NaiveTime) -> DateTime<Utc> {
    date.and_time(start_time).and_utc()
}

/// Status recorded for a QR scan at `scanned_at`.
pub fn scan_status(session_start: DateTime<Utc>, scanned_at: DateTime<Utc>) -> i16 {
    if scanned_at - session_start > Duration::minutes(LATE_AFTER_MINUTES) {
        ATTENDANCE_LATE
    } else {
        ATTENDANCE_PRESENT
    }
}

/// Status a row receives when its session is finalized.
pub fn finalized_status(current: Option<i16>) -> i16 {
    current.unwrap_or(ATTENDANCE_ABSENT)
}

/// Present and late both count toward attendance.
pub fn counts_as_attended(status_id: i16) -> bool {
    matches!(status_id, ATTENDANCE_PRESENT | ATTENDANCE_LATE)
}

pub fn validate_status(status_id: i16) -> Result<(), String> {
    if (ATTENDANCE_PRESENT..=ATTENDANCE_EXCUSED).contains(&status_id) {
        Ok(())
    } else {
        Err(format!("Invalid attendance status id {status_id}"))
    }
}

pub fn validate_type(type_id: i16) -> Result<(), String> {
    if matches!(type_id, ATTENDANCE_TYPE_QR | ATTENDANCE_TYPE_MANUAL) {
        Ok(())
    } else {
        Err(format!("Invalid attendance type id {type_id}"))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Attendance percentage over `total` finalized sessions.
///
/// A student with no sessions yet has a perfect record.
pub fn attendance_percentage(attended: i64, total: i64) -> f64 {
    if total <= 0 {
        return 100.0;
    }
    round2(attended as f64 / total as f64 * 100.0)
}

/// Mean of per-course percentages, 100 when there are none.
pub fn average_percentage(percentages: &[f64]) -> f64 {
    if percentages.is_empty() {
        return 100.0;
    }
    round2(percentages.iter().sum::<f64>() / percentages.len() as f64)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, h, m, 0).unwrap()
    }

    #[test]
    fn qr_expires_after_fifteen_minutes() {
        let expiry = qr_expiry(t(8, 0));
        assert_eq!(expiry, t(8, 15));
        assert!(!is_qr_expired(expiry, t(8, 15)));
        assert!(is_qr_expired(expiry, t(8, 16)));
    }

    #[test]
    fn session_start_combines_date_and_time() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let time = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert_eq!(session_start(date, time), t(8, 0));
    }

    #[test]
    fn early_and_on_time_scans_are_present() {
        assert_eq!(scan_status(t(8, 0), t(7, 55)), ATTENDANCE_PRESENT);
        assert_eq!(scan_status(t(8, 0), t(8, 10)), ATTENDANCE_PRESENT);
    }

    #[test]
    fn late_scans_are_late() {
        assert_eq!(scan_status(t(8, 0), t(8, 11)), ATTENDANCE_LATE);
    }

    #[test]
    fn finalize_defaults_unset_to_absent() {
        assert_eq!(finalized_status(None), ATTENDANCE_ABSENT);
        assert_eq!(finalized_status(Some(ATTENDANCE_LATE)), ATTENDANCE_LATE);
    }

    #[test]
    fn attended_statuses() {
        assert!(counts_as_attended(ATTENDANCE_PRESENT));
        assert!(counts_as_attended(ATTENDANCE_LATE));
        assert!(!counts_as_attended(ATTENDANCE_ABSENT));
        assert!(!counts_as_attended(ATTENDANCE_EXCUSED));
    }

    #[test]
    fn status_and_type_validation() {
        assert!(validate_status(ATTENDANCE_EXCUSED).is_ok());
        assert!(validate_status(9).is_err());
        assert!(validate_type(ATTENDANCE_TYPE_MANUAL).is_ok());
        assert!(validate_type(0).is_err());
    }

    #[test]
    fn percentage_without_sessions_is_full() {
        assert_eq!(attendance_percentage(0, 0), 100.0);
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(attendance_percentage(2, 3), 66.67);
        assert_eq!(attendance_percentage(3, 4), 75.0);
    }

    #[test]
    fn average_of_courses() {
        assert_eq!(average_percentage(&[]), 100.0);
        assert_eq!(average_percentage(&[80.0, 90.0]), 85.0);
    }
}
