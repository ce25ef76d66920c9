//! Subscription lifecycle arithmetic and bulk-operation bookkeeping.
//!
//! Date math, note formatting, and the decision rules used by the expiry
//! sweep live here so handlers and background jobs agree on them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::types::{Cents, DbId};

/// How many days ahead the sweep warns about upcoming expiry.
pub const EXPIRY_WARNING_DAYS: i64 = 7;

/// Extension length used by bulk `EXTEND` when the reason carries no number.
pub const DEFAULT_EXTEND_DAYS: i64 = 30;

/// Largest single extension accepted.
pub const MAX_EXTEND_DAYS: i64 = 3650;

/// Longest plan or renewal period, in days.
pub const MAX_DURATION_DAYS: i32 = 3650;

pub const MSG_ALREADY_ACTIVE: &str =
    "Business already has an active subscription. Cancel existing subscription first.";
pub const MSG_REACTIVATE_EXPIRED: &str =
    "Cannot reactivate expired subscription. Please renew instead.";

/// End of a subscription that starts at `start` and lasts `duration_days`.
pub fn end_date(start: DateTime<Utc>, duration_days: i32) -> Result<DateTime<Utc>, String> {
    shift_days(start, i64::from(duration_days))
}

/// `at` moved by `days`, or an error when the result leaves the calendar range.
pub fn shift_days(at: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, String> {
    Duration::try_days(days)
        .and_then(|delta| at.checked_add_signed(delta))
        .ok_or_else(|| format!("Date out of range: {days} days from {}", at.date_naive()))
}

/// Plan and renewal lengths must fit `1..=MAX_DURATION_DAYS`.
pub fn validate_duration_days(days: i32) -> Result<(), String> {
    if !(1..=MAX_DURATION_DAYS).contains(&days) {
        return Err(format!(
            "Duration must be between 1 and {MAX_DURATION_DAYS} days, got {days}"
        ));
    }
    Ok(())
}

/// A subscription is expired once its end date is in the past.
pub fn is_expired(end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    end < now
}

/// Active and not yet past its end date.
pub fn is_current(is_active: bool, end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    is_active && !is_expired(end, now)
}

/// Whole days left before `end`, never negative.
pub fn days_remaining(end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (end - now).num_days().max(0)
}

/// A renewal starts where the old period ends, or now if that already passed.
pub fn renewal_start(previous_end: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    previous_end.max(now)
}

/// Append one line to a free-text notes field.
pub fn append_note(existing: Option<&str>, line: &str) -> String {
    match existing.map(str::trim_end) {
        Some(notes) if !notes.is_empty() => format!("{notes}\n{line}"),
        _ => line.to_string(),
    }
}

pub fn suspend_note(reason: &str) -> String {
    format!("SUSPENDED: {reason}")
}

pub fn extend_note(days: i64, reason: &str) -> String {
    format!("EXTENDED: {days} days - {reason}")
}

/// Validate an extension length in days.
pub fn validate_extend_days(days: i64) -> Result<(), String> {
    if !(1..=MAX_EXTEND_DAYS).contains(&days) {
        return Err(format!(
            "Extension must be between 1 and {MAX_EXTEND_DAYS} days, got {days}"
        ));
    }
    Ok(())
}

/// Read the day count for a bulk `EXTEND` from the leading integer of `reason`.
///
/// `"14 days goodwill"` yields 14; anything without a positive leading
/// number yields [`DEFAULT_EXTEND_DAYS`].
pub fn parse_extend_days(reason: Option<&str>) -> i64 {
    reason
        .map(str::trim_start)
        .map(|r| {
            r.chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
        })
        .and_then(|digits| digits.parse::<i64>().ok())
        .filter(|days| *days > 0)
        .unwrap_or(DEFAULT_EXTEND_DAYS)
}

/// Display price for a plan: `"Free"` or `"$12.50/30 days"`.
pub fn pricing_display(price_cents: Cents, duration_days: i32) -> String {
    if price_cents == 0 {
        return "Free".to_string();
    }
    format!(
        "${}.{:02}/{duration_days} days",
        price_cents / 100,
        price_cents % 100
    )
}

/// What the expiry sweep does with one expired, still-active subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryAction {
    Renew,
    Deactivate,
}

pub fn expiry_action(auto_renew: bool) -> ExpiryAction {
    if auto_renew {
        ExpiryAction::Renew
    } else {
        ExpiryAction::Deactivate
    }
}

// ---------------------------------------------------------------------------
// Bulk operations
// ---------------------------------------------------------------------------

/// Action applied to every id in a bulk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkAction {
    Cancel,
    Suspend,
    Reactivate,
    Extend,
    Renew,
}

impl BulkAction {
    pub fn as_str(self) -> &'static str {
        match self {
            BulkAction::Cancel => "CANCEL",
            BulkAction::Suspend => "SUSPEND",
            BulkAction::Reactivate => "REACTIVATE",
            BulkAction::Extend => "EXTEND",
            BulkAction::Renew => "RENEW",
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulkAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CANCEL" => Ok(BulkAction::Cancel),
            "SUSPEND" => Ok(BulkAction::Suspend),
            "REACTIVATE" => Ok(BulkAction::Reactivate),
            "EXTEND" => Ok(BulkAction::Extend),
            "RENEW" => Ok(BulkAction::Renew),
            other => Err(format!(
                "Invalid bulk action '{other}'. Must be one of: CANCEL, SUSPEND, REACTIVATE, EXTEND, RENEW"
            )),
        }
    }
}

/// Outcome of a bulk request. Failures are collected, never fatal.
#[derive(Debug, Clone, Serialize)]
pub struct BulkSummary {
    pub action: BulkAction,
    pub total_requested: usize,
    pub successful: usize,
    pub errors: usize,
    pub successful_ids: Vec<DbId>,
    pub error_messages: Vec<String>,
}

impl BulkSummary {
    pub fn new(action: BulkAction, total_requested: usize) -> Self {
        Self {
            action,
            total_requested,
            successful: 0,
            errors: 0,
            successful_ids: Vec::new(),
            error_messages: Vec::new(),
        }
    }

    pub fn record_success(&mut self, id: DbId) {
        self.successful += 1;
        self.successful_ids.push(id);
    }

    pub fn record_failure(&mut self, id: DbId, message: impl fmt::Display) {
        self.errors += 1;
        self.error_messages
            .push(format!("Subscription {id}: {message}"));
    }
}

/// Outcome of one pass over expired subscriptions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpirySummary {
    pub total_expired: usize,
    pub processed: usize,
    pub renewed: usize,
    pub deactivated: usize,
    pub errors: usize,
    pub processed_ids: Vec<DbId>,
    pub error_messages: Vec<String>,
}

impl ExpirySummary {
    pub fn new(total_expired: usize) -> Self {
        Self {
            total_expired,
            ..Default::default()
        }
    }

    pub fn record(&mut self, id: DbId, action: ExpiryAction) {
        self.processed += 1;
        self.processed_ids.push(id);
        match action {
            ExpiryAction::Renew => self.renewed += 1,
            ExpiryAction::Deactivate => self.deactivated += 1,
        }
    }

    pub fn record_failure(&mut self, id: DbId, message: impl fmt::Display) {
        self.errors += 1;
        self.error_messages
            .push(format!("Subscription {id}: {message}"));
    }
}
