//! Attendance session and attendance row models.

use backoffice_core::types::{DbId, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `attendance_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttendanceSession {
    pub id: DbId,
    pub schedule_id: DbId,
    pub teacher_id: DbId,
    pub session_date: NaiveDate,
    pub started_at: Timestamp,
    pub qr_code: String,
    pub qr_expires_at: Timestamp,
    pub finalization_status_id: StatusId,
    pub finalized_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `attendances` table. `status_id` stays `None` until the
/// student scans or the session is finalized.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attendance {
    pub id: DbId,
    pub session_id: DbId,
    pub student_id: DbId,
    pub status_id: Option<StatusId>,
    pub attendance_type_id: Option<StatusId>,
    pub finalization_status_id: StatusId,
    pub recorded_at: Option<Timestamp>,
    pub comment: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionWithAttendances {
    #[serde(flatten)]
    pub session: AttendanceSession,
    pub attendances: Vec<Attendance>,
}

#[derive(Debug, Clone)]
pub struct CreateAttendanceSession {
    pub schedule_id: DbId,
    pub teacher_id: DbId,
    pub session_date: NaiveDate,
    pub started_at: Timestamp,
    pub qr_code: String,
    pub qr_expires_at: Timestamp,
}

/// Manual edit of one attendance row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAttendance {
    pub status_id: Option<StatusId>,
    pub attendance_type_id: Option<StatusId>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionFilter {
    pub schedule_id: Option<DbId>,
    pub class_id: Option<DbId>,
    pub finalization_status_id: Option<StatusId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceFilter {
    pub student_id: Option<DbId>,
    pub session_id: Option<DbId>,
    pub status_id: Option<StatusId>,
}

/// Per-student counts over finalized sessions, used for percentages.
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceTally {
    pub student_id: DbId,
    pub attended: i64,
    pub total: i64,
}

/// One student's counts within a single schedule.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduleTally {
    pub schedule_id: DbId,
    pub course_name: String,
    pub attended: i64,
    pub total: i64,
}
