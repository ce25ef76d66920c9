use backoffice_core::types::{DbId, Timestamp};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `schedules` table: one weekly course slot for a class.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Schedule {
    pub id: DbId,
    pub class_id: DbId,
    pub teacher_id: DbId,
    pub course_name: String,
    pub credits: i32,
    /// ISO weekday, Monday = 1.
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSchedule {
    pub class_id: DbId,
    pub teacher_id: DbId,
    pub course_name: String,
    pub credits: Option<i32>,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSchedule {
    pub teacher_id: Option<DbId>,
    pub course_name: Option<String>,
    pub credits: Option<i32>,
    pub day_of_week: Option<i16>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub room: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleFilter {
    pub class_id: Option<DbId>,
    pub teacher_id: Option<DbId>,
}
