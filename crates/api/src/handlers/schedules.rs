//! Handlers for `/schedules`: weekly course slots of a class.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::roles::ROLE_TEACHER;
use backoffice_core::types::DbId;
use backoffice_db::models::schedule::{CreateSchedule, Schedule, ScheduleFilter, UpdateSchedule};
use backoffice_db::repositories::{ClassRepo, ScheduleRepo, UserRepo};
use chrono::NaiveTime;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireStaff, RequireTeacher};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    pub class_id: DbId,
    pub teacher_id: DbId,
    #[validate(length(min = 1, max = 100))]
    pub course_name: String,
    #[validate(range(min = 0, max = 30))]
    pub credits: Option<i32>,
    #[validate(range(min = 1, max = 7))]
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[validate(length(max = 50))]
    pub room: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateScheduleRequest {
    pub teacher_id: Option<DbId>,
    #[validate(length(min = 1, max = 100))]
    pub course_name: Option<String>,
    #[validate(range(min = 0, max = 30))]
    pub credits: Option<i32>,
    #[validate(range(min = 1, max = 7))]
    pub day_of_week: Option<i16>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[validate(length(max = 50))]
    pub room: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleListParams {
    pub class_id: Option<DbId>,
    pub teacher_id: Option<DbId>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

fn check_times(start: NaiveTime, end: NaiveTime) -> AppResult<()> {
    if start >= end {
        return Err(AppError::validation("start_time must be before end_time"));
    }
    Ok(())
}

async fn ensure_teacher(state: &AppState, teacher_id: DbId) -> AppResult<()> {
    let user = UserRepo::find_by_id(&state.pool, teacher_id)
        .await?
        .ok_or(AppError::not_found("User", teacher_id))?;
    if user.role != ROLE_TEACHER {
        return Err(AppError::validation(format!(
            "User {teacher_id} is not a teacher"
        )));
    }
    Ok(())
}

/// POST /api/v1/schedules
pub async fn create_schedule(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Json(input): Json<CreateScheduleRequest>,
) -> AppResult<(StatusCode, Json<Schedule>)> {
    input.validate()?;
    check_times(input.start_time, input.end_time)?;
    ClassRepo::find_by_id(&state.pool, input.class_id)
        .await?
        .ok_or(AppError::not_found("Class", input.class_id))?;
    ensure_teacher(&state, input.teacher_id).await?;

    let schedule = ScheduleRepo::create(
        &state.pool,
        &CreateSchedule {
            class_id: input.class_id,
            teacher_id: input.teacher_id,
            course_name: input.course_name.trim().to_string(),
            credits: input.credits,
            day_of_week: input.day_of_week,
            start_time: input.start_time,
            end_time: input.end_time,
            room: input.room,
        },
    )
    .await?;
    tracing::info!(schedule_id = schedule.id, class_id = schedule.class_id, "Schedule created");
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// GET /api/v1/schedules
pub async fn list_schedules(
    State(state): State<AppState>,
    RequireTeacher(_user): RequireTeacher,
    Query(params): Query<ScheduleListParams>,
) -> AppResult<Json<DataResponse<Page<Schedule>>>> {
    let filter = ScheduleFilter {
        class_id: params.class_id,
        teacher_id: params.teacher_id,
    };
    let page = PageRequest::new(params.page, params.size);
    let schedules = ScheduleRepo::list(&state.pool, &filter, page).await?;
    Ok(Json(DataResponse::new(schedules)))
}

/// GET /api/v1/schedules/{id}
pub async fn get_schedule(
    State(state): State<AppState>,
    RequireTeacher(_user): RequireTeacher,
    Path(id): Path<DbId>,
) -> AppResult<Json<Schedule>> {
    let schedule = ScheduleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Schedule", id))?;
    Ok(Json(schedule))
}

/// PUT /api/v1/schedules/{id}
///
/// Times are checked against the stored values when only one side changes.
pub async fn update_schedule(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateScheduleRequest>,
) -> AppResult<Json<Schedule>> {
    input.validate()?;
    let current = ScheduleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Schedule", id))?;
    check_times(
        input.start_time.unwrap_or(current.start_time),
        input.end_time.unwrap_or(current.end_time),
    )?;
    if let Some(teacher_id) = input.teacher_id {
        ensure_teacher(&state, teacher_id).await?;
    }

    let schedule = ScheduleRepo::update(
        &state.pool,
        id,
        &UpdateSchedule {
            teacher_id: input.teacher_id,
            course_name: input.course_name.map(|n| n.trim().to_string()),
            credits: input.credits,
            day_of_week: input.day_of_week,
            start_time: input.start_time,
            end_time: input.end_time,
            room: input.room,
        },
    )
    .await?
    .ok_or(AppError::not_found("Schedule", id))?;
    Ok(Json(schedule))
}

/// DELETE /api/v1/schedules/{id}
pub async fn delete_schedule(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ScheduleRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Schedule", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
