//! Handlers for QR attendance sessions and attendance reports.
//!
//! A teacher opens a session for today's slot of a schedule; students scan
//! the rotating QR code; finalizing marks everyone who never scanned as
//! absent. Percentages count only finalized sessions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::attendance::{
    attendance_percentage, average_percentage, is_qr_expired, qr_expiry, scan_status,
    session_start, validate_status, validate_type, MSG_INVALID_QR, MSG_QR_EXPIRED,
    MSG_REGENERATE_FINALIZED, MSG_SESSION_FINALIZED, MSG_STUDENT_NOT_IN_SESSION,
};
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::roles::{ROLE_ADMIN, ROLE_STAFF, ROLE_STUDENT, ROLE_TEACHER};
use backoffice_core::types::DbId;
use backoffice_db::models::attendance::{
    Attendance, AttendanceFilter, AttendanceSession, CreateAttendanceSession,
    SessionFilter, SessionWithAttendances, UpdateAttendance,
};
use backoffice_db::models::schedule::Schedule;
use backoffice_db::models::status::{FinalizationStatus, StatusId};
use backoffice_db::repositories::{AttendanceRepo, ClassRepo, ScheduleRepo, UserRepo};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAuth, RequireStudent, RequireTeacher};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub schedule_id: DbId,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub qr_code: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionListParams {
    pub schedule_id: Option<DbId>,
    pub class_id: Option<DbId>,
    pub finalization_status_id: Option<StatusId>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceListParams {
    pub student_id: Option<DbId>,
    pub session_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PercentageParams {
    pub schedule_id: Option<DbId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ClassReportParams {
    pub schedule_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct StudentPercentage {
    pub student_id: DbId,
    pub schedule_id: Option<DbId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub attended: i64,
    pub total: i64,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct ClassReportRow {
    pub student_id: DbId,
    pub attended: i64,
    pub total: i64,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct ClassReport {
    pub class_id: DbId,
    pub schedule_id: Option<DbId>,
    pub students: Vec<ClassReportRow>,
}

#[derive(Debug, Serialize)]
pub struct CourseAttendance {
    pub schedule_id: DbId,
    pub course_name: String,
    pub attended: i64,
    pub total: i64,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct StudentReport {
    pub student_id: DbId,
    pub courses: Vec<CourseAttendance>,
    pub average_percentage: f64,
}

/// Teachers run sessions only for schedules they teach.
fn ensure_teaches(user: &AuthUser, schedule: &Schedule) -> AppResult<()> {
    if user.role == ROLE_TEACHER && schedule.teacher_id != user.user_id {
        return Err(AppError::forbidden("You do not teach this schedule"));
    }
    Ok(())
}

/// Students may read their own numbers; school staff read anyone's.
fn ensure_can_read_student(user: &AuthUser, student_id: DbId) -> AppResult<()> {
    if user.is_school_staff() || (user.role == ROLE_STUDENT && user.user_id == student_id) {
        Ok(())
    } else {
        Err(AppError::forbidden("You cannot view this student's attendance"))
    }
}

async fn load_session_for(
    state: &AppState,
    user: &AuthUser,
    id: DbId,
) -> AppResult<AttendanceSession> {
    let session = AttendanceRepo::find_session(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("AttendanceSession", id))?;
    if user.role == ROLE_TEACHER && session.teacher_id != user.user_id {
        return Err(AppError::forbidden("You do not teach this session"));
    }
    Ok(session)
}

fn is_final(status_id: StatusId) -> bool {
    status_id == FinalizationStatus::Final.id()
}

/// POST /api/v1/attendance-sessions
///
/// Reuses today's open session for the schedule, otherwise opens one with
/// a row per enrolled student.
pub async fn open_session(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Json(input): Json<OpenSessionRequest>,
) -> AppResult<(StatusCode, Json<SessionWithAttendances>)> {
    let schedule = ScheduleRepo::find_by_id(&state.pool, input.schedule_id)
        .await?
        .ok_or(AppError::not_found("Schedule", input.schedule_id))?;
    ensure_teaches(&user, &schedule)?;

    let now = Utc::now();
    let today = now.date_naive();
    if let Some(existing) =
        AttendanceRepo::find_draft_for_day(&state.pool, schedule.id, today).await?
    {
        let session = AttendanceRepo::find_with_attendances(&state.pool, existing.id)
            .await?
            .ok_or(AppError::not_found("AttendanceSession", existing.id))?;
        return Ok((StatusCode::OK, Json(session)));
    }

    let roster: Vec<DbId> = UserRepo::list_students_in_class(&state.pool, schedule.class_id)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();

    let session = AttendanceRepo::create_with_roster(
        &state.pool,
        &CreateAttendanceSession {
            schedule_id: schedule.id,
            teacher_id: schedule.teacher_id,
            session_date: today,
            started_at: session_start(today, schedule.start_time),
            qr_code: Uuid::new_v4().to_string(),
            qr_expires_at: qr_expiry(now),
        },
        &roster,
    )
    .await?;

    tracing::info!(
        session_id = session.session.id,
        schedule_id = schedule.id,
        students = roster.len(),
        "Attendance session opened"
    );
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /api/v1/attendance-sessions/{id}/regenerate-qr
pub async fn regenerate_qr(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Path(id): Path<DbId>,
) -> AppResult<Json<AttendanceSession>> {
    let session = load_session_for(&state, &user, id).await?;
    if is_final(session.finalization_status_id) {
        return Err(AppError::conflict(MSG_REGENERATE_FINALIZED));
    }

    let updated = AttendanceRepo::regenerate_qr(
        &state.pool,
        id,
        &Uuid::new_v4().to_string(),
        qr_expiry(Utc::now()),
    )
    .await?
    .ok_or_else(|| AppError::conflict(MSG_REGENERATE_FINALIZED))?;
    tracing::debug!(session_id = id, "QR code regenerated");
    Ok(Json(updated))
}

/// POST /api/v1/attendance/scan
///
/// A repeated scan returns the row unchanged; the first recorded status wins.
pub async fn scan(
    State(state): State<AppState>,
    RequireStudent(student): RequireStudent,
    Json(input): Json<ScanRequest>,
) -> AppResult<Json<Attendance>> {
    let now = Utc::now();
    let session = AttendanceRepo::find_session_by_qr(&state.pool, input.qr_code.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(MSG_INVALID_QR.into()))?;
    if is_qr_expired(session.qr_expires_at, now) {
        return Err(AppError::validation(MSG_QR_EXPIRED));
    }
    if is_final(session.finalization_status_id) {
        return Err(AppError::conflict(MSG_SESSION_FINALIZED));
    }

    let row = AttendanceRepo::find_for_student(&state.pool, session.id, student.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(MSG_STUDENT_NOT_IN_SESSION.into()))?;

    let status = scan_status(session.started_at, now);
    match AttendanceRepo::record_scan(&state.pool, row.id, status).await? {
        Some(recorded) => {
            tracing::info!(
                session_id = session.id,
                student_id = student.user_id,
                status_id = status,
                "Attendance scanned"
            );
            Ok(Json(recorded))
        }
        None => Ok(Json(row)),
    }
}

/// POST /api/v1/attendance-sessions/{id}/finalize
pub async fn finalize_session(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Path(id): Path<DbId>,
) -> AppResult<Json<SessionWithAttendances>> {
    load_session_for(&state, &user, id).await?;
    let session = AttendanceRepo::finalize(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("AttendanceSession", id))?;
    tracing::info!(
        session_id = id,
        rows = session.attendances.len(),
        "Attendance session finalized"
    );
    Ok(Json(session))
}

/// PUT /api/v1/attendance/{id}
pub async fn update_attendance(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAttendance>,
) -> AppResult<Json<Attendance>> {
    if let Some(status_id) = input.status_id {
        validate_status(status_id).map_err(AppError::validation)?;
    }
    if let Some(type_id) = input.attendance_type_id {
        validate_type(type_id).map_err(AppError::validation)?;
    }

    let row = AttendanceRepo::find_attendance(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Attendance", id))?;
    load_session_for(&state, &user, row.session_id).await?;
    if is_final(row.finalization_status_id) && !user.has_any_role(&[ROLE_ADMIN, ROLE_STAFF]) {
        return Err(AppError::forbidden(
            "Only staff can edit finalized attendance",
        ));
    }

    let updated = AttendanceRepo::update_attendance(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("Attendance", id))?;
    tracing::info!(attendance_id = id, editor_id = user.user_id, "Attendance edited");
    Ok(Json(updated))
}

/// GET /api/v1/attendance-sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    RequireTeacher(_user): RequireTeacher,
    Query(params): Query<SessionListParams>,
) -> AppResult<Json<DataResponse<Page<AttendanceSession>>>> {
    let filter = SessionFilter {
        schedule_id: params.schedule_id,
        class_id: params.class_id,
        finalization_status_id: params.finalization_status_id,
    };
    let page = PageRequest::new(params.page, params.size);
    let sessions = AttendanceRepo::list_sessions(&state.pool, &filter, page).await?;
    Ok(Json(DataResponse::new(sessions)))
}

/// GET /api/v1/attendance-sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Path(id): Path<DbId>,
) -> AppResult<Json<SessionWithAttendances>> {
    load_session_for(&state, &user, id).await?;
    let session = AttendanceRepo::find_with_attendances(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("AttendanceSession", id))?;
    Ok(Json(session))
}

/// GET /api/v1/attendance
///
/// Students only ever see their own rows.
pub async fn list_attendance(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<AttendanceListParams>,
) -> AppResult<Json<DataResponse<Page<Attendance>>>> {
    let student_id = if user.is_school_staff() {
        params.student_id
    } else if user.role == ROLE_STUDENT {
        Some(user.user_id)
    } else {
        return Err(AppError::forbidden("You cannot view attendance records"));
    };

    let filter = AttendanceFilter {
        student_id,
        session_id: params.session_id,
        status_id: params.status_id,
    };
    let page = PageRequest::new(params.page, params.size);
    let rows = AttendanceRepo::list_attendances(&state.pool, &filter, page).await?;
    Ok(Json(DataResponse::new(rows)))
}

/// GET /api/v1/attendance/students/{id}/percentage
pub async fn student_percentage(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(student_id): Path<DbId>,
    Query(params): Query<PercentageParams>,
) -> AppResult<Json<DataResponse<StudentPercentage>>> {
    ensure_can_read_student(&user, student_id)?;
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if from > to {
            return Err(AppError::validation("'from' must not be after 'to'"));
        }
    }

    let tally = AttendanceRepo::tally_for_student(
        &state.pool,
        student_id,
        params.schedule_id,
        params.from,
        params.to,
    )
    .await?;
    Ok(Json(DataResponse::new(StudentPercentage {
        student_id,
        schedule_id: params.schedule_id,
        from: params.from,
        to: params.to,
        attended: tally.attended,
        total: tally.total,
        percentage: attendance_percentage(tally.attended, tally.total),
    })))
}

/// GET /api/v1/attendance/classes/{id}/report
pub async fn class_report(
    State(state): State<AppState>,
    RequireTeacher(_user): RequireTeacher,
    Path(class_id): Path<DbId>,
    Query(params): Query<ClassReportParams>,
) -> AppResult<Json<DataResponse<ClassReport>>> {
    ClassRepo::find_by_id(&state.pool, class_id)
        .await?
        .ok_or(AppError::not_found("Class", class_id))?;
    let students = AttendanceRepo::tally_for_class(&state.pool, class_id, params.schedule_id)
        .await?
        .into_iter()
        .map(|t| ClassReportRow {
            student_id: t.student_id,
            attended: t.attended,
            total: t.total,
            percentage: attendance_percentage(t.attended, t.total),
        })
        .collect();
    Ok(Json(DataResponse::new(ClassReport {
        class_id,
        schedule_id: params.schedule_id,
        students,
    })))
}

/// GET /api/v1/attendance/students/{id}/report
pub async fn student_report(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(student_id): Path<DbId>,
) -> AppResult<Json<DataResponse<StudentReport>>> {
    ensure_can_read_student(&user, student_id)?;
    let courses: Vec<CourseAttendance> = AttendanceRepo::tally_by_schedule(&state.pool, student_id)
        .await?
        .into_iter()
        .map(|t| CourseAttendance {
            percentage: attendance_percentage(t.attended, t.total),
            schedule_id: t.schedule_id,
            course_name: t.course_name,
            attended: t.attended,
            total: t.total,
        })
        .collect();
    let percentages: Vec<f64> = courses.iter().map(|c| c.percentage).collect();
    Ok(Json(DataResponse::new(StudentReport {
        student_id,
        average_percentage: average_percentage(&percentages),
        courses,
    })))
}
