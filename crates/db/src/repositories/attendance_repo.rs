//! Repository for `attendance_sessions` and `attendances`.
//!
//! A session and its per-student rows move from DRAFT to FINAL together.
//! Percentages only ever count finalized rows.

use backoffice_core::attendance::{ATTENDANCE_ABSENT, ATTENDANCE_LATE, ATTENDANCE_PRESENT};
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::{DbId, Timestamp};
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::attendance::{
    Attendance, AttendanceFilter, AttendanceSession, AttendanceTally, CreateAttendanceSession,
    ScheduleTally, SessionFilter, SessionWithAttendances, UpdateAttendance,
};
use crate::models::status::{AttendanceType, FinalizationStatus, StatusId};

const SESSION_COLUMNS: &str = "id, schedule_id, teacher_id, session_date, started_at, qr_code, \
                               qr_expires_at, finalization_status_id, finalized_at, \
                               created_at, updated_at";

const ATTENDANCE_COLUMNS: &str = "id, session_id, student_id, status_id, attendance_type_id, \
                                  finalization_status_id, recorded_at, comment, \
                                  created_at, updated_at";

pub struct AttendanceRepo;

impl AttendanceRepo {
    /// The DRAFT session for a schedule on a given day, if one is open.
    pub async fn find_draft_for_day(
        pool: &PgPool,
        schedule_id: DbId,
        date: NaiveDate,
    ) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM attendance_sessions
             WHERE schedule_id = $1 AND session_date = $2 AND finalization_status_id = $3"
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(schedule_id)
            .bind(date)
            .bind(FinalizationStatus::Draft.id())
            .fetch_optional(pool)
            .await
    }

    /// Create a session plus one empty DRAFT row per student, atomically.
    pub async fn create_with_roster(
        pool: &PgPool,
        input: &CreateAttendanceSession,
        student_ids: &[DbId],
    ) -> Result<SessionWithAttendances, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO attendance_sessions
                (schedule_id, teacher_id, session_date, started_at, qr_code, qr_expires_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SESSION_COLUMNS}"
        );
        let session = sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(input.schedule_id)
            .bind(input.teacher_id)
            .bind(input.session_date)
            .bind(input.started_at)
            .bind(&input.qr_code)
            .bind(input.qr_expires_at)
            .fetch_one(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO attendances (session_id, student_id)
             SELECT $1, student_id FROM UNNEST($2::BIGINT[]) AS t(student_id)
             RETURNING {ATTENDANCE_COLUMNS}"
        );
        let mut attendances = sqlx::query_as::<_, Attendance>(&query)
            .bind(session.id)
            .bind(student_ids)
            .fetch_all(&mut *tx)
            .await?;
        attendances.sort_by_key(|a| a.student_id);

        tx.commit().await?;
        Ok(SessionWithAttendances {
            session,
            attendances,
        })
    }

    pub async fn find_session(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query = format!("SELECT {SESSION_COLUMNS} FROM attendance_sessions WHERE id = $1");
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_session_by_qr(
        pool: &PgPool,
        qr_code: &str,
    ) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query = format!("SELECT {SESSION_COLUMNS} FROM attendance_sessions WHERE qr_code = $1");
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(qr_code)
            .fetch_optional(pool)
            .await
    }

    pub async fn attendances(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        let query = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances WHERE session_id = $1 ORDER BY student_id"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_with_attendances(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<SessionWithAttendances>, sqlx::Error> {
        let Some(session) = Self::find_session(pool, id).await? else {
            return Ok(None);
        };
        let attendances = Self::attendances(pool, id).await?;
        Ok(Some(SessionWithAttendances {
            session,
            attendances,
        }))
    }

    /// Replace the QR code of a DRAFT session. `None` when the session is
    /// missing or already final.
    pub async fn regenerate_qr(
        pool: &PgPool,
        id: DbId,
        qr_code: &str,
        expires_at: Timestamp,
    ) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query = format!(
            "UPDATE attendance_sessions SET qr_code = $2, qr_expires_at = $3
             WHERE id = $1 AND finalization_status_id = $4
             RETURNING {SESSION_COLUMNS}"
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(id)
            .bind(qr_code)
            .bind(expires_at)
            .bind(FinalizationStatus::Draft.id())
            .fetch_optional(pool)
            .await
    }

    pub async fn find_for_student(
        pool: &PgPool,
        session_id: DbId,
        student_id: DbId,
    ) -> Result<Option<Attendance>, sqlx::Error> {
        let query = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances WHERE session_id = $1 AND student_id = $2"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(session_id)
            .bind(student_id)
            .fetch_optional(pool)
            .await
    }

    /// Record a QR scan. Only the first scan sets a status; later scans
    /// return `None` and leave the row unchanged.
    pub async fn record_scan(
        pool: &PgPool,
        attendance_id: DbId,
        status_id: StatusId,
    ) -> Result<Option<Attendance>, sqlx::Error> {
        let query = format!(
            "UPDATE attendances SET status_id = $2, attendance_type_id = $3, recorded_at = NOW()
             WHERE id = $1 AND status_id IS NULL
             RETURNING {ATTENDANCE_COLUMNS}"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(attendance_id)
            .bind(status_id)
            .bind(AttendanceType::Qr.id())
            .fetch_optional(pool)
            .await
    }

    /// Finalize a session: unset rows become ABSENT and everything turns FINAL.
    /// Re-finalizing is a no-op apart from returning the current state.
    pub async fn finalize(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Option<SessionWithAttendances>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE attendance_sessions SET
                finalization_status_id = $2,
                finalized_at = COALESCE(finalized_at, NOW())
             WHERE id = $1
             RETURNING {SESSION_COLUMNS}"
        );
        let Some(session) = sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(session_id)
            .bind(FinalizationStatus::Final.id())
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let query = format!(
            "UPDATE attendances SET
                status_id = COALESCE(status_id, $2),
                finalization_status_id = $3
             WHERE session_id = $1
             RETURNING {ATTENDANCE_COLUMNS}"
        );
        let mut attendances = sqlx::query_as::<_, Attendance>(&query)
            .bind(session_id)
            .bind(ATTENDANCE_ABSENT)
            .bind(FinalizationStatus::Final.id())
            .fetch_all(&mut *tx)
            .await?;
        attendances.sort_by_key(|a| a.student_id);

        tx.commit().await?;
        Ok(Some(SessionWithAttendances {
            session,
            attendances,
        }))
    }

    pub async fn find_attendance(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Attendance>, sqlx::Error> {
        let query = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendances WHERE id = $1");
        sqlx::query_as::<_, Attendance>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Manual edit of one row; stamps `recorded_at`.
    pub async fn update_attendance(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAttendance,
    ) -> Result<Option<Attendance>, sqlx::Error> {
        let query = format!(
            "UPDATE attendances SET
                status_id = COALESCE($2, status_id),
                attendance_type_id = COALESCE($3, attendance_type_id, $5),
                comment = COALESCE($4, comment),
                recorded_at = NOW()
             WHERE id = $1
             RETURNING {ATTENDANCE_COLUMNS}"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(id)
            .bind(input.status_id)
            .bind(input.attendance_type_id)
            .bind(&input.comment)
            .bind(AttendanceType::Manual.id())
            .fetch_optional(pool)
            .await
    }

    /// Sessions, newest first. `class_id` filters through the schedule.
    pub async fn list_sessions(
        pool: &PgPool,
        filter: &SessionFilter,
        page: PageRequest,
    ) -> Result<Page<AttendanceSession>, sqlx::Error> {
        let conditions = "($1::BIGINT IS NULL OR a.schedule_id = $1)
            AND ($2::BIGINT IS NULL OR s.class_id = $2)
            AND ($3::SMALLINT IS NULL OR a.finalization_status_id = $3)";
        let from = "attendance_sessions a JOIN schedules s ON s.id = a.schedule_id";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {from} WHERE {conditions}"))
                .bind(filter.schedule_id)
                .bind(filter.class_id)
                .bind(filter.finalization_status_id)
                .fetch_one(pool)
                .await?;

        let query = format!(
            "SELECT a.id, a.schedule_id, a.teacher_id, a.session_date, a.started_at, a.qr_code,
                    a.qr_expires_at, a.finalization_status_id, a.finalized_at,
                    a.created_at, a.updated_at
             FROM {from} WHERE {conditions}
             ORDER BY a.session_date DESC, a.started_at DESC, a.id DESC
             LIMIT $4 OFFSET $5"
        );
        let items = sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(filter.schedule_id)
            .bind(filter.class_id)
            .bind(filter.finalization_status_id)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    /// Attendance history, newest first.
    pub async fn list_attendances(
        pool: &PgPool,
        filter: &AttendanceFilter,
        page: PageRequest,
    ) -> Result<Page<Attendance>, sqlx::Error> {
        let conditions = "($1::BIGINT IS NULL OR student_id = $1)
            AND ($2::BIGINT IS NULL OR session_id = $2)
            AND ($3::SMALLINT IS NULL OR status_id = $3)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM attendances WHERE {conditions}"))
                .bind(filter.student_id)
                .bind(filter.session_id)
                .bind(filter.status_id)
                .fetch_one(pool)
                .await?;

        let query = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances WHERE {conditions}
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
        let items = sqlx::query_as::<_, Attendance>(&query)
            .bind(filter.student_id)
            .bind(filter.session_id)
            .bind(filter.status_id)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    /// Finalized counts for one student, optionally narrowed to a schedule
    /// and an inclusive date range.
    pub async fn tally_for_student(
        pool: &PgPool,
        student_id: DbId,
        schedule_id: Option<DbId>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<AttendanceTally, sqlx::Error> {
        sqlx::query_as::<_, AttendanceTally>(
            "SELECT $1::BIGINT AS student_id,
                    COUNT(*) FILTER (WHERE at.status_id IN ($6, $7)) AS attended,
                    COUNT(*) AS total
             FROM attendances at
             JOIN attendance_sessions a ON a.id = at.session_id
             WHERE at.student_id = $1 AND at.finalization_status_id = $5
               AND ($2::BIGINT IS NULL OR a.schedule_id = $2)
               AND ($3::DATE IS NULL OR a.session_date >= $3)
               AND ($4::DATE IS NULL OR a.session_date <= $4)",
        )
        .bind(student_id)
        .bind(schedule_id)
        .bind(from)
        .bind(to)
        .bind(FinalizationStatus::Final.id())
        .bind(ATTENDANCE_PRESENT)
        .bind(ATTENDANCE_LATE)
        .fetch_one(pool)
        .await
    }

    /// Finalized counts for every active student of a class. Students with
    /// no finalized rows appear with zero totals.
    pub async fn tally_for_class(
        pool: &PgPool,
        class_id: DbId,
        schedule_id: Option<DbId>,
    ) -> Result<Vec<AttendanceTally>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceTally>(
            "SELECT u.id AS student_id,
                    COUNT(at.id) FILTER (WHERE at.status_id IN ($4, $5)) AS attended,
                    COUNT(at.id) AS total
             FROM users u
             JOIN roles r ON r.id = u.role_id AND r.name = 'student'
             LEFT JOIN attendances at
                    ON at.student_id = u.id AND at.finalization_status_id = $3
                   AND EXISTS (
                       SELECT 1 FROM attendance_sessions a
                       JOIN schedules s ON s.id = a.schedule_id
                       WHERE a.id = at.session_id AND s.class_id = $1
                         AND ($2::BIGINT IS NULL OR a.schedule_id = $2)
                   )
             WHERE u.class_id = $1 AND u.deleted_at IS NULL AND u.is_active
             GROUP BY u.id
             ORDER BY u.id",
        )
        .bind(class_id)
        .bind(schedule_id)
        .bind(FinalizationStatus::Final.id())
        .bind(ATTENDANCE_PRESENT)
        .bind(ATTENDANCE_LATE)
        .fetch_all(pool)
        .await
    }

    /// One student's finalized counts broken down by schedule.
    pub async fn tally_by_schedule(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<Vec<ScheduleTally>, sqlx::Error> {
        sqlx::query_as::<_, ScheduleTally>(
            "SELECT s.id AS schedule_id, s.course_name,
                    COUNT(*) FILTER (WHERE at.status_id IN ($3, $4)) AS attended,
                    COUNT(*) AS total
             FROM attendances at
             JOIN attendance_sessions a ON a.id = at.session_id
             JOIN schedules s ON s.id = a.schedule_id
             WHERE at.student_id = $1 AND at.finalization_status_id = $2
             GROUP BY s.id, s.course_name
             ORDER BY s.course_name, s.id",
        )
        .bind(student_id)
        .bind(FinalizationStatus::Final.id())
        .bind(ATTENDANCE_PRESENT)
        .bind(ATTENDANCE_LATE)
        .fetch_all(pool)
        .await
    }
}
