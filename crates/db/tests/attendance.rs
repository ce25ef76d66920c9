//! QR attendance sessions: roster creation, first-scan-wins, finalization.

use backoffice_core::attendance::{ATTENDANCE_ABSENT, ATTENDANCE_LATE, ATTENDANCE_PRESENT};
use backoffice_db::models::attendance::CreateAttendanceSession;
use backoffice_db::models::class::CreateClass;
use backoffice_db::models::schedule::CreateSchedule;
use backoffice_db::models::status::FinalizationStatus;
use backoffice_db::models::user::CreateUser;
use backoffice_db::repositories::{AttendanceRepo, ClassRepo, ScheduleRepo, UserRepo};
use chrono::{Duration, NaiveTime, Utc};
use sqlx::PgPool;

struct Fixture {
    class_id: i64,
    schedule_id: i64,
    teacher_id: i64,
    students: Vec<i64>,
}

async fn user(pool: &PgPool, username: &str, role: &str, class_id: Option<i64>) -> i64 {
    let role_id = UserRepo::role_id_by_name(pool, role).await.unwrap().unwrap();
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@school.test"),
            password_hash: "hash".to_string(),
            role_id,
            full_name: None,
            phone: None,
            business_id: None,
            class_id,
        },
    )
    .await
    .unwrap()
    .id
}

async fn fixture(pool: &PgPool) -> Fixture {
    let class = ClassRepo::create(
        pool,
        &CreateClass {
            code: "CS-1".to_string(),
            name: "Computer Science 1".to_string(),
            academic_year: Some("2026".to_string()),
        },
    )
    .await
    .unwrap();
    let teacher_id = user(pool, "teacher", "teacher", None).await;
    let s1 = user(pool, "s1", "student", Some(class.id)).await;
    let s2 = user(pool, "s2", "student", Some(class.id)).await;
    let schedule = ScheduleRepo::create(
        pool,
        &CreateSchedule {
            class_id: class.id,
            teacher_id,
            course_name: "Databases".to_string(),
            credits: None,
            day_of_week: 1,
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            room: None,
        },
    )
    .await
    .unwrap();
    Fixture {
        class_id: class.id,
        schedule_id: schedule.id,
        teacher_id,
        students: vec![s1, s2],
    }
}

fn new_session(f: &Fixture, qr: &str) -> CreateAttendanceSession {
    let now = Utc::now();
    CreateAttendanceSession {
        schedule_id: f.schedule_id,
        teacher_id: f.teacher_id,
        session_date: now.date_naive(),
        started_at: now,
        qr_code: qr.to_string(),
        qr_expires_at: now + Duration::minutes(15),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_session_created_with_empty_roster(pool: PgPool) {
    let f = fixture(&pool).await;
    let created = AttendanceRepo::create_with_roster(&pool, &new_session(&f, "qr-1"), &f.students)
        .await
        .unwrap();

    assert_eq!(created.attendances.len(), 2);
    assert!(created.attendances.iter().all(|a| a.status_id.is_none()));

    let draft = AttendanceRepo::find_draft_for_day(&pool, f.schedule_id, Utc::now().date_naive())
        .await
        .unwrap();
    assert_eq!(draft.map(|s| s.id), Some(created.session.id));

    // Only one DRAFT session per schedule and day.
    let err = AttendanceRepo::create_with_roster(&pool, &new_session(&f, "qr-2"), &f.students)
        .await
        .unwrap_err();
    assert_eq!(
        err.as_database_error().and_then(|e| e.constraint()),
        Some("uq_attendance_sessions_draft_per_day")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_first_scan_wins_and_finalize_defaults_absent(pool: PgPool) {
    let f = fixture(&pool).await;
    let created = AttendanceRepo::create_with_roster(&pool, &new_session(&f, "qr-1"), &f.students)
        .await
        .unwrap();
    let row = AttendanceRepo::find_for_student(&pool, created.session.id, f.students[0])
        .await
        .unwrap()
        .unwrap();

    let scanned = AttendanceRepo::record_scan(&pool, row.id, ATTENDANCE_PRESENT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(scanned.status_id, Some(ATTENDANCE_PRESENT));
    assert!(AttendanceRepo::record_scan(&pool, row.id, ATTENDANCE_LATE)
        .await
        .unwrap()
        .is_none());

    let finalized = AttendanceRepo::finalize(&pool, created.session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        finalized.session.finalization_status_id,
        FinalizationStatus::Final.id()
    );
    let statuses: Vec<_> = finalized.attendances.iter().map(|a| a.status_id).collect();
    assert!(statuses.contains(&Some(ATTENDANCE_PRESENT)));
    assert!(statuses.contains(&Some(ATTENDANCE_ABSENT)));

    // Finalizing again keeps the original stamp.
    let again = AttendanceRepo::finalize(&pool, created.session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.session.finalized_at, finalized.session.finalized_at);

    // A finalized session cannot get a fresh QR code.
    let refused = AttendanceRepo::regenerate_qr(
        &pool,
        created.session.id,
        "qr-new",
        Utc::now() + Duration::minutes(15),
    )
    .await
    .unwrap();
    assert!(refused.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tallies_count_finalized_rows_only(pool: PgPool) {
    let f = fixture(&pool).await;
    let created = AttendanceRepo::create_with_roster(&pool, &new_session(&f, "qr-1"), &f.students)
        .await
        .unwrap();
    let row = AttendanceRepo::find_for_student(&pool, created.session.id, f.students[0])
        .await
        .unwrap()
        .unwrap();
    AttendanceRepo::record_scan(&pool, row.id, ATTENDANCE_LATE)
        .await
        .unwrap();

    let draft_tally = AttendanceRepo::tally_for_student(&pool, f.students[0], None, None, None)
        .await
        .unwrap();
    assert_eq!(draft_tally.total, 0);

    AttendanceRepo::finalize(&pool, created.session.id).await.unwrap();

    let tally = AttendanceRepo::tally_for_student(&pool, f.students[0], Some(f.schedule_id), None, None)
        .await
        .unwrap();
    assert_eq!((tally.attended, tally.total), (1, 1));

    let class = AttendanceRepo::tally_for_class(&pool, f.class_id, None).await.unwrap();
    assert_eq!(class.len(), 2);
    let absent = class.iter().find(|t| t.student_id == f.students[1]).unwrap();
    assert_eq!((absent.attended, absent.total), (0, 1));

    let by_schedule = AttendanceRepo::tally_by_schedule(&pool, f.students[0]).await.unwrap();
    assert_eq!(by_schedule.len(), 1);
    assert_eq!(by_schedule[0].course_name, "Databases");
}
