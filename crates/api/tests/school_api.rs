//! Classes, schedules, QR attendance, scoring and surveys.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_auth, post_auth, post_json_auth, put_json_auth};
use serde_json::{json, Value};
use sqlx::PgPool;

struct School {
    staff: String,
    teacher: String,
    teacher_id: i64,
    student: String,
    student_id: i64,
    class_id: i64,
}

/// One class with one student, a teacher and an office account.
async fn seed_school(pool: &PgPool, test: &common::TestApp) -> School {
    let (_, staff) = common::user_with_token(pool, "office", "staff", None).await;
    let (teacher, teacher_token) = common::user_with_token(pool, "mrsmith", "teacher", None).await;

    let response = post_json_auth(
        test.app(),
        "/api/v1/classes",
        &staff,
        json!({ "code": "10a", "name": "Tenth grade A", "academic_year": "2026-2027" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let class = body_json(response).await;
    assert_eq!(class["code"], "10A");
    let class_id = class["id"].as_i64().unwrap();

    let student = common::create_user(pool, "pupil", "student", None, Some(class_id)).await;

    School {
        staff,
        teacher: teacher_token,
        teacher_id: teacher.id,
        student: common::token_for(&student),
        student_id: student.id,
        class_id,
    }
}

async fn create_schedule(test: &common::TestApp, school: &School) -> Value {
    let response = post_json_auth(
        test.app(),
        "/api/v1/schedules",
        &school.staff,
        json!({
            "class_id": school.class_id,
            "teacher_id": school.teacher_id,
            "course_name": "Algebra",
            "credits": 3,
            "day_of_week": 1,
            "start_time": "08:00:00",
            "end_time": "09:30:00",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn schedule_rejects_inverted_times(pool: PgPool) {
    let test = common::build_test_app(pool.clone());
    let school = seed_school(&pool, &test).await;

    let response = post_json_auth(
        test.app(),
        "/api/v1/schedules",
        &school.staff,
        json!({
            "class_id": school.class_id,
            "teacher_id": school.teacher_id,
            "course_name": "History",
            "day_of_week": 2,
            "start_time": "10:00:00",
            "end_time": "09:00:00",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let students = get_auth(
        test.app(),
        &format!("/api/v1/classes/{}/students", school.class_id),
        &school.teacher,
    )
    .await;
    assert_eq!(students.status(), StatusCode::OK);
    let students = body_json(students).await;
    assert_eq!(students["data"][0]["id"], school.student_id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn class_with_schedules_cannot_be_deleted(pool: PgPool) {
    let test = common::build_test_app(pool.clone());
    let school = seed_school(&pool, &test).await;
    create_schedule(&test, &school).await;

    let response = common::delete_auth(
        test.app(),
        &format!("/api/v1/classes/{}", school.class_id),
        &school.staff,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn qr_attendance_flow(pool: PgPool) {
    let test = common::build_test_app(pool.clone());
    let school = seed_school(&pool, &test).await;
    let schedule = create_schedule(&test, &school).await;
    let body = json!({ "schedule_id": schedule["id"] });

    let opened =
        post_json_auth(test.app(), "/api/v1/attendance-sessions", &school.teacher, body.clone())
            .await;
    assert_eq!(opened.status(), StatusCode::CREATED);
    let session = body_json(opened).await;
    assert_eq!(session["attendances"].as_array().unwrap().len(), 1);
    let qr_code = session["qr_code"].as_str().unwrap().to_string();

    // Reopening the same day returns the same draft.
    let reopened =
        post_json_auth(test.app(), "/api/v1/attendance-sessions", &school.teacher, body).await;
    assert_eq!(reopened.status(), StatusCode::OK);
    assert_eq!(body_json(reopened).await["id"], session["id"]);

    let unknown = post_json_auth(
        test.app(),
        "/api/v1/attendance/scan",
        &school.student,
        json!({ "qr_code": "not-a-code" }),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let scan = json!({ "qr_code": qr_code });
    let first = post_json_auth(test.app(), "/api/v1/attendance/scan", &school.student, scan.clone())
        .await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    let status = first["status_id"].as_i64().unwrap();
    assert!(status == 1 || status == 3, "present or late, got {status}");
    assert_eq!(first["attendance_type_id"], 1);

    let repeat = post_json_auth(test.app(), "/api/v1/attendance/scan", &school.student, scan.clone())
        .await;
    assert_eq!(repeat.status(), StatusCode::OK);
    assert_eq!(body_json(repeat).await["status_id"], first["status_id"]);

    let session_id = session["id"].as_i64().unwrap();
    let finalized = post_auth(
        test.app(),
        &format!("/api/v1/attendance-sessions/{session_id}/finalize"),
        &school.teacher,
    )
    .await;
    assert_eq!(finalized.status(), StatusCode::OK);
    assert_eq!(body_json(finalized).await["finalization_status_id"], 2);

    let late_scan = post_json_auth(test.app(), "/api/v1/attendance/scan", &school.student, scan).await;
    assert_eq!(late_scan.status(), StatusCode::CONFLICT);

    let regenerate = post_auth(
        test.app(),
        &format!("/api/v1/attendance-sessions/{session_id}/regenerate-qr"),
        &school.teacher,
    )
    .await;
    assert_eq!(regenerate.status(), StatusCode::CONFLICT);

    let percentage = get_auth(
        test.app(),
        &format!("/api/v1/attendance/students/{}/percentage", school.student_id),
        &school.student,
    )
    .await;
    assert_eq!(percentage.status(), StatusCode::OK);
    let percentage = body_json(percentage).await;
    assert_eq!(percentage["data"]["total"], 1);
    assert_eq!(percentage["data"]["attended"], 1);

    let report = get_auth(
        test.app(),
        &format!("/api/v1/attendance/students/{}/report", school.student_id),
        &school.student,
    )
    .await;
    assert_eq!(report.status(), StatusCode::OK);
    let report = body_json(report).await;
    assert_eq!(report["data"]["courses"][0]["course_name"], "Algebra");
    assert_eq!(report["data"]["average_percentage"], 100.0);

    let class = get_auth(
        test.app(),
        &format!("/api/v1/attendance/classes/{}/report", school.class_id),
        &school.teacher,
    )
    .await;
    assert_eq!(class.status(), StatusCode::OK);
    let class = body_json(class).await;
    assert_eq!(class["data"]["class_id"], school.class_id);
    assert_eq!(class["data"]["students"][0]["student_id"], school.student_id);
}

/// Move a session's start (and optionally its QR expiry) relative to now.
async fn shift_session(pool: &PgPool, session_id: i64, started_mins_ago: i32, qr_expired: bool) {
    sqlx::query(
        "UPDATE attendance_sessions
         SET started_at = NOW() - make_interval(mins => $2),
             qr_expires_at = CASE WHEN $3 THEN NOW() - INTERVAL '1 minute'
                                  ELSE NOW() + INTERVAL '15 minutes' END
         WHERE id = $1",
    )
    .bind(session_id)
    .bind(started_mins_ago)
    .bind(qr_expired)
    .execute(pool)
    .await
    .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn scan_time_decides_present_late_or_expired(pool: PgPool) {
    let test = common::build_test_app(pool.clone());
    let school = seed_school(&pool, &test).await;
    let early = common::create_user(&pool, "early", "student", None, Some(school.class_id)).await;
    let tardy = common::create_user(&pool, "tardy", "student", None, Some(school.class_id)).await;
    let schedule = create_schedule(&test, &school).await;

    let opened = post_json_auth(
        test.app(),
        "/api/v1/attendance-sessions",
        &school.teacher,
        json!({ "schedule_id": schedule["id"] }),
    )
    .await;
    assert_eq!(opened.status(), StatusCode::CREATED);
    let session = body_json(opened).await;
    let session_id = session["id"].as_i64().unwrap();
    let scan = json!({ "qr_code": session["qr_code"] });

    // Inside the ten-minute window.
    shift_session(&pool, session_id, 9, false).await;
    let on_time = post_json_auth(
        test.app(),
        "/api/v1/attendance/scan",
        &common::token_for(&early),
        scan.clone(),
    )
    .await;
    assert_eq!(on_time.status(), StatusCode::OK);
    assert_eq!(body_json(on_time).await["status_id"], 1);

    // Past the window but while the code is still valid.
    shift_session(&pool, session_id, 11, false).await;
    let late = post_json_auth(
        test.app(),
        "/api/v1/attendance/scan",
        &common::token_for(&tardy),
        scan.clone(),
    )
    .await;
    assert_eq!(late.status(), StatusCode::OK);
    assert_eq!(body_json(late).await["status_id"], 3);

    shift_session(&pool, session_id, 20, true).await;
    let expired = post_json_auth(test.app(), "/api/v1/attendance/scan", &school.student, scan).await;
    assert_eq!(expired.status(), StatusCode::BAD_REQUEST);
    let body = body_json(expired).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"], "QR code has expired");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn other_teacher_cannot_open_session(pool: PgPool) {
    let test = common::build_test_app(pool.clone());
    let school = seed_school(&pool, &test).await;
    let schedule = create_schedule(&test, &school).await;
    let (_, intruder) = common::user_with_token(&pool, "mrjones", "teacher", None).await;

    let response = post_json_auth(
        test.app(),
        "/api/v1/attendance-sessions",
        &intruder,
        json!({ "schedule_id": schedule["id"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn other_teacher_cannot_read_session(pool: PgPool) {
    let test = common::build_test_app(pool.clone());
    let school = seed_school(&pool, &test).await;
    let schedule = create_schedule(&test, &school).await;
    let (_, intruder) = common::user_with_token(&pool, "mrjones", "teacher", None).await;

    let opened = post_json_auth(
        test.app(),
        "/api/v1/attendance-sessions",
        &school.teacher,
        json!({ "schedule_id": schedule["id"] }),
    )
    .await;
    let session_uri = format!("/api/v1/attendance-sessions/{}", body_json(opened).await["id"]);

    let own = get_auth(test.app(), &session_uri, &school.teacher).await;
    assert_eq!(own.status(), StatusCode::OK);
    assert_eq!(body_json(own).await["attendances"].as_array().unwrap().len(), 1);

    let foreign = get_auth(test.app(), &session_uri, &intruder).await;
    assert_eq!(foreign.status(), StatusCode::FORBIDDEN);

    // Office staff may read any session.
    let office = get_auth(test.app(), &session_uri, &school.staff).await;
    assert_eq!(office.status(), StatusCode::OK);

    let missing = get_auth(test.app(), "/api/v1/attendance-sessions/999999", &school.teacher).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn scoring_review_flow(pool: PgPool) {
    let test = common::build_test_app(pool.clone());
    let school = seed_school(&pool, &test).await;
    let schedule = create_schedule(&test, &school).await;

    let created = post_json_auth(
        test.app(),
        "/api/v1/score-sessions",
        &school.teacher,
        json!({ "schedule_id": schedule["id"] }),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let session = body_json(created).await;
    let session_id = session["id"].as_i64().unwrap();
    let score_id = session["scores"][0]["id"].as_i64().unwrap();

    // Assignment is capped by its default weight of 20.
    let over = put_json_auth(
        test.app(),
        &format!("/api/v1/student-scores/{score_id}"),
        &school.teacher,
        json!({ "assignment_score": 25.0 }),
    )
    .await;
    assert_eq!(over.status(), StatusCode::BAD_REQUEST);

    let scored = put_json_auth(
        test.app(),
        &format!("/api/v1/student-scores/{score_id}"),
        &school.teacher,
        json!({ "assignment_score": 18.0, "midterm_score": 27.0, "final_score": 36.0 }),
    )
    .await;
    assert_eq!(scored.status(), StatusCode::OK);
    assert_eq!(body_json(scored).await["assignment_score"], 18.0);

    // Nothing is visible to the student before approval.
    let hidden = get_auth(
        test.app(),
        &format!("/api/v1/students/{}/scores", school.student_id),
        &school.student,
    )
    .await;
    assert_eq!(body_json(hidden).await["data"].as_array().unwrap().len(), 0);

    let session_uri = format!("/api/v1/score-sessions/{session_id}");
    let submitted =
        put_json_auth(test.app(), &session_uri, &school.teacher, json!({ "status_id": 2 })).await;
    assert_eq!(submitted.status(), StatusCode::OK);

    let locked = put_json_auth(
        test.app(),
        &format!("/api/v1/student-scores/{score_id}"),
        &school.teacher,
        json!({ "final_score": 40.0 }),
    )
    .await;
    assert_eq!(locked.status(), StatusCode::CONFLICT);

    let self_approve =
        put_json_auth(test.app(), &session_uri, &school.teacher, json!({ "status_id": 3 })).await;
    assert_eq!(self_approve.status(), StatusCode::FORBIDDEN);

    let approved =
        put_json_auth(test.app(), &session_uri, &school.staff, json!({ "status_id": 3 })).await;
    assert_eq!(approved.status(), StatusCode::OK);

    let transcript = get_auth(
        test.app(),
        &format!("/api/v1/students/{}/transcript", school.student_id),
        &school.student,
    )
    .await;
    assert_eq!(transcript.status(), StatusCode::OK);
    let transcript = body_json(transcript).await;
    let transcript = &transcript["data"];
    assert_eq!(transcript["courses"].as_array().unwrap().len(), 1);
    assert_eq!(transcript["total_credits"], 3);
    assert_eq!(transcript["courses"][0]["course_name"], "Algebra");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn survey_accepts_one_response_per_student(pool: PgPool) {
    let test = common::build_test_app(pool.clone());
    let school = seed_school(&pool, &test).await;

    let created = post_json_auth(
        test.app(),
        "/api/v1/surveys",
        &school.staff,
        json!({
            "title": "Course feedback",
            "sections": [{
                "title": "Teaching",
                "questions": [
                    { "prompt": "How clear were the lessons?", "question_type": "rating" },
                    { "prompt": "Anything else?", "question_type": "TEXT", "is_required": false },
                ],
            }],
        }),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let survey = body_json(created).await;
    let survey_id = survey["id"].as_i64().unwrap();
    let rating_id = survey["sections"][0]["questions"][0]["id"].as_i64().unwrap();
    let text_id = survey["sections"][0]["questions"][1]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/surveys/{survey_id}/responses");

    let missing = post_json_auth(
        test.app(),
        &uri,
        &school.student,
        json!({ "answers": [{ "question_id": text_id, "text_answer": "Great" }] }),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let out_of_range = post_json_auth(
        test.app(),
        &uri,
        &school.student,
        json!({ "answers": [{ "question_id": rating_id, "rating": 9 }] }),
    )
    .await;
    assert_eq!(out_of_range.status(), StatusCode::BAD_REQUEST);

    let answers = json!({ "answers": [{ "question_id": rating_id, "rating": 4 }] });
    let accepted = post_json_auth(test.app(), &uri, &school.student, answers.clone()).await;
    assert_eq!(accepted.status(), StatusCode::CREATED);

    let duplicate = post_json_auth(test.app(), &uri, &school.student, answers).await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let report = get_auth(
        test.app(),
        &format!("/api/v1/surveys/{survey_id}/report"),
        &school.staff,
    )
    .await;
    assert_eq!(report.status(), StatusCode::OK);
    let report = body_json(report).await;
    assert_eq!(report["data"]["response_count"], 1);
}
