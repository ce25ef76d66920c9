//! Repository for the `schedules` table.

use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::DbId;
use sqlx::PgPool;

use crate::models::schedule::{CreateSchedule, Schedule, ScheduleFilter, UpdateSchedule};

const COLUMNS: &str = "id, class_id, teacher_id, course_name, credits, day_of_week, start_time, \
                       end_time, room, created_at, updated_at";

pub struct ScheduleRepo;

impl ScheduleRepo {
    pub async fn create(pool: &PgPool, input: &CreateSchedule) -> Result<Schedule, sqlx::Error> {
        let query = format!(
            "INSERT INTO schedules
                (class_id, teacher_id, course_name, credits, day_of_week, start_time, end_time, room)
             VALUES ($1, $2, $3, COALESCE($4, 3), $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(input.class_id)
            .bind(input.teacher_id)
            .bind(&input.course_name)
            .bind(input.credits)
            .bind(input.day_of_week)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(&input.room)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Schedule>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM schedules WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Schedule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &ScheduleFilter,
        page: PageRequest,
    ) -> Result<Page<Schedule>, sqlx::Error> {
        let conditions = "deleted_at IS NULL
            AND ($1::BIGINT IS NULL OR class_id = $1)
            AND ($2::BIGINT IS NULL OR teacher_id = $2)";
        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM schedules WHERE {conditions}"))
                .bind(filter.class_id)
                .bind(filter.teacher_id)
                .fetch_one(pool)
                .await?;
        let query = format!(
            "SELECT {COLUMNS} FROM schedules WHERE {conditions}
             ORDER BY day_of_week, start_time, id LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, Schedule>(&query)
            .bind(filter.class_id)
            .bind(filter.teacher_id)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSchedule,
    ) -> Result<Option<Schedule>, sqlx::Error> {
        let query = format!(
            "UPDATE schedules SET
                teacher_id = COALESCE($2, teacher_id),
                course_name = COALESCE($3, course_name),
                credits = COALESCE($4, credits),
                day_of_week = COALESCE($5, day_of_week),
                start_time = COALESCE($6, start_time),
                end_time = COALESCE($7, end_time),
                room = COALESCE($8, room)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(id)
            .bind(input.teacher_id)
            .bind(&input.course_name)
            .bind(input.credits)
            .bind(input.day_of_week)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(&input.room)
            .fetch_optional(pool)
            .await
    }

    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE schedules SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
