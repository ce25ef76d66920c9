//! Handlers for `/classes`. Office staff manage; teachers read.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::pagination::Page;
use backoffice_core::types::DbId;
use backoffice_db::models::class::{Class, CreateClass, UpdateClass};
use backoffice_db::models::user::StudentSummary;
use backoffice_db::repositories::{ClassRepo, UserRepo};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireStaff, RequireTeacher};
use crate::query::PageParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 20))]
    pub academic_year: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClassRequest {
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 20))]
    pub academic_year: Option<String>,
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// POST /api/v1/classes
pub async fn create_class(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Json(input): Json<CreateClassRequest>,
) -> AppResult<(StatusCode, Json<Class>)> {
    input.validate()?;
    let class = ClassRepo::create(
        &state.pool,
        &CreateClass {
            code: normalize_code(&input.code),
            name: input.name.trim().to_string(),
            academic_year: input.academic_year,
        },
    )
    .await?;
    tracing::info!(class_id = class.id, code = %class.code, "Class created");
    Ok((StatusCode::CREATED, Json(class)))
}

/// GET /api/v1/classes
pub async fn list_classes(
    State(state): State<AppState>,
    RequireTeacher(_user): RequireTeacher,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<Class>>>> {
    let classes = ClassRepo::list(&state.pool, params.request()).await?;
    Ok(Json(DataResponse::new(classes)))
}

/// GET /api/v1/classes/{id}
pub async fn get_class(
    State(state): State<AppState>,
    RequireTeacher(_user): RequireTeacher,
    Path(id): Path<DbId>,
) -> AppResult<Json<Class>> {
    let class = ClassRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Class", id))?;
    Ok(Json(class))
}

/// PUT /api/v1/classes/{id}
pub async fn update_class(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateClassRequest>,
) -> AppResult<Json<Class>> {
    input.validate()?;
    let class = ClassRepo::update(
        &state.pool,
        id,
        &UpdateClass {
            code: input.code.as_deref().map(normalize_code),
            name: input.name.map(|n| n.trim().to_string()),
            academic_year: input.academic_year,
        },
    )
    .await?
    .ok_or(AppError::not_found("Class", id))?;
    Ok(Json(class))
}

/// DELETE /api/v1/classes/{id}
///
/// Refused with 409 while schedules still point at the class.
pub async fn delete_class(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    ClassRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Class", id))?;
    if !ClassRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::conflict(
            "Cannot delete a class that still has schedules",
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/classes/{id}/students
pub async fn list_students(
    State(state): State<AppState>,
    RequireTeacher(_user): RequireTeacher,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<StudentSummary>>>> {
    ClassRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Class", id))?;
    let students = UserRepo::list_students_in_class(&state.pool, id).await?;
    Ok(Json(DataResponse::new(students)))
}
