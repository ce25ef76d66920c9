use backoffice_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `classes` table (a cohort of students).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Class {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub academic_year: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClass {
    pub code: String,
    pub name: String,
    pub academic_year: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateClass {
    pub code: Option<String>,
    pub name: Option<String>,
    pub academic_year: Option<String>,
}
