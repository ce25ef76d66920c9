//! Repository for the `products` table (menu items).

use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::DbId;
use sqlx::PgPool;

use crate::models::product::{CreateProduct, Product, UpdateProduct};

const COLUMNS: &str =
    "id, business_id, name, description, price_cents, is_available, created_at, updated_at";

pub struct ProductRepo;

impl ProductRepo {
    pub async fn create(
        pool: &PgPool,
        business_id: DbId,
        input: &CreateProduct,
    ) -> Result<Product, sqlx::Error> {
        let query = format!(
            "INSERT INTO products (business_id, name, description, price_cents, is_available)
             VALUES ($1, $2, $3, $4, COALESCE($5, true))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(business_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.price_cents)
            .bind(input.is_available)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Product>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM products WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Menu for one business. `available_only` hides unavailable items.
    pub async fn list_for_business(
        pool: &PgPool,
        business_id: DbId,
        available_only: bool,
        page: PageRequest,
    ) -> Result<Page<Product>, sqlx::Error> {
        let conditions =
            "business_id = $1 AND deleted_at IS NULL AND (NOT $2 OR is_available)";
        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {conditions}"))
                .bind(business_id)
                .bind(available_only)
                .fetch_one(pool)
                .await?;
        let query = format!(
            "SELECT {COLUMNS} FROM products WHERE {conditions}
             ORDER BY name, id LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, Product>(&query)
            .bind(business_id)
            .bind(available_only)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProduct,
    ) -> Result<Option<Product>, sqlx::Error> {
        let query = format!(
            "UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price_cents = COALESCE($4, price_cents),
                is_available = COALESCE($5, is_available)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.price_cents)
            .bind(input.is_available)
            .fetch_optional(pool)
            .await
    }

    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = NOW(), is_available = false
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
