//! Repository for `carts` and `cart_items`.

use backoffice_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::cart::{Cart, CartLine};

const CART_COLUMNS: &str = "id, user_id, business_id, created_at, updated_at";

/// Lines joined with live product data. A soft-deleted product shows as unavailable.
const LINE_QUERY: &str = "SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity,
        p.name AS product_name, p.price_cents AS unit_price_cents,
        (p.is_available AND p.deleted_at IS NULL) AS is_available
     FROM cart_items ci JOIN products p ON p.id = ci.product_id";

pub struct CartRepo;

impl CartRepo {
    /// Fetch the customer's cart for a business, creating it if needed.
    pub async fn get_or_create(
        pool: &PgPool,
        user_id: DbId,
        business_id: DbId,
    ) -> Result<Cart, sqlx::Error> {
        let query = format!(
            "INSERT INTO carts (user_id, business_id) VALUES ($1, $2)
             ON CONFLICT (user_id, business_id) DO UPDATE SET updated_at = carts.updated_at
             RETURNING {CART_COLUMNS}"
        );
        sqlx::query_as::<_, Cart>(&query)
            .bind(user_id)
            .bind(business_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find(
        pool: &PgPool,
        user_id: DbId,
        business_id: DbId,
    ) -> Result<Option<Cart>, sqlx::Error> {
        let query = format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 AND business_id = $2"
        );
        sqlx::query_as::<_, Cart>(&query)
            .bind(user_id)
            .bind(business_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Cart>, sqlx::Error> {
        let query = format!("SELECT {CART_COLUMNS} FROM carts WHERE id = $1");
        sqlx::query_as::<_, Cart>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn lines(pool: &PgPool, cart_id: DbId) -> Result<Vec<CartLine>, sqlx::Error> {
        let query = format!("{LINE_QUERY} WHERE ci.cart_id = $1 ORDER BY ci.created_at, ci.id");
        sqlx::query_as::<_, CartLine>(&query)
            .bind(cart_id)
            .fetch_all(pool)
            .await
    }

    /// A single line, only if it belongs to a cart owned by `user_id`.
    pub async fn find_line_for_user(
        pool: &PgPool,
        item_id: DbId,
        user_id: DbId,
    ) -> Result<Option<CartLine>, sqlx::Error> {
        let query = format!(
            "{LINE_QUERY} JOIN carts c ON c.id = ci.cart_id WHERE ci.id = $1 AND c.user_id = $2"
        );
        sqlx::query_as::<_, CartLine>(&query)
            .bind(item_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Quantity of `product_id` already in the cart (0 when absent).
    pub async fn quantity_of(
        pool: &PgPool,
        cart_id: DbId,
        product_id: DbId,
    ) -> Result<i32, sqlx::Error> {
        let quantity: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM cart_items WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
        Ok(quantity.unwrap_or(0))
    }

    /// Insert a line or overwrite the quantity of the existing one.
    pub async fn put_item(
        pool: &PgPool,
        cart_id: DbId,
        product_id: DbId,
        quantity: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3)
             ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_line_quantity(
        pool: &PgPool,
        item_id: DbId,
        quantity: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
            .bind(item_id)
            .bind(quantity)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_line(pool: &PgPool, item_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop lines whose product was deleted or taken off the menu.
    pub async fn purge_unorderable_lines(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM cart_items ci USING products p
             WHERE p.id = ci.product_id AND (p.deleted_at IS NOT NULL OR NOT p.is_available)",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Drop lines not touched since `cutoff`.
    pub async fn purge_stale_lines(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE updated_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Empty a cart. Returns the number of lines removed.
    pub async fn clear(pool: &PgPool, cart_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
