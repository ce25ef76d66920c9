//! Repository for `orders` and `order_items`.

use backoffice_core::ordering;
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::DbId;
use sqlx::PgPool;

use crate::models::order::{
    CreateOrder, CreateOrderItem, Order, OrderFilter, OrderItem, OrderWithItems,
};
use crate::models::status::StatusId;

const COLUMNS: &str = "id, order_number, customer_id, business_id, guest_name, guest_phone, \
    guest_location, status_id, customer_note, business_note, subtotal_cents, delivery_fee_cents, \
    total_cents, payment_method, is_paid, is_pos_order, confirmed_at, completed_at, \
    created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, unit_price_cents, quantity, line_total_cents, created_at";

pub struct OrderRepo;

impl OrderRepo {
    /// Insert an order header and its snapshot lines in one transaction.
    ///
    /// When `clear_cart_id` is set, that cart is emptied in the same
    /// transaction so a checkout either fully happens or leaves the cart intact.
    pub async fn create(
        pool: &PgPool,
        input: &CreateOrder,
        items: &[CreateOrderItem],
        clear_cart_id: Option<DbId>,
    ) -> Result<OrderWithItems, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO orders
                (order_number, customer_id, business_id, guest_name, guest_phone, guest_location,
                 customer_note, subtotal_cents, delivery_fee_cents, total_cents, payment_method,
                 is_pos_order)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $8 + $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(&input.order_number)
            .bind(input.customer_id)
            .bind(input.business_id)
            .bind(&input.guest_name)
            .bind(&input.guest_phone)
            .bind(&input.guest_location)
            .bind(&input.customer_note)
            .bind(input.subtotal_cents)
            .bind(input.delivery_fee_cents)
            .bind(&input.payment_method)
            .bind(input.is_pos_order)
            .fetch_one(&mut *tx)
            .await?;

        let item_query = format!(
            "INSERT INTO order_items
                (order_id, product_id, product_name, unit_price_cents, quantity, line_total_cents)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ITEM_COLUMNS}"
        );
        let mut created = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, OrderItem>(&item_query)
                .bind(order.id)
                .bind(item.product_id)
                .bind(&item.product_name)
                .bind(item.unit_price_cents)
                .bind(item.quantity)
                .bind(item.line_total_cents)
                .fetch_one(&mut *tx)
                .await?;
            created.push(row);
        }

        if let Some(cart_id) = clear_cart_id {
            sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
                .bind(cart_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(OrderWithItems {
            order,
            items: created,
        })
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn items(pool: &PgPool, order_id: DbId) -> Result<Vec<OrderItem>, sqlx::Error> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id");
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_with_items(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<OrderWithItems>, sqlx::Error> {
        let Some(order) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let items = Self::items(pool, id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    pub async fn list(
        pool: &PgPool,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<Page<Order>, sqlx::Error> {
        let conditions = "($1::BIGINT IS NULL OR business_id = $1)
            AND ($2::BIGINT IS NULL OR customer_id = $2)
            AND ($3::SMALLINT IS NULL OR status_id = $3)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders WHERE {conditions}"))
                .bind(filter.business_id)
                .bind(filter.customer_id)
                .bind(filter.status_id)
                .fetch_one(pool)
                .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM orders WHERE {conditions}
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
        let items = sqlx::query_as::<_, Order>(&query)
            .bind(filter.business_id)
            .bind(filter.customer_id)
            .bind(filter.status_id)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    /// Move an order from `from` to `to`, stamping `confirmed_at` or
    /// `completed_at` where the target status calls for it.
    ///
    /// Returns `None` when the order is missing or no longer in `from`.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: StatusId,
        to: StatusId,
        business_note: Option<&str>,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!(
            "UPDATE orders SET
                status_id = $3,
                business_note = COALESCE($4, business_note),
                confirmed_at = CASE WHEN $5 THEN COALESCE(confirmed_at, NOW()) ELSE confirmed_at END,
                completed_at = CASE WHEN $6 THEN NOW() ELSE completed_at END
             WHERE id = $1 AND status_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(business_note)
            .bind(ordering::stamps_confirmed(to))
            .bind(ordering::stamps_completed(to))
            .fetch_optional(pool)
            .await
    }

    pub async fn mark_paid(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("UPDATE orders SET is_paid = true WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
