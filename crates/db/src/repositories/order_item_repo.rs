//! Repository for the `order_items` table.

use std::collections::HashMap;

use ama_core::history::ItemRow;
use ama_core::search::{like_pattern, SUGGESTION_LIMIT};
use ama_core::status::ItemStatus;
use ama_core::types::DbId;
use sqlx::PgPool;

use crate::models::order_item::OrderItem;

/// Column list for `order_items` queries.
const COLUMNS: &str = "id, order_id, name, quantity, price, status, created_at, updated_at";

/// Provides CRUD operations for order line items.
pub struct OrderItemRepo;

impl OrderItemRepo {
    /// Items of one order in insertion order.
    pub async fn list_for_order(
        conn: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
        order_id: DbId,
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id");
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(order_id)
            .fetch_all(conn)
            .await
    }

    /// Items of several orders, grouped by order id.
    pub async fn list_for_orders(
        pool: &PgPool,
        order_ids: &[DbId],
    ) -> Result<HashMap<DbId, Vec<OrderItem>>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, id"
        );
        let rows = sqlx::query_as::<_, OrderItem>(&query)
            .bind(order_ids)
            .fetch_all(pool)
            .await?;

        let mut grouped: HashMap<DbId, Vec<OrderItem>> = HashMap::new();
        for item in rows {
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    /// Insert rows for an order.
    pub async fn insert_many(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        order_id: DbId,
        rows: &[ItemRow],
    ) -> Result<(), sqlx::Error> {
        for row in rows {
            sqlx::query(
                "INSERT INTO order_items (order_id, name, quantity, price, status) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(order_id)
            .bind(&row.name)
            .bind(row.quantity)
            .bind(row.price)
            .bind(row.status.map(ItemStatus::as_str))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Replace the full item list of an order.
    pub async fn replace_all(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        order_id: DbId,
        rows: &[ItemRow],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
        Self::insert_many(tx, order_id, rows).await
    }

    /// Set or clear an item's collection status. Returns `None` if the item does not exist.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: Option<ItemStatus>,
    ) -> Result<Option<OrderItem>, sqlx::Error> {
        let query = format!("UPDATE order_items SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(id)
            .bind(status.map(ItemStatus::as_str))
            .fetch_optional(pool)
            .await
    }

    /// Distinct item names containing `term`, for autocomplete.
    pub async fn name_suggestions(pool: &PgPool, term: &str) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT name FROM order_items \
             WHERE name ILIKE $1 \
             ORDER BY name \
             LIMIT $2",
        )
        .bind(like_pattern(term))
        .bind(SUGGESTION_LIMIT)
        .fetch_all(pool)
        .await
    }
}
