//! Repository for the append-only `order_logs` table.

use std::collections::HashMap;

use ama_core::history::HistoryEntry;
use ama_core::types::DbId;
use sqlx::PgPool;

use crate::models::order_log::{OrderChange, OrderLogEntry};

/// Provides insert and read operations for order history.
pub struct OrderLogRepo;

impl OrderLogRepo {
    /// Append history entries for an order, preserving their order.
    pub async fn insert_many(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        order_id: DbId,
        changed_by: DbId,
        entries: &[HistoryEntry],
    ) -> Result<(), sqlx::Error> {
        for entry in entries {
            sqlx::query(
                "INSERT INTO order_logs (order_id, previous_description, new_description, changed_by) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id)
            .bind(&entry.previous)
            .bind(&entry.new)
            .bind(changed_by)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Full history of one order, newest first.
    pub async fn list_for_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<OrderLogEntry>, sqlx::Error> {
        sqlx::query_as::<_, OrderLogEntry>(
            "SELECT l.id, l.order_id, l.previous_description, l.new_description, \
                    l.changed_by, u.username AS editor_username, l.created_at \
             FROM order_logs l \
             LEFT JOIN users u ON u.id = l.changed_by \
             WHERE l.order_id = $1 \
             ORDER BY l.created_at DESC, l.id DESC",
        )
        .bind(order_id)
        .fetch_all(pool)
        .await
    }

    /// History of several orders grouped by order id, newest first.
    ///
    /// With `Some(n)`, only the newest `n` entries per order are returned.
    pub async fn recent_for_orders(
        pool: &PgPool,
        order_ids: &[DbId],
        per_order: Option<i64>,
    ) -> Result<HashMap<DbId, Vec<OrderLogEntry>>, sqlx::Error> {
        let rows = sqlx::query_as::<_, OrderLogEntry>(
            "SELECT id, order_id, previous_description, new_description, \
                    changed_by, editor_username, created_at \
             FROM ( \
                 SELECT l.id, l.order_id, l.previous_description, l.new_description, \
                        l.changed_by, u.username AS editor_username, l.created_at, \
                        ROW_NUMBER() OVER ( \
                            PARTITION BY l.order_id ORDER BY l.created_at DESC, l.id DESC \
                        ) AS rn \
                 FROM order_logs l \
                 LEFT JOIN users u ON u.id = l.changed_by \
                 WHERE l.order_id = ANY($1) \
             ) ranked \
             WHERE rn <= $2 \
             ORDER BY order_id, rn",
        )
        .bind(order_ids)
        .bind(per_order.unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<DbId, Vec<OrderLogEntry>> = HashMap::new();
        for entry in rows {
            grouped.entry(entry.order_id).or_default().push(entry);
        }
        Ok(grouped)
    }

    /// Newest changes across all orders, for the admin audit feed.
    pub async fn recent_changes(pool: &PgPool, limit: i64) -> Result<Vec<OrderChange>, sqlx::Error> {
        sqlx::query_as::<_, OrderChange>(
            "SELECT l.id, l.order_id, o.title AS order_title, o.status AS order_status, \
                    o.city AS order_city, l.previous_description, l.new_description, \
                    l.changed_by, u.username AS editor_username, l.created_at \
             FROM order_logs l \
             JOIN orders o ON o.id = l.order_id \
             LEFT JOIN users u ON u.id = l.changed_by \
             ORDER BY l.created_at DESC, l.id DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
