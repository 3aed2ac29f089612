//! Repository for the `order_assignments` join table.

use std::collections::HashMap;

use ama_core::types::DbId;
use sqlx::{FromRow, PgPool};

use crate::models::user::UserContact;

/// Provides operations on taker assignments.
pub struct OrderAssignmentRepo;

#[derive(FromRow)]
struct AssignedTaker {
    order_id: DbId,
    id: DbId,
    username: String,
    email: Option<String>,
}

impl OrderAssignmentRepo {
    /// Ids of the takers assigned to an order.
    pub async fn taker_ids(
        conn: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
        order_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT user_id FROM order_assignments WHERE order_id = $1 ORDER BY user_id",
        )
        .bind(order_id)
        .fetch_all(conn)
        .await
    }

    /// Assigned takers of several orders, grouped by order id.
    pub async fn takers_for_orders(
        pool: &PgPool,
        order_ids: &[DbId],
    ) -> Result<HashMap<DbId, Vec<UserContact>>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AssignedTaker>(
            "SELECT a.order_id, u.id, u.username, u.email \
             FROM order_assignments a \
             JOIN users u ON u.id = a.user_id \
             WHERE a.order_id = ANY($1) \
             ORDER BY a.order_id, u.username",
        )
        .bind(order_ids)
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<DbId, Vec<UserContact>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(UserContact {
                id: row.id,
                username: row.username,
                email: row.email,
            });
        }
        Ok(grouped)
    }

    /// Replace the assignment set of an order.
    pub async fn replace(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        order_id: DbId,
        taker_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM order_assignments WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
        if taker_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO order_assignments (order_id, user_id) \
             SELECT $1, UNNEST($2::BIGINT[]) \
             ON CONFLICT ON CONSTRAINT uq_order_assignments_user_order DO NOTHING",
        )
        .bind(order_id)
        .bind(taker_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
