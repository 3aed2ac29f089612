//! Repository for the `orders` table and the order detail view.

use std::collections::HashMap;

use ama_core::search::{like_pattern, SUGGESTION_LIMIT};
use ama_core::status::OrderStatus;
use ama_core::types::DbId;
use ama_core::visibility::OrderScope;
use sqlx::PgPool;

use crate::models::order::{CreateOrder, Order, OrderDetails};
use crate::models::user::UserSummary;
use crate::repositories::{OrderAssignmentRepo, OrderItemRepo, OrderLogRepo, UserRepo};

/// Column list for `orders` queries.
const COLUMNS: &str =
    "id, title, description, status, city, maker_id, accounter_id, created_at, updated_at";

/// Column list qualified with the `o` alias used by the listing query.
const COLUMNS_O: &str = "o.id, o.title, o.description, o.status, o.city, o.maker_id, \
     o.accounter_id, o.created_at, o.updated_at";

/// What to attach when expanding orders into [`OrderDetails`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DetailOptions {
    /// Attach history; `Some(n)` keeps the newest `n` entries per order.
    pub history: Option<Option<i64>>,
    /// Strip item prices (taker views).
    pub hide_prices: bool,
}

/// Provides CRUD and listing operations for orders.
pub struct OrderRepo;

impl OrderRepo {
    /// Insert an order, returning the created row.
    pub async fn create(
        conn: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
        input: &CreateOrder,
    ) -> Result<Order, sqlx::Error> {
        let query = format!(
            "INSERT INTO orders (title, description, status, city, maker_id, accounter_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.status.as_str())
            .bind(&input.city)
            .bind(input.maker_id)
            .bind(input.accounter_id)
            .fetch_one(conn)
            .await
    }

    /// Find an order by its primary key.
    pub async fn find_by_id(
        conn: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
        id: DbId,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Find an order and hold a row lock on it until the transaction ends.
    pub async fn find_for_update(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Find several orders by id, newest first.
    pub async fn find_many(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Order>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM orders WHERE id = ANY($1) ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Write back every mutable column of an order.
    ///
    /// Callers must hold the row lock from [`OrderRepo::find_for_update`].
    /// `created_at` is included because re-sending an archived order refreshes it.
    pub async fn save(
        conn: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
        order: &Order,
    ) -> Result<Order, sqlx::Error> {
        let query = format!(
            "UPDATE orders SET \
                title = $2, description = $3, status = $4, city = $5, \
                accounter_id = $6, created_at = $7 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(order.id)
            .bind(&order.title)
            .bind(&order.description)
            .bind(&order.status)
            .bind(&order.city)
            .bind(order.accounter_id)
            .bind(order.created_at)
            .fetch_one(conn)
            .await
    }

    /// Set only the status column.
    pub async fn set_status(
        conn: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
        id: DbId,
        status: OrderStatus,
    ) -> Result<Order, sqlx::Error> {
        let query = format!("UPDATE orders SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(conn)
            .await
    }

    /// List one page of orders matching a resolved scope, newest first.
    pub async fn list(pool: &PgPool, scope: &OrderScope) -> Result<Vec<Order>, sqlx::Error> {
        let (where_clause, bind_values, bind_idx) = build_order_filter(scope);
        let query = format!(
            "SELECT {COLUMNS_O} FROM orders o {where_clause} \
             ORDER BY o.created_at DESC, o.id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );
        let q = bind_order_values(sqlx::query_as::<_, Order>(&query), &bind_values);
        q.bind(scope.limit).bind(scope.offset).fetch_all(pool).await
    }

    /// Count orders matching a scope, ignoring pagination.
    pub async fn count(pool: &PgPool, scope: &OrderScope) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_order_filter(scope);
        let query = format!("SELECT COUNT(*)::BIGINT FROM orders o {where_clause}");
        let q = bind_order_values_scalar(sqlx::query_scalar::<_, i64>(&query), &bind_values);
        q.fetch_one(pool).await
    }

    /// Admin listing: optional exact status and maker, no pagination.
    pub async fn list_all(
        pool: &PgPool,
        status: Option<OrderStatus>,
        maker_id: Option<DbId>,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM orders \
             WHERE ($1::TEXT IS NULL OR status = $1) \
               AND ($2::BIGINT IS NULL OR maker_id = $2) \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(status.map(OrderStatus::as_str))
            .bind(maker_id)
            .fetch_all(pool)
            .await
    }

    /// Distinct titles of the maker's own orders containing `term`.
    pub async fn title_suggestions(
        pool: &PgPool,
        maker_id: DbId,
        term: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT title FROM orders \
             WHERE maker_id = $1 AND title ILIKE $2 \
             ORDER BY title \
             LIMIT $3",
        )
        .bind(maker_id)
        .bind(like_pattern(term))
        .bind(SUGGESTION_LIMIT)
        .fetch_all(pool)
        .await
    }

    /// Total number of orders.
    pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*)::BIGINT FROM orders")
            .fetch_one(pool)
            .await
    }

    /// Orders still being worked on (`pending` or `in-progress`).
    pub async fn count_in_flight(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let active: Vec<&str> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.is_active())
            .map(OrderStatus::as_str)
            .collect();
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*)::BIGINT FROM orders WHERE status = ANY($1)")
            .bind(active)
            .fetch_one(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    /// Delete an order and its items, logs and assignments in one transaction.
    ///
    /// Returns `false` if the order does not exist.
    pub async fn delete_cascade(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        Self::delete_children(&mut tx, &[id]).await?;
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove the rows that reference the given orders.
    ///
    /// Notifications keep their text; their `order_id` is nulled by the foreign key.
    pub async fn delete_children(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        order_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        for table in ["order_items", "order_logs", "order_assignments"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE order_id = ANY($1)"))
                .bind(order_ids)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Detail view
    // -----------------------------------------------------------------------

    /// Expand orders with maker, accounter, takers, items and optional history.
    ///
    /// Runs one query per association regardless of the number of orders.
    pub async fn with_details(
        pool: &PgPool,
        orders: Vec<Order>,
        opts: DetailOptions,
    ) -> Result<Vec<OrderDetails>, sqlx::Error> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<DbId> = orders.iter().map(|o| o.id).collect();
        let mut user_ids: Vec<DbId> = orders
            .iter()
            .flat_map(|o| std::iter::once(o.maker_id).chain(o.accounter_id))
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let users: HashMap<DbId, UserSummary> = UserRepo::summaries(pool, &user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let mut takers = OrderAssignmentRepo::takers_for_orders(pool, &order_ids).await?;
        let mut items = OrderItemRepo::list_for_orders(pool, &order_ids).await?;
        let mut history = match opts.history {
            Some(limit) => Some(OrderLogRepo::recent_for_orders(pool, &order_ids, limit).await?),
            None => None,
        };

        let details = orders
            .into_iter()
            .map(|order| {
                let mut detail = OrderDetails {
                    maker: users.get(&order.maker_id).cloned(),
                    accounter: order.accounter_id.and_then(|id| users.get(&id).cloned()),
                    assigned_takers: takers.remove(&order.id).unwrap_or_default(),
                    items: items.remove(&order.id).unwrap_or_default(),
                    history: history
                        .as_mut()
                        .map(|h| h.remove(&order.id).unwrap_or_default()),
                    order,
                };
                if opts.hide_prices {
                    detail.hide_prices();
                }
                detail
            })
            .collect();

        Ok(details)
    }

    /// Load a single order with its details.
    pub async fn find_details(
        pool: &PgPool,
        id: DbId,
        opts: DetailOptions,
    ) -> Result<Option<OrderDetails>, sqlx::Error> {
        let Some(order) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let mut details = Self::with_details(pool, vec![order], opts).await?;
        Ok(details.pop())
    }
}

// ---------------------------------------------------------------------------
// Dynamic filter
// ---------------------------------------------------------------------------

/// A value bound into a dynamically built order query.
enum BindValue {
    BigInt(i64),
    Text(String),
    TextArray(Vec<String>),
}

/// Build a WHERE clause and bind values from an [`OrderScope`].
///
/// Returns `(where_clause, bind_values, next_bind_index)`.
/// The `where_clause` is empty if no filters are active, or starts with `WHERE `.
fn build_order_filter(scope: &OrderScope) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(maker_id) = scope.maker_id {
        conditions.push(format!("o.maker_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(maker_id));
    }

    if let Some(accounter_id) = scope.accounter_id {
        conditions.push(format!("o.accounter_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(accounter_id));
    }

    if let Some(taker_id) = scope.assigned_to {
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM order_assignments a \
             WHERE a.order_id = o.id AND a.user_id = ${bind_idx})"
        ));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(taker_id));
    }

    if let Some(ref statuses) = scope.status_in {
        conditions.push(format!("o.status = ANY(${bind_idx})"));
        bind_idx += 1;
        bind_values.push(BindValue::TextArray(status_names(statuses)));
    }

    if !scope.status_not_in.is_empty() {
        conditions.push(format!("o.status <> ALL(${bind_idx})"));
        bind_idx += 1;
        bind_values.push(BindValue::TextArray(status_names(&scope.status_not_in)));
    }

    if let Some(ref city) = scope.city {
        conditions.push(format!("o.city = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(city.clone()));
    }

    if let Some(ref search) = scope.search {
        conditions.push(format!(
            "(o.title ILIKE ${bind_idx} OR o.description ILIKE ${bind_idx} OR o.city ILIKE ${bind_idx})"
        ));
        bind_idx += 1;
        bind_values.push(BindValue::Text(like_pattern(search)));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}

fn status_names(statuses: &[OrderStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
fn bind_order_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::TextArray(v) => q = q.bind(v.as_slice()),
        }
    }
    q
}

/// Bind a slice of `BindValue` to a sqlx `QueryScalar`.
fn bind_order_values_scalar<'q>(
    mut q: sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::TextArray(v) => q = q.bind(v.as_slice()),
        }
    }
    q
}
