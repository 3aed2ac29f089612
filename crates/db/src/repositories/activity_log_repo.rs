//! Repository for the append-only `activity_logs` table.

use ama_core::search::{clamp_limit, DEFAULT_ACTIVITY_LIMIT, MAX_ACTIVITY_LIMIT};
use ama_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::activity_log::{ActivityLog, ActivityQuery, CreateActivityLog};

/// Select list joining the acting user.
const SELECT: &str = "SELECT l.id, l.user_id, u.username, u.role AS user_role, l.action, \
     l.target_type, l.target_id, l.details, l.ip_address, l.created_at \
     FROM activity_logs l \
     LEFT JOIN users u ON u.id = l.user_id";

/// Provides insert and query operations for activity logs.
pub struct ActivityLogRepo;

impl ActivityLogRepo {
    /// Append an activity row, returning its id.
    pub async fn create(
        conn: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
        input: &CreateActivityLog,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO activity_logs (user_id, action, target_type, target_id, details, ip_address) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(input.user_id)
        .bind(&input.action)
        .bind(&input.target_type)
        .bind(input.target_id)
        .bind(&input.details)
        .bind(&input.ip_address)
        .fetch_one(conn)
        .await
    }

    /// Filtered activity, newest first.
    pub async fn query(pool: &PgPool, params: &ActivityQuery) -> Result<Vec<ActivityLog>, sqlx::Error> {
        let (where_clause, bind_values, bind_idx) = build_activity_filter(params);
        let limit = clamp_limit(params.limit, DEFAULT_ACTIVITY_LIMIT, MAX_ACTIVITY_LIMIT);
        let query = format!(
            "{SELECT} {where_clause} ORDER BY l.created_at DESC, l.id DESC LIMIT ${bind_idx}"
        );

        let mut q = sqlx::query_as::<_, ActivityLog>(&query);
        for val in &bind_values {
            match val {
                BindValue::BigInt(v) => q = q.bind(*v),
                BindValue::Text(v) => q = q.bind(v.as_str()),
                BindValue::Timestamp(v) => q = q.bind(*v),
            }
        }
        q.bind(limit).fetch_all(pool).await
    }

    /// Newest activity rows.
    pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<ActivityLog>, sqlx::Error> {
        let query = format!("{SELECT} ORDER BY l.created_at DESC, l.id DESC LIMIT $1");
        sqlx::query_as::<_, ActivityLog>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Dynamic filter
// ---------------------------------------------------------------------------

enum BindValue {
    BigInt(i64),
    Text(String),
    Timestamp(Timestamp),
}

/// Returns `(where_clause, bind_values, next_bind_index)`.
fn build_activity_filter(params: &ActivityQuery) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(ref action) = params.action {
        conditions.push(format!("l.action = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(action.clone()));
    }

    if let Some(user_id) = params.user_id {
        conditions.push(format!("l.user_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(user_id));
    }

    if let Some(start) = params.start_date {
        conditions.push(format!("l.created_at >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(start));
    }

    if let Some(end) = params.end_date {
        conditions.push(format!("l.created_at <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(end));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}
