//! Best-effort writes to the activity log.

use ama_db::models::activity_log::CreateActivityLog;
use ama_db::repositories::ActivityLogRepo;
use ama_db::DbPool;

/// Append an activity row. A failed write is logged and otherwise ignored.
pub async fn record(pool: &DbPool, entry: CreateActivityLog) {
    if let Err(e) = ActivityLogRepo::create(pool, &entry).await {
        tracing::warn!(
            action = %entry.action,
            user_id = ?entry.user_id,
            error = %e,
            "Failed to write activity log",
        );
    }
}
