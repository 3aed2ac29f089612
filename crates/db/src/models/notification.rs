//! In-app notification models.

use ama_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub message: String,
    pub is_read: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub order_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
