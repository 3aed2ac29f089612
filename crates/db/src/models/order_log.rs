//! Order change history models.

use ama_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `order_logs` joined with the editor's username.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLogEntry {
    pub id: DbId,
    pub order_id: DbId,
    pub previous_description: Option<String>,
    pub new_description: String,
    pub changed_by: Option<DbId>,
    pub editor_username: Option<String>,
    pub created_at: Timestamp,
}

/// An order log row for the admin audit feed, with the order's title.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderChange {
    pub id: DbId,
    pub order_id: DbId,
    pub order_title: Option<String>,
    pub order_status: String,
    pub order_city: Option<String>,
    pub previous_description: Option<String>,
    pub new_description: String,
    pub changed_by: Option<DbId>,
    pub editor_username: Option<String>,
    pub created_at: Timestamp,
}
