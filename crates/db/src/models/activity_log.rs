//! Activity log models and DTOs.

use ama_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from `activity_logs` joined with the acting user.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub username: Option<String>,
    pub user_role: Option<String>,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<DbId>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for appending an activity row.
#[derive(Debug, Clone)]
pub struct CreateActivityLog {
    pub user_id: Option<DbId>,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<DbId>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
}

impl CreateActivityLog {
    pub fn new(user_id: Option<DbId>, action: &str) -> Self {
        Self {
            user_id,
            action: action.to_string(),
            target_type: None,
            target_id: None,
            details: None,
            ip_address: None,
        }
    }

    pub fn with_target(mut self, target_type: &str, target_id: Option<DbId>) -> Self {
        self.target_type = Some(target_type.to_string());
        self.target_id = target_id;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_ip(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }
}

/// Query parameters for the admin activity log view.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub action: Option<String>,
    pub user_id: Option<DbId>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub limit: Option<i64>,
}
