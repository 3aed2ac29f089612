//! Activity log vocabulary and the human-readable audit descriptions.

use serde_json::Value;

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

pub const ACTION_USER_REGISTERED: &str = "user_registered";
pub const ACTION_USER_LOGIN: &str = "user_login";
pub const ACTION_USER_APPROVED: &str = "user_approved";
pub const ACTION_USER_EMAIL_UPDATED: &str = "user_email_updated";
pub const ACTION_USER_DELETED: &str = "user_deleted";
pub const ACTION_ORDER_CREATED: &str = "order_created";
pub const ACTION_ORDER_UPDATED: &str = "order_updated";
pub const ACTION_ORDER_STATUS_CHANGED: &str = "order_status_changed";
pub const ACTION_ORDER_DELETED: &str = "order_deleted";
pub const ACTION_ORDER_ERROR: &str = "order_error";

// ---------------------------------------------------------------------------
// Target types
// ---------------------------------------------------------------------------

pub const TARGET_USER: &str = "user";
pub const TARGET_ORDER: &str = "order";

/// Phase recorded in `order_error` details.
pub const PHASE_CREATE: &str = "create";
pub const PHASE_UPDATE: &str = "update";

/// Describe an activity row for the unified audit feed.
pub fn describe_activity(action: &str, target_id: Option<DbId>, details: Option<&Value>) -> String {
    let target = target_id.map(|id| format!(" #{id}")).unwrap_or_default();
    let field = |key: &str| details.and_then(|d| d.get(key));

    match action {
        ACTION_ORDER_CREATED => {
            let item_count = field("items")
                .and_then(Value::as_array)
                .map(|items| items.len() as u64)
                .or_else(|| field("itemCount").and_then(Value::as_u64))
                .unwrap_or(0);
            let status = field("status")
                .and_then(Value::as_str)
                .map(|s| format!(", status: {s}"))
                .unwrap_or_default();
            let takers: Vec<&str> = field("assignedTakerNames")
                .and_then(Value::as_array)
                .map(|names| names.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let takers = if takers.is_empty() {
                String::new()
            } else {
                format!(", to: {}", takers.join(", "))
            };
            format!("Order created{target} ({item_count} items{status}{takers})")
        }
        ACTION_ORDER_UPDATED => {
            let changes = field("changes")
                .and_then(Value::as_array)
                .map(|c| c.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(", "))
                .unwrap_or_else(|| "fields".to_string());
            format!("Order updated{target}: {changes}")
        }
        ACTION_ORDER_ERROR => {
            let message = field("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            format!("Order error{target}: {message}")
        }
        other => field("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.replace('_', " ")),
    }
}

/// Describe an order change row for the unified audit feed.
pub fn describe_order_change(order_id: DbId, title: Option<&str>, change: &str) -> String {
    format!("#{order_id} {}: {change}", title.unwrap_or("Order"))
}
