//! The unified admin audit feed.
//!
//! Activity rows and order history rows are fetched separately and merged
//! here into one newest-first list of [`AuditEntry`] values, each with a
//! human-readable description.

use ama_core::activity::{describe_activity, describe_order_change, TARGET_ORDER};
use ama_core::types::{DbId, Timestamp};
use ama_db::models::activity_log::ActivityLog;
use ama_db::models::order_log::OrderChange;
use serde::Serialize;
use serde_json::json;

/// Default and maximum size of the merged feed.
pub const DEFAULT_AUDIT_LIMIT: i64 = 200;
pub const MAX_AUDIT_LIMIT: i64 = 500;

/// Action name given to order history rows in the feed.
pub const ORDER_CHANGE: &str = "order_change";

/// Where an audit entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSource {
    Activity,
    OrderChange,
}

/// The user behind an audit entry, if still known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditUser {
    pub id: DbId,
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(rename = "type")]
    pub source: AuditSource,
    pub created_at: Timestamp,
    pub user: Option<AuditUser>,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<DbId>,
    pub details: Option<serde_json::Value>,
    pub description: String,
}

impl From<ActivityLog> for AuditEntry {
    fn from(log: ActivityLog) -> Self {
        let description = describe_activity(&log.action, log.target_id, log.details.as_ref());
        Self {
            source: AuditSource::Activity,
            created_at: log.created_at,
            user: log.user_id.map(|id| AuditUser {
                id,
                username: log.username,
                role: log.user_role,
            }),
            action: log.action,
            target_type: log.target_type,
            target_id: log.target_id,
            details: log.details,
            description,
        }
    }
}

impl From<OrderChange> for AuditEntry {
    fn from(change: OrderChange) -> Self {
        let description = describe_order_change(
            change.order_id,
            change.order_title.as_deref(),
            &change.new_description,
        );
        let details = json!({
            "new": change.new_description,
            "old": change.previous_description,
            "order": {
                "id": change.order_id,
                "title": change.order_title,
                "status": change.order_status,
                "city": change.order_city,
            },
        });
        Self {
            source: AuditSource::OrderChange,
            created_at: change.created_at,
            user: change.changed_by.map(|id| AuditUser {
                id,
                username: change.editor_username,
                role: None,
            }),
            action: ORDER_CHANGE.to_string(),
            target_type: Some(TARGET_ORDER.to_string()),
            target_id: Some(change.order_id),
            details: Some(details),
            description,
        }
    }
}

/// Merge both sources newest first and keep at most `limit` entries.
pub fn merge_feed(
    activity: Vec<ActivityLog>,
    changes: Vec<OrderChange>,
    limit: i64,
) -> Vec<AuditEntry> {
    let mut entries: Vec<AuditEntry> = activity
        .into_iter()
        .map(AuditEntry::from)
        .chain(changes.into_iter().map(AuditEntry::from))
        .collect();
    // Stable sort keeps each source's own ordering for equal timestamps.
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    entries.truncate(usize::try_from(limit).unwrap_or(0));
    entries
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn at(minutes: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn activity(id: DbId, action: &str, minutes: i64) -> ActivityLog {
        ActivityLog {
            id,
            user_id: Some(1),
            username: Some("boss".into()),
            user_role: Some("admin".into()),
            action: action.into(),
            target_type: Some("order".into()),
            target_id: Some(7),
            details: Some(json!({"message": "Order must have at least one item", "phase": "update"})),
            ip_address: None,
            created_at: at(minutes),
        }
    }

    fn change(id: DbId, text: &str, minutes: i64) -> OrderChange {
        OrderChange {
            id,
            order_id: 7,
            order_title: Some("Weekly".into()),
            order_status: "pending".into(),
            order_city: None,
            previous_description: Some("2".into()),
            new_description: text.into(),
            changed_by: None,
            editor_username: None,
            created_at: at(minutes),
        }
    }

    #[test]
    fn feed_is_newest_first_across_sources() {
        let feed = merge_feed(
            vec![activity(1, "order_error", 1), activity(2, "user_login", 3)],
            vec![change(10, "Updated A: Qty 2 -> 3", 2)],
            DEFAULT_AUDIT_LIMIT,
        );
        let sources: Vec<AuditSource> = feed.iter().map(|e| e.source).collect();
        assert_eq!(
            sources,
            vec![AuditSource::Activity, AuditSource::OrderChange, AuditSource::Activity]
        );
        assert_eq!(feed[1].description, "#7 Weekly: Updated A: Qty 2 -> 3");
        assert_eq!(feed[2].description, "Order error #7: Order must have at least one item");
    }

    #[test]
    fn feed_is_truncated_to_limit() {
        let feed = merge_feed(
            vec![activity(1, "user_login", 1), activity(2, "user_login", 2)],
            vec![change(10, "Removed: B", 3)],
            2,
        );
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].action, ORDER_CHANGE);
    }

    #[test]
    fn order_change_without_editor_has_no_user() {
        let entry = AuditEntry::from(change(1, "Added: C (Qty: 1)", 0));
        assert!(entry.user.is_none());
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "order_change");
        assert_eq!(json["targetType"], "order");
        assert_eq!(json["details"]["order"]["title"], "Weekly");
    }
}
