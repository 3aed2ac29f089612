//! In-app notification kinds and message texts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::OrderStatus;
use crate::types::DbId;

/// Push notification titles.
pub const PUSH_TITLE_ASSIGNED: &str = "New Order Assigned";
pub const PUSH_TITLE_COMPLETED: &str = "New Completed Order";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Alert,
    Success,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Alert => "alert",
            NotificationKind::Success => "success",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(NotificationKind::Info),
            "alert" => Ok(NotificationKind::Alert),
            "success" => Ok(NotificationKind::Success),
            other => Err(CoreError::Validation(format!(
                "Invalid notification type '{other}'"
            ))),
        }
    }
}

/// An in-app notification to insert for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotice {
    pub user_id: DbId,
    pub message: String,
    pub kind: NotificationKind,
    pub order_id: Option<DbId>,
}

impl NewNotice {
    pub fn alert(user_id: DbId, order_id: DbId, message: String) -> Self {
        Self {
            user_id,
            message,
            kind: NotificationKind::Alert,
            order_id: Some(order_id),
        }
    }

    pub fn info(user_id: DbId, order_id: DbId, message: String) -> Self {
        Self {
            user_id,
            message,
            kind: NotificationKind::Info,
            order_id: Some(order_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Message texts
// ---------------------------------------------------------------------------

fn title_or(title: Option<&str>, fallback: &'static str) -> String {
    title.filter(|t| !t.is_empty()).unwrap_or(fallback).to_string()
}

pub fn new_order_assigned(title: Option<&str>) -> String {
    format!("New Order Assigned: {}", title_or(title, "Untitled Order"))
}

pub fn assigned_to_order(order_id: DbId, title: Option<&str>) -> String {
    format!(
        "You have been assigned to order #{order_id}: {}",
        title_or(title, "Untitled")
    )
}

/// Push body for an assignment.
pub fn assignment_push_body(order_id: DbId, title: Option<&str>) -> String {
    format!(
        "You have been assigned to order #{order_id}: {}",
        title_or(title, "Untitled Order")
    )
}

pub fn status_updated_by(order_id: DbId, status: OrderStatus, username: &str) -> String {
    format!("Order #{order_id} status updated to '{status}' by {username}")
}

pub fn ready_for_review(order_id: DbId, title: Option<&str>) -> String {
    format!(
        "New completed order ready for review: Order #{order_id} - {}",
        title_or(title, "Untitled Order")
    )
}

/// Push body for an order that reached `completed`.
pub fn ready_for_review_push_body(order_id: DbId, title: Option<&str>) -> String {
    format!(
        "Order #{order_id}: {} is ready for review",
        title_or(title, "Untitled Order")
    )
}

pub fn updated_by_maker(order_id: DbId) -> String {
    format!("Order #{order_id} was updated by Maker")
}

pub fn details_updated_by(order_id: DbId, username: &str) -> String {
    format!("Order #{order_id} details updated by {username}")
}
