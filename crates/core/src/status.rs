//! Order and item status values.
//!
//! Both are stored as text; the database CHECK constraints in the migrations
//! list exactly the values below.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "archived")]
    Archived,
    #[serde(rename = "entered_erp")]
    EnteredErp,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Archived,
        OrderStatus::EnteredErp,
    ];

    /// Statuses hidden from the default ("active") listing.
    pub const INACTIVE: [OrderStatus; 3] = [
        OrderStatus::Archived,
        OrderStatus::Completed,
        OrderStatus::EnteredErp,
    ];

    /// Statuses a taker never sees and never moves an order into.
    pub const FINALIZED: [OrderStatus; 2] = [OrderStatus::Completed, OrderStatus::EnteredErp];

    /// Statuses visible to (and settable by) an assigned taker.
    pub const TAKER_WORKFLOW: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::InProgress,
        OrderStatus::Completed,
    ];

    /// Statuses that make an order visible to its accounter.
    pub const ACCOUNTING: [OrderStatus; 2] = [OrderStatus::Completed, OrderStatus::EnteredErp];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in-progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Archived => "archived",
            OrderStatus::EnteredErp => "entered_erp",
        }
    }

    /// Still being worked on: neither archived nor finalized.
    pub fn is_active(self) -> bool {
        !Self::INACTIVE.contains(&self)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid order status '{s}'")))
    }
}

/// Collection status of a single order item. `None` means not yet handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Collected,
    Unavailable,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Collected => "collected",
            ItemStatus::Unavailable => "unavailable",
        }
    }

    /// Parse an optional wire value; empty strings count as "no status".
    pub fn parse_optional(value: Option<&str>) -> Result<Option<Self>, CoreError> {
        match value {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }

    /// Parse the `status` field of an item-status PATCH. The field must be
    /// present; an explicit `null` clears the status.
    pub fn parse_patch(value: Option<Option<&str>>) -> Result<Option<Self>, CoreError> {
        match value {
            None => Err(invalid_item_status()),
            Some(None) => Ok(None),
            Some(Some(s)) => s.parse().map(Some),
        }
    }
}

fn invalid_item_status() -> CoreError {
    CoreError::Validation(
        "Invalid status value. Must be null, \"collected\", or \"unavailable\"".into(),
    )
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collected" => Ok(ItemStatus::Collected),
            "unavailable" => Ok(ItemStatus::Unavailable),
            _ => Err(invalid_item_status()),
        }
    }
}
