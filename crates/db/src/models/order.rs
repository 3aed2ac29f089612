//! Order entity models and DTOs.

use ama_core::error::CoreError;
use ama_core::status::OrderStatus;
use ama_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::order_item::OrderItem;
use crate::models::order_log::OrderLogEntry;
use crate::models::user::{UserContact, UserSummary};

/// A row from the `orders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: DbId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub city: Option<String>,
    pub maker_id: DbId,
    pub accounter_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    pub fn status(&self) -> Result<OrderStatus, CoreError> {
        self.status.parse()
    }
}

/// DTO for inserting an order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub title: Option<String>,
    pub description: String,
    pub status: OrderStatus,
    pub city: Option<String>,
    pub maker_id: DbId,
    pub accounter_id: Option<DbId>,
}

/// An order with everything the client renders: people, items and recent history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub maker: Option<UserSummary>,
    pub accounter: Option<UserSummary>,
    pub assigned_takers: Vec<UserContact>,
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<OrderLogEntry>>,
}

impl OrderDetails {
    /// Takers never see prices.
    pub fn hide_prices(&mut self) {
        for item in &mut self.items {
            item.price = None;
        }
    }
}

/// One page of a role-scoped order listing.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    pub orders: Vec<OrderDetails>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
