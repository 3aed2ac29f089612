//! Order item models.

use ama_core::error::CoreError;
use ama_core::history::ExistingItem;
use ama_core::status::ItemStatus;
use ama_core::types::{DbId, Timestamp};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `order_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: DbId,
    pub order_id: DbId,
    pub name: String,
    pub quantity: Decimal,
    /// Omitted from responses when absent or hidden from the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub status: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OrderItem {
    pub fn item_status(&self) -> Result<Option<ItemStatus>, CoreError> {
        ItemStatus::parse_optional(self.status.as_deref())
    }

    /// The stored state that an item-list replacement is diffed against.
    pub fn to_existing(&self) -> Result<ExistingItem, CoreError> {
        Ok(ExistingItem {
            name: self.name.clone(),
            quantity: self.quantity,
            status: self.item_status()?,
        })
    }
}
