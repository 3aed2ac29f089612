//! Order change history.
//!
//! Every field change made through an order update produces one
//! [`HistoryEntry`], persisted as an `order_logs` row. The text formats are
//! read by people in the order detail view and in the admin audit feed.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::items::CleanItem;
use crate::status::{ItemStatus, OrderStatus};
use crate::types::DbId;

/// Placeholder used when a text field had no previous value.
const NONE_TEXT: &str = "None";

/// Placeholder used when an item had no collection status.
const NO_STATUS_TEXT: &str = "none";

/// One `order_logs` row before it is tied to an order and an editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub previous: String,
    pub new: String,
}

impl HistoryEntry {
    pub fn new(previous: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            previous: previous.into(),
            new: new.into(),
        }
    }
}

pub fn title_change(old: Option<&str>, new: &str) -> HistoryEntry {
    labelled_change("Title", old, new)
}

/// A city may be cleared, so the new value is optional too.
pub fn city_change(old: Option<&str>, new: Option<&str>) -> HistoryEntry {
    labelled_change("City", old, new.unwrap_or(NONE_TEXT))
}

pub fn description_change(old: Option<&str>, new: &str) -> HistoryEntry {
    labelled_change("Desc", old, new)
}

fn labelled_change(label: &str, old: Option<&str>, new: &str) -> HistoryEntry {
    let old = old.unwrap_or(NONE_TEXT);
    HistoryEntry::new(old, format!("{label}: {old} -> {new}"))
}

pub fn status_change(from: OrderStatus, to: OrderStatus) -> HistoryEntry {
    HistoryEntry::new(from.as_str(), format!("Status: {from} -> {to}"))
}

pub fn takers_changed() -> HistoryEntry {
    HistoryEntry::new("Takers Updated", "Updated Assigned Takers")
}

/// Whether two taker id lists name a different set of users.
pub fn takers_differ(current: &[DbId], requested: &[DbId]) -> bool {
    let current: BTreeSet<DbId> = current.iter().copied().collect();
    let requested: BTreeSet<DbId> = requested.iter().copied().collect();
    current != requested
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// An item as currently stored on the order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingItem {
    pub name: String,
    pub quantity: Decimal,
    pub status: Option<ItemStatus>,
}

/// An item row to insert after the old rows are deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRow {
    pub name: String,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub status: Option<ItemStatus>,
}

/// Result of replacing an order's item list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemDiff {
    pub entries: Vec<HistoryEntry>,
    pub rows: Vec<ItemRow>,
}

/// Compare the stored items with a sanitized replacement list.
///
/// Items are matched by exact name. Entries come out in this order: updates
/// and additions in new-list order, removals in old-list order, then status
/// changes on carried-over items. A carried-over item keeps its stored status
/// unless the new row sets one explicitly.
pub fn diff_items(old: &[ExistingItem], new: &[CleanItem]) -> ItemDiff {
    let old_by_name: HashMap<&str, &ExistingItem> =
        old.iter().rev().map(|item| (item.name.as_str(), item)).collect();

    let mut entries = Vec::new();
    let mut matched: Vec<&str> = Vec::new();

    for item in new {
        match old_by_name.get(item.name.as_str()) {
            Some(existing) => {
                matched.push(existing.name.as_str());
                if existing.quantity != item.quantity {
                    entries.push(HistoryEntry::new(
                        qty(existing.quantity),
                        format!(
                            "Updated {}: Qty {} -> {}",
                            item.name,
                            qty(existing.quantity),
                            qty(item.quantity)
                        ),
                    ));
                }
            }
            None => entries.push(HistoryEntry::new(
                NONE_TEXT,
                format!("Added: {} (Qty: {})", item.name, qty(item.quantity)),
            )),
        }
    }

    let mut removed_seen: BTreeSet<&str> = BTreeSet::new();
    for existing in old {
        let name = existing.name.as_str();
        if matched.contains(&name) || !removed_seen.insert(name) {
            continue;
        }
        entries.push(HistoryEntry::new(
            format!("{} ({})", existing.name, qty(existing.quantity)),
            format!("Removed: {}", existing.name),
        ));
    }

    let mut rows = Vec::with_capacity(new.len());
    for item in new {
        let previous = old_by_name.get(item.name.as_str());
        let carried = previous.and_then(|existing| existing.status);
        let status = item.status.or(carried);

        if previous.is_some() && carried != status {
            entries.push(HistoryEntry::new(
                format!("{}: {}", item.name, status_text(carried)),
                format!("{}: {}", item.name, status_text(status)),
            ));
        }

        rows.push(ItemRow {
            name: item.name.clone(),
            quantity: item.quantity,
            price: item.price,
            status,
        });
    }

    ItemDiff { entries, rows }
}

/// Rows for a freshly created order; nothing to carry over.
pub fn initial_rows(items: &[CleanItem]) -> Vec<ItemRow> {
    diff_items(&[], items).rows
}

fn qty(value: Decimal) -> String {
    value.normalize().to_string()
}

fn status_text(status: Option<ItemStatus>) -> &'static str {
    status.map(ItemStatus::as_str).unwrap_or(NO_STATUS_TEXT)
}
