//! Order lifecycle rules.
//!
//! Pure authorization and transition checks used by the order engine in the
//! API crate. Nothing here touches the database: callers load the order, ask
//! these functions what the actor may do, then write.
//!
//! ```text
//! archived ──send──> pending <──> in-progress <──> completed ──> entered_erp
//! ```
//!
//! Owners and admins may jump between any two states. Assigned takers move
//! orders within `pending`/`in-progress`/`completed`. The routed accounter
//! only marks completed orders as entered into the ERP.

use serde::Deserialize;

use crate::error::CoreError;
use crate::items::RawItem;
use crate::roles::{Actor, Role};
use crate::serde_util::{double_option, double_optional_id, optional_id};
use crate::status::OrderStatus;
use crate::types::DbId;

/// Description given to an order created without one.
pub fn default_description(item_count: usize) -> String {
    if item_count > 0 {
        format!("Order with {item_count} items")
    } else {
        "New Order".to_string()
    }
}

/// Orders start as drafts (`archived`) or go straight to `pending`.
pub fn initial_status(requested: Option<&str>) -> OrderStatus {
    match requested {
        Some("archived") => OrderStatus::Archived,
        _ => OrderStatus::Pending,
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Body of `POST /orders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<RawItem>,
    pub city: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub assigned_taker_ids: Vec<DbId>,
    #[serde(default, deserialize_with = "optional_id")]
    pub accounter_id: Option<DbId>,
}

/// Body of `PUT /orders/{id}`. Every field is optional.
///
/// `accounterId` and `city` accept an explicit `null` to clear the value;
/// `accounterId` also accepts `""`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderInput {
    pub status: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub items: Option<Vec<RawItem>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_taker_ids: Option<Option<Vec<DbId>>>,
    #[serde(default, deserialize_with = "double_optional_id")]
    pub accounter_id: Option<Option<DbId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default)]
    pub skip_email: bool,
}

impl UpdateOrderInput {
    /// The requested status, ignoring an empty string.
    pub fn requested_status(&self) -> Result<Option<OrderStatus>, CoreError> {
        match self.status.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }

    /// The requested taker set, with `null` meaning "nobody".
    pub fn requested_takers(&self) -> Option<Vec<DbId>> {
        self.assigned_taker_ids
            .as_ref()
            .map(|ids| ids.clone().unwrap_or_default())
    }

    /// Whether any order detail (title, description, items, takers, city) is present.
    pub fn touches_details(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.items.is_some()
            || self.assigned_taker_ids.is_some()
            || self.city.is_some()
    }

    /// Whether any field other than status is present.
    pub fn touches_edit_fields(&self) -> bool {
        self.touches_details() || self.accounter_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// Authority
// ---------------------------------------------------------------------------

/// The capacity in which an actor acts on a specific order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Admin,
    /// The maker who created the order.
    Owner,
    /// A taker listed in the order's assignments.
    AssignedTaker,
    /// The accounter the order is routed to.
    Accounter,
}

/// The parts of an order that decide who may act on it.
#[derive(Debug, Clone, Copy)]
pub struct OrderAccess<'a> {
    pub maker_id: DbId,
    pub accounter_id: Option<DbId>,
    pub assigned_taker_ids: &'a [DbId],
}

/// Work out in which capacity `actor` may modify the order, if at all.
pub fn resolve_authority(actor: &Actor, order: OrderAccess<'_>) -> Result<Authority, CoreError> {
    match actor.role {
        Role::Accounter => {
            if order.accounter_id == Some(actor.id) {
                Ok(Authority::Accounter)
            } else {
                Err(CoreError::Forbidden(
                    "Not authorized to process this order".into(),
                ))
            }
        }
        Role::Admin => Ok(Authority::Admin),
        _ if order.maker_id == actor.id => Ok(Authority::Owner),
        _ if order.assigned_taker_ids.contains(&actor.id) => Ok(Authority::AssignedTaker),
        _ => Err(CoreError::Forbidden("Not authorized to edit this order".into())),
    }
}

pub fn ensure_can_create(actor: &Actor) -> Result<(), CoreError> {
    if actor.role.can_create_orders() {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Only makers or admins can create orders".into(),
        ))
    }
}

pub fn ensure_can_delete(actor: &Actor, maker_id: DbId) -> Result<(), CoreError> {
    if actor.is_admin() || (actor.role == Role::Maker && actor.id == maker_id) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "You can only delete your own orders".into(),
        ))
    }
}

/// Only the owner and admins may route an order to an accounter.
pub fn ensure_can_change_accounter(authority: Authority) -> Result<(), CoreError> {
    match authority {
        Authority::Admin | Authority::Owner => Ok(()),
        _ => Err(CoreError::Forbidden(
            "Only makers or admins can assign an accounter".into(),
        )),
    }
}

/// Accounter updates are status-only and only ever target `entered_erp`.
pub fn check_accounter_update(
    input: &UpdateOrderInput,
    current: OrderStatus,
) -> Result<(), CoreError> {
    if input.touches_edit_fields() {
        return Err(CoreError::Forbidden(
            "Accounters cannot edit order details".into(),
        ));
    }
    if input.requested_status()? != Some(OrderStatus::EnteredErp) {
        return Err(CoreError::Validation(
            "Accounter can only mark orders as entered to ERP".into(),
        ));
    }
    if !OrderStatus::ACCOUNTING.contains(&current) {
        return Err(CoreError::Validation(
            "Order must be completed before entering ERP".into(),
        ));
    }
    Ok(())
}

/// Check a status transition for an actor that already passed [`resolve_authority`].
pub fn check_status_change(
    authority: Authority,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<(), CoreError> {
    match authority {
        Authority::Admin => Ok(()),
        Authority::Owner => {
            if from == OrderStatus::EnteredErp && to != OrderStatus::EnteredErp {
                Err(CoreError::Forbidden(
                    "Only admins can reopen an order entered into ERP".into(),
                ))
            } else {
                Ok(())
            }
        }
        Authority::AssignedTaker => {
            let allowed = &OrderStatus::TAKER_WORKFLOW;
            if allowed.contains(&from) && allowed.contains(&to) {
                Ok(())
            } else {
                Err(CoreError::Forbidden(format!(
                    "Takers cannot move an order from '{from}' to '{to}'"
                )))
            }
        }
        Authority::Accounter => {
            if to == OrderStatus::EnteredErp {
                Ok(())
            } else {
                Err(CoreError::Validation(
                    "Accounter can only mark orders as entered to ERP".into(),
                ))
            }
        }
    }
}
