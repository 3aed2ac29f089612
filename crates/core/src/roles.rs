//! User roles.
//!
//! Role names are stored as text in `users.role` and must match the CHECK
//! constraint in `20260101000001_create_users.sql`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

pub const ROLE_MAKER: &str = "maker";
pub const ROLE_TAKER: &str = "taker";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_ACCOUNTER: &str = "accounter";

/// The four roles that take part in the order workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Creates and owns orders.
    Maker,
    /// Collects items for orders it is assigned to.
    Taker,
    /// Sees and edits everything.
    Admin,
    /// Enters completed orders into the ERP.
    Accounter,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Maker, Role::Taker, Role::Admin, Role::Accounter];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Maker => ROLE_MAKER,
            Role::Taker => ROLE_TAKER,
            Role::Admin => ROLE_ADMIN,
            Role::Accounter => ROLE_ACCOUNTER,
        }
    }

    /// Admins are approved at creation; every other role waits for an admin.
    pub fn is_auto_approved(self) -> bool {
        self == Role::Admin
    }

    /// Roles allowed to create orders.
    pub fn can_create_orders(self) -> bool {
        matches!(self, Role::Maker | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_MAKER => Ok(Role::Maker),
            ROLE_TAKER => Ok(Role::Taker),
            ROLE_ADMIN => Ok(Role::Admin),
            ROLE_ACCOUNTER => Ok(Role::Accounter),
            other => Err(CoreError::Validation(format!(
                "Invalid role '{other}'. Must be one of: maker, taker, admin, accounter"
            ))),
        }
    }
}

/// The authenticated caller of a core operation.
///
/// Built by the auth layer from a verified token; the core trusts it as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: DbId,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: DbId, username: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            username: username.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
