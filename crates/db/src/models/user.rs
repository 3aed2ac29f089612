//! User entity models and DTOs.

use ama_core::error::CoreError;
use ama_core::roles::Role;
use ama_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: DbId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_approved: bool,
    pub email: Option<String>,
    pub approved_by: Option<DbId>,
    pub approved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn role(&self) -> Result<Role, CoreError> {
        self.role.parse()
    }
}

/// A user as embedded in other responses.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct UserSummary {
    pub id: DbId,
    pub username: String,
    pub role: String,
}

/// A user with the address needed to email them.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct UserContact {
    pub id: DbId,
    pub username: String,
    pub email: Option<String>,
}

/// A user as listed on the admin users page, with the approver's name.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithApprover {
    pub id: DbId,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub is_approved: bool,
    pub approved_by: Option<DbId>,
    pub approved_at: Option<Timestamp>,
    pub approver_username: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for inserting a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub email: Option<String>,
}

/// Filters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<String>,
    pub is_approved: Option<bool>,
    /// Username prefix.
    pub search: Option<String>,
}

/// Number of non-admin users per role.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}
