//! Cascading user deletion.

use ama_core::activity::{ACTION_USER_DELETED, TARGET_USER};
use ama_core::error::CoreError;
use ama_core::roles::Actor;
use ama_core::types::DbId;
use ama_db::models::activity_log::CreateActivityLog;
use ama_db::repositories::UserRepo;
use ama_db::DbPool;
use serde_json::json;

use crate::activity;
use crate::error::{AppError, AppResult};

/// Delete a user and everything that hangs off them.
///
/// Only admins reach this; an admin cannot delete their own account. The
/// cascade itself runs in one transaction inside [`UserRepo::delete_cascade`].
pub async fn delete_user(
    pool: &DbPool,
    actor: &Actor,
    user_id: DbId,
    ip: Option<String>,
) -> AppResult<()> {
    if !actor.is_admin() {
        return Err(CoreError::Forbidden("Admin role required".into()).into());
    }
    if actor.id == user_id {
        return Err(AppError::BadRequest("Cannot delete your own account".into()));
    }

    let user = UserRepo::find_by_id(pool, user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: user_id,
        })?;

    if !UserRepo::delete_cascade(pool, user_id).await? {
        return Err(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }
        .into());
    }

    tracing::info!(user_id, admin_id = actor.id, role = %user.role, "User deleted");

    activity::record(
        pool,
        CreateActivityLog::new(Some(actor.id), ACTION_USER_DELETED)
            .with_target(TARGET_USER, Some(user_id))
            .with_details(json!({
                "username": user.username,
                "role": user.role,
            }))
            .with_ip(ip),
    )
    .await;

    Ok(())
}
