//! First-start data.

use ama_core::roles::Role;
use ama_db::models::user::CreateUser;
use ama_db::repositories::UserRepo;
use ama_db::DbPool;

use crate::auth::password::hash_password;
use crate::config::AdminSeed;
use crate::error::{AppError, AppResult};

/// Create the configured admin account unless an admin already exists.
///
/// Returns `true` if an account was created.
pub async fn seed_admin(pool: &DbPool, seed: &AdminSeed) -> AppResult<bool> {
    if UserRepo::admin_exists(pool).await? {
        return Ok(false);
    }

    let password_hash = hash_password(&seed.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    // Admins are approved on insert.
    let admin = UserRepo::create(
        pool,
        &CreateUser {
            username: seed.username.clone(),
            password_hash,
            role: Role::Admin,
            email: None,
        },
    )
    .await?;

    tracing::warn!(
        user_id = admin.id,
        username = %admin.username,
        "Default admin account created; change its password",
    );
    Ok(true)
}
