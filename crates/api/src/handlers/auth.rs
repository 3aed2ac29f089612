//! Handlers for the `/auth` resource (register, login, profile, user pickers).

use ama_core::activity::{ACTION_USER_LOGIN, ACTION_USER_REGISTERED, TARGET_USER};
use ama_core::error::CoreError;
use ama_core::roles::Role;
use ama_core::types::DbId;
use ama_db::models::activity_log::CreateActivityLog;
use ama_db::models::user::{CreateUser, UserSummary};
use ama_db::repositories::UserRepo;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::activity;
use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client_ip::ClientIp;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    pub role: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub requires_approval: bool,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public user info returned by login and `/auth/me`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub role: String,
    pub is_approved: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserInfo,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/register
///
/// Create an account. Admin accounts are approved immediately; every other
/// role waits for an admin.
pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    input.validate()?;
    let role: Role = input.role.parse()?;

    let username = input.username.trim().to_string();
    if username.is_empty() {
        return Err(CoreError::Validation("Username is required".into()).into());
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let email = input
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string);

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username,
            password_hash,
            role,
            email,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, role = %user.role, "User registered");

    activity::record(
        &state.pool,
        CreateActivityLog::new(Some(user.id), ACTION_USER_REGISTERED)
            .with_target(TARGET_USER, Some(user.id))
            .with_details(json!({ "username": user.username, "role": user.role }))
            .with_ip(ip),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".into(),
            requires_approval: !role.is_auto_approved(),
        }),
    ))
}

/// POST /api/auth/login
///
/// Authenticate with username + password and receive a bearer token.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid credentials".into()));

    let user = UserRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(invalid)?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(invalid());
    }

    let role = user.role()?;
    if !role.is_auto_approved() && !user.is_approved {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account pending admin approval".into(),
        )));
    }

    let token = generate_access_token(user.id, &user.username, role.as_str(), &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(user_id = user.id, role = %role, "User logged in");

    activity::record(
        &state.pool,
        CreateActivityLog::new(Some(user.id), ACTION_USER_LOGIN)
            .with_target(TARGET_USER, Some(user.id))
            .with_details(json!({ "username": user.username }))
            .with_ip(ip),
    )
    .await;

    Ok(Json(LoginResponse {
        token,
        user: UserInfo {
            id: user.id,
            username: user.username,
            role: user.role,
            is_approved: user.is_approved,
        },
    }))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<MeResponse>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        })?;

    Ok(Json(MeResponse {
        user: UserInfo {
            id: user.id,
            username: user.username,
            role: user.role,
            is_approved: user.is_approved,
        },
    }))
}

/// GET /api/auth/takers
pub async fn takers(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(UserRepo::list_by_role(&state.pool, Role::Taker).await?))
}

/// GET /api/auth/accounters
pub async fn accounters(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(UserRepo::list_by_role(&state.pool, Role::Accounter).await?))
}
