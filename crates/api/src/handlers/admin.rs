//! Handlers for the `/admin` resource: user management, order oversight,
//! the activity log and dashboard statistics.
//!
//! All handlers require the `admin` role via [`RequireAdmin`].

use std::collections::BTreeMap;

use ama_core::activity::{ACTION_USER_APPROVED, ACTION_USER_EMAIL_UPDATED, TARGET_USER};
use ama_core::error::CoreError;
use ama_core::search::{clamp_limit, normalize_term};
use ama_core::status::OrderStatus;
use ama_core::types::DbId;
use ama_db::models::activity_log::{ActivityLog, ActivityQuery, CreateActivityLog};
use ama_db::models::order::OrderDetails;
use ama_db::models::order_log::OrderLogEntry;
use ama_db::models::user::{User, UserFilter, UserWithApprover};
use ama_db::repositories::order_repo::DetailOptions;
use ama_db::repositories::{ActivityLogRepo, OrderLogRepo, OrderRepo, UserRepo};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::ValidateEmail;

use crate::activity;
use crate::audit::{merge_feed, AuditEntry, DEFAULT_AUDIT_LIMIT, MAX_AUDIT_LIMIT};
use crate::engine::{users, OrderLifecycle};
use crate::error::{AppError, AppResult};
use crate::middleware::client_ip::ClientIp;
use crate::middleware::rbac::RequireAdmin;
use crate::query::LimitParams;
use crate::response::MessageResponse;
use crate::state::AppState;

/// Number of activity rows shown on the dashboard.
const DASHBOARD_ACTIVITY: i64 = 10;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /admin/users`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListParams {
    pub role: Option<String>,
    pub is_approved: Option<bool>,
    pub search: Option<String>,
}

/// Query parameters for `GET /admin/orders`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderParams {
    pub status: Option<String>,
    pub maker_id: Option<DbId>,
}

/// Request body for `PUT /admin/users/{id}/email`. Empty or `null` clears it.
#[derive(Debug, Deserialize)]
pub struct UpdateEmailRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedUser {
    pub id: DbId,
    pub username: String,
    pub role: String,
    pub is_approved: bool,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub message: String,
    pub user: ApprovedUser,
}

#[derive(Debug, Serialize)]
pub struct EmailUser {
    pub id: DbId,
    pub username: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateEmailResponse {
    pub message: String,
    pub user: EmailUser,
}

/// Dashboard counters.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub pending_approvals: i64,
    pub total_orders: i64,
    pub active_orders: i64,
    pub users_by_role: BTreeMap<String, i64>,
    pub recent_activity: Vec<ActivityLog>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// GET /api/admin/users
///
/// Filters: `role`, `isApproved`, `search` (username prefix).
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<UserListParams>,
) -> AppResult<Json<Vec<UserWithApprover>>> {
    let filter = UserFilter {
        role: normalize_term(params.role.as_deref()),
        is_approved: params.is_approved,
        search: normalize_term(params.search.as_deref()),
    };
    Ok(Json(UserRepo::list(&state.pool, &filter).await?))
}

/// GET /api/admin/users/pending
pub async fn list_pending_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(UserRepo::list_pending(&state.pool).await?))
}

/// PUT /api/admin/users/{id}/approve
pub async fn approve_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ClientIp(ip): ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApproveResponse>> {
    let user = find_user(&state, id).await?;
    if user.is_approved {
        return Err(AppError::BadRequest("User is already approved".into()));
    }

    let user = UserRepo::approve(&state.pool, id, admin.user_id)
        .await?
        .ok_or(CoreError::NotFound { entity: "User", id })?;

    tracing::info!(user_id = id, admin_id = admin.user_id, "User approved");

    activity::record(
        &state.pool,
        CreateActivityLog::new(Some(admin.user_id), ACTION_USER_APPROVED)
            .with_target(TARGET_USER, Some(id))
            .with_details(json!({ "approvedUser": user.username, "approvedRole": user.role }))
            .with_ip(ip),
    )
    .await;

    Ok(Json(ApproveResponse {
        message: "User approved successfully".into(),
        user: ApprovedUser {
            id: user.id,
            username: user.username,
            role: user.role,
            is_approved: user.is_approved,
        },
    }))
}

/// PUT /api/admin/users/{id}/email
pub async fn update_user_email(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ClientIp(ip): ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateEmailRequest>,
) -> AppResult<Json<UpdateEmailResponse>> {
    find_user(&state, id).await?;

    let email = normalize_term(input.email.as_deref());
    if let Some(address) = &email {
        if !address.validate_email() {
            return Err(CoreError::Validation("Invalid email format".into()).into());
        }
    }

    let user = UserRepo::update_email(&state.pool, id, email.as_deref())
        .await?
        .ok_or(CoreError::NotFound { entity: "User", id })?;

    activity::record(
        &state.pool,
        CreateActivityLog::new(Some(admin.user_id), ACTION_USER_EMAIL_UPDATED)
            .with_target(TARGET_USER, Some(id))
            .with_details(json!({ "username": user.username, "newEmail": email }))
            .with_ip(ip),
    )
    .await;

    Ok(Json(UpdateEmailResponse {
        message: "Email updated successfully".into(),
        user: EmailUser {
            id: user.id,
            username: user.username,
            email: user.email,
        },
    }))
}

/// DELETE /api/admin/users/{id}
///
/// Removes the user together with their orders, notifications, push
/// subscriptions and activity.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ClientIp(ip): ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    users::delete_user(&state.pool, &admin.actor(), id, ip).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// GET /api/admin/orders
///
/// Every order, newest first, optionally narrowed by exact `status` and
/// `makerId`. Not paginated.
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<AdminOrderParams>,
) -> AppResult<Json<Vec<OrderDetails>>> {
    let status = normalize_term(params.status.as_deref())
        .map(|s| s.parse::<OrderStatus>())
        .transpose()?;

    let orders = OrderRepo::list_all(&state.pool, status, params.maker_id).await?;
    let details = OrderRepo::with_details(&state.pool, orders, DetailOptions::default()).await?;
    Ok(Json(details))
}

/// GET /api/admin/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<OrderDetails>> {
    let order = OrderRepo::find_details(&state.pool, id, DetailOptions::default())
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Order",
            id,
        })?;
    Ok(Json(order))
}

/// GET /api/admin/orders/{id}/logs
///
/// Full change history of one order, newest first.
pub async fn order_logs(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<Vec<OrderLogEntry>>> {
    Ok(Json(OrderLogRepo::list_for_order(&state.pool, id).await?))
}

/// DELETE /api/admin/orders/{id}
pub async fn delete_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ClientIp(ip): ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    OrderLifecycle::from_state(&state)
        .delete(&admin.actor(), id, ip)
        .await?;
    Ok(Json(MessageResponse::new("Order deleted successfully")))
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// GET /api/admin/logs
///
/// Filters: `action`, `userId`, `startDate`, `endDate`, `limit` (default 100).
pub async fn activity_logs(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<ActivityQuery>,
) -> AppResult<Json<Vec<ActivityLog>>> {
    Ok(Json(ActivityLogRepo::query(&state.pool, &params).await?))
}

/// GET /api/admin/logs/all
///
/// Activity and order changes merged into one feed, newest first.
pub async fn audit_feed(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<LimitParams>,
) -> AppResult<Json<Vec<AuditEntry>>> {
    let limit = clamp_limit(params.limit, DEFAULT_AUDIT_LIMIT, MAX_AUDIT_LIMIT);

    let (activity, changes) = tokio::try_join!(
        ActivityLogRepo::recent(&state.pool, limit),
        OrderLogRepo::recent_changes(&state.pool, limit),
    )?;

    Ok(Json(merge_feed(activity, changes, limit)))
}

/// GET /api/admin/stats
pub async fn dashboard_stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DashboardStats>> {
    let pool = &state.pool;
    let (total_users, pending_approvals, total_orders, active_orders, by_role, recent_activity) =
        tokio::try_join!(
            UserRepo::count_non_admin(pool),
            UserRepo::count_pending(pool),
            OrderRepo::count_all(pool),
            OrderRepo::count_in_flight(pool),
            UserRepo::count_by_role(pool),
            ActivityLogRepo::recent(pool, DASHBOARD_ACTIVITY),
        )?;

    Ok(Json(DashboardStats {
        total_users,
        pending_approvals,
        total_orders,
        active_orders,
        users_by_role: by_role.into_iter().map(|r| (r.role, r.count)).collect(),
        recent_activity,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_user(state: &AppState, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| CoreError::NotFound { entity: "User", id }.into())
}
