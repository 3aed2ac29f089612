//! Handlers for the `/notifications` resource (in-app inbox and push subscriptions).
//!
//! All handlers act on the authenticated caller's own notifications.

use ama_core::error::CoreError;
use ama_core::search::NOTIFICATION_LIMIT;
use ama_core::types::DbId;
use ama_db::models::notification::Notification;
use ama_db::models::push_subscription::CreatePushSubscription;
use ama_db::repositories::{NotificationRepo, PushSubscriptionRepo};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{CountResponse, MessageResponse};
use crate::state::AppState;

/// GET /api/notifications
///
/// The caller's newest notifications, read and unread.
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications =
        NotificationRepo::list_for_user(&state.pool, auth.user_id, NOTIFICATION_LIMIT).await?;
    Ok(Json(notifications))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<CountResponse>> {
    let count = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;
    Ok(Json(CountResponse { count }))
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<Notification>> {
    let notification = NotificationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Notification",
            id,
        })?;

    if notification.user_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot modify another user's notification".into(),
        )));
    }

    let updated = NotificationRepo::mark_read(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Notification",
            id,
        })?;
    Ok(Json(updated))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<MessageResponse>> {
    let updated = NotificationRepo::mark_all_read(&state.pool, auth.user_id).await?;
    tracing::debug!(user_id = auth.user_id, updated, "Notifications marked read");
    Ok(Json(MessageResponse::new("All marked as read")))
}

/// POST /api/notifications/subscribe
///
/// Register a browser push subscription for the caller. Re-subscribing an
/// existing endpoint moves it to the caller.
pub async fn subscribe(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreatePushSubscription>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    if input.endpoint.trim().is_empty() {
        return Err(AppError::BadRequest("Subscription endpoint is required".into()));
    }

    let subscription = PushSubscriptionRepo::upsert(&state.pool, auth.user_id, &input).await?;
    tracing::info!(
        user_id = auth.user_id,
        subscription_id = subscription.id,
        "Push subscription stored",
    );

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Subscribed successfully")),
    ))
}
