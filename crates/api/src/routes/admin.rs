//! Route definitions for the `/admin` resource.

use axum::routing::{delete, get, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. Every handler requires the admin role.
///
/// ```text
/// GET    /users                -> list_users
/// GET    /users/pending        -> list_pending_users
/// DELETE /users/{id}           -> delete_user
/// PUT    /users/{id}/approve   -> approve_user
/// PUT    /users/{id}/email     -> update_user_email
/// GET    /orders               -> list_orders
/// GET    /orders/{id}          -> get_order
/// DELETE /orders/{id}          -> delete_order
/// GET    /orders/{id}/logs     -> order_logs
/// GET    /logs                 -> activity_logs
/// GET    /logs/all             -> audit_feed
/// GET    /stats                -> dashboard_stats
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/pending", get(admin::list_pending_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/approve", put(admin::approve_user))
        .route("/users/{id}/email", put(admin::update_user_email))
        .route("/orders", get(admin::list_orders))
        .route(
            "/orders/{id}",
            get(admin::get_order).delete(admin::delete_order),
        )
        .route("/orders/{id}/logs", get(admin::order_logs))
        .route("/logs", get(admin::activity_logs))
        .route("/logs/all", get(admin::audit_feed))
        .route("/stats", get(admin::dashboard_stats))
}
