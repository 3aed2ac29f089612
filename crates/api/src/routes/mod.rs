pub mod admin;
pub mod auth;
pub mod health;
pub mod items;
pub mod notifications;
pub mod orders;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                   register (public)
/// /auth/login                                      login (public)
/// /auth/me                                         current user
/// /auth/takers                                     taker picker
/// /auth/accounters                                 accounter picker
///
/// /orders                                          list (own role), create
/// /orders/maker | /taker | /accounter | /admin     role-specific listings
/// /orders/suggestions                              title typeahead
/// /orders/bulk-email                               digest email to takers (POST)
/// /orders/{id}                                     update (PUT), delete
///
/// /items/suggestions                               item name typeahead
/// /items/{id}/status                               set collection status (PATCH)
///
/// /notifications                                   list own
/// /notifications/unread-count                      unread counter
/// /notifications/read-all                          mark all read (PUT)
/// /notifications/{id}/read                         mark one read (PUT)
/// /notifications/subscribe                         push subscription (POST)
///
/// /admin/users                                     list (admin only)
/// /admin/users/pending                             awaiting approval
/// /admin/users/{id}                                delete
/// /admin/users/{id}/approve                        approve (PUT)
/// /admin/users/{id}/email                          update email (PUT)
/// /admin/orders                                    list with details
/// /admin/orders/{id}                               get, delete
/// /admin/orders/{id}/logs                          change history
/// /admin/logs                                      activity log query
/// /admin/logs/all                                  merged audit feed
/// /admin/stats                                     dashboard counters
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/orders", orders::router())
        .nest("/items", items::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
}
