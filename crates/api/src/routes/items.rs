//! Route definitions for the `/items` resource.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::items;
use crate::state::AppState;

/// Routes mounted at `/items`.
///
/// ```text
/// GET   /suggestions    -> name_suggestions
/// PATCH /{id}/status    -> set_item_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/suggestions", get(items::name_suggestions))
        .route("/{id}/status", patch(items::set_item_status))
}
