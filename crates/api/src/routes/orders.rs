//! Route definitions for the `/orders` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::orders;
use crate::state::AppState;

/// Routes mounted at `/orders`.
///
/// ```text
/// GET    /              -> list_orders
/// POST   /              -> create_order
/// GET    /maker         -> list_maker_orders
/// GET    /taker         -> list_taker_orders
/// GET    /accounter     -> list_accounter_orders
/// GET    /admin         -> list_admin_orders
/// GET    /suggestions   -> title_suggestions
/// POST   /bulk-email    -> bulk_email
/// PUT    /{id}          -> update_order
/// DELETE /{id}          -> delete_order
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route("/maker", get(orders::list_maker_orders))
        .route("/taker", get(orders::list_taker_orders))
        .route("/accounter", get(orders::list_accounter_orders))
        .route("/admin", get(orders::list_admin_orders))
        .route("/suggestions", get(orders::title_suggestions))
        .route("/bulk-email", post(orders::bulk_email))
        .route(
            "/{id}",
            put(orders::update_order).delete(orders::delete_order),
        )
}
