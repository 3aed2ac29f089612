//! Handlers for the `/orders` resource.
//!
//! Every write goes through [`OrderLifecycle`]; the handlers only extract the
//! caller, the client address and the body.

use ama_core::error::CoreError;
use ama_core::lifecycle::{CreateOrderInput, UpdateOrderInput};
use ama_core::roles::Role;
use ama_core::types::DbId;
use ama_core::visibility::{
    accounter_scope, admin_scope, maker_scope, strategy_for, taker_scope, ListFilters,
    ScopeStrategy,
};
use ama_db::models::order::{OrderDetails, OrderPage};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::engine::OrderLifecycle;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client_ip::ClientIp;
use crate::middleware::rbac::RequireOrderCreator;
use crate::query::SuggestionParams;
use crate::response::MessageResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /orders/bulk-email`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEmailRequest {
    #[serde(default)]
    pub order_ids: Vec<DbId>,
    #[serde(default)]
    pub taker_ids: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct BulkEmailResponse {
    pub message: String,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// POST /api/orders
///
/// Create an order. Makers and admins only.
pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientIp(ip): ClientIp,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<OrderDetails>)> {
    let order = OrderLifecycle::from_state(&state)
        .create(&auth.actor(), input, ip)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// PUT /api/orders/{id}
///
/// Partial update. What the caller may change depends on their authority
/// over the order; see [`OrderLifecycle::update`].
pub async fn update_order(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateOrderInput>,
) -> AppResult<Json<OrderDetails>> {
    let order = OrderLifecycle::from_state(&state)
        .update(&auth.actor(), id, input, ip)
        .await?;
    Ok(Json(order))
}

/// DELETE /api/orders/{id}
pub async fn delete_order(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    OrderLifecycle::from_state(&state)
        .delete(&auth.actor(), id, ip)
        .await?;
    Ok(Json(MessageResponse::new("Order deleted successfully")))
}

/// POST /api/orders/bulk-email
///
/// Email each selected taker one digest of the selected orders.
pub async fn bulk_email(
    State(state): State<AppState>,
    RequireOrderCreator(auth): RequireOrderCreator,
    Json(input): Json<BulkEmailRequest>,
) -> AppResult<Json<BulkEmailResponse>> {
    let count = OrderLifecycle::from_state(&state)
        .bulk_email(&auth.actor(), &input.order_ids, &input.taker_ids)
        .await?;
    Ok(Json(BulkEmailResponse {
        message: "Bulk emails sent successfully".into(),
        count,
    }))
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// GET /api/orders
///
/// Orders visible to the caller under their own role's rules.
pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filters): Query<ListFilters>,
) -> AppResult<Json<OrderPage>> {
    list_with(&state, &auth, strategy_for(auth.role), &filters).await
}

/// GET /api/orders/maker
pub async fn list_maker_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filters): Query<ListFilters>,
) -> AppResult<Json<OrderPage>> {
    require_role(&auth, &[Role::Maker], "Only makers can view their orders")?;
    list_with(&state, &auth, maker_scope, &filters).await
}

/// GET /api/orders/taker
pub async fn list_taker_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filters): Query<ListFilters>,
) -> AppResult<Json<OrderPage>> {
    require_role(&auth, &[Role::Taker], "Only takers can view their orders")?;
    list_with(&state, &auth, taker_scope, &filters).await
}

/// GET /api/orders/accounter
///
/// Admins may pass `accounterId` to list on behalf of an accounter.
pub async fn list_accounter_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filters): Query<ListFilters>,
) -> AppResult<Json<OrderPage>> {
    require_role(
        &auth,
        &[Role::Accounter, Role::Admin],
        "Only accounters or admins can view ERP-entered orders",
    )?;
    list_with(&state, &auth, accounter_scope, &filters).await
}

/// GET /api/orders/admin
pub async fn list_admin_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filters): Query<ListFilters>,
) -> AppResult<Json<OrderPage>> {
    require_role(&auth, &[Role::Admin], "Only admins can view all orders")?;
    list_with(&state, &auth, admin_scope, &filters).await
}

/// GET /api/orders/suggestions?q=
///
/// Titles of the caller's own orders.
pub async fn title_suggestions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SuggestionParams>,
) -> AppResult<Json<Vec<String>>> {
    let titles = OrderLifecycle::from_state(&state)
        .title_suggestions(&auth.actor(), params.q.as_deref())
        .await?;
    Ok(Json(titles))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn list_with(
    state: &AppState,
    auth: &AuthUser,
    strategy: ScopeStrategy,
    filters: &ListFilters,
) -> AppResult<Json<OrderPage>> {
    let page = OrderLifecycle::from_state(state)
        .list(&auth.actor(), strategy, filters)
        .await?;
    Ok(Json(page))
}

fn require_role(auth: &AuthUser, allowed: &[Role], message: &str) -> Result<(), AppError> {
    if allowed.contains(&auth.role) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(message.into()).into())
    }
}
