//! Handlers for the `/items` resource.

use ama_core::search::normalize_term;
use ama_core::serde_util::double_option;
use ama_core::types::DbId;
use ama_db::models::order_item::OrderItem;
use ama_db::repositories::OrderItemRepo;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::engine::OrderLifecycle;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::SuggestionParams;
use crate::state::AppState;

/// Request body for `PATCH /items/{id}/status`. `null` clears the status; a
/// body without `status` is rejected.
#[derive(Debug, Deserialize)]
pub struct ItemStatusRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub status: Option<Option<String>>,
}

/// GET /api/items/suggestions?q=
///
/// Distinct item names matching the term, case-insensitively.
pub async fn name_suggestions(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<SuggestionParams>,
) -> AppResult<Json<Vec<String>>> {
    let Some(term) = normalize_term(params.q.as_deref()) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(OrderItemRepo::name_suggestions(&state.pool, &term).await?))
}

/// PATCH /api/items/{id}/status
pub async fn set_item_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<DbId>,
    Json(input): Json<ItemStatusRequest>,
) -> AppResult<Json<OrderItem>> {
    let item = OrderLifecycle::from_state(&state)
        .set_item_status(&auth.actor(), item_id, input.status.as_ref().map(Option::as_deref))
        .await?;
    Ok(Json(item))
}
