//! Grocery Catalog Routes
//!
//! - GET /api/v1/groceries - List the catalog
//! - POST /api/v1/groceries - Add an item (returns the existing one on a name match)
//! - GET /api/v1/groceries/suggest?q= - Name suggestions for autocomplete

use axum::{extract::Query, http::StatusCode, Json};

use crate::api::dto::{GroceryListResponse, GroceryRequest, SuggestParams};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::RequireSession;
use crate::planner::GroceryCatalogItem;

/// GET /api/v1/groceries
pub async fn list_groceries(
    RequireSession(session): RequireSession,
) -> ApiResult<Json<GroceryListResponse>> {
    let items = session.workspace.catalog().await?.items().to_vec();
    Ok(Json(GroceryListResponse {
        total: items.len(),
        items,
    }))
}

/// POST /api/v1/groceries
pub async fn add_grocery(
    RequireSession(session): RequireSession,
    Json(req): Json<GroceryRequest>,
) -> ApiResult<(StatusCode, Json<GroceryCatalogItem>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    let item = session
        .workspace
        .add_grocery(&req.name, req.default_units.as_deref(), req.default_aisle)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/v1/groceries/suggest
pub async fn suggest(
    RequireSession(session): RequireSession,
    Query(params): Query<SuggestParams>,
) -> ApiResult<Json<Vec<GroceryCatalogItem>>> {
    let limit = params.limit.clamp(1, 50);
    Ok(Json(session.workspace.suggest(&params.q, limit).await?))
}
