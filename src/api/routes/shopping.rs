//! Shopping List Routes
//!
//! - GET /api/v1/shopping-list - Entries for the drawn meals in a window plus manual items
//! - POST /api/v1/shopping-list - Add a manual item
//! - POST /api/v1/shopping-list/:id/toggle - Flip the purchased flag
//! - POST /api/v1/shopping-list/:id/quantity - Change a manual item's quantity
//! - PUT /api/v1/shopping-list/:id/aisle - Set the aisle of an entry's grocery
//! - DELETE /api/v1/shopping-list/:id - Remove a manual item
//! - POST /api/v1/shopping-list/clear-purchased - Remove purchased manual items
//! - GET /api/v1/shopping-list/export - Download the list as CSV

use axum::{
    extract::{Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, NaiveDate, Utc};

use crate::api::dto::{
    AddItemRequest, AisleRequest, ClearPurchasedResponse, QuantityRequest, QuantityResponse,
    ShoppingListParams, ShoppingListResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::RequireSession;
use crate::planner::{self, ShoppingListEntry};

/// Window from the query, defaulting to today and the six days after it
fn window(params: &ShoppingListParams) -> (NaiveDate, NaiveDate) {
    let start = params.start.unwrap_or_else(|| Utc::now().date_naive());
    let end = params.end.unwrap_or(start + Duration::days(6));
    (start, end)
}

/// GET /api/v1/shopping-list
pub async fn get_shopping_list(
    RequireSession(session): RequireSession,
    Query(params): Query<ShoppingListParams>,
) -> ApiResult<Json<ShoppingListResponse>> {
    let (start, end) = window(&params);
    let entries = session
        .workspace
        .shopping_list(start, end, params.include_purchased)
        .await?;

    Ok(Json(ShoppingListResponse {
        start,
        end,
        consolidated: planner::consolidate(&entries),
        unpurchased: entries.iter().filter(|e| !e.purchased).count(),
        entries,
    }))
}

/// POST /api/v1/shopping-list
pub async fn add_item(
    RequireSession(session): RequireSession,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<(StatusCode, Json<ShoppingListEntry>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    let entry = session
        .workspace
        .add_shopping_item(&req.name, req.quantity, req.units.as_deref(), req.aisle)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /api/v1/shopping-list/:id/toggle
pub async fn toggle_item(
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
) -> ApiResult<Json<ShoppingListEntry>> {
    Ok(Json(session.workspace.toggle_purchased(&id).await?))
}

/// POST /api/v1/shopping-list/:id/quantity
pub async fn adjust_quantity(
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
    Json(req): Json<QuantityRequest>,
) -> ApiResult<Json<QuantityResponse>> {
    let entry = session.workspace.adjust_quantity(&id, req.delta).await?;
    Ok(Json(QuantityResponse {
        removed: entry.is_none(),
        entry,
    }))
}

/// PUT /api/v1/shopping-list/:id/aisle
pub async fn set_aisle(
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
    Json(req): Json<AisleRequest>,
) -> ApiResult<Json<ShoppingListEntry>> {
    Ok(Json(session.workspace.set_aisle(&id, req.aisle).await?))
}

/// DELETE /api/v1/shopping-list/:id
pub async fn remove_item(
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    session.workspace.remove_entry(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/shopping-list/clear-purchased
pub async fn clear_purchased(
    RequireSession(session): RequireSession,
) -> ApiResult<Json<ClearPurchasedResponse>> {
    let removed = session.workspace.clear_purchased().await?;
    Ok(Json(ClearPurchasedResponse { removed }))
}

/// GET /api/v1/shopping-list/export
pub async fn export_csv(
    RequireSession(session): RequireSession,
    Query(params): Query<ShoppingListParams>,
) -> ApiResult<impl IntoResponse> {
    let (start, end) = window(&params);
    let entries = session
        .workspace
        .shopping_list(start, end, params.include_purchased)
        .await?;
    let body = planner::to_csv(&entries)?;

    let filename = format!("attachment; filename=\"shopping-list-{}.csv\"", start);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_defaults_to_a_week() {
        let start: NaiveDate = "2024-05-01".parse().unwrap();
        let params = ShoppingListParams {
            start: Some(start),
            end: None,
            include_purchased: false,
        };
        assert_eq!(window(&params), (start, "2024-05-07".parse().unwrap()));
    }
}
