//! Meal Routes
//!
//! CRUD endpoints for the meals in the active household's hat.
//!
//! - GET /api/v1/meals - List meals, sorted by title
//! - POST /api/v1/meals - Add a meal
//! - GET /api/v1/meals/:id - Get a meal
//! - PUT /api/v1/meals/:id - Replace a meal
//! - DELETE /api/v1/meals/:id - Delete a meal
//!
//! Drawn meals that reference a deleted meal are kept; they show without a
//! title.

use axum::{extract::Path, http::StatusCode, Json};

use crate::api::dto::{MealListResponse, MealRequest};
use crate::api::error::ApiResult;
use crate::api::extract::RequireSession;
use crate::planner::Meal;

/// GET /api/v1/meals
pub async fn list_meals(RequireSession(session): RequireSession) -> ApiResult<Json<MealListResponse>> {
    let meals = session.workspace.meals().await?;
    Ok(Json(MealListResponse {
        total: meals.len(),
        meals,
    }))
}

/// GET /api/v1/meals/:id
pub async fn get_meal(
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
) -> ApiResult<Json<Meal>> {
    Ok(Json(session.workspace.meal(&id).await?))
}

/// POST /api/v1/meals
pub async fn create_meal(
    RequireSession(session): RequireSession,
    Json(req): Json<MealRequest>,
) -> ApiResult<(StatusCode, Json<Meal>)> {
    let meal = session.workspace.add_meal(req.into_meal()).await?;
    Ok((StatusCode::CREATED, Json(meal)))
}

/// PUT /api/v1/meals/:id
pub async fn update_meal(
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
    Json(req): Json<MealRequest>,
) -> ApiResult<Json<Meal>> {
    Ok(Json(session.workspace.update_meal(&id, req.into_meal()).await?))
}

/// DELETE /api/v1/meals/:id
pub async fn delete_meal(
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    session.workspace.delete_meal(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
