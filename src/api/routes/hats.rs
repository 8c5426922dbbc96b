//! Meal Hat Routes
//!
//! - GET /api/v1/meal-hats - The user's own household and every hat they joined
//! - POST /api/v1/meal-hats - Create a hat
//! - POST /api/v1/meal-hats/:name/join - Join a hat by its shared name
//! - POST /api/v1/meal-hats/switch - Make another household active

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{CreateHatRequest, HatListResponse, SwitchHatRequest, SwitchHatResponse};
use crate::api::error::ApiResult;
use crate::api::extract::RequireSession;
use crate::api::state::AppState;
use crate::household::{self, HouseholdKey, MealHat};

/// GET /api/v1/meal-hats
pub async fn list_hats(
    State(state): State<Arc<AppState>>,
    RequireSession(session): RequireSession,
) -> ApiResult<Json<HatListResponse>> {
    let hats = household::list_hats(&state.store, &session.user, &session.email).await?;
    Ok(Json(HatListResponse {
        active: session.workspace.household().await,
        hats,
    }))
}

/// POST /api/v1/meal-hats
pub async fn create_hat(
    State(state): State<Arc<AppState>>,
    RequireSession(session): RequireSession,
    Json(req): Json<CreateHatRequest>,
) -> ApiResult<(StatusCode, Json<MealHat>)> {
    let hat = household::create_hat(&state.store, &session.user, &session.email, &req.name).await?;
    Ok((StatusCode::CREATED, Json(hat)))
}

/// POST /api/v1/meal-hats/:name/join
pub async fn join_hat(
    State(state): State<Arc<AppState>>,
    RequireSession(session): RequireSession,
    Path(name): Path<String>,
) -> ApiResult<Json<MealHat>> {
    Ok(Json(household::join_hat(&state.store, &session.user, &name).await?))
}

/// POST /api/v1/meal-hats/switch
pub async fn switch_hat(
    State(state): State<Arc<AppState>>,
    RequireSession(session): RequireSession,
    Json(req): Json<SwitchHatRequest>,
) -> ApiResult<Json<SwitchHatResponse>> {
    let key = HouseholdKey::parse(&req.key)?;
    let switched = session.switch(&state.store, key.clone()).await?;
    Ok(Json(SwitchHatResponse {
        household: key,
        switched,
    }))
}
