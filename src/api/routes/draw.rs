//! Draw Routes
//!
//! - POST /api/v1/draw - Draw meals for every open date in a range
//! - POST /api/v1/draw/redraw - Replace the meal drawn for one date
//! - GET /api/v1/drawn-meals?view=future|history - Scheduled meals
//! - DELETE /api/v1/drawn-meals/:id - Remove a drawn meal
//! - GET /api/v1/home - Upcoming meals and shopping summary

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};

use crate::api::dto::{
    DrawRequest, DrawResponse, DrawnMealView, DrawnMealsParams, DrawnMealsResponse, RedrawRequest,
    RedrawResponse,
};
use crate::api::error::ApiResult;
use crate::api::extract::RequireSession;
use crate::household::HomeSummary;

/// POST /api/v1/draw
///
/// Responds 422 when no date in the range could be filled.
pub async fn draw_meals(
    RequireSession(session): RequireSession,
    Json(req): Json<DrawRequest>,
) -> ApiResult<(StatusCode, Json<DrawResponse>)> {
    let mut rng = StdRng::from_os_rng();
    let outcome = session.workspace.draw(req.start, req.end, &mut rng).await?;
    let drawn = session.workspace.scheduled(&outcome.drawn).await?;

    let status = if drawn.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(DrawResponse {
            drawn,
            skipped: outcome.skipped,
            unfilled: outcome.unfilled,
        }),
    ))
}

/// POST /api/v1/draw/redraw
pub async fn redraw_meal(
    RequireSession(session): RequireSession,
    Json(req): Json<RedrawRequest>,
) -> ApiResult<Json<RedrawResponse>> {
    let mut rng = StdRng::from_os_rng();
    let drawn = session.workspace.redraw(req.date, &mut rng).await?;
    let title = session
        .workspace
        .scheduled(std::slice::from_ref(&drawn))
        .await?
        .pop()
        .and_then(|s| s.title);

    Ok(Json(RedrawResponse { drawn, title }))
}

/// GET /api/v1/drawn-meals
pub async fn list_drawn_meals(
    RequireSession(session): RequireSession,
    Query(params): Query<DrawnMealsParams>,
) -> ApiResult<Json<DrawnMealsResponse>> {
    let partition = session.workspace.drawn_meals(Utc::now()).await?;
    let records = match params.view {
        DrawnMealView::Future => partition.future,
        DrawnMealView::History => partition.history,
    };

    Ok(Json(DrawnMealsResponse {
        view: params.view,
        meals: session.workspace.scheduled(&records).await?,
    }))
}

/// DELETE /api/v1/drawn-meals/:id
pub async fn delete_drawn_meal(
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    session.workspace.delete_drawn_meal(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/home
pub async fn home(RequireSession(session): RequireSession) -> ApiResult<Json<HomeSummary>> {
    Ok(Json(session.workspace.home(Utc::now()).await?))
}
