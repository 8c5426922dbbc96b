//! Auth Routes
//!
//! - POST /api/v1/auth/login - Verify a credential and start a session
//! - POST /api/v1/auth/resume - Start a session from a stored email/household pair
//! - POST /api/v1/auth/logout - End the session
//! - GET /api/v1/auth/session - Current session state (anonymous or authenticated)

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{LoginRequest, LoginResponse, LogoutResponse, ResumeRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::BearerToken;
use crate::api::state::AppState;
use crate::auth::SessionState;

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if req.credential.trim().is_empty() {
        return Err(ApiError::Validation("credential is required".to_string()));
    }

    let session = state.sessions.login(&req.credential).await?;
    Ok(Json(LoginResponse {
        token: session.id.clone(),
        state: session.state().await,
    }))
}

/// POST /api/v1/auth/resume
pub async fn resume(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResumeRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if req.credential.trim().is_empty() {
        return Err(ApiError::Validation("credential is required".to_string()));
    }

    let session = state
        .sessions
        .resume(&req.credential, &req.email, &req.household_key)
        .await?;
    Ok(Json(LoginResponse {
        token: session.id.clone(),
        state: session.state().await,
    }))
}

/// POST /api/v1/auth/logout
///
/// Idempotent: logging out an unknown token reports `logged_out: false`.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
) -> Json<LogoutResponse> {
    let logged_out = match token {
        Some(token) => state.sessions.logout(&token).await,
        None => false,
    };
    Json(LogoutResponse { logged_out })
}

/// GET /api/v1/auth/session
pub async fn session_state(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
) -> Json<SessionState> {
    Json(state.sessions.state(token.as_deref()).await)
}
