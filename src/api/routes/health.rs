//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (ready to serve traffic)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Kubernetes readiness probe.
/// Returns 503 once the store has stopped accepting writes.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    match check_storage_health(&state).await {
        true => StatusCode::OK,
        false => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let storage_ok = check_storage_health(&state).await;
    let stats = state.store.stats().await;
    tracing::debug!(%stats, "Health check");

    Json(HealthResponse {
        status: if storage_ok { "healthy" } else { "unhealthy" }.to_string(),
        storage: if storage_ok { "ok" } else { "shut_down" }.to_string(),
        uptime_seconds: state.uptime_seconds(),
        sessions: state.sessions.count().await,
        ws_connections: state.ws_connection_count().await,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn check_storage_health(state: &AppState) -> bool {
    !state.store.is_shut_down().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
