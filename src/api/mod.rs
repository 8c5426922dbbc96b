//! Meal Hat REST API
//!
//! HTTP API layer for Meal Hat, built with Axum. Every endpoint under
//! `/api/v1` except login, resume, logout and the session probe needs a
//! bearer token issued by login or resume.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /api/v1/auth/login` - Log in with an identity-provider credential
//! - `POST /api/v1/auth/resume` - Resume a stored email/household pair with a fresh credential
//! - `POST /api/v1/auth/logout` - End the session
//! - `GET /api/v1/auth/session` - Current session state
//!
//! ## Meals
//! - `GET /api/v1/home` - Upcoming meals and shopping summary
//! - `GET /api/v1/meals` - List meals
//! - `POST /api/v1/meals` - Add a meal
//! - `GET /api/v1/meals/:id` - Get a meal
//! - `PUT /api/v1/meals/:id` - Update a meal
//! - `DELETE /api/v1/meals/:id` - Delete a meal
//!
//! ## Drawing
//! - `POST /api/v1/draw` - Draw meals for a date range
//! - `POST /api/v1/draw/redraw` - Redraw one date
//! - `GET /api/v1/drawn-meals?view=future|history` - Scheduled meals
//! - `DELETE /api/v1/drawn-meals/:id` - Remove a drawn meal
//!
//! ## Shopping
//! - `GET /api/v1/shopping-list` - Shopping list for a date window
//! - `POST /api/v1/shopping-list` - Add a manual item
//! - `POST /api/v1/shopping-list/:id/toggle` - Toggle purchased
//! - `POST /api/v1/shopping-list/:id/quantity` - Adjust quantity
//! - `PUT /api/v1/shopping-list/:id/aisle` - Set aisle
//! - `DELETE /api/v1/shopping-list/:id` - Remove a manual item
//! - `POST /api/v1/shopping-list/clear-purchased` - Remove purchased manual items
//! - `GET /api/v1/shopping-list/export` - CSV download
//! - `GET /api/v1/groceries` - Grocery catalog
//! - `POST /api/v1/groceries` - Add a catalog item
//! - `GET /api/v1/groceries/suggest?q=` - Autocomplete
//!
//! ## Meal hats
//! - `GET /api/v1/meal-hats` - List hats
//! - `POST /api/v1/meal-hats` - Create a hat
//! - `POST /api/v1/meal-hats/:name/join` - Join a hat
//! - `POST /api/v1/meal-hats/switch` - Switch the active household
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /api/v1/ws?token=` - Change notifications for the session's household
//!
//! # Example
//!
//! ```rust,ignore
//! use mealhat::api::{serve, ApiConfig, AppState};
//! use mealhat::auth::StaticIdentityProvider;
//! use mealhat::household::WorkspaceSettings;
//! use mealhat::storage::{StoreConfig, TreeStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(TreeStore::open(StoreConfig::default()).await?);
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(
//!         store,
//!         Arc::new(StaticIdentityProvider),
//!         WorkspaceSettings::default(),
//!         config.clone(),
//!     );
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::websocket::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Auth routes
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/resume", post(routes::auth::resume))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/session", get(routes::auth::session_state))
        // Meal routes
        .route("/home", get(routes::draw::home))
        .route("/meals", get(routes::meals::list_meals))
        .route("/meals", post(routes::meals::create_meal))
        .route("/meals/:id", get(routes::meals::get_meal))
        .route("/meals/:id", put(routes::meals::update_meal))
        .route("/meals/:id", delete(routes::meals::delete_meal))
        // Draw routes
        .route("/draw", post(routes::draw::draw_meals))
        .route("/draw/redraw", post(routes::draw::redraw_meal))
        .route("/drawn-meals", get(routes::draw::list_drawn_meals))
        .route("/drawn-meals/:id", delete(routes::draw::delete_drawn_meal))
        // Shopping list routes
        .route("/shopping-list", get(routes::shopping::get_shopping_list))
        .route("/shopping-list", post(routes::shopping::add_item))
        .route("/shopping-list/export", get(routes::shopping::export_csv))
        .route(
            "/shopping-list/clear-purchased",
            post(routes::shopping::clear_purchased),
        )
        .route("/shopping-list/:id", delete(routes::shopping::remove_item))
        .route("/shopping-list/:id/toggle", post(routes::shopping::toggle_item))
        .route(
            "/shopping-list/:id/quantity",
            post(routes::shopping::adjust_quantity),
        )
        .route("/shopping-list/:id/aisle", put(routes::shopping::set_aisle))
        // Grocery catalog routes
        .route("/groceries", get(routes::groceries::list_groceries))
        .route("/groceries", post(routes::groceries::add_grocery))
        .route("/groceries/suggest", get(routes::groceries::suggest))
        // Meal hat routes
        .route("/meal-hats", get(routes::hats::list_hats))
        .route("/meal-hats", post(routes::hats::create_hat))
        .route("/meal-hats/switch", post(routes::hats::switch_hat))
        .route("/meal-hats/:name/join", post(routes::hats::join_hat))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout_secs,
        )))
        // WebSocket route (long-lived, outside the timeout)
        .route("/ws", get(websocket_handler));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Allow the configured origins, or any origin when none are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server
///
/// Returns once a shutdown signal has been received and in-flight requests
/// have finished. Closing sessions and the store is left to the caller.
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Meal Hat API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Meal Hat API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
