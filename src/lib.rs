//! # Meal Hat
//!
//! Household meal planning: put your meals in a hat, draw one for each day,
//! and shop for what was drawn.
//!
//! ## Features
//!
//! - **Realtime tree store**: JSON tree with path subscriptions, WAL and LZ4 snapshots
//! - **Fair drawing**: a meal is only drawn again after its frequency has passed
//! - **Shopping lists**: ingredients of drawn meals plus manual items, sorted by aisle
//! - **Shared households**: meal hats can be joined by name and switched between
//! - **Live updates**: WebSocket notifications when a household's data changes
//!
//! ## Modules
//!
//! - [`storage`]: Tree store with listeners and durability
//! - [`planner`]: Draw algorithm, schedule views and shopping-list aggregation
//! - [`household`]: Household keys, meal hats and the live workspace
//! - [`auth`]: Identity providers and sessions
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mealhat::household::{HouseholdKey, Workspace, WorkspaceSettings};
//! use mealhat::planner::{Ingredient, Meal};
//! use mealhat::storage::{StoreConfig, TreeStore};
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(TreeStore::open(StoreConfig::new("mealhat_data")).await?);
//!     let user = HouseholdKey::from_email("cook@example.com")?;
//!
//!     let workspace = Workspace::open(
//!         Arc::clone(&store),
//!         None,
//!         "local",
//!         user.clone(),
//!         user,
//!         WorkspaceSettings::default(),
//!     )
//!     .await?;
//!
//!     workspace
//!         .add_meal(Meal::new("", "Tacos", 7).ingredient(Ingredient::new("tortillas").quantity(8.0)))
//!         .await?;
//!
//!     let today = chrono::Utc::now().date_naive();
//!     let mut rng = StdRng::seed_from_u64(7);
//!     let outcome = workspace.draw(today, today + chrono::Duration::days(6), &mut rng).await?;
//!     println!("Drew {} meals", outcome.drawn.len());
//!
//!     workspace.close().await;
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod household;
pub mod planner;
pub mod storage;
pub mod websocket;

// Re-export top-level types for convenience
pub use storage::{DbPath, StorageError, StorageResult, StoreConfig, StoreStats, TreeStore};

pub use planner::{
    Collection, DrawnMeal, GroceryCatalog, GroceryCatalogItem, Ingredient, Meal, PlannerError,
    PlannerResult, ShoppingListEntry,
};

pub use household::{HouseholdError, HouseholdKey, MealHat, Workspace, WorkspaceSettings};

pub use auth::{
    AuthError, GoogleCredentialProvider, Identity, IdentityProvider, SessionManager,
    SessionState, StaticIdentityProvider,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use websocket::{
    websocket_handler, ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent,
};

pub use config::{generate_default_config, Config, ConfigError, LoggingConfig};
