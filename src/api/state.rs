//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::auth::{IdentityProvider, SessionManager};
use crate::household::WorkspaceSettings;
use crate::storage::TreeStore;
use crate::websocket::{ConnectionHub, HubConfig};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Tree store holding every household
    pub store: Arc<TreeStore>,
    /// Live sessions and their household workspaces
    pub sessions: Arc<SessionManager>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// WebSocket connection hub for change notifications
    pub ws_hub: Arc<ConnectionHub>,
}

impl AppState {
    pub fn new(
        store: Arc<TreeStore>,
        provider: Arc<dyn IdentityProvider>,
        settings: WorkspaceSettings,
        config: ApiConfig,
    ) -> Self {
        Self::with_ws_config(store, provider, settings, config, HubConfig::default())
    }

    /// Create AppState with custom WebSocket hub configuration
    pub fn with_ws_config(
        store: Arc<TreeStore>,
        provider: Arc<dyn IdentityProvider>,
        settings: WorkspaceSettings,
        config: ApiConfig,
        hub_config: HubConfig,
    ) -> Self {
        let ws_hub = Arc::new(ConnectionHub::new(hub_config));
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&store),
            Some(Arc::clone(&ws_hub)),
            provider,
            settings,
        ));

        Self {
            store,
            sessions,
            config: Arc::new(config),
            start_time: Instant::now(),
            ws_hub,
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            request_timeout_secs: 30,
            cors_origins: Vec::new(),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&crate::config::ApiConfig> for ApiConfig {
    fn from(config: &crate::config::ApiConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            request_timeout_secs: config.request_timeout_secs,
            cors_origins: config.cors_origins.clone(),
            ..Default::default()
        }
    }
}
