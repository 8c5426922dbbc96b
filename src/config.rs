//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::household::WorkspaceSettings;
use crate::storage::StoreConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tree store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_ms: u64,

    #[serde(default = "default_wal_enabled")]
    pub wal_enabled: bool,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("mealhat").to_string_lossy().to_string())
        .unwrap_or_else(|| "./mealhat_data".to_string())
}

fn default_snapshot_interval() -> u64 {
    30_000 // 30 seconds
}

fn default_wal_enabled() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            snapshot_interval_ms: default_snapshot_interval(),
            wal_enabled: default_wal_enabled(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![
                "http://localhost:8080".to_string(),
                "http://127.0.0.1:8080".to_string(),
            ],
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Login configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// `google` (ID tokens) or `static` (email as credential, development only)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Expected `aud` of Google ID tokens; unchecked when empty
    #[serde(default)]
    pub google_client_id: Option<String>,

    #[serde(default)]
    pub allow_unverified_email: bool,
}

fn default_provider() -> String {
    "google".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            google_client_id: None,
            allow_unverified_email: false,
        }
    }
}

/// Planner configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_grace_window")]
    pub grace_window_ms: i64,

    #[serde(default = "default_max_draw_days")]
    pub max_draw_days: u32,
}

fn default_grace_window() -> i64 {
    86_400_000 // 24 hours
}

fn default_max_draw_days() -> u32 {
    31
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            grace_window_ms: default_grace_window(),
            max_draw_days: default_max_draw_days(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("mealhat").join("config.toml")),
            Some(PathBuf::from("/etc/mealhat/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(data_dir) = var("MEALHAT_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }

        if let Some(host) = var("MEALHAT_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("MEALHAT_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid MEALHAT_API_PORT"),
            }
        }

        if let Some(client_id) = var("MEALHAT_GOOGLE_CLIENT_ID") {
            self.auth.google_client_id = Some(client_id);
        }

        if let Some(level) = var("MEALHAT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("MEALHAT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Tree store settings
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            snapshot_interval_ms: self.storage.snapshot_interval_ms,
            wal_enabled: self.storage.wal_enabled,
            ..StoreConfig::new(&self.storage.data_dir)
        }
    }

    /// Planner settings for household workspaces
    pub fn workspace_settings(&self) -> WorkspaceSettings {
        WorkspaceSettings {
            grace_window_ms: self.planner.grace_window_ms,
            max_draw_days: self.planner.max_draw_days,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Meal Hat Configuration
#
# Environment variables override these settings:
# - MEALHAT_DATA_DIR
# - MEALHAT_API_HOST
# - MEALHAT_API_PORT
# - MEALHAT_GOOGLE_CLIENT_ID
# - MEALHAT_LOG_LEVEL
# - MEALHAT_LOG_FORMAT

[storage]
# Directory for the household database
data_dir = "~/.local/share/mealhat"

# How often to snapshot the database and truncate the WAL (ms)
snapshot_interval_ms = 30000

# Enable write-ahead log for durability
wal_enabled = true

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins
cors_origins = ["http://localhost:8080", "http://127.0.0.1:8080"]

# Request timeout in seconds
request_timeout_secs = 30

[auth]
# Identity provider: google, or static (any email logs in; development only)
provider = "google"

# OAuth client id the Google ID tokens must be issued for
# google_client_id = "1234.apps.googleusercontent.com"

# Accept Google accounts whose email is not verified
allow_unverified_email = false

[planner]
# A drawn meal up to this long in the past still counts as upcoming (ms)
grace_window_ms = 86400000

# Longest date range a single draw may cover (days)
max_draw_days = 31

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/mealhat/mealhat.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.port, 8090);
        assert_eq!(config.planner.grace_window_ms, 86_400_000);
        assert_eq!(config.planner.max_draw_days, 31);
        assert_eq!(config.auth.provider, "google");
        assert!(config.storage.wal_enabled);
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.storage.snapshot_interval_ms, 30_000);
        assert_eq!(config.api.cors_origins.len(), 2);
        assert!(config.auth.google_client_id.is_none());
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::parse("[planner]\nmax_draw_days = 7\n").unwrap();
        assert_eq!(config.planner.max_draw_days, 7);
        assert_eq!(config.planner.grace_window_ms, 86_400_000);
        assert_eq!(config.api.host, "0.0.0.0");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MEALHAT_DATA_DIR", "/tmp/hat"),
            ("MEALHAT_API_PORT", "9000"),
            ("MEALHAT_GOOGLE_CLIENT_ID", "abc"),
            ("MEALHAT_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.storage.data_dir, "/tmp/hat");
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.auth.google_client_id.as_deref(), Some("abc"));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.store_config().data_dir, PathBuf::from("/tmp/hat"));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nport = \"nope\"\n").unwrap();

        match Config::load(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
