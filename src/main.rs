//! Meal Hat API Server
//!
//! Run with: cargo run --bin mealhat -- --config ./config.toml
//!
//! Without `--config`, the config is read from the default locations (see
//! [`Config::load_default`]). `RUST_LOG` overrides the configured log level.

use anyhow::Context;
use clap::Parser;
use mealhat::api::{serve, ApiConfig, AppState};
use mealhat::auth::{GoogleCredentialProvider, IdentityProvider, StaticIdentityProvider};
use mealhat::config::{Config, LoggingConfig};
use mealhat::storage::TreeStore;
use mealhat::websocket::WsEvent;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mealhat")]
#[command(about = "Meal Hat API server", version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "MEALHAT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_logging(&config.logging)?;

    tracing::info!("Starting Meal Hat API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Data directory: {}", config.storage.data_dir);

    // Open the tree store
    let store = Arc::new(
        TreeStore::open(config.store_config())
            .await
            .context("Failed to open tree store")?,
    );
    let snapshot_handle = store.start_background_snapshot();

    let provider = identity_provider(&config)?;
    tracing::info!(provider = %provider.name(), "Identity provider configured");

    let api_config = ApiConfig::from(&config.api);
    let state = AppState::new(
        Arc::clone(&store),
        provider,
        config.workspace_settings(),
        api_config.clone(),
    );
    let sessions = Arc::clone(&state.sessions);
    let hub = Arc::clone(&state.ws_hub);

    // Run server
    serve(state, &api_config).await?;

    // Graceful shutdown
    hub.broadcast(&WsEvent::system("Server shutting down")).await;
    sessions.close_all().await;
    snapshot_handle.abort();

    tracing::info!("Shutting down tree store...");
    store.shutdown().await?;
    tracing::info!("Meal Hat API server stopped");

    Ok(())
}

fn identity_provider(config: &Config) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    match config.auth.provider.as_str() {
        "google" => {
            if config.auth.google_client_id.is_none() {
                tracing::warn!("No google_client_id configured; token audience is not checked");
            }
            Ok(Arc::new(GoogleCredentialProvider::new(
                config.auth.google_client_id.clone(),
                config.auth.allow_unverified_email,
            )))
        }
        "static" => {
            tracing::warn!("Static identity provider enabled; any email address can log in");
            Ok(Arc::new(StaticIdentityProvider))
        }
        other => anyhow::bail!("Unknown identity provider '{}' (expected google or static)", other),
    }
}

fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("mealhat={},tower_http=info", config.level).into()
    });

    let is_json = config.format.eq_ignore_ascii_case("json");
    let json_layer = is_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_json).then(tracing_subscriber::fmt::layer);

    let file_layer = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .init();

    Ok(())
}
