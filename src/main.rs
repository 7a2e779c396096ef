//! sanctiond - member registry and moderation sanction daemon.
//!
//! Serves the member API (registration, profiles, staff sanctions) over HTTP,
//! backed by SQLite, with a background sweep that lifts expired sanctions.

mod accounts;
mod api;
mod config;
mod db;
mod error;
mod http;
mod metrics;
mod notify;
mod sanction;
mod telemetry;

use crate::api::AppState;
use crate::config::Config;
use crate::db::Database;
use crate::sanction::expiry::spawn_sweep_task;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "Refusing to start with {} configuration error(s)",
            errors.len()
        ));
    }

    info!(
        server = %config.server.name,
        listen = %config.server.listen,
        "Starting sanctiond"
    );

    // Initialize database
    let db = Database::new(&config.database.path).await?;

    // Notification backend
    let notifier = notify::build(&config.notify)?;
    info!(backend = ?config.notify.backend, "Notifier ready");

    let state = AppState::new(db.clone(), &config, notifier);

    // Staff accounts
    state.accounts.provision_staff(&config.staff).await?;
    info!(count = config.staff.len(), "Staff accounts provisioned");
    state.accounts.provision_bot_account().await?;

    // Sanction expiry sweep
    spawn_sweep_task(db, config.sanctions.sweep_interval_secs);
    info!(
        interval_secs = config.sanctions.sweep_interval_secs,
        "Expiry sweep task started"
    );

    // Prometheus metrics. Convention: metrics_port = 0 disables the HTTP endpoint.
    metrics::init();
    match config.server.metrics_port {
        Some(port) if port != 0 => {
            tokio::spawn(http::run_metrics_server(port));
            info!(port, "Prometheus HTTP server started");
        }
        _ => info!("Metrics endpoint disabled"),
    }

    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .map_err(|e| {
            error!(addr = %config.server.listen, error = %e, "Failed to bind member API");
            e
        })?;
    info!(addr = %config.server.listen, "Member API listening");

    api::serve(listener, state).await?;

    info!("Server shutdown complete");
    Ok(())
}
