use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use fleet_telemetry_api::{app, config, middleware};
use persistence::repositories::{TelemetryRepository, VehicleRegistryRepository};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::load()?;

    // Initialize logging
    middleware::logging::init_logging(&config.logging);

    info!(
        "Starting Fleet Telemetry API v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize Prometheus metrics
    middleware::init_metrics();

    // Create database pool
    let db_config = persistence::db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        connect_timeout_secs: config.database.connect_timeout_secs,
        idle_timeout_secs: config.database.idle_timeout_secs,
    };
    let pool = persistence::db::create_pool(&db_config).await?;

    // Run migrations
    info!("Running database migrations...");
    persistence::db::MIGRATOR.run(&pool).await?;
    info!("Migrations completed");

    // Build application over the Postgres-backed ports
    let registry = Arc::new(VehicleRegistryRepository::new(pool.clone()));
    let store = Arc::new(TelemetryRepository::new(pool.clone()));
    let addr = config.socket_addr();
    let (router, channel) = app::create_app(config, registry, store);

    // Start server
    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Close live connections with the shutdown close code before exiting.
    channel.shutdown().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl-c, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
