use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::ports::{TelemetryStore, VehicleRegistry};

use crate::channel::LiveChannel;
use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, security_headers_middleware, trace_id,
};
use crate::routes::{health, ingest, live, vehicles};
use crate::services::IngestService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn TelemetryStore>,
    pub ingest: IngestService,
    pub channel: LiveChannel,
}

/// Build the router over injected registry/store implementations.
///
/// Returns the live channel alongside the router so the caller can close
/// connections on shutdown.
pub fn create_app(
    config: Config,
    registry: Arc<dyn VehicleRegistry>,
    store: Arc<dyn TelemetryStore>,
) -> (Router, LiveChannel) {
    let config = Arc::new(config);
    let channel = LiveChannel::new();
    let ingest = IngestService::new(
        registry,
        store.clone(),
        channel.clone(),
        config.channel.batch_warn_size,
    );

    let state = AppState {
        config: config.clone(),
        store,
        ingest,
        channel: channel.clone(),
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production: only allow specified origins
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api_routes = Router::new()
        .route("/api/v1/telemetry/ingest", post(ingest::ingest_batch))
        .route("/api/v1/live", get(live::live_channel))
        .route(
            "/api/v1/vehicles/:vehicle_id/location",
            post(vehicles::report_location),
        )
        .route(
            "/api/v1/vehicles/:vehicle_id/telemetry",
            get(vehicles::recent_telemetry),
        );

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let router = Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state);

    (router, channel)
}
