//! Vehicle-scoped endpoints: mobile location reporting and recent telemetry.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{TimeZone, Utc};
use domain::models::{
    LocationPoint, LocationSource, MobileLocationReport, TelemetryRecord, VehicleLocationUpdate,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// Response for a mobile location report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLocationResponse {
    pub success: bool,
    pub delivered_to: usize,
}

/// POST /api/v1/vehicles/:vehicle_id/location
///
/// Publishes a mobile-sourced update to the live channel. Distribution only;
/// nothing is persisted here.
pub async fn report_location(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
    Json(report): Json<MobileLocationReport>,
) -> Result<Json<ReportLocationResponse>, ApiError> {
    report.validate()?;

    let timestamp = Utc
        .timestamp_millis_opt(report.timestamp)
        .single()
        .ok_or_else(|| ApiError::Validation("Invalid timestamp".to_string()))?;

    let update = VehicleLocationUpdate {
        vehicle_id,
        timestamp,
        location: LocationPoint {
            latitude: report.latitude,
            longitude: report.longitude,
            speed: report.speed,
            heading: report.heading,
        },
        source: LocationSource::Mobile,
    };

    let delivered_to = state.channel.publish(update).await;

    tracing::info!(
        vehicle_id = %vehicle_id,
        latitude = report.latitude,
        longitude = report.longitude,
        delivered_to,
        "Mobile location published"
    );

    Ok(Json(ReportLocationResponse {
        success: true,
        delivered_to,
    }))
}

const DEFAULT_HISTORY_LIMIT: i64 = 100;
const MAX_HISTORY_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct RecentTelemetryQuery {
    pub limit: Option<i64>,
}

impl RecentTelemetryQuery {
    fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentTelemetryResponse {
    pub records: Vec<TelemetryRecord>,
}

/// GET /api/v1/vehicles/:vehicle_id/telemetry
///
/// Newest-first slice of the vehicle's stored telemetry.
pub async fn recent_telemetry(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
    Query(query): Query<RecentTelemetryQuery>,
) -> Result<Json<RecentTelemetryResponse>, ApiError> {
    let records = state
        .store
        .recent_for_vehicle(vehicle_id, query.effective_limit())
        .await?;

    Ok(Json(RecentTelemetryResponse { records }))
}
