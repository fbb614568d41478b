//! Telemetry record entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the telemetry_records table.
#[derive(Debug, Clone, FromRow)]
pub struct TelemetryRecordEntity {
    pub id: i64,
    pub vehicle_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub device_ident: String,
    pub recorded_at: DateTime<Utc>,
    pub server_recorded_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub hdop: Option<f64>,
    pub satellites: Option<i32>,
    pub position_valid: Option<bool>,
    pub ignition: Option<bool>,
    pub movement: Option<bool>,
    pub mileage: Option<f64>,
    pub external_voltage: Option<f64>,
    pub battery_voltage: Option<f64>,
    pub gsm_signal_level: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<TelemetryRecordEntity> for domain::models::TelemetryRecord {
    fn from(entity: TelemetryRecordEntity) -> Self {
        Self {
            id: entity.id,
            vehicle_id: entity.vehicle_id,
            company_id: entity.company_id,
            device_ident: entity.device_ident,
            recorded_at: entity.recorded_at,
            server_recorded_at: entity.server_recorded_at,
            latitude: entity.latitude,
            longitude: entity.longitude,
            altitude: entity.altitude,
            heading: entity.heading,
            speed: entity.speed,
            hdop: entity.hdop,
            satellites: entity.satellites,
            position_valid: entity.position_valid,
            ignition: entity.ignition,
            movement: entity.movement,
            mileage: entity.mileage,
            external_voltage: entity.external_voltage,
            battery_voltage: entity.battery_voltage,
            gsm_signal_level: entity.gsm_signal_level,
            created_at: entity.created_at,
        }
    }
}
