//! Telemetry domain models.
//!
//! `RawTelemetryMessage` mirrors the field names emitted by the device
//! vendor's webhook protocol. `TelemetryRecord` is the canonical, vendor
//! independent shape that gets persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One raw device report as delivered by the tracking network webhook.
///
/// Every field except `ident` is optional: devices routinely omit fields
/// (no GPS fix, no external power sense line) and a partially populated
/// message must still be accepted. Timestamps are epoch seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTelemetryMessage {
    /// Vendor-assigned identifier of the physical tracking unit.
    pub ident: String,

    /// Device-clock timestamp, epoch seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,

    /// Tracking-network receipt timestamp, epoch seconds.
    #[serde(default)]
    pub server_timestamp: Option<i64>,

    #[serde(default)]
    pub position_latitude: Option<f64>,

    #[serde(default)]
    pub position_longitude: Option<f64>,

    #[serde(default)]
    pub position_altitude: Option<f64>,

    /// Heading in degrees, 0-360.
    #[serde(default)]
    pub position_direction: Option<f64>,

    #[serde(default)]
    pub position_speed: Option<f64>,

    #[serde(default)]
    pub position_hdop: Option<f64>,

    #[serde(default)]
    pub position_satellites: Option<i32>,

    #[serde(default)]
    pub position_valid: Option<bool>,

    #[serde(default)]
    pub engine_ignition_status: Option<bool>,

    #[serde(default)]
    pub movement_status: Option<bool>,

    #[serde(default)]
    pub vehicle_mileage: Option<f64>,

    #[serde(default)]
    pub external_powersource_voltage: Option<f64>,

    #[serde(default)]
    pub battery_voltage: Option<f64>,

    #[serde(default)]
    pub gsm_signal_level: Option<i32>,
}

/// Insert shape for one canonical telemetry row.
///
/// `vehicle_id`/`company_id` are `None` when the ident had no active
/// registry entry at ingest time. No numeric field is ever defaulted to
/// zero: `None` means "not reported", zero is a real reading.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTelemetryRecord {
    pub vehicle_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub device_ident: String,
    /// Device clock, falling back to ingest wall-clock when absent.
    pub recorded_at: DateTime<Utc>,
    /// Tracking-network receipt time. Absence is meaningful and preserved.
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
}

/// A persisted telemetry record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
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
