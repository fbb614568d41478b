//! Telemetry normalizer.
//!
//! Converts one raw vendor message into the canonical record shape. This is
//! a pure function: the ingest wall-clock is passed in so the whole batch
//! shares one fallback instant, and nothing here can fail — malformed or
//! missing fields degrade to `None` rather than rejecting the message.

use chrono::{DateTime, TimeZone, Utc};

use crate::models::{NewTelemetryRecord, RawTelemetryMessage, RegistryResolution};

/// Normalizes a raw device message into a canonical telemetry record.
///
/// Defaulting rules:
/// - `recorded_at` is the device timestamp when present and representable,
///   otherwise `ingested_at`.
/// - `server_recorded_at` stays `None` when the device reported none;
///   absence is meaningful and never replaced with wall-clock time.
/// - Every other absent field maps to `None`. Zero is a valid reading and
///   is never used as a stand-in for "unknown".
pub fn normalize(
    msg: &RawTelemetryMessage,
    resolution: Option<&RegistryResolution>,
    ingested_at: DateTime<Utc>,
) -> NewTelemetryRecord {
    let recorded_at = msg
        .timestamp
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or(ingested_at);

    let server_recorded_at = msg
        .server_timestamp
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

    NewTelemetryRecord {
        vehicle_id: resolution.map(|r| r.vehicle_id),
        company_id: resolution.map(|r| r.company_id),
        device_ident: msg.ident.clone(),
        recorded_at,
        server_recorded_at,
        latitude: msg.position_latitude,
        longitude: msg.position_longitude,
        altitude: msg.position_altitude,
        heading: msg.position_direction,
        speed: msg.position_speed,
        hdop: msg.position_hdop,
        satellites: msg.position_satellites,
        position_valid: msg.position_valid,
        ignition: msg.engine_ignition_status,
        movement: msg.movement_status,
        mileage: msg.vehicle_mileage,
        external_voltage: msg.external_powersource_voltage,
        battery_voltage: msg.battery_voltage,
        gsm_signal_level: msg.gsm_signal_level,
    }
}
