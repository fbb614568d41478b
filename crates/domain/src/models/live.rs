//! Live location channel protocol.
//!
//! Wire messages exchanged over the dashboard WebSocket, plus the
//! location-update event payload fanned out to subscribers. All messages
//! are JSON text frames tagged on `type`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Close code sent by the server on intentional shutdown.
///
/// Clients must not auto-reconnect after seeing this code.
pub const SERVER_SHUTDOWN_CLOSE_CODE: u16 = 4000;

/// Close code used by the client's own explicit disconnect.
pub const CLIENT_DISCONNECT_CLOSE_CODE: u16 = 4001;

/// Origin of a location update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    Mobile,
    Iot,
}

/// A geographic point with optional motion data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

/// The event payload broadcast to every connection subscribed to the vehicle.
///
/// Derived from a stored telemetry record (`iot`) or a mobile-originated
/// report (`mobile`); never persisted by the channel itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleLocationUpdate {
    pub vehicle_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub location: LocationPoint,
    pub source: LocationSource,
}

/// Client-to-server channel messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Subscribe { vehicle_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Unsubscribe { vehicle_id: Uuid },
}

/// Server-to-client channel messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Sent once when the connection opens.
    Connected,
    #[serde(rename_all = "camelCase")]
    Subscribed { vehicle_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Unsubscribed { vehicle_id: Uuid },
    VehicleLocationReceived(VehicleLocationUpdate),
    /// Malformed input is answered on the connection, never by closing it.
    Error { message: String },
}

/// Request payload for a mobile-app vehicle location report.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MobileLocationReport {
    /// Timestamp in milliseconds since epoch.
    #[validate(custom(function = "shared::validation::validate_timestamp"))]
    pub timestamp: i64,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(custom(function = "shared::validation::validate_speed"))]
    pub speed: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_heading"))]
    pub heading: Option<f64>,
}
