//! Domain models.

pub mod live;
pub mod registry;
pub mod telemetry;

pub use live::{
    ClientMessage, LocationPoint, LocationSource, MobileLocationReport, ServerMessage,
    VehicleLocationUpdate, CLIENT_DISCONNECT_CLOSE_CODE, SERVER_SHUTDOWN_CLOSE_CODE,
};
pub use registry::RegistryResolution;
pub use telemetry::{NewTelemetryRecord, RawTelemetryMessage, TelemetryRecord};
