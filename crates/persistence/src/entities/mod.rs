//! Database entity definitions (row mappings).

pub mod telemetry_record;
pub mod vehicle_registry;

pub use telemetry_record::TelemetryRecordEntity;
pub use vehicle_registry::VehicleRegistryEntity;
