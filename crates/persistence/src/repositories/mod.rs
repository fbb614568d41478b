//! Repository implementations.

pub mod registry;
pub mod telemetry;

pub use registry::VehicleRegistryRepository;
pub use telemetry::TelemetryRepository;
