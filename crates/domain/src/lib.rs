//! Domain layer for the Fleet Telemetry backend.
//!
//! This crate contains:
//! - Domain models (raw telemetry messages, telemetry records, live channel protocol)
//! - The telemetry normalizer
//! - Port traits for the injected collaborators (vehicle registry, telemetry store)

pub mod models;
pub mod ports;
pub mod services;
