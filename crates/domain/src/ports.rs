//! Port traits for the injected collaborators.
//!
//! The fleet registry and the durable telemetry store are owned by other
//! systems; the ingestion core only consumes them through these traits.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewTelemetryRecord, RegistryResolution, TelemetryRecord};

/// Errors from the fleet registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry lookup failed: {0}")]
    Unavailable(String),
}

/// Errors from the durable telemetry store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("telemetry store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only bulk ident resolution against the fleet registry.
#[async_trait]
pub trait VehicleRegistry: Send + Sync {
    /// Resolves a set of distinct device idents in one lookup.
    ///
    /// Idents with no active registry entry are omitted from the result;
    /// that is a normal outcome, not an error. The only failure mode is
    /// the registry being unreachable.
    async fn resolve_idents(
        &self,
        idents: &[String],
    ) -> Result<HashMap<String, RegistryResolution>, RegistryError>;
}

/// Append-only bulk insert into the durable telemetry store.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Persists all records in a single transactional bulk write.
    ///
    /// Either every record is stored or none is; a partial insert is never
    /// left behind.
    async fn insert_batch(&self, records: Vec<NewTelemetryRecord>) -> Result<usize, StoreError>;

    /// Most recent records for one vehicle, newest first.
    async fn recent_for_vehicle(
        &self,
        vehicle_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TelemetryRecord>, StoreError>;

    /// Connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
