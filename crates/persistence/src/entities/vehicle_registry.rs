//! Vehicle registry entity (database row mapping).
//!
//! The registry is owned by the fleet-management system; this core only
//! reads it for ident resolution.

use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the vehicles registry table.
#[derive(Debug, Clone, FromRow)]
pub struct VehicleRegistryEntity {
    pub vehicle_id: Uuid,
    pub company_id: Uuid,
    pub device_ident: String,
}
