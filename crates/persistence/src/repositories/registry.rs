//! Vehicle registry repository.
//!
//! Read-only bulk ident resolution against the vehicles table.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use domain::models::RegistryResolution;
use domain::ports::{RegistryError, VehicleRegistry};

use crate::entities::VehicleRegistryEntity;
use crate::metrics::QueryTimer;

/// Repository backing the [`VehicleRegistry`] port with PostgreSQL.
#[derive(Clone)]
pub struct VehicleRegistryRepository {
    pool: PgPool,
}

impl VehicleRegistryRepository {
    /// Creates a new VehicleRegistryRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VehicleRegistry for VehicleRegistryRepository {
    /// Resolves all idents in one query.
    ///
    /// Batches of hundreds of messages must not turn into per-message
    /// lookups, so this is a single `= ANY($1)` scan over active entries.
    async fn resolve_idents(
        &self,
        idents: &[String],
    ) -> Result<HashMap<String, RegistryResolution>, RegistryError> {
        if idents.is_empty() {
            return Ok(HashMap::new());
        }

        let timer = QueryTimer::new("resolve_idents");
        let rows = sqlx::query_as::<_, VehicleRegistryEntity>(
            r#"
            SELECT vehicle_id, company_id, device_ident
            FROM vehicles
            WHERE device_ident = ANY($1)
              AND active = TRUE
            "#,
        )
        .bind(idents)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RegistryError::Unavailable(e.to_string()))?;
        timer.record();

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.device_ident,
                    RegistryResolution {
                        vehicle_id: row.vehicle_id,
                        company_id: row.company_id,
                    },
                )
            })
            .collect())
    }
}
