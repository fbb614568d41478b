//! Telemetry repository.
//!
//! Append-only bulk insert into the telemetry_records table. Records are
//! never mutated or deleted by this core.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{NewTelemetryRecord, TelemetryRecord};
use domain::ports::{StoreError, TelemetryStore};

use crate::entities::TelemetryRecordEntity;
use crate::metrics::QueryTimer;

/// Repository backing the [`TelemetryStore`] port with PostgreSQL.
#[derive(Clone)]
pub struct TelemetryRepository {
    pool: PgPool,
}

impl TelemetryRepository {
    /// Creates a new TelemetryRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TelemetryStore for TelemetryRepository {
    /// Insert all records within one transaction.
    ///
    /// The batch is all-or-nothing: a failure rolls back every row so a
    /// retried delivery never leaves a partial insert behind.
    async fn insert_batch(&self, records: Vec<NewTelemetryRecord>) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let timer = QueryTimer::new("insert_telemetry_batch");
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let count = records.len();

        for record in &records {
            sqlx::query(
                r#"
                INSERT INTO telemetry_records (
                    vehicle_id, company_id, device_ident, recorded_at, server_recorded_at,
                    latitude, longitude, altitude, heading, speed, hdop, satellites,
                    position_valid, ignition, movement, mileage,
                    external_voltage, battery_voltage, gsm_signal_level
                )
                VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19
                )
                "#,
            )
            .bind(record.vehicle_id)
            .bind(record.company_id)
            .bind(&record.device_ident)
            .bind(record.recorded_at)
            .bind(record.server_recorded_at)
            .bind(record.latitude)
            .bind(record.longitude)
            .bind(record.altitude)
            .bind(record.heading)
            .bind(record.speed)
            .bind(record.hdop)
            .bind(record.satellites)
            .bind(record.position_valid)
            .bind(record.ignition)
            .bind(record.movement)
            .bind(record.mileage)
            .bind(record.external_voltage)
            .bind(record.battery_voltage)
            .bind(record.gsm_signal_level)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        timer.record();

        Ok(count)
    }

    /// Newest-first slice of a vehicle's records.
    ///
    /// Served by the (vehicle_id, recorded_at DESC) index.
    async fn recent_for_vehicle(
        &self,
        vehicle_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TelemetryRecord>, StoreError> {
        let timer = QueryTimer::new("recent_telemetry_for_vehicle");
        let rows = sqlx::query_as::<_, TelemetryRecordEntity>(
            r#"
            SELECT id, vehicle_id, company_id, device_ident, recorded_at, server_recorded_at,
                   latitude, longitude, altitude, heading, speed, hdop, satellites,
                   position_valid, ignition, movement, mileage,
                   external_voltage, battery_voltage, gsm_signal_level, created_at
            FROM telemetry_records
            WHERE vehicle_id = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            "#,
        )
        .bind(vehicle_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        timer.record();

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
