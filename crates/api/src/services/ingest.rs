//! Telemetry batch ingest service.
//!
//! One unit of work per batch: collect the distinct device idents, resolve
//! them against the vehicle registry in a single bulk lookup, normalize every
//! message in order, and hand the whole batch to the store in one
//! transactional insert. Infrastructure failures are reported through
//! [`IngestOutcome`] so the endpoint can log them while still acknowledging
//! the batch.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use domain::{
    models::{
        LocationPoint, LocationSource, NewTelemetryRecord, RawTelemetryMessage,
        VehicleLocationUpdate,
    },
    ports::{TelemetryStore, VehicleRegistry},
    services::normalize,
};

use crate::channel::LiveChannel;
use crate::middleware::metrics::{record_ingest_failure_swallowed, record_messages_ingested};

/// Result of processing one ingest batch.
///
/// Only the caller's logging depends on this; the HTTP response does not.
#[derive(Debug)]
pub enum IngestOutcome {
    /// The whole batch was written.
    Stored { count: usize },
    /// Resolution or storage failed; no rows were written.
    Failed {
        message_count: usize,
        idents: Vec<String>,
        error: String,
    },
}

#[derive(Clone)]
pub struct IngestService {
    registry: Arc<dyn VehicleRegistry>,
    store: Arc<dyn TelemetryStore>,
    channel: LiveChannel,
    batch_warn_size: usize,
}

impl IngestService {
    pub fn new(
        registry: Arc<dyn VehicleRegistry>,
        store: Arc<dyn TelemetryStore>,
        channel: LiveChannel,
        batch_warn_size: usize,
    ) -> Self {
        Self {
            registry,
            store,
            channel,
            batch_warn_size,
        }
    }

    /// Process one batch of raw device messages.
    ///
    /// Every message produces exactly one record, resolved or not. After the
    /// store attempt, resolved records carrying a position are published to
    /// the live channel as `iot` events regardless of the write outcome.
    pub async fn ingest(&self, messages: Vec<RawTelemetryMessage>) -> IngestOutcome {
        let message_count = messages.len();
        if message_count == 0 {
            return IngestOutcome::Stored { count: 0 };
        }

        if message_count > self.batch_warn_size {
            tracing::warn!(
                message_count,
                threshold = self.batch_warn_size,
                "Unusually large ingest batch"
            );
        }

        let idents = distinct_idents(&messages);

        let resolutions = match self.registry.resolve_idents(&idents).await {
            Ok(resolutions) => resolutions,
            Err(e) => {
                record_ingest_failure_swallowed();
                return IngestOutcome::Failed {
                    message_count,
                    idents,
                    error: format!("registry lookup failed: {e}"),
                };
            }
        };

        let ingested_at = Utc::now();
        let records: Vec<NewTelemetryRecord> = messages
            .iter()
            .map(|msg| normalize(msg, resolutions.get(&msg.ident), ingested_at))
            .collect();

        let updates = location_updates(&records);

        let outcome = match self.store.insert_batch(records).await {
            Ok(count) => {
                record_messages_ingested(count);
                IngestOutcome::Stored { count }
            }
            Err(e) => {
                record_ingest_failure_swallowed();
                IngestOutcome::Failed {
                    message_count,
                    idents,
                    error: format!("telemetry insert failed: {e}"),
                }
            }
        };

        // Live distribution is best-effort and independent of the write.
        for update in updates {
            self.channel.publish(update).await;
        }

        outcome
    }
}

/// Distinct idents in first-seen order.
fn distinct_idents(messages: &[RawTelemetryMessage]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut idents = Vec::new();
    for msg in messages {
        if seen.insert(msg.ident.as_str()) {
            idents.push(msg.ident.clone());
        }
    }
    idents
}

/// Live-channel events for the resolved records that carry a position.
fn location_updates(records: &[NewTelemetryRecord]) -> Vec<VehicleLocationUpdate> {
    records
        .iter()
        .filter_map(|record| {
            let vehicle_id = record.vehicle_id?;
            let latitude = record.latitude?;
            let longitude = record.longitude?;
            Some(VehicleLocationUpdate {
                vehicle_id,
                timestamp: record.recorded_at,
                location: LocationPoint {
                    latitude,
                    longitude,
                    speed: record.speed,
                    heading: record.heading,
                },
                source: LocationSource::Iot,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::RegistryResolution;
    use domain::ports::{RegistryError, StoreError};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct StubRegistry {
        resolutions: HashMap<String, RegistryResolution>,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl VehicleRegistry for StubRegistry {
        async fn resolve_idents(
            &self,
            idents: &[String],
        ) -> Result<HashMap<String, RegistryResolution>, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RegistryError::Unavailable("connection refused".into()));
            }
            Ok(idents
                .iter()
                .filter_map(|ident| {
                    self.resolutions
                        .get(ident)
                        .map(|r| (ident.clone(), *r))
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct StubStore {
        inserted: Mutex<Vec<NewTelemetryRecord>>,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl TelemetryStore for StubStore {
        async fn insert_batch(
            &self,
            records: Vec<NewTelemetryRecord>,
        ) -> Result<usize, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Unavailable("pool timeout".into()));
            }
            let count = records.len();
            self.inserted.lock().unwrap().extend(records);
            Ok(count)
        }

        async fn recent_for_vehicle(
            &self,
            _vehicle_id: Uuid,
            _limit: i64,
        ) -> Result<Vec<domain::models::TelemetryRecord>, StoreError> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn raw_message(ident: &str) -> RawTelemetryMessage {
        serde_json::from_value(serde_json::json!({
            "ident": ident,
            "timestamp": 1_700_000_000,
            "position_latitude": 48.1486,
            "position_longitude": 17.1077,
            "position_speed": 42.0,
        }))
        .unwrap()
    }

    fn service_with(
        registry: StubRegistry,
        store: StubStore,
    ) -> (IngestService, Arc<StubRegistry>, Arc<StubStore>, LiveChannel) {
        let registry = Arc::new(registry);
        let store = Arc::new(store);
        let channel = LiveChannel::new();
        let service = IngestService::new(
            registry.clone(),
            store.clone(),
            channel.clone(),
            500,
        );
        (service, registry, store, channel)
    }

    #[tokio::test]
    async fn test_empty_batch_skips_infrastructure() {
        let (service, registry, store, _channel) =
            service_with(StubRegistry::default(), StubStore::default());

        let outcome = service.ingest(vec![]).await;
        assert!(matches!(outcome, IngestOutcome::Stored { count: 0 }));
        assert_eq!(registry.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_every_message_produces_one_record() {
        let vehicle_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();
        let mut registry = StubRegistry::default();
        registry.resolutions.insert(
            "X1".to_string(),
            RegistryResolution {
                vehicle_id,
                company_id,
            },
        );

        let (service, registry, store, _channel) = service_with(registry, StubStore::default());

        let outcome = service
            .ingest(vec![raw_message("X1"), raw_message("X2"), raw_message("X1")])
            .await;

        assert!(matches!(outcome, IngestOutcome::Stored { count: 3 }));
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);

        let inserted = store.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 3);
        assert_eq!(inserted[0].vehicle_id, Some(vehicle_id));
        assert_eq!(inserted[0].company_id, Some(company_id));
        assert_eq!(inserted[1].vehicle_id, None);
        assert_eq!(inserted[1].company_id, None);
        assert_eq!(inserted[2].vehicle_id, Some(vehicle_id));
        assert_eq!(inserted[0].device_ident, "X1");
        assert_eq!(inserted[1].device_ident, "X2");
    }

    #[tokio::test]
    async fn test_registry_failure_reports_batch_context() {
        let registry = StubRegistry {
            fail: true,
            ..Default::default()
        };
        let (service, _registry, store, _channel) = service_with(registry, StubStore::default());

        let outcome = service
            .ingest(vec![raw_message("A"), raw_message("B"), raw_message("A")])
            .await;

        match outcome {
            IngestOutcome::Failed {
                message_count,
                idents,
                error,
            } => {
                assert_eq!(message_count, 3);
                assert_eq!(idents, vec!["A".to_string(), "B".to_string()]);
                assert!(error.contains("registry lookup failed"));
            }
            other => panic!("Expected Failed outcome, got {:?}", other),
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failure_reports_batch_context() {
        let store = StubStore {
            fail: true,
            ..Default::default()
        };
        let (service, _registry, _store, _channel) = service_with(StubRegistry::default(), store);

        let outcome = service.ingest(vec![raw_message("A")]).await;
        match outcome {
            IngestOutcome::Failed {
                message_count,
                error,
                ..
            } => {
                assert_eq!(message_count, 1);
                assert!(error.contains("telemetry insert failed"));
            }
            other => panic!("Expected Failed outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolved_records_published_to_channel() {
        let vehicle_id = Uuid::new_v4();
        let mut registry = StubRegistry::default();
        registry.resolutions.insert(
            "X1".to_string(),
            RegistryResolution {
                vehicle_id,
                company_id: Uuid::new_v4(),
            },
        );
        let (service, _registry, _store, channel) = service_with(registry, StubStore::default());

        let (conn_id, mut rx) = channel.register().await;
        channel.subscribe(conn_id, vehicle_id).await;

        service
            .ingest(vec![raw_message("X1"), raw_message("UNKNOWN")])
            .await;

        // Only the resolved message reaches the subscriber.
        match rx.try_recv() {
            Ok(crate::channel::OutboundFrame::Message(
                domain::models::ServerMessage::VehicleLocationReceived(update),
            )) => {
                assert_eq!(update.vehicle_id, vehicle_id);
                assert_eq!(update.source, LocationSource::Iot);
                assert_eq!(update.location.speed, Some(42.0));
            }
            other => panic!("Expected location update, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_happens_even_when_store_fails() {
        let vehicle_id = Uuid::new_v4();
        let mut registry = StubRegistry::default();
        registry.resolutions.insert(
            "X1".to_string(),
            RegistryResolution {
                vehicle_id,
                company_id: Uuid::new_v4(),
            },
        );
        let store = StubStore {
            fail: true,
            ..Default::default()
        };
        let (service, _registry, _store, channel) = service_with(registry, store);

        let (conn_id, mut rx) = channel.register().await;
        channel.subscribe(conn_id, vehicle_id).await;

        let outcome = service.ingest(vec![raw_message("X1")]).await;
        assert!(matches!(outcome, IngestOutcome::Failed { .. }));
        assert!(matches!(
            rx.try_recv(),
            Ok(crate::channel::OutboundFrame::Message(_))
        ));
    }

    #[tokio::test]
    async fn test_record_without_position_not_published() {
        let vehicle_id = Uuid::new_v4();
        let mut registry = StubRegistry::default();
        registry.resolutions.insert(
            "X1".to_string(),
            RegistryResolution {
                vehicle_id,
                company_id: Uuid::new_v4(),
            },
        );
        let (service, _registry, _store, channel) = service_with(registry, StubStore::default());

        let (conn_id, mut rx) = channel.register().await;
        channel.subscribe(conn_id, vehicle_id).await;

        let msg: RawTelemetryMessage = serde_json::from_value(serde_json::json!({
            "ident": "X1",
            "battery_voltage": 3.9,
        }))
        .unwrap();
        service.ingest(vec![msg]).await;

        assert!(rx.try_recv().is_err());
    }
}
