//! Shared test helpers.
//!
//! Integration tests run against counting stub implementations of the
//! registry/store ports so they need no database.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use domain::models::{NewTelemetryRecord, RegistryResolution, TelemetryRecord};
use domain::ports::{RegistryError, StoreError, TelemetryStore, VehicleRegistry};
use fleet_telemetry_api::app::create_app;
use fleet_telemetry_api::channel::LiveChannel;
use fleet_telemetry_api::config::Config;
use uuid::Uuid;

/// Shared secret baked into `Config::load_for_test`.
pub const TEST_SECRET: &str = "test-ingest-secret";

#[derive(Default)]
pub struct StubRegistry {
    pub resolutions: Mutex<HashMap<String, RegistryResolution>>,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl StubRegistry {
    pub fn with_vehicle(self, ident: &str, vehicle_id: Uuid) -> Self {
        self.resolutions.lock().unwrap().insert(
            ident.to_string(),
            RegistryResolution {
                vehicle_id,
                company_id: Uuid::new_v4(),
            },
        );
        self
    }
}

#[async_trait::async_trait]
impl VehicleRegistry for StubRegistry {
    async fn resolve_idents(
        &self,
        idents: &[String],
    ) -> Result<HashMap<String, RegistryResolution>, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("connection refused".into()));
        }
        let resolutions = self.resolutions.lock().unwrap();
        Ok(idents
            .iter()
            .filter_map(|ident| resolutions.get(ident).map(|r| (ident.clone(), *r)))
            .collect())
    }
}

#[derive(Default)]
pub struct StubStore {
    pub inserted: Mutex<Vec<NewTelemetryRecord>>,
    pub records: Mutex<Vec<TelemetryRecord>>,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait::async_trait]
impl TelemetryStore for StubStore {
    async fn insert_batch(&self, records: Vec<NewTelemetryRecord>) -> Result<usize, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("pool timeout".into()));
        }
        let count = records.len();
        self.inserted.lock().unwrap().extend(records);
        Ok(count)
    }

    async fn recent_for_vehicle(
        &self,
        vehicle_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TelemetryRecord>, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("pool timeout".into()));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.vehicle_id == Some(vehicle_id))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("pool timeout".into()));
        }
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config::load_for_test(&[("database.url", "postgres://unused")])
        .expect("Failed to load test config")
}

pub fn create_test_app(
    registry: Arc<StubRegistry>,
    store: Arc<StubStore>,
) -> (Router, LiveChannel) {
    create_app(test_config(), registry, store)
}

pub fn sample_record(vehicle_id: Uuid, id: i64) -> TelemetryRecord {
    let now = chrono::Utc::now();
    TelemetryRecord {
        id,
        vehicle_id: Some(vehicle_id),
        company_id: Some(Uuid::new_v4()),
        device_ident: "863921034872910".to_string(),
        recorded_at: now,
        server_recorded_at: None,
        latitude: Some(48.1486),
        longitude: Some(17.1077),
        altitude: None,
        heading: Some(270.0),
        speed: Some(54.0),
        hdop: None,
        satellites: None,
        position_valid: Some(true),
        ignition: None,
        movement: None,
        mileage: None,
        external_voltage: None,
        battery_voltage: None,
        gsm_signal_level: None,
        created_at: now,
    }
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// POST with a JSON body and the given shared secret header, when provided.
pub fn json_request(uri: &str, secret: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(secret) = secret {
        builder = builder.header("x-shared-secret", secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn parse_response_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
