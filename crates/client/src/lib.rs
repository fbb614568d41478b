//! Reconnecting client for the live location channel.
//!
//! [`LiveLocationClient`] maintains a WebSocket connection to the Fleet
//! Telemetry API, resubscribes after every reconnect, and forwards server
//! events to a caller-supplied handler. Dashboards keep a single client
//! alive for their whole lifetime and mutate the subscription set as the
//! user's map viewport changes.

pub mod backoff;
pub mod client;

pub use client::{ClientConfig, ClientState, ClientStatus, LiveLocationClient};
