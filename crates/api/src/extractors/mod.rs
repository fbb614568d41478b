//! Custom axum extractors.

pub mod shared_secret;

pub use shared_secret::IngestAuth;
