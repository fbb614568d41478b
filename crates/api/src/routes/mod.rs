//! HTTP route handlers.

pub mod health;
pub mod ingest;
pub mod live;
pub mod vehicles;
