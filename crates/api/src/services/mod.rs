//! Application services wiring domain logic to infrastructure ports.

pub mod ingest;

pub use ingest::{IngestOutcome, IngestService};
