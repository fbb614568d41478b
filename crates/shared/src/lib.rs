//! Shared utilities for the Fleet Telemetry backend.
//!
//! This crate provides common functionality used across the other crates:
//! - Validation helpers for position and timestamp fields

pub mod validation;
