//! Domain services.

pub mod normalizer;

pub use normalizer::normalize;
