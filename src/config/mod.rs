//! Configuration model for cooplock.
//!
//! This module defines the `EngineConfig` struct, usually read from a
//! `cooplock.yaml` file. It supports forward-compatible YAML parsing (unknown
//! fields are ignored), sensible defaults for optional fields, and validation
//! of config values.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::EngineConfig;
