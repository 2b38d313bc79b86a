//! Error types for cooplock.
//!
//! Uses thiserror for derive macros. Expected lock outcomes (wait timeouts,
//! hold expiry) are never returned from the engine surface; they are delivered
//! through callbacks. The enum below covers configuration, scenario files and
//! the CLI.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for cooplock operations outside the engine's callback path.
#[derive(Error, Debug)]
pub enum CooplockError {
    /// User provided invalid arguments or an unreadable input file.
    #[error("{0}")]
    UserError(String),

    /// Configuration could not be parsed or failed validation.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Scenario file could not be parsed or failed validation.
    #[error("Invalid scenario: {0}")]
    ScenarioError(String),

    /// A scenario ran, but callback failures were left unrecovered.
    #[error("{0} callback failure(s) were not recovered")]
    UnrecoveredFaults(usize),
}

impl CooplockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CooplockError::UserError(_) => exit_codes::USER_ERROR,
            CooplockError::ConfigError(_) => exit_codes::CONFIG_FAILURE,
            CooplockError::ScenarioError(_) => exit_codes::SCENARIO_FAILURE,
            CooplockError::UnrecoveredFaults(_) => exit_codes::UNCAUGHT_FAILURE,
        }
    }
}

/// Result type alias for cooplock operations.
pub type Result<T> = std::result::Result<T, CooplockError>;

/// Delivered to `on_wait_timeout` when a queued request was not granted
/// before its wait deadline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("timed out after {waited_ms}ms waiting for lock '{name}'")]
pub struct WaitTimeoutError {
    /// Name of the lock that was being waited for.
    pub name: String,

    /// How long the request waited before giving up.
    pub waited_ms: u64,
}
