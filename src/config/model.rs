//! EngineConfig struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a lock engine and the tools that drive it.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // =========================================================================
    // Engine settings
    // =========================================================================
    /// Period of the pruning loop, in milliseconds.
    #[serde(default = "default_prune_interval_ms")]
    pub prune_interval_ms: u64,

    // =========================================================================
    // Host settings
    // =========================================================================
    /// Whether the scenario runner calls `recover()` when a callback fails.
    #[serde(default = "default_true")]
    pub recover_on_error: bool,

    /// Default `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prune_interval_ms: default_prune_interval_ms(),
            recover_on_error: default_true(),
            log_filter: default_log_filter(),
        }
    }
}
