//! Configuration defaults for cooplock.

/// Default file name looked up by the CLI when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "cooplock.yaml";

// Default value functions for serde
pub(crate) fn default_prune_interval_ms() -> u64 {
    100
}
pub(crate) fn default_log_filter() -> String {
    "warn".to_string()
}
pub(crate) fn default_true() -> bool {
    true
}
