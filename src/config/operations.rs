//! Config loading, validation, and utility operations.

use super::model::EngineConfig;
use crate::error::{CooplockError, Result};
use std::path::Path;

impl EngineConfig {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            CooplockError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load `path` if given, else the default file if it exists, else defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(super::types::DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not a map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: EngineConfig = serde_yaml::from_str(yaml)
            .map_err(|e| CooplockError::ConfigError(format!("failed to parse YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| CooplockError::ConfigError(format!("failed to serialize to YAML: {}", e)))
    }

    /// Validate config values.
    ///
    /// - `prune_interval_ms` must be positive
    /// - `log_filter` must be non-empty
    pub fn validate(&self) -> Result<()> {
        if self.prune_interval_ms == 0 {
            return Err(CooplockError::ConfigError(
                "prune_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.log_filter.trim().is_empty() {
            return Err(CooplockError::ConfigError(
                "log_filter must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
