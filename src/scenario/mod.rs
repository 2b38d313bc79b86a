//! Scripted lock scenarios.
//!
//! A scenario is a YAML file of timed steps (`lock`, `release`, `recover`)
//! replayed against a fresh engine. It is how the CLI exercises the engine
//! and how behaviour can be reproduced outside of unit tests.
//!
//! ```yaml
//! run_for: 5000
//! steps:
//!   - at: 0
//!     action: lock
//!     name: printer
//!     label: a
//!     release_after: 1000
//!   - at: 0
//!     action: lock
//!     name: printer
//!     label: b
//!     wait_timeout: 1500
//! ```

mod runner;

#[cfg(test)]
mod tests;

pub use runner::{RunReport, run};

use crate::error::{CooplockError, Result};
use crate::scheduler::Millis;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// What a step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Request a lock (`lock` or `lockFor` depending on `hold_for`).
    Lock,
    /// Release the lock granted to `label`.
    Release,
    /// Call `recover()`.
    Recover,
}

/// One timed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// When the step runs, in milliseconds from the start of the run.
    #[serde(default)]
    pub at: Millis,

    pub action: StepAction,

    /// Lock name (`lock` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Handle for the request; `release` steps refer to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Give up after waiting this long.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_timeout: Option<Millis>,

    /// Auto-release this long after the grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_for: Option<Millis>,

    /// Release explicitly this long after the grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_after: Option<Millis>,

    /// Make the grant callback fail.
    #[serde(default)]
    pub fail_on_grant: bool,
}

fn default_run_for() -> Millis {
    10_000
}

/// A full scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// How much scheduler time to simulate.
    #[serde(default = "default_run_for")]
    pub run_for: Millis,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Load a scenario from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            CooplockError::UserError(format!(
                "failed to read scenario file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate a scenario from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml)
            .map_err(|e| CooplockError::ScenarioError(format!("failed to parse YAML: {}", e)))?;

        scenario.validate()?;
        Ok(scenario)
    }

    /// Validate step structure.
    ///
    /// Validation rules:
    /// - `lock` steps need a `name` and a `label`; labels are unique
    /// - `release` steps need a `label` that some `lock` step defines
    /// - no step runs after `run_for`
    pub fn validate(&self) -> Result<()> {
        let mut labels = HashSet::new();

        for (index, step) in self.steps.iter().enumerate() {
            if step.at > self.run_for {
                return Err(CooplockError::ScenarioError(format!(
                    "step {} runs at {}ms, after run_for ({}ms)",
                    index, step.at, self.run_for
                )));
            }

            if step.action != StepAction::Lock {
                continue;
            }
            if step.name.as_deref().is_none_or(str::is_empty) {
                return Err(CooplockError::ScenarioError(format!(
                    "lock step {} is missing a name",
                    index
                )));
            }
            let Some(label) = step.label.as_deref() else {
                return Err(CooplockError::ScenarioError(format!(
                    "lock step {} is missing a label",
                    index
                )));
            };
            if !labels.insert(label) {
                return Err(CooplockError::ScenarioError(format!(
                    "duplicate label '{}' in step {}",
                    label, index
                )));
            }
        }

        for (index, step) in self.steps.iter().enumerate() {
            if step.action != StepAction::Release {
                continue;
            }
            match step.label.as_deref() {
                None => {
                    return Err(CooplockError::ScenarioError(format!(
                        "release step {} is missing a label",
                        index
                    )));
                }
                Some(label) if !labels.contains(label) => {
                    return Err(CooplockError::ScenarioError(format!(
                        "release step {} refers to unknown label '{}'",
                        index, label
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}
