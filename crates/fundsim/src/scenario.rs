//! Scenario files
//!
//! A scenario is one YAML document:
//!
//! ```yaml
//! simulation:          # SimulationConfig, every field optional
//!   trials: 5000
//!   seed: 7
//! investments:         # list of Investment records
//!   - name: Acme
//!     ...
//! sensitivity:         # optional
//!   targets: [2.0, 3.0]
//!   max_adjustment_percent: 40
//! ```

use std::fs;
use std::path::Path;

use fundsim_core::SensitivityConfig;
use fundsim_core::config::SimulationConfig;
use fundsim_core::model::Investment;
use serde::{Deserialize, Serialize};

/// Error types for scenario loading
#[derive(Debug)]
pub enum ScenarioError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::Io(msg) => write!(f, "IO error: {msg}"),
            ScenarioError::Parse(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl std::error::Error for ScenarioError {}

/// Sensitivity settings stored alongside a scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensitivitySection {
    #[serde(default)]
    pub targets: Vec<f64>,
    #[serde(flatten)]
    pub config: SensitivityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub simulation: SimulationConfig,
    pub investments: Vec<Investment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<SensitivitySection>,
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub trials: Option<usize>,
    pub seed: Option<u64>,
    pub targets: Vec<f64>,
    pub max_adjustment: Option<f64>,
    pub step: Option<f64>,
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }

    /// Load a scenario from a path
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScenarioError::Io(format!("Failed to read {}: {e}", path.display()))
        })?;

        Self::from_yaml(&content)
            .map_err(|e| ScenarioError::Parse(format!("Failed to parse YAML: {e}")))
    }

    /// Apply command-line overrides in place
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(trials) = overrides.trials {
            self.simulation.trials = trials;
        }
        if let Some(seed) = overrides.seed {
            self.simulation.seed = seed;
        }

        let touches_search = !overrides.targets.is_empty()
            || overrides.max_adjustment.is_some()
            || overrides.step.is_some();
        if !touches_search {
            return;
        }

        let section = self.sensitivity.get_or_insert_with(SensitivitySection::default);
        if !overrides.targets.is_empty() {
            section.targets = overrides.targets.clone();
        }
        if let Some(max) = overrides.max_adjustment {
            section.config.max_adjustment_percent = max;
        }
        if let Some(step) = overrides.step {
            section.config.step_size = step;
        }
    }
}
