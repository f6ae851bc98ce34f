//! Sensitivity search configuration
//!
//! The weights here are heuristics. They are plain configurable values so
//! callers can tune ranking and scoring without touching the search.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::family::{FamilyValues, ParameterFamily};

fn default_max_adjustment() -> f64 {
    50.0
}

fn default_max_decrease() -> f64 {
    100.0
}

fn default_step_size() -> f64 {
    5.0
}

fn default_loss_floor() -> f64 {
    1.0
}

fn default_realistic_threshold() -> f64 {
    20.0
}

fn default_max_mixed_options() -> usize {
    3
}

/// Weights of the achievability score factors; normalized when scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// How close the baseline MOIC already is to the target
    pub closeness: f64,
    /// How small the smallest achievable single adjustment is
    pub single_adjustment: f64,
    /// Share of families that can reach the target on their own
    pub breadth: f64,
    /// Whether any mixed option reaches the target
    pub mixed_availability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            closeness: 0.40,
            single_adjustment: 0.35,
            breadth: 0.15,
            mixed_availability: 0.10,
        }
    }
}

impl ScoreWeights {
    fn total(&self) -> f64 {
        self.closeness + self.single_adjustment + self.breadth + self.mixed_availability
    }
}

/// Strategy used to spread a total adjustment budget across families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedApproach {
    Balanced,
    ExitFocused,
    SuccessFocused,
    Conservative,
    Aggressive,
}

impl MixedApproach {
    pub const ALL: [MixedApproach; 5] = [
        MixedApproach::Balanced,
        MixedApproach::ExitFocused,
        MixedApproach::SuccessFocused,
        MixedApproach::Conservative,
        MixedApproach::Aggressive,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            MixedApproach::Balanced => "Balanced",
            MixedApproach::ExitFocused => "Exit-focused",
            MixedApproach::SuccessFocused => "Success-focused",
            MixedApproach::Conservative => "Conservative",
            MixedApproach::Aggressive => "Aggressive",
        }
    }

    /// Default share of the budget given to each family
    #[must_use]
    pub fn default_weights(self) -> FamilyValues {
        let (progression, dilution, loss, exit) = match self {
            MixedApproach::Balanced => (0.25, 0.25, 0.25, 0.25),
            MixedApproach::ExitFocused => (0.20, 0.15, 0.10, 0.55),
            MixedApproach::SuccessFocused => (0.40, 0.10, 0.40, 0.10),
            MixedApproach::Conservative => (0.30, 0.30, 0.30, 0.10),
            MixedApproach::Aggressive => (0.40, 0.10, 0.10, 0.40),
        };
        FamilyValues::new(progression, dilution, loss, exit)
    }

    /// Budget cap as a multiple of `max_adjustment_percent`
    #[must_use]
    pub fn default_budget_multiplier(self) -> f64 {
        match self {
            MixedApproach::Conservative => 1.0,
            MixedApproach::Aggressive => 4.0,
            _ => 2.0,
        }
    }
}

/// Weights and budget for one mixed approach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedApproachConfig {
    pub approach: MixedApproach,
    pub weights: FamilyValues,
    pub budget_multiplier: f64,
}

impl MixedApproachConfig {
    #[must_use]
    pub fn default_for(approach: MixedApproach) -> Self {
        Self {
            approach,
            weights: approach.default_weights(),
            budget_multiplier: approach.default_budget_multiplier(),
        }
    }
}

fn default_approaches() -> Vec<MixedApproachConfig> {
    MixedApproach::ALL
        .iter()
        .map(|a| MixedApproachConfig::default_for(*a))
        .collect()
}

/// Settings for `analyze_sensitivity`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityConfig {
    /// Cap for increase-type families (stage progression, exit valuation)
    #[serde(default = "default_max_adjustment")]
    pub max_adjustment_percent: f64,

    /// Cap for decrease-type families (dilution, loss probability)
    #[serde(default = "default_max_decrease")]
    pub max_decrease_percent: f64,

    /// Search resolution in percentage points
    #[serde(default = "default_step_size")]
    pub step_size: f64,

    /// Loss probabilities above this percent are never reduced below it
    #[serde(default = "default_loss_floor")]
    pub loss_probability_floor: f64,

    /// Smallest single adjustment at or below which a target is realistic
    #[serde(default = "default_realistic_threshold")]
    pub realistic_threshold_percent: f64,

    #[serde(default = "default_max_mixed_options")]
    pub max_mixed_options: usize,

    /// Trials per re-simulation; `None` reuses the simulation config
    #[serde(default)]
    pub trials: Option<usize>,

    #[serde(default)]
    pub score_weights: ScoreWeights,

    #[serde(default = "default_approaches")]
    pub approaches: Vec<MixedApproachConfig>,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            max_adjustment_percent: default_max_adjustment(),
            max_decrease_percent: default_max_decrease(),
            step_size: default_step_size(),
            loss_probability_floor: default_loss_floor(),
            realistic_threshold_percent: default_realistic_threshold(),
            max_mixed_options: default_max_mixed_options(),
            trials: None,
            score_weights: ScoreWeights::default(),
            approaches: default_approaches(),
        }
    }
}

impl SensitivityConfig {
    /// Largest adjustment the search may apply to `family`
    #[must_use]
    pub fn limit(&self, family: ParameterFamily) -> f64 {
        if family.is_decrease() {
            self.max_decrease_percent
        } else {
            self.max_adjustment_percent
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = [
            ("step_size", self.step_size),
            ("max_adjustment_percent", self.max_adjustment_percent),
            ("max_decrease_percent", self.max_decrease_percent),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::InvalidSetting {
                    name,
                    value,
                    reason: "must be a positive finite number",
                });
            }
        }

        if self.max_decrease_percent > 100.0 {
            return Err(ValidationError::InvalidSetting {
                name: "max_decrease_percent",
                value: self.max_decrease_percent,
                reason: "cannot remove more than the whole baseline value",
            });
        }

        if !(0.0..=100.0).contains(&self.loss_probability_floor) {
            return Err(ValidationError::InvalidSetting {
                name: "loss_probability_floor",
                value: self.loss_probability_floor,
                reason: "must be between 0 and 100",
            });
        }

        if self.trials == Some(0) {
            return Err(ValidationError::ZeroTrials);
        }

        let w = &self.score_weights;
        let weights = [w.closeness, w.single_adjustment, w.breadth, w.mixed_availability];
        if weights.iter().any(|v| !v.is_finite() || *v < 0.0) || w.total() <= 0.0 {
            return Err(ValidationError::InvalidSetting {
                name: "score_weights",
                value: w.total(),
                reason: "weights must be non-negative with a positive sum",
            });
        }

        for approach in &self.approaches {
            let m = approach.budget_multiplier;
            if !m.is_finite() || m <= 0.0 {
                return Err(ValidationError::InvalidSetting {
                    name: "approaches.budget_multiplier",
                    value: m,
                    reason: "must be a positive finite number",
                });
            }
            if approach
                .weights
                .iter()
                .any(|(_, v)| !v.is_finite() || *v < 0.0)
            {
                return Err(ValidationError::InvalidSetting {
                    name: "approaches.weights",
                    value: approach.weights.total(),
                    reason: "weights must be non-negative",
                });
            }
        }

        Ok(())
    }

    /// Score weights scaled to sum to one
    #[must_use]
    pub(crate) fn normalized_score_weights(&self) -> ScoreWeights {
        let w = self.score_weights;
        let total = w.total();
        if total <= 0.0 {
            return ScoreWeights::default();
        }
        ScoreWeights {
            closeness: w.closeness / total,
            single_adjustment: w.single_adjustment / total,
            breadth: w.breadth / total,
            mixed_availability: w.mixed_availability / total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = SensitivityConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.approaches.len(), 5);
        assert_eq!(config.limit(ParameterFamily::Dilution), 100.0);
        assert_eq!(config.limit(ParameterFamily::ExitValuation), 50.0);
    }

    #[test]
    fn test_default_approach_weights_sum_to_one() {
        for approach in MixedApproach::ALL {
            let total = approach.default_weights().total();
            assert!((total - 1.0).abs() < 1e-12, "{approach:?} sums to {total}");
        }
    }

    #[test]
    fn test_rejects_bad_step() {
        let config = SensitivityConfig {
            step_size: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidSetting {
                name: "step_size",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_decrease_over_hundred() {
        let config = SensitivityConfig {
            max_decrease_percent: 120.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_score_weights_normalized() {
        let config = SensitivityConfig {
            score_weights: ScoreWeights {
                closeness: 2.0,
                single_adjustment: 2.0,
                breadth: 0.0,
                mixed_availability: 0.0,
            },
            ..Default::default()
        };
        let w = config.normalized_score_weights();
        assert!((w.closeness - 0.5).abs() < 1e-12);
        assert!((w.single_adjustment - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_serde_partial_config() {
        let config: SensitivityConfig =
            serde_json::from_str(r#"{"max_adjustment_percent": 30, "step_size": 2.5}"#).unwrap();
        assert_eq!(config.max_adjustment_percent, 30.0);
        assert_eq!(config.step_size, 2.5);
        assert_eq!(config.max_decrease_percent, 100.0);
        assert_eq!(config.approaches.len(), 5);
    }
}
