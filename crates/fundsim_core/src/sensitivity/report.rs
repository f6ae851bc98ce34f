//! Sensitivity report types

use serde::{Deserialize, Serialize};

use crate::model::FundMetrics;

use super::config::MixedApproach;
use super::family::{FamilyValues, ParameterAdjustment, ParameterFamily};

/// Smallest adjustment of one family, in isolation, that reaches a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleParameterResult {
    pub family: ParameterFamily,
    pub achievable: bool,
    /// Adjustment found on the search grid; the family limit when not achievable
    pub adjustment_percent: f64,
    /// Adjustment actually needed: equals `adjustment_percent` when
    /// achievable, otherwise a linear extrapolation that may be infinite.
    /// Infinity serializes as the string `"inf"`.
    #[serde(with = "unbounded_percent")]
    pub required_percent: f64,
    /// Why the family cannot reach the target (empty when achievable)
    pub bound_violations: Vec<String>,
    /// Re-simulated metrics at `adjustment_percent`
    pub metrics: FundMetrics,
}

impl SingleParameterResult {
    #[must_use]
    pub fn adjustment(&self) -> ParameterAdjustment {
        ParameterAdjustment {
            family: self.family,
            percent: self.adjustment_percent,
        }
    }
}

/// JSON has no infinity, so an unbounded requirement is written as `"inf"`
mod unbounded_percent {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

    const INFINITE: &str = "inf";

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if *value == f64::INFINITY {
            Repr::Text(INFINITE.to_string()).serialize(serializer)
        } else {
            Repr::Finite(*value).serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Finite(value) => Ok(value),
            Repr::Text(text) if text == INFINITE => Ok(f64::INFINITY),
            Repr::Text(other) => Err(de::Error::invalid_value(
                de::Unexpected::Str(&other),
                &"a number or \"inf\"",
            )),
        }
    }
}

/// A combination of adjustments across families that reaches a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedParameterOption {
    pub approach: MixedApproach,
    pub adjustments: Vec<ParameterAdjustment>,
    /// Sum of every family's adjustment, the ranking key
    pub total_adjustment: f64,
    pub metrics: FundMetrics,
}

impl MixedParameterOption {
    #[must_use]
    pub fn values(&self) -> FamilyValues {
        let mut values = FamilyValues::default();
        for adj in &self.adjustments {
            *values.get_mut(adj.family) = adj.percent;
        }
        values
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Realism {
    Realistic,
    Optimistic,
}

/// One weighted input to the achievability score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    /// Normalized weight in `[0, 1]`
    pub weight: f64,
    /// Factor value in `[0, 100]`
    pub value: f64,
    pub explanation: String,
}

impl ScoreFactor {
    /// Contribution to the composite score
    #[must_use]
    pub fn weighted(&self) -> f64 {
        self.weight * self.value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievabilityScore {
    /// Composite in `[0, 100]`
    pub score: f64,
    pub realism: Realism,
    pub factors: Vec<ScoreFactor>,
}

/// Everything found for one target multiple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetScenario {
    pub target_moic: f64,
    pub single_parameter: Vec<SingleParameterResult>,
    /// Decrease families exhausted at a lower target and skipped here
    pub suppressed_families: Vec<ParameterFamily>,
    /// Ranked by total adjustment, smallest first
    pub mixed_options: Vec<MixedParameterOption>,
    pub achievability: AchievabilityScore,
}

impl TargetScenario {
    #[must_use]
    pub fn result_for(&self, family: ParameterFamily) -> Option<&SingleParameterResult> {
        self.single_parameter.iter().find(|r| r.family == family)
    }

    /// Smallest achievable single-family adjustment, if any
    #[must_use]
    pub fn min_single_adjustment(&self) -> Option<&SingleParameterResult> {
        self.single_parameter
            .iter()
            .filter(|r| r.achievable)
            .min_by(|a, b| a.adjustment_percent.total_cmp(&b.adjustment_percent))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub baseline: FundMetrics,
    pub baseline_moic: f64,
    /// One scenario per distinct target, ascending
    pub scenarios: Vec<TargetScenario>,
    /// Fund simulations actually run (cache hits excluded)
    pub simulations_run: usize,
}

impl SensitivityReport {
    #[must_use]
    pub fn scenario(&self, target: f64) -> Option<&TargetScenario> {
        self.scenarios
            .iter()
            .find(|s| (s.target_moic - target).abs() < 1e-9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insensitive() -> SingleParameterResult {
        SingleParameterResult {
            family: ParameterFamily::StageProgression,
            achievable: false,
            adjustment_percent: 50.0,
            required_percent: f64::INFINITY,
            bound_violations: vec!["no effect on the multiple".to_string()],
            metrics: FundMetrics::empty(),
        }
    }

    #[test]
    fn test_infinite_requirement_survives_json() {
        let json = serde_json::to_string(&insensitive()).unwrap();
        assert!(json.contains(r#""required_percent":"inf""#));

        let back: SingleParameterResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.required_percent, f64::INFINITY);
    }

    #[test]
    fn test_finite_requirement_stays_numeric() {
        let result = SingleParameterResult {
            required_percent: 137.5,
            ..insensitive()
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""required_percent":137.5"#));

        let back: SingleParameterResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.required_percent, 137.5);
    }
}
