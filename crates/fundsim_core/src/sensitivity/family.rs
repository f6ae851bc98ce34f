//! Adjustable parameter families
//!
//! Each family is a closed set of investment assumptions scaled together by
//! one percentage. Increase-type families scale values up, decrease-type
//! families scale them toward zero.

use serde::{Deserialize, Serialize};

use crate::model::Investment;

use super::config::SensitivityConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterFamily {
    /// Stage-advancement probabilities, increased
    StageProgression,
    /// Per-round dilution, decreased
    Dilution,
    /// Per-stage loss probabilities, decreased
    LossProbability,
    /// Per-stage exit-valuation ranges, increased
    ExitValuation,
}

impl ParameterFamily {
    pub const ALL: [ParameterFamily; 4] = [
        ParameterFamily::StageProgression,
        ParameterFamily::Dilution,
        ParameterFamily::LossProbability,
        ParameterFamily::ExitValuation,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ParameterFamily::StageProgression => "stage progression",
            ParameterFamily::Dilution => "dilution",
            ParameterFamily::LossProbability => "loss probability",
            ParameterFamily::ExitValuation => "exit valuation",
        }
    }

    /// True for families adjusted downward
    #[must_use]
    pub fn is_decrease(self) -> bool {
        matches!(
            self,
            ParameterFamily::Dilution | ParameterFamily::LossProbability
        )
    }

    /// Verb describing the direction of adjustment
    #[must_use]
    pub fn direction(self) -> &'static str {
        if self.is_decrease() {
            "decrease"
        } else {
            "increase"
        }
    }

    /// Return a copy of `investment` with this family adjusted by `percent`.
    ///
    /// Probabilities never rise past 100, dilution never goes negative, and
    /// a loss probability above the configured floor never drops below it.
    #[must_use]
    pub fn apply(self, investment: &Investment, percent: f64, config: &SensitivityConfig) -> Investment {
        let mut adjusted = investment.clone();
        if percent <= 0.0 {
            return adjusted;
        }
        let up = 1.0 + percent / 100.0;
        let down = (1.0 - percent / 100.0).max(0.0);

        match self {
            ParameterFamily::StageProgression => {
                adjusted.rounds.for_each_mut(|_, r| {
                    if r.advance_probability < 100.0 {
                        r.advance_probability = (r.advance_probability * up).min(100.0);
                    }
                });
            }
            ParameterFamily::Dilution => {
                adjusted
                    .rounds
                    .for_each_mut(|_, r| r.dilution = (r.dilution * down).max(0.0));
            }
            ParameterFamily::LossProbability => {
                let floor = config.loss_probability_floor;
                adjusted.stages.for_each_mut(|_, s| {
                    if s.loss_probability > floor {
                        s.loss_probability = (s.loss_probability * down).max(floor);
                    }
                });
            }
            ParameterFamily::ExitValuation => {
                adjusted
                    .stages
                    .for_each_mut(|_, s| s.exit_valuation = s.exit_valuation.scaled(up));
            }
        }
        adjusted
    }
}

impl std::fmt::Display for ParameterFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One value per parameter family
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyValues {
    #[serde(default)]
    pub stage_progression: f64,
    #[serde(default)]
    pub dilution: f64,
    #[serde(default)]
    pub loss_probability: f64,
    #[serde(default)]
    pub exit_valuation: f64,
}

impl FamilyValues {
    #[must_use]
    pub fn new(stage_progression: f64, dilution: f64, loss_probability: f64, exit_valuation: f64) -> Self {
        Self {
            stage_progression,
            dilution,
            loss_probability,
            exit_valuation,
        }
    }

    /// Only `family` set to `value`
    #[must_use]
    pub fn single(family: ParameterFamily, value: f64) -> Self {
        let mut values = Self::default();
        *values.get_mut(family) = value;
        values
    }

    #[must_use]
    pub fn get(&self, family: ParameterFamily) -> f64 {
        match family {
            ParameterFamily::StageProgression => self.stage_progression,
            ParameterFamily::Dilution => self.dilution,
            ParameterFamily::LossProbability => self.loss_probability,
            ParameterFamily::ExitValuation => self.exit_valuation,
        }
    }

    pub fn get_mut(&mut self, family: ParameterFamily) -> &mut f64 {
        match family {
            ParameterFamily::StageProgression => &mut self.stage_progression,
            ParameterFamily::Dilution => &mut self.dilution,
            ParameterFamily::LossProbability => &mut self.loss_probability,
            ParameterFamily::ExitValuation => &mut self.exit_valuation,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterFamily, &f64)> {
        [
            (ParameterFamily::StageProgression, &self.stage_progression),
            (ParameterFamily::Dilution, &self.dilution),
            (ParameterFamily::LossProbability, &self.loss_probability),
            (ParameterFamily::ExitValuation, &self.exit_valuation),
        ]
        .into_iter()
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.iter().map(|(_, v)| *v).sum()
    }

    /// Hashable key with values rounded to 1e-6
    #[must_use]
    pub(crate) fn cache_key(&self) -> [i64; 4] {
        let q = |v: f64| (v * 1e6).round() as i64;
        [
            q(self.stage_progression),
            q(self.dilution),
            q(self.loss_probability),
            q(self.exit_valuation),
        ]
    }
}

/// A named percentage change to one family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterAdjustment {
    pub family: ParameterFamily,
    pub percent: f64,
}

impl ParameterAdjustment {
    /// Non-zero entries of `values`, in family order
    #[must_use]
    pub fn from_values(values: &FamilyValues) -> Vec<ParameterAdjustment> {
        values
            .iter()
            .filter(|(_, v)| **v > 0.0)
            .map(|(family, v)| ParameterAdjustment {
                family,
                percent: *v,
            })
            .collect()
    }
}

impl std::fmt::Display for ParameterAdjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.family.is_decrease() { '-' } else { '+' };
        write!(f, "{} {}{:.1}%", self.family, sign, self.percent)
    }
}

/// Apply every family adjustment in `values` to each investment
#[must_use]
pub fn apply_adjustments(
    investments: &[Investment],
    values: &FamilyValues,
    config: &SensitivityConfig,
) -> Vec<Investment> {
    investments
        .iter()
        .map(|inv| {
            values.iter().fold(inv.clone(), |acc, (family, pct)| {
                family.apply(&acc, *pct, config)
            })
        })
        .collect()
}
