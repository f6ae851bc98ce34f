//! Investment records and their per-stage assumptions

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::stage::{RoundValues, Stage, StageValues};

/// Longest fund life, in years, that entry years, round gaps and fee periods
/// may reach. Keeps the annual cash-flow timeline bounded.
pub const MAX_HORIZON_YEARS: u32 = 100;

/// Inclusive `[min, max]` range sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A zero-width range that always yields `value`
    #[must_use]
    pub fn fixed(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    #[must_use]
    pub fn midpoint(&self) -> f64 {
        f64::midpoint(self.min, self.max)
    }

    /// Both bounds multiplied by `factor`
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }

    fn check(&self, investment: &str, field: String) -> Result<(), ValidationError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ValidationError::NonFinite {
                investment: investment.to_string(),
                field,
            });
        }
        if self.min > self.max {
            return Err(ValidationError::InvertedRange {
                investment: investment.to_string(),
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::fixed(0.0)
    }
}

/// Assumptions for one funding round (the transition into a stage)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionAssumptions {
    /// Chance (percent) the company raises this round
    pub advance_probability: f64,
    /// Ownership dilution (percent) applied when the round closes
    pub dilution: f64,
    /// Years between the previous round and this one
    pub years: ValueRange,
}

impl Default for TransitionAssumptions {
    fn default() -> Self {
        Self {
            advance_probability: 50.0,
            dilution: 20.0,
            years: ValueRange::new(1.0, 3.0),
        }
    }
}

/// Assumptions for exiting at a stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageAssumptions {
    /// Chance (percent) that an exit at this stage returns nothing
    pub loss_probability: f64,
    /// Company valuation at exit from this stage
    pub exit_valuation: ValueRange,
}

impl Default for StageAssumptions {
    fn default() -> Self {
        Self {
            loss_probability: 50.0,
            exit_valuation: ValueRange::default(),
        }
    }
}

/// A single portfolio position. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub name: String,
    pub entry_stage: Stage,
    /// Initial check written by the fund
    pub check_size: f64,
    /// Post-money valuation at entry
    pub entry_valuation: f64,
    /// Fund year (0-based) in which the check is deployed
    #[serde(default)]
    pub entry_year: u32,
    pub rounds: RoundValues<TransitionAssumptions>,
    pub stages: StageValues<StageAssumptions>,
}

/// A probability or rate outside `[0, 100]` that the simulator clamped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterWarning {
    pub investment: String,
    pub field: String,
    pub value: f64,
    pub clamped_to: f64,
}

/// Clamp a percentage into `[0, 100]`; NaN is treated as 0
#[must_use]
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

impl Investment {
    /// Ownership bought by the initial check, capped at 100%
    #[must_use]
    pub fn initial_ownership(&self) -> f64 {
        if self.entry_valuation > 0.0 {
            (self.check_size / self.entry_valuation).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Reject structurally invalid records
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("check_size", self.check_size),
            ("entry_valuation", self.entry_valuation),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite {
                    investment: self.name.clone(),
                    field: field.to_string(),
                });
            }
            if value <= 0.0 {
                return Err(ValidationError::NonPositive {
                    investment: self.name.clone(),
                    field,
                    value,
                });
            }
        }

        if self.entry_year > MAX_HORIZON_YEARS {
            return Err(ValidationError::BeyondHorizon {
                investment: self.name.clone(),
                field: "entry_year".to_string(),
                value: f64::from(self.entry_year),
                limit: MAX_HORIZON_YEARS,
            });
        }

        for (to, round) in self.rounds.iter() {
            let field = RoundValues::<TransitionAssumptions>::field_name(to);
            round.years.check(&self.name, format!("{field}.years"))?;
            if round.years.min < 0.0 {
                return Err(ValidationError::InvertedRange {
                    investment: self.name.clone(),
                    field: format!("{field}.years"),
                    min: round.years.min,
                    max: round.years.max,
                });
            }
            if round.years.max > f64::from(MAX_HORIZON_YEARS) {
                return Err(ValidationError::BeyondHorizon {
                    investment: self.name.clone(),
                    field: format!("{field}.years"),
                    value: round.years.max,
                    limit: MAX_HORIZON_YEARS,
                });
            }
        }

        for (stage, assumptions) in self.stages.iter() {
            let field = StageValues::<StageAssumptions>::field_name(stage);
            assumptions
                .exit_valuation
                .check(&self.name, format!("{field}.exit_valuation"))?;
        }

        Ok(())
    }

    /// Every probability or rate the simulator will clamp into `[0, 100]`
    #[must_use]
    pub fn parameter_warnings(&self) -> Vec<ParameterWarning> {
        let mut warnings = Vec::new();
        let mut flag = |field: String, value: f64| {
            let clamped = clamp_percent(value);
            if clamped != value {
                warnings.push(ParameterWarning {
                    investment: self.name.clone(),
                    field,
                    value,
                    clamped_to: clamped,
                });
            }
        };

        for (to, round) in self.rounds.iter() {
            let field = RoundValues::<TransitionAssumptions>::field_name(to);
            flag(format!("{field}.advance_probability"), round.advance_probability);
            flag(format!("{field}.dilution"), round.dilution);
        }
        for (stage, assumptions) in self.stages.iter() {
            let field = StageValues::<StageAssumptions>::field_name(stage);
            flag(format!("{field}.loss_probability"), assumptions.loss_probability);
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InvestmentBuilder;

    #[test]
    fn test_initial_ownership() {
        let inv = InvestmentBuilder::new("A")
            .check_size(1_000_000.0)
            .entry_valuation(10_000_000.0)
            .build();
        assert!((inv.initial_ownership() - 0.1).abs() < 1e-12);

        let over = InvestmentBuilder::new("B")
            .check_size(20.0)
            .entry_valuation(10.0)
            .build();
        assert_eq!(over.initial_ownership(), 1.0);
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut inv = InvestmentBuilder::new("Inverted").build();
        inv.stages.series_a.exit_valuation = ValueRange::new(50.0, 10.0);

        match inv.validate() {
            Err(ValidationError::InvertedRange { field, .. }) => {
                assert_eq!(field, "stages.series_a.exit_valuation");
            }
            other => panic!("expected inverted range, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_non_positive_check() {
        let inv = InvestmentBuilder::new("Zero").check_size(0.0).build();
        assert!(matches!(
            inv.validate(),
            Err(ValidationError::NonPositive {
                field: "check_size",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_years_past_horizon() {
        let mut inv = InvestmentBuilder::certain("Forever", 10.0).build();
        inv.rounds.seed.years = ValueRange::fixed(1.0e19);
        match inv.validate() {
            Err(ValidationError::BeyondHorizon { field, limit, .. }) => {
                assert_eq!(field, "rounds.seed.years");
                assert_eq!(limit, MAX_HORIZON_YEARS);
            }
            other => panic!("expected horizon error, got {other:?}"),
        }

        let mut late = InvestmentBuilder::certain("Late", 10.0).build();
        late.entry_year = MAX_HORIZON_YEARS + 1;
        assert!(matches!(
            late.validate(),
            Err(ValidationError::BeyondHorizon { .. })
        ));

        late.entry_year = MAX_HORIZON_YEARS;
        assert!(late.validate().is_ok());
    }

    #[test]
    fn test_parameter_warnings_flag_out_of_range() {
        let mut inv = InvestmentBuilder::new("Loose").build();
        inv.rounds.seed.advance_probability = 120.0;
        inv.stages.ipo.loss_probability = -5.0;

        let warnings = inv.parameter_warnings();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].field, "rounds.seed.advance_probability");
        assert_eq!(warnings[0].clamped_to, 100.0);
        assert_eq!(warnings[1].field, "stages.ipo.loss_probability");
        assert_eq!(warnings[1].clamped_to, 0.0);
        assert!(inv.validate().is_ok());
    }
}
