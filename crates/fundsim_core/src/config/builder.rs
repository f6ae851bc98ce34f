//! Investment Builder DSL
//!
//! Provides a fluent API for defining portfolio investments.
//!
//! # Examples
//!
//! ```ignore
//! use fundsim_core::config::InvestmentBuilder;
//! use fundsim_core::model::Stage;
//!
//! // Start from typical market assumptions and override a few
//! let acme = InvestmentBuilder::new("Acme")
//!     .entry_stage(Stage::PreSeed)
//!     .check_size(250_000.0)
//!     .entry_valuation(3_000_000.0)
//!     .all_dilution(18.0)
//!     .build();
//!
//! // A path with no randomness: always reaches IPO at a fixed valuation
//! let sure_thing = InvestmentBuilder::certain("Sure", 10.0).build();
//! ```

use crate::model::{
    Investment, RoundValues, Stage, StageAssumptions, StageValues, TransitionAssumptions,
    ValueRange,
};

/// Builder for a single `Investment`
#[derive(Debug, Clone)]
pub struct InvestmentBuilder {
    name: String,
    entry_stage: Stage,
    check_size: f64,
    entry_valuation: f64,
    entry_year: u32,
    rounds: RoundValues<TransitionAssumptions>,
    stages: StageValues<StageAssumptions>,
}

fn round(advance_probability: f64, dilution: f64, min_years: f64, max_years: f64) -> TransitionAssumptions {
    TransitionAssumptions {
        advance_probability,
        dilution,
        years: ValueRange::new(min_years, max_years),
    }
}

fn stage(loss_probability: f64, min_exit: f64, max_exit: f64) -> StageAssumptions {
    StageAssumptions {
        loss_probability,
        exit_valuation: ValueRange::new(min_exit, max_exit),
    }
}

impl InvestmentBuilder {
    /// Create a builder seeded with typical venture market assumptions
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_stage: Stage::Seed,
            check_size: 250_000.0,
            entry_valuation: 5_000_000.0,
            entry_year: 0,
            rounds: RoundValues {
                seed: round(55.0, 20.0, 1.0, 2.0),
                series_a: round(40.0, 20.0, 1.5, 2.5),
                series_b: round(45.0, 15.0, 1.5, 3.0),
                series_c: round(50.0, 12.0, 2.0, 3.0),
                ipo: round(25.0, 10.0, 2.0, 4.0),
            },
            stages: StageValues {
                pre_seed: stage(70.0, 1_000_000.0, 5_000_000.0),
                seed: stage(60.0, 5_000_000.0, 20_000_000.0),
                series_a: stage(45.0, 20_000_000.0, 80_000_000.0),
                series_b: stage(35.0, 60_000_000.0, 250_000_000.0),
                series_c: stage(25.0, 150_000_000.0, 600_000_000.0),
                ipo: stage(5.0, 500_000_000.0, 3_000_000_000.0),
            },
        }
    }

    // =========================================================================
    // Presets
    // =========================================================================

    /// Pre-Seed entry that always advances to IPO, never loses, and exits at
    /// exactly `exit_valuation` from any stage, with no dilution and one year
    /// per round.
    #[must_use]
    pub fn certain(name: impl Into<String>, exit_valuation: f64) -> Self {
        Self::new(name)
            .entry_stage(Stage::PreSeed)
            .all_advance_probabilities(100.0)
            .all_dilution(0.0)
            .all_round_years(1.0, 1.0)
            .all_loss_probabilities(0.0)
            .all_exit_valuations(exit_valuation, exit_valuation)
    }

    /// Every exit is a total loss
    #[must_use]
    pub fn write_off(name: impl Into<String>) -> Self {
        Self::new(name).all_loss_probabilities(100.0)
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    #[must_use]
    pub fn entry_stage(mut self, stage: Stage) -> Self {
        self.entry_stage = stage;
        self
    }

    #[must_use]
    pub fn check_size(mut self, amount: f64) -> Self {
        self.check_size = amount;
        self
    }

    #[must_use]
    pub fn entry_valuation(mut self, valuation: f64) -> Self {
        self.entry_valuation = valuation;
        self
    }

    #[must_use]
    pub fn entry_year(mut self, year: u32) -> Self {
        self.entry_year = year;
        self
    }

    /// Set the probability of raising the round into `to`
    #[must_use]
    pub fn advance_probability(mut self, to: Stage, percent: f64) -> Self {
        if let Some(r) = self.rounds.get_mut(to) {
            r.advance_probability = percent;
        }
        self
    }

    #[must_use]
    pub fn all_advance_probabilities(mut self, percent: f64) -> Self {
        self.rounds
            .for_each_mut(|_, r| r.advance_probability = percent);
        self
    }

    #[must_use]
    pub fn dilution(mut self, to: Stage, percent: f64) -> Self {
        if let Some(r) = self.rounds.get_mut(to) {
            r.dilution = percent;
        }
        self
    }

    #[must_use]
    pub fn all_dilution(mut self, percent: f64) -> Self {
        self.rounds.for_each_mut(|_, r| r.dilution = percent);
        self
    }

    #[must_use]
    pub fn round_years(mut self, to: Stage, min: f64, max: f64) -> Self {
        if let Some(r) = self.rounds.get_mut(to) {
            r.years = ValueRange::new(min, max);
        }
        self
    }

    #[must_use]
    pub fn all_round_years(mut self, min: f64, max: f64) -> Self {
        self.rounds
            .for_each_mut(|_, r| r.years = ValueRange::new(min, max));
        self
    }

    #[must_use]
    pub fn loss_probability(mut self, stage: Stage, percent: f64) -> Self {
        self.stages.get_mut(stage).loss_probability = percent;
        self
    }

    #[must_use]
    pub fn all_loss_probabilities(mut self, percent: f64) -> Self {
        self.stages
            .for_each_mut(|_, s| s.loss_probability = percent);
        self
    }

    #[must_use]
    pub fn exit_valuation(mut self, stage: Stage, min: f64, max: f64) -> Self {
        self.stages.get_mut(stage).exit_valuation = ValueRange::new(min, max);
        self
    }

    #[must_use]
    pub fn all_exit_valuations(mut self, min: f64, max: f64) -> Self {
        self.stages
            .for_each_mut(|_, s| s.exit_valuation = ValueRange::new(min, max));
        self
    }

    /// Build the investment
    #[must_use]
    pub fn build(self) -> Investment {
        Investment {
            name: self.name,
            entry_stage: self.entry_stage,
            check_size: self.check_size,
            entry_valuation: self.entry_valuation,
            entry_year: self.entry_year,
            rounds: self.rounds,
            stages: self.stages,
        }
    }
}
