//! Simulation configuration
//!
//! `SimulationConfig` holds everything the fund runner needs besides the
//! investment set: trial count, seed, fee schedule and follow-on strategy.
//! It is supplied per run and never mutated by the engine.
//!
//! # Builder DSL
//!
//! Investments can be assembled with a fluent builder that starts from
//! typical venture market assumptions:
//!
//! ```ignore
//! use fundsim_core::config::InvestmentBuilder;
//! use fundsim_core::model::Stage;
//!
//! let inv = InvestmentBuilder::new("Acme")
//!     .entry_stage(Stage::Seed)
//!     .check_size(1_000_000.0)
//!     .entry_valuation(12_000_000.0)
//!     .advance_probability(Stage::SeriesA, 45.0)
//!     .exit_valuation(Stage::SeriesA, 30_000_000.0, 90_000_000.0)
//!     .build();
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{Investment, MAX_HORIZON_YEARS, Stage};

pub mod builder;

pub use builder::InvestmentBuilder;

fn default_trials() -> usize {
    1000
}

fn default_seed() -> u64 {
    42
}

fn default_batch_size() -> usize {
    100
}

fn default_qualifying_stages() -> Vec<Stage> {
    vec![Stage::SeriesA, Stage::SeriesB]
}

/// Fund fees, expressed as percentages of the initial-check base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// One-time fee charged in year 0
    #[serde(default)]
    pub setup_fee_percent: f64,
    /// Fee charged in each of the first `fee_years` years
    #[serde(default)]
    pub management_fee_percent: f64,
    #[serde(default)]
    pub fee_years: u32,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            setup_fee_percent: 0.0,
            management_fee_percent: 2.0,
            fee_years: 10,
        }
    }
}

impl FeeSchedule {
    /// A schedule that charges nothing
    #[must_use]
    pub fn none() -> Self {
        Self {
            setup_fee_percent: 0.0,
            management_fee_percent: 0.0,
            fee_years: 0,
        }
    }

    /// Setup fee amount on `base`
    #[must_use]
    pub fn setup_fee(&self, base: f64) -> f64 {
        base * self.setup_fee_percent / 100.0
    }

    /// Annual management fee amount on `base`
    #[must_use]
    pub fn annual_fee(&self, base: f64) -> f64 {
        base * self.management_fee_percent / 100.0
    }

    /// Setup fee plus every annual fee
    #[must_use]
    pub fn total_fees(&self, base: f64) -> f64 {
        self.setup_fee(base) + self.annual_fee(base) * f64::from(self.fee_years)
    }
}

/// Follow-on investment, reserves and recycling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowOnStrategy {
    #[serde(default)]
    pub enabled: bool,
    /// Chance (percent) of following on at a qualifying stage
    #[serde(default)]
    pub rate: f64,
    /// Follow-on check as a multiple of the initial check
    #[serde(default)]
    pub multiple: f64,
    /// Stages at which a follow-on may be written
    #[serde(default = "default_qualifying_stages")]
    pub qualifying_stages: Vec<Stage>,
    /// Fraction (0-1) of the initial-check base held back for follow-ons
    #[serde(default)]
    pub reserve_ratio: f64,
    #[serde(default)]
    pub recycling_enabled: bool,
    /// Share (percent) of early exit proceeds reinvested
    #[serde(default)]
    pub recycling_rate: f64,
}

impl Default for FollowOnStrategy {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: 0.0,
            multiple: 0.0,
            qualifying_stages: default_qualifying_stages(),
            reserve_ratio: 0.0,
            recycling_enabled: false,
            recycling_rate: 0.0,
        }
    }
}

impl FollowOnStrategy {
    /// True when `stage` may receive a follow-on
    #[must_use]
    pub fn qualifies(&self, stage: Stage) -> bool {
        self.enabled && self.qualifying_stages.contains(&stage)
    }
}

/// Complete configuration for a fund simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of independent portfolio trials
    #[serde(default = "default_trials")]
    pub trials: usize,

    /// Seed for the trial generators; equal seeds give identical results
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub fees: FeeSchedule,

    #[serde(default)]
    pub follow_on: FollowOnStrategy,

    /// Keep every `PortfolioTrial` in the result (for histograms)
    #[serde(default)]
    pub retain_trials: bool,

    /// Trials per parallel batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: default_trials(),
            seed: default_seed(),
            fees: FeeSchedule::default(),
            follow_on: FollowOnStrategy::default(),
            retain_trials: false,
            batch_size: default_batch_size(),
        }
    }
}

impl SimulationConfig {
    /// Create a copy with a different trial count
    #[must_use]
    pub fn with_trials(&self, trials: usize) -> Self {
        Self {
            trials,
            ..self.clone()
        }
    }

    /// Reject structurally invalid configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.trials == 0 {
            return Err(ValidationError::ZeroTrials);
        }
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidSetting {
                name: "batch_size",
                value: 0.0,
                reason: "must be at least 1",
            });
        }

        let non_negative = [
            ("fees.setup_fee_percent", self.fees.setup_fee_percent),
            ("fees.management_fee_percent", self.fees.management_fee_percent),
            ("follow_on.multiple", self.follow_on.multiple),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidSetting {
                    name,
                    value,
                    reason: "must be a non-negative finite number",
                });
            }
        }

        if self.fees.fee_years > MAX_HORIZON_YEARS {
            return Err(ValidationError::InvalidSetting {
                name: "fees.fee_years",
                value: f64::from(self.fees.fee_years),
                reason: "must not exceed the fund horizon",
            });
        }

        let ratio = self.follow_on.reserve_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ValidationError::InvalidSetting {
                name: "follow_on.reserve_ratio",
                value: ratio,
                reason: "must be between 0 and 1",
            });
        }

        Ok(())
    }

    /// Validate the configuration together with every investment
    pub fn validate_with(&self, investments: &[Investment]) -> Result<(), ValidationError> {
        self.validate()?;
        for inv in investments {
            inv.validate()?;
        }
        Ok(())
    }
}
