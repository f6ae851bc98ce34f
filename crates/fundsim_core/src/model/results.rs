//! Simulation results and aggregate fund metrics

use serde::{Deserialize, Serialize};

use super::investment::ParameterWarning;
use super::stage::Stage;

/// Multiple on invested capital, defined as 0 when nothing was paid in
#[must_use]
pub fn moic(distributed: f64, paid_in: f64) -> f64 {
    if paid_in > 0.0 {
        let ratio = distributed / paid_in;
        if ratio.is_finite() { ratio } else { 0.0 }
    } else {
        0.0
    }
}

/// One investment's outcome in one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationTrial {
    /// Initial check plus any follow-on
    pub entry_amount: f64,
    /// Follow-on portion of `entry_amount`
    pub follow_on_amount: f64,
    /// Proceeds returned at exit (0 on a total loss)
    pub exit_amount: f64,
    pub exit_stage: Stage,
    /// Ownership held when the initial check closed
    pub ownership_at_entry: f64,
    /// Ownership held at exit, after every round's dilution
    pub ownership_at_exit: f64,
    pub holding_period_years: f64,
    /// Years after entry at which the follow-on was written, if any
    pub follow_on_year: Option<f64>,
    pub total_loss: bool,
    pub moic: f64,
}

/// One full-portfolio trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioTrial {
    pub investments: Vec<SimulationTrial>,
    /// Checks plus follow-ons
    pub entry_amount: f64,
    pub fees: f64,
    /// Capital called from LPs: entry amounts plus fees
    pub paid_in: f64,
    /// Capital returned to LPs
    pub distributed: f64,
    pub recycled_capital: f64,
    /// Entry amounts plus recycled capital
    pub total_invested: f64,
    pub moic: f64,
    pub irr: f64,
}

/// Aggregate over every trial of a fund simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundMetrics {
    pub num_trials: usize,
    /// `average_distributed / total_paid_in` (0 when nothing was paid in)
    pub average_moic: f64,
    pub average_irr: f64,
    pub average_distributed: f64,
    /// Mean paid-in capital per trial
    pub total_paid_in: f64,
    /// Fraction of trials with portfolio MOIC >= 1
    pub success_rate: f64,
    /// Mean of the per-trial MOICs
    pub mean_trial_moic: f64,
    pub min_moic: f64,
    pub max_moic: f64,
    /// `(percentile, moic)` pairs over the per-trial MOIC distribution
    pub moic_percentiles: Vec<(f64, f64)>,
    /// Present when a follow-on or recycling strategy is active
    pub average_total_invested: Option<f64>,
    pub average_recycled_capital: Option<f64>,
}

impl FundMetrics {
    /// Metrics for a run that produced no trials
    #[must_use]
    pub fn empty() -> Self {
        Self {
            num_trials: 0,
            average_moic: 0.0,
            average_irr: 0.0,
            average_distributed: 0.0,
            total_paid_in: 0.0,
            success_rate: 0.0,
            mean_trial_moic: 0.0,
            min_moic: 0.0,
            max_moic: 0.0,
            moic_percentiles: Vec::new(),
            average_total_invested: None,
            average_recycled_capital: None,
        }
    }

    /// Look up a stored MOIC percentile (e.g. `0.5` for the median)
    #[must_use]
    pub fn moic_percentile(&self, percentile: f64) -> Option<f64> {
        self.moic_percentiles
            .iter()
            .find(|(p, _)| (*p - percentile).abs() < 1e-9)
            .map(|(_, v)| *v)
    }
}

/// Output of the fund simulation runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundSimulationResult {
    pub metrics: FundMetrics,
    /// Parameters that were clamped into range during simulation
    pub warnings: Vec<ParameterWarning>,
    /// Raw per-trial results, when the configuration asks to retain them
    pub trials: Option<Vec<PortfolioTrial>>,
}
