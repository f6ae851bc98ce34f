//! Monotonic grid search and the cached re-simulation evaluator
//!
//! Every candidate is a vector of per-family adjustments. The evaluator
//! applies it to the investment set, re-runs the fund simulation with the
//! same seed, and memoizes the metrics by quantized vector.

use rustc_hash::FxHashMap;

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::model::{FundMetrics, Investment};
use crate::progress::RunProgress;
use crate::simulation::run_batches;

use super::config::SensitivityConfig;
use super::family::{FamilyValues, ParameterFamily, apply_adjustments};
use super::report::SingleParameterResult;

/// Relative slack when comparing a simulated MOIC with a target
const TARGET_EPSILON: f64 = 1e-9;

/// True when `moic` reaches `target`
#[must_use]
pub fn meets_target(moic: f64, target: f64) -> bool {
    moic >= target - TARGET_EPSILON * target.abs().max(1.0)
}

/// Re-simulates adjusted investment sets, caching by adjustment vector
pub(crate) struct Evaluator<'a> {
    investments: &'a [Investment],
    sim_config: SimulationConfig,
    config: &'a SensitivityConfig,
    progress: Option<&'a RunProgress>,
    cache: FxHashMap<[i64; 4], FundMetrics>,
    simulations: usize,
}

impl<'a> Evaluator<'a> {
    /// Inputs must already be validated
    pub(crate) fn new(
        investments: &'a [Investment],
        sim_config: SimulationConfig,
        config: &'a SensitivityConfig,
        progress: Option<&'a RunProgress>,
    ) -> Self {
        Self {
            investments,
            sim_config,
            config,
            progress,
            cache: FxHashMap::default(),
            simulations: 0,
        }
    }

    pub(crate) fn config(&self) -> &SensitivityConfig {
        self.config
    }

    pub(crate) fn simulations(&self) -> usize {
        self.simulations
    }

    /// Record externally computed metrics for `values`
    pub(crate) fn seed(&mut self, values: &FamilyValues, metrics: FundMetrics) {
        self.cache.insert(values.cache_key(), metrics);
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), SimulationError> {
        if self.progress.is_some_and(RunProgress::is_cancelled) {
            return Err(SimulationError::Cancelled);
        }
        Ok(())
    }

    pub(crate) fn evaluate(&mut self, values: &FamilyValues) -> Result<FundMetrics, SimulationError> {
        self.check_cancelled()?;
        let key = values.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }

        let adjusted = apply_adjustments(self.investments, values, self.config);
        let (metrics, _) = run_batches(&adjusted, &self.sim_config, self.progress)?;
        self.simulations += 1;

        tracing::debug!(
            progression = values.stage_progression,
            dilution = values.dilution,
            loss = values.loss_probability,
            exit = values.exit_valuation,
            moic = metrics.average_moic,
            "evaluated adjustment"
        );

        self.cache.insert(key, metrics.clone());
        Ok(metrics)
    }
}

/// Result of a grid search
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GridOutcome {
    /// Smallest grid point reaching the target, with its metrics
    Found { point: f64, metrics: FundMetrics },
    /// The target is out of reach even at the limit
    NotFound { metrics_at_limit: FundMetrics },
}

/// Grid points `step, 2*step, ..` up to and including `limit`
fn grid_point(k: usize, step: f64, limit: f64) -> f64 {
    (k as f64 * step).min(limit)
}

/// Binary search for the smallest grid point in `(0, limit]` that meets
/// `target`, assuming MOIC is non-decreasing along the grid and that the
/// zero point does not meet it.
pub(crate) fn search_grid<F>(
    limit: f64,
    step: f64,
    target: f64,
    mut evaluate: F,
) -> Result<GridOutcome, SimulationError>
where
    F: FnMut(f64) -> Result<FundMetrics, SimulationError>,
{
    let last = (limit / step).ceil().max(1.0) as usize;

    let at_limit = evaluate(grid_point(last, step, limit))?;
    if !meets_target(at_limit.average_moic, target) {
        return Ok(GridOutcome::NotFound {
            metrics_at_limit: at_limit,
        });
    }

    // Invariant: `low` fails, `high` meets
    let mut low = 0;
    let mut high = last;
    let mut best = at_limit;
    while high - low > 1 {
        let mid = low + (high - low) / 2;
        let metrics = evaluate(grid_point(mid, step, limit))?;
        if meets_target(metrics.average_moic, target) {
            high = mid;
            best = metrics;
        } else {
            low = mid;
        }
    }

    Ok(GridOutcome::Found {
        point: grid_point(high, step, limit),
        metrics: best,
    })
}

/// Linear extrapolation of the adjustment needed to reach `target`.
///
/// Infinite when MOIC did not rise between the baseline and the limit.
#[must_use]
pub fn extrapolate_requirement(baseline_moic: f64, moic_at_limit: f64, limit: f64, target: f64) -> f64 {
    let slope = (moic_at_limit - baseline_moic) / limit;
    if !slope.is_finite() || slope <= 1e-12 {
        return f64::INFINITY;
    }
    ((target - baseline_moic) / slope).max(limit)
}

fn bound_violations(
    family: ParameterFamily,
    config: &SensitivityConfig,
    limit: f64,
    required: f64,
    moic_at_limit: f64,
    target: f64,
) -> Vec<String> {
    let direction = family.direction();
    let mut reasons = vec![format!(
        "{family} {direction} capped at {limit:.0}% reaches only {moic_at_limit:.2}x, short of the {target:.2}x target"
    )];

    if required.is_infinite() {
        reasons.push(format!(
            "fund MOIC does not respond to a {family} {direction}; no adjustment reaches the target"
        ));
    } else if family.is_decrease() && required > 100.0 {
        reasons.push(format!(
            "would require a {required:.0}% {family} {direction}, past the -100% floor"
        ));
    } else {
        reasons.push(format!(
            "would require a {required:.0}% {family} {direction}, above the {limit:.0}% limit"
        ));
    }

    match family {
        ParameterFamily::LossProbability if config.loss_probability_floor > 0.0 => {
            reasons.push(format!(
                "loss probabilities are not reduced below the {:.1}% floor",
                config.loss_probability_floor
            ));
        }
        ParameterFamily::StageProgression => {
            reasons.push("advancement probabilities cannot exceed 100%".to_string());
        }
        _ => {}
    }
    reasons
}

/// Smallest single-family adjustment that reaches `target`
pub(crate) fn search_single(
    evaluator: &mut Evaluator<'_>,
    family: ParameterFamily,
    baseline: &FundMetrics,
    target: f64,
) -> Result<SingleParameterResult, SimulationError> {
    if meets_target(baseline.average_moic, target) {
        return Ok(SingleParameterResult {
            family,
            achievable: true,
            adjustment_percent: 0.0,
            required_percent: 0.0,
            bound_violations: Vec::new(),
            metrics: baseline.clone(),
        });
    }

    let config = evaluator.config().clone();
    let limit = config.limit(family);
    let outcome = search_grid(limit, config.step_size, target, |pct| {
        evaluator.evaluate(&FamilyValues::single(family, pct))
    })?;

    let result = match outcome {
        GridOutcome::Found { point, metrics } => SingleParameterResult {
            family,
            achievable: true,
            adjustment_percent: point,
            required_percent: point,
            bound_violations: Vec::new(),
            metrics,
        },
        GridOutcome::NotFound { metrics_at_limit } => {
            let moic_at_limit = metrics_at_limit.average_moic;
            let required = extrapolate_requirement(baseline.average_moic, moic_at_limit, limit, target);
            SingleParameterResult {
                family,
                achievable: false,
                adjustment_percent: limit,
                required_percent: required,
                bound_violations: bound_violations(family, &config, limit, required, moic_at_limit, target),
                metrics: metrics_at_limit,
            }
        }
    };

    tracing::debug!(
        family = %family,
        target,
        achievable = result.achievable,
        adjustment = result.adjustment_percent,
        moic = result.metrics.average_moic,
        "single-parameter search finished"
    );
    Ok(result)
}
