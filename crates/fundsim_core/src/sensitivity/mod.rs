//! Sensitivity search engine
//!
//! Back-solves which assumption changes would lift the simulated fund MOIC
//! to each requested target multiple:
//! - `family` - the four adjustable parameter families and their transforms
//! - `search` - cached re-simulation and the monotonic grid search
//! - `mixed` - weighted multi-family combinations
//! - `scoring` - the achievability composite
//! - `report` - output types
//!
//! All re-simulations reuse the caller's seed, so every candidate sees the
//! same random draws and MOIC moves only because the assumptions moved.

pub mod config;
pub mod family;
pub mod mixed;
pub mod report;
pub mod scoring;
pub mod search;

pub use config::{MixedApproach, MixedApproachConfig, ScoreWeights, SensitivityConfig};
pub use family::{FamilyValues, ParameterAdjustment, ParameterFamily, apply_adjustments};
pub use report::{
    AchievabilityScore, MixedParameterOption, Realism, ScoreFactor, SensitivityReport,
    SingleParameterResult, TargetScenario,
};

use crate::config::SimulationConfig;
use crate::error::{SimulationError, ValidationError};
use crate::model::{FundMetrics, Investment};
use crate::progress::RunProgress;

use mixed::search_mixed;
use scoring::score_scenario;
use search::{Evaluator, search_single};

/// Validate, sort ascending and deduplicate target multiples
pub fn normalize_targets(targets: &[f64]) -> Result<Vec<f64>, ValidationError> {
    if targets.is_empty() {
        return Err(ValidationError::NoTargets);
    }
    if let Some(bad) = targets.iter().find(|t| !t.is_finite() || **t <= 0.0) {
        return Err(ValidationError::InvalidTarget(*bad));
    }
    let mut sorted = targets.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    Ok(sorted)
}

/// True when a decrease family was pushed all the way to its limit
fn exhausted(result: &SingleParameterResult, config: &SensitivityConfig) -> bool {
    result.family.is_decrease()
        && (!result.achievable || result.adjustment_percent >= config.limit(result.family) - 1e-9)
}

/// Run the sensitivity search for every target.
///
/// `baseline` may carry metrics already computed for these inputs with the
/// same simulation configuration; otherwise the baseline is simulated here.
/// Progress is reported after the baseline and after each family and mixed
/// search; cancellation is checked before every re-simulation.
pub fn analyze_sensitivity(
    investments: &[Investment],
    sim_config: &SimulationConfig,
    baseline: Option<&FundMetrics>,
    targets: &[f64],
    config: &SensitivityConfig,
    progress: Option<&RunProgress>,
) -> Result<SensitivityReport, SimulationError> {
    config.validate()?;
    let targets = normalize_targets(targets)?;
    let search_config = match config.trials {
        Some(trials) => sim_config.with_trials(trials),
        None => sim_config.clone(),
    };
    search_config.validate_with(investments)?;

    let mut evaluator = Evaluator::new(investments, search_config, config, progress);

    let phases_per_target = ParameterFamily::ALL.len() + 1;
    let total_phases = 1 + targets.len() * phases_per_target;
    let mut completed = 0usize;
    let mut report_phase = |step: String| {
        completed += 1;
        if let Some(p) = progress {
            p.report(100.0 * completed as f64 / total_phases as f64, &step);
        }
    };

    let zero = FamilyValues::default();
    let baseline = match baseline {
        Some(metrics) => {
            evaluator.seed(&zero, metrics.clone());
            metrics.clone()
        }
        None => evaluator.evaluate(&zero)?,
    };
    let baseline_moic = baseline.average_moic;
    tracing::info!(baseline_moic, targets = targets.len(), "sensitivity baseline ready");
    report_phase(format!("baseline {baseline_moic:.2}x"));

    let mut suppressed: Vec<ParameterFamily> = Vec::new();
    let mut scenarios = Vec::with_capacity(targets.len());

    for target in targets {
        tracing::info!(target, "searching target");
        let suppressed_here = suppressed.clone();

        let mut singles = Vec::with_capacity(ParameterFamily::ALL.len());
        for family in ParameterFamily::ALL {
            if suppressed_here.contains(&family) {
                report_phase(format!("{target:.2}x: {family} suppressed"));
                continue;
            }
            evaluator.check_cancelled()?;
            let result = search_single(&mut evaluator, family, &baseline, target)?;
            report_phase(format!("{target:.2}x: {family} search"));
            singles.push(result);
        }

        for result in &singles {
            if exhausted(result, config) && !suppressed.contains(&result.family) {
                tracing::debug!(family = %result.family, target, "decrease family exhausted");
                suppressed.push(result.family);
            }
        }

        evaluator.check_cancelled()?;
        let mixed_options = search_mixed(&mut evaluator, &baseline, target)?;
        report_phase(format!("{target:.2}x: mixed options"));

        let achievability = score_scenario(
            baseline_moic,
            target,
            &singles,
            !mixed_options.is_empty(),
            config,
        );

        tracing::info!(
            target,
            score = achievability.score,
            realism = ?achievability.realism,
            mixed = mixed_options.len(),
            "target scenario complete"
        );

        scenarios.push(TargetScenario {
            target_moic: target,
            single_parameter: singles,
            suppressed_families: suppressed_here,
            mixed_options,
            achievability,
        });
    }

    Ok(SensitivityReport {
        baseline,
        baseline_moic,
        scenarios,
        simulations_run: evaluator.simulations(),
    })
}
