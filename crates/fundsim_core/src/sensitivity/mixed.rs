//! Mixed-parameter options
//!
//! Each approach spreads one total budget across families by fixed weights.
//! The smallest budget on the step grid that reaches the target becomes a
//! candidate; candidates are deduplicated and ranked by total adjustment.

use crate::error::SimulationError;
use crate::model::FundMetrics;

use super::config::{MixedApproachConfig, SensitivityConfig};
use super::family::{FamilyValues, ParameterAdjustment, ParameterFamily};
use super::report::MixedParameterOption;
use super::search::{Evaluator, GridOutcome, search_grid};

/// Per-family adjustments for `budget`, each clamped to its family limit
#[must_use]
pub fn allocate_budget(approach: &MixedApproachConfig, budget: f64, config: &SensitivityConfig) -> FamilyValues {
    let mut values = FamilyValues::default();
    for family in ParameterFamily::ALL {
        let share = budget * approach.weights.get(family);
        *values.get_mut(family) = share.clamp(0.0, config.limit(family));
    }
    values
}

/// Order candidates by total adjustment, ties to the higher MOIC, then drop
/// duplicates and keep at most `limit`
pub(crate) fn rank_options(mut options: Vec<MixedParameterOption>, limit: usize) -> Vec<MixedParameterOption> {
    options.sort_by(|a, b| {
        a.total_adjustment
            .total_cmp(&b.total_adjustment)
            .then_with(|| b.metrics.average_moic.total_cmp(&a.metrics.average_moic))
    });

    let mut seen = Vec::new();
    options.retain(|opt| {
        let key = opt.values().cache_key();
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
    options.truncate(limit);
    options
}

/// Search every configured approach for `target`
pub(crate) fn search_mixed(
    evaluator: &mut Evaluator<'_>,
    baseline: &FundMetrics,
    target: f64,
) -> Result<Vec<MixedParameterOption>, SimulationError> {
    if super::search::meets_target(baseline.average_moic, target) {
        return Ok(Vec::new());
    }

    let config = evaluator.config().clone();
    let mut candidates = Vec::new();

    for approach in &config.approaches {
        if approach.weights.total() <= 0.0 {
            continue;
        }
        let cap = approach.budget_multiplier * config.max_adjustment_percent;
        let outcome = search_grid(cap, config.step_size, target, |budget| {
            evaluator.evaluate(&allocate_budget(approach, budget, &config))
        })?;

        match outcome {
            GridOutcome::Found { point, metrics } => {
                let values = allocate_budget(approach, point, &config);
                tracing::debug!(
                    approach = approach.approach.label(),
                    budget = point,
                    total = values.total(),
                    moic = metrics.average_moic,
                    "mixed option found"
                );
                candidates.push(MixedParameterOption {
                    approach: approach.approach,
                    adjustments: ParameterAdjustment::from_values(&values),
                    total_adjustment: values.total(),
                    metrics,
                });
            }
            GridOutcome::NotFound { metrics_at_limit } => {
                tracing::debug!(
                    approach = approach.approach.label(),
                    cap,
                    moic = metrics_at_limit.average_moic,
                    "mixed approach cannot reach target"
                );
            }
        }
    }

    Ok(rank_options(candidates, config.max_mixed_options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensitivity::config::MixedApproach;

    fn option(approach: MixedApproach, values: FamilyValues, moic: f64) -> MixedParameterOption {
        MixedParameterOption {
            approach,
            adjustments: ParameterAdjustment::from_values(&values),
            total_adjustment: values.total(),
            metrics: FundMetrics {
                average_moic: moic,
                ..FundMetrics::empty()
            },
        }
    }

    #[test]
    fn test_allocation_respects_family_limits() {
        let config = SensitivityConfig::default();
        let approach = MixedApproachConfig::default_for(MixedApproach::ExitFocused);
        let values = allocate_budget(&approach, 200.0, &config);
        // 55% of 200 would be 110, capped at the 50% increase limit
        assert_eq!(values.exit_valuation, 50.0);
        assert!((values.stage_progression - 40.0).abs() < 1e-12);
        assert!((values.dilution - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_ranking_prefers_smaller_total_then_higher_moic() {
        let a = option(MixedApproach::Balanced, FamilyValues::new(10.0, 10.0, 10.0, 10.0), 2.1);
        let b = option(MixedApproach::ExitFocused, FamilyValues::new(5.0, 5.0, 5.0, 15.0), 2.3);
        let c = option(MixedApproach::Aggressive, FamilyValues::new(2.0, 2.0, 2.0, 10.0), 2.0);
        let ranked = rank_options(vec![a, b, c], 3);
        let order: Vec<_> = ranked.iter().map(|o| o.approach).collect();
        assert_eq!(
            order,
            vec![MixedApproach::Aggressive, MixedApproach::ExitFocused, MixedApproach::Balanced]
        );
    }

    #[test]
    fn test_ranking_drops_duplicates_and_truncates() {
        let values = FamilyValues::new(5.0, 5.0, 5.0, 5.0);
        let options = vec![
            option(MixedApproach::Balanced, values, 2.0),
            option(MixedApproach::Conservative, values, 2.0),
            option(MixedApproach::Aggressive, FamilyValues::new(1.0, 1.0, 1.0, 30.0), 2.0),
        ];
        let ranked = rank_options(options, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].approach, MixedApproach::Balanced);
    }
}
