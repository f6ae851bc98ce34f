//! Achievability scoring

use super::config::SensitivityConfig;
use super::report::{AchievabilityScore, Realism, ScoreFactor, SingleParameterResult};
use super::search::meets_target;

/// Composite 0-100 score for reaching `target` from `baseline_moic`.
///
/// `singles` holds the non-suppressed single-family results.
#[must_use]
pub fn score_scenario(
    baseline_moic: f64,
    target: f64,
    singles: &[SingleParameterResult],
    mixed_available: bool,
    config: &SensitivityConfig,
) -> AchievabilityScore {
    let weights = config.normalized_score_weights();

    if meets_target(baseline_moic, target) {
        let met = |name: &str, weight: f64| ScoreFactor {
            name: name.to_string(),
            weight,
            value: 100.0,
            explanation: format!("baseline {baseline_moic:.2}x already meets the {target:.2}x target"),
        };
        return AchievabilityScore {
            score: 100.0,
            realism: Realism::Realistic,
            factors: vec![
                met("closeness", weights.closeness),
                met("single adjustment", weights.single_adjustment),
                met("breadth", weights.breadth),
                met("mixed availability", weights.mixed_availability),
            ],
        };
    }

    let closeness_value = if target > 0.0 {
        100.0 * (baseline_moic / target).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closeness = ScoreFactor {
        name: "closeness".to_string(),
        weight: weights.closeness,
        value: closeness_value,
        explanation: format!(
            "baseline {baseline_moic:.2}x is {closeness_value:.0}% of the {target:.2}x target"
        ),
    };

    let smallest = singles
        .iter()
        .filter(|r| r.achievable)
        .min_by(|a, b| a.adjustment_percent.total_cmp(&b.adjustment_percent));
    let single_adjustment = match smallest {
        Some(best) => {
            let limit = config.limit(best.family);
            let value = 100.0 * (1.0 - best.adjustment_percent / limit).clamp(0.0, 1.0);
            ScoreFactor {
                name: "single adjustment".to_string(),
                weight: weights.single_adjustment,
                value,
                explanation: format!(
                    "smallest single change is a {:.0}% {} {} (limit {limit:.0}%)",
                    best.adjustment_percent,
                    best.family,
                    best.family.direction()
                ),
            }
        }
        None => ScoreFactor {
            name: "single adjustment".to_string(),
            weight: weights.single_adjustment,
            value: 0.0,
            explanation: "no single family reaches the target within its limit".to_string(),
        },
    };

    let achievable = singles.iter().filter(|r| r.achievable).count();
    let breadth_value = if singles.is_empty() {
        0.0
    } else {
        100.0 * achievable as f64 / singles.len() as f64
    };
    let breadth = ScoreFactor {
        name: "breadth".to_string(),
        weight: weights.breadth,
        value: breadth_value,
        explanation: format!(
            "{achievable} of {} families reach the target on their own",
            singles.len()
        ),
    };

    let mixed = ScoreFactor {
        name: "mixed availability".to_string(),
        weight: weights.mixed_availability,
        value: if mixed_available { 100.0 } else { 0.0 },
        explanation: if mixed_available {
            "a combined adjustment reaches the target".to_string()
        } else {
            "no combined adjustment reaches the target".to_string()
        },
    };

    let factors = vec![closeness, single_adjustment, breadth, mixed];
    let score = factors
        .iter()
        .map(ScoreFactor::weighted)
        .sum::<f64>()
        .clamp(0.0, 100.0);

    let realism = match smallest {
        Some(best) if best.adjustment_percent <= config.realistic_threshold_percent => {
            Realism::Realistic
        }
        _ => Realism::Optimistic,
    };

    AchievabilityScore {
        score,
        realism,
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FundMetrics;
    use crate::sensitivity::family::ParameterFamily;

    fn single(family: ParameterFamily, achievable: bool, pct: f64) -> SingleParameterResult {
        SingleParameterResult {
            family,
            achievable,
            adjustment_percent: pct,
            required_percent: pct,
            bound_violations: Vec::new(),
            metrics: FundMetrics::empty(),
        }
    }

    #[test]
    fn test_met_target_scores_hundred() {
        let score = score_scenario(2.0, 2.0, &[], false, &SensitivityConfig::default());
        assert_eq!(score.score, 100.0);
        assert_eq!(score.realism, Realism::Realistic);
        assert_eq!(score.factors.len(), 4);
    }

    #[test]
    fn test_composite_weights() {
        let singles = vec![
            single(ParameterFamily::ExitValuation, true, 10.0),
            single(ParameterFamily::StageProgression, true, 25.0),
            single(ParameterFamily::Dilution, false, 100.0),
            single(ParameterFamily::LossProbability, false, 100.0),
        ];
        let score = score_scenario(1.5, 3.0, &singles, true, &SensitivityConfig::default());
        // closeness 50, single 80, breadth 50, mixed 100
        let expected = 0.40 * 50.0 + 0.35 * 80.0 + 0.15 * 50.0 + 0.10 * 100.0;
        assert!((score.score - expected).abs() < 1e-9);
        assert_eq!(score.realism, Realism::Realistic);
    }

    #[test]
    fn test_nothing_achievable_is_optimistic() {
        let singles = vec![single(ParameterFamily::Dilution, false, 100.0)];
        let score = score_scenario(0.5, 5.0, &singles, false, &SensitivityConfig::default());
        assert!((score.score - 4.0).abs() < 1e-9);
        assert_eq!(score.realism, Realism::Optimistic);
    }

    #[test]
    fn test_large_adjustment_is_optimistic() {
        let singles = vec![single(ParameterFamily::ExitValuation, true, 35.0)];
        let score = score_scenario(1.0, 1.3, &singles, false, &SensitivityConfig::default());
        assert_eq!(score.realism, Realism::Optimistic);
    }
}
