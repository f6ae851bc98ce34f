//! Fund simulation runner
//!
//! Runs many independent portfolio trials and aggregates them into
//! `FundMetrics`. Trials are split into batches; each batch owns a
//! `SmallRng` seeded from a master generator, so results depend only on the
//! configuration seed and never on thread scheduling.

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::irr::solve_irr;
use crate::model::{
    FundMetrics, FundSimulationResult, Investment, ParameterWarning, PortfolioTrial, moic,
};
use crate::path::{FollowOnReserve, simulate_path};
use crate::progress::RunProgress;
use crate::sampling::PathDraws;

/// Percentiles reported over the per-trial MOIC distribution
pub const MOIC_PERCENTILES: [f64; 5] = [0.05, 0.25, 0.50, 0.75, 0.95];

/// Run one portfolio trial, drawing every investment's path from `rng`.
///
/// Investments are drawn in input order, so the same generator state always
/// produces the same trial for the same investment list.
pub fn run_trial<R: Rng + ?Sized>(
    investments: &[Investment],
    config: &SimulationConfig,
    rng: &mut R,
) -> PortfolioTrial {
    let draws: Vec<PathDraws> = investments
        .iter()
        .map(|_| PathDraws::sample(rng))
        .collect();
    trial_from_draws(investments, config, &draws)
}

/// Assemble a portfolio trial from pre-sampled draws (one per investment)
pub fn trial_from_draws(
    investments: &[Investment],
    config: &SimulationConfig,
    draws: &[PathDraws],
) -> PortfolioTrial {
    let strategy = &config.follow_on;
    let base: f64 = investments.iter().map(|inv| inv.check_size).sum();

    let mut reserve = if strategy.enabled && strategy.reserve_ratio > 0.0 {
        FollowOnReserve::with_budget(base * strategy.reserve_ratio)
    } else {
        FollowOnReserve::unlimited()
    };

    let paths: Vec<_> = investments
        .iter()
        .zip(draws)
        .map(|(inv, d)| simulate_path(inv, strategy, d, &mut reserve))
        .collect();

    // Annual cash-flow timeline, negative = called from LPs
    let mut flows = CashFlows::default();
    let fees = &config.fees;
    flows.add(0, -fees.setup_fee(base));
    let annual_fee = fees.annual_fee(base);
    for year in 0..fees.fee_years as usize {
        flows.add(year, -annual_fee);
    }

    let mut exits = Vec::with_capacity(paths.len());
    for (inv, path) in investments.iter().zip(&paths) {
        let entry_year = inv.entry_year as usize;
        flows.add(entry_year, -inv.check_size);
        if let Some(fo_year) = path.follow_on_year {
            flows.add(entry_year + fo_year.floor() as usize, -path.follow_on_amount);
        }
        let exit_year = entry_year + path.holding_period_years.round() as usize;
        flows.add(exit_year, path.exit_amount);
        exits.push((exit_year, path.exit_amount));
    }

    let entry_amount: f64 = paths.iter().map(|p| p.entry_amount).sum();
    let gross_proceeds: f64 = paths.iter().map(|p| p.exit_amount).sum();
    let fee_total = fees.total_fees(base);
    let paid_in = entry_amount + fee_total;

    let mut distributed = gross_proceeds;
    let mut recycled_capital = 0.0;
    if strategy.recycling_enabled && strategy.recycling_rate > 0.0 {
        let fee_period = fees.fee_years as usize;
        let early: f64 = exits
            .iter()
            .filter(|(year, _)| *year < fee_period)
            .map(|(_, amount)| amount)
            .sum();
        recycled_capital =
            (early * strategy.recycling_rate.clamp(0.0, 100.0) / 100.0).min(fee_total);

        if recycled_capital > 0.0 && early > 0.0 {
            // Withheld proportionally from early exits, returned at the
            // portfolio's gross multiple when the last position exits
            let share = recycled_capital / early;
            for (year, amount) in exits.iter().filter(|(y, _)| *y < fee_period) {
                flows.add(*year, -amount * share);
            }
            let gross_multiple = moic(gross_proceeds, entry_amount);
            let returned = recycled_capital * gross_multiple;
            let last_exit = exits.iter().map(|(y, _)| *y).max().unwrap_or(0);
            flows.add(last_exit, returned);
            distributed = gross_proceeds - recycled_capital + returned;
        }
    }

    let irr = solve_irr(flows.as_slice());

    PortfolioTrial {
        investments: paths,
        entry_amount,
        fees: fee_total,
        paid_in,
        distributed,
        recycled_capital,
        total_invested: entry_amount + recycled_capital,
        moic: moic(distributed, paid_in),
        irr,
    }
}

/// Growable per-year cash-flow series
#[derive(Debug, Default)]
struct CashFlows(Vec<f64>);

impl CashFlows {
    fn add(&mut self, year: usize, amount: f64) {
        if amount == 0.0 {
            return;
        }
        if self.0.len() <= year {
            self.0.resize(year + 1, 0.0);
        }
        self.0[year] += amount;
    }

    fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Running sums over a set of trials; batches merge associatively
#[derive(Debug, Default)]
struct TrialAccumulator {
    count: usize,
    paid_in: f64,
    distributed: f64,
    irr: f64,
    total_invested: f64,
    recycled: f64,
    successes: usize,
    moics: Vec<f64>,
    retained: Vec<PortfolioTrial>,
}

impl TrialAccumulator {
    fn push(&mut self, trial: PortfolioTrial, retain: bool) {
        self.count += 1;
        self.paid_in += trial.paid_in;
        self.distributed += trial.distributed;
        self.irr += trial.irr;
        self.total_invested += trial.total_invested;
        self.recycled += trial.recycled_capital;
        if trial.moic >= 1.0 {
            self.successes += 1;
        }
        self.moics.push(trial.moic);
        if retain {
            self.retained.push(trial);
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.count += other.count;
        self.paid_in += other.paid_in;
        self.distributed += other.distributed;
        self.irr += other.irr;
        self.total_invested += other.total_invested;
        self.recycled += other.recycled;
        self.successes += other.successes;
        self.moics.extend(other.moics);
        self.retained.extend(other.retained);
        self
    }

    fn finish(mut self, config: &SimulationConfig) -> (FundMetrics, Option<Vec<PortfolioTrial>>) {
        if self.count == 0 {
            return (FundMetrics::empty(), None);
        }
        let n = self.count as f64;
        let average_distributed = self.distributed / n;
        let total_paid_in = self.paid_in / n;

        self.moics.sort_by(f64::total_cmp);
        let moic_percentiles = MOIC_PERCENTILES
            .iter()
            .map(|&p| (p, percentile_of_sorted(&self.moics, p)))
            .collect();

        let strategy = &config.follow_on;
        let tracks_capital = strategy.enabled || strategy.recycling_enabled;

        let metrics = FundMetrics {
            num_trials: self.count,
            average_moic: moic(average_distributed, total_paid_in),
            average_irr: self.irr / n,
            average_distributed,
            total_paid_in,
            success_rate: self.successes as f64 / n,
            mean_trial_moic: self.moics.iter().sum::<f64>() / n,
            min_moic: self.moics.first().copied().unwrap_or(0.0),
            max_moic: self.moics.last().copied().unwrap_or(0.0),
            moic_percentiles,
            average_total_invested: tracks_capital.then(|| self.total_invested / n),
            average_recycled_capital: strategy
                .recycling_enabled
                .then(|| self.recycled / n),
        };

        let retained = config.retain_trials.then_some(self.retained);
        (metrics, retained)
    }
}

/// Nearest-rank percentile of an ascending slice
fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p.clamp(0.0, 1.0)).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Collect and log every clamped parameter across the investment set
fn collect_warnings(investments: &[Investment]) -> Vec<ParameterWarning> {
    let warnings: Vec<ParameterWarning> = investments
        .iter()
        .flat_map(Investment::parameter_warnings)
        .collect();
    for w in &warnings {
        tracing::warn!(
            investment = %w.investment,
            field = %w.field,
            value = w.value,
            clamped_to = w.clamped_to,
            "parameter out of range, clamped"
        );
    }
    warnings
}

/// Run the full Monte Carlo fund simulation.
///
/// Validates inputs first; an invalid configuration never starts a trial.
/// When `progress` is supplied, completed trials are counted on it and its
/// cancellation flag is checked before every batch.
pub fn simulate_fund(
    investments: &[Investment],
    config: &SimulationConfig,
    progress: Option<&RunProgress>,
) -> Result<FundSimulationResult, SimulationError> {
    config.validate_with(investments)?;
    let warnings = collect_warnings(investments);

    let (metrics, trials) = run_batches(investments, config, progress)?;

    tracing::debug!(
        trials = metrics.num_trials,
        average_moic = metrics.average_moic,
        average_irr = metrics.average_irr,
        "fund simulation complete"
    );

    Ok(FundSimulationResult {
        metrics,
        warnings,
        trials,
    })
}

/// Seeded batch execution over already-validated inputs
pub(crate) fn run_batches(
    investments: &[Investment],
    config: &SimulationConfig,
    progress: Option<&RunProgress>,
) -> Result<(FundMetrics, Option<Vec<PortfolioTrial>>), SimulationError> {
    let batch_size = config.batch_size;
    let num_batches = config.trials.div_ceil(batch_size);

    // Batch seeds come from one master generator so the run is reproducible
    let mut master = SmallRng::seed_from_u64(config.seed);
    let batch_seeds: Vec<u64> = (0..num_batches).map(|_| master.next_u64()).collect();

    let run_batch = |i: usize| -> Result<TrialAccumulator, SimulationError> {
        if progress.is_some_and(RunProgress::is_cancelled) {
            return Err(SimulationError::Cancelled);
        }
        let mut rng = SmallRng::seed_from_u64(batch_seeds[i]);
        let size = if i == num_batches - 1 {
            config.trials - i * batch_size
        } else {
            batch_size
        };

        let mut acc = TrialAccumulator::default();
        for _ in 0..size {
            acc.push(run_trial(investments, config, &mut rng), config.retain_trials);
        }
        if let Some(p) = progress {
            p.add_trials(size);
        }
        Ok(acc)
    };

    #[cfg(feature = "parallel")]
    let batches: Result<Vec<TrialAccumulator>, SimulationError> =
        (0..num_batches).into_par_iter().map(run_batch).collect();

    #[cfg(not(feature = "parallel"))]
    let batches: Result<Vec<TrialAccumulator>, SimulationError> =
        (0..num_batches).map(run_batch).collect();

    let acc = batches?
        .into_iter()
        .fold(TrialAccumulator::default(), TrialAccumulator::merge);
    Ok(acc.finish(config))
}

/// Run the fund simulation sequentially on a caller-supplied generator.
///
/// The configuration seed and batch size are ignored; every trial is drawn
/// from `rng` in order.
pub fn simulate_fund_with_rng<R: Rng + ?Sized>(
    investments: &[Investment],
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<FundSimulationResult, SimulationError> {
    config.validate_with(investments)?;
    let warnings = collect_warnings(investments);

    let mut acc = TrialAccumulator::default();
    for _ in 0..config.trials {
        acc.push(run_trial(investments, config, rng), config.retain_trials);
    }
    let (metrics, trials) = acc.finish(config);

    Ok(FundSimulationResult {
        metrics,
        warnings,
        trials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeeSchedule, FollowOnStrategy, InvestmentBuilder};
    use crate::error::ValidationError;
    use crate::model::ValueRange;

    fn no_fees(trials: usize) -> SimulationConfig {
        SimulationConfig {
            trials,
            fees: FeeSchedule::none(),
            ..Default::default()
        }
    }

    #[test]
    fn test_percentile_of_sorted() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_of_sorted(&data, 0.0), 1.0);
        assert_eq!(percentile_of_sorted(&data, 0.5), 3.0);
        assert_eq!(percentile_of_sorted(&data, 1.0), 5.0);
        assert_eq!(percentile_of_sorted(&[], 0.5), 0.0);
    }

    #[test]
    fn test_cash_flows_grow_on_demand() {
        let mut flows = CashFlows::default();
        flows.add(3, 5.0);
        flows.add(0, -2.0);
        flows.add(7, 0.0);
        assert_eq!(flows.as_slice(), &[-2.0, 0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_certain_portfolio_timeline_and_irr() {
        // 1 in at year 0, 2.5 back after five one-year rounds
        let inv = InvestmentBuilder::certain("Sure", 10.0)
            .check_size(1.0)
            .entry_valuation(4.0)
            .build();
        let config = no_fees(1);
        let trial = trial_from_draws(&[inv], &config, &[PathDraws::constant(0.5)]);

        assert!((trial.moic - 2.5).abs() < 1e-12);
        let expected_irr = 2.5_f64.powf(1.0 / 5.0) - 1.0;
        assert!((trial.irr - expected_irr).abs() < 1e-3);
    }

    #[test]
    fn test_entry_year_shifts_timeline_not_return() {
        let at = |year: u32| {
            let inv = InvestmentBuilder::certain("Sure", 10.0)
                .check_size(1.0)
                .entry_valuation(4.0)
                .entry_year(year)
                .build();
            trial_from_draws(&[inv], &no_fees(1), &[PathDraws::constant(0.5)])
        };
        let (first, later) = (at(0), at(2));

        let expected_irr = 2.5_f64.powf(1.0 / 5.0) - 1.0;
        assert!((first.irr - expected_irr).abs() < 1e-3);
        assert!((later.irr - expected_irr).abs() < 1e-3);
        assert_eq!(first.moic, later.moic);
    }

    #[test]
    fn test_follow_on_called_in_its_own_year() {
        // 1 in at year 0, 1 more at Series A (year 2), 3.5 back at year 5
        let inv = InvestmentBuilder::certain("Backed", 10.0)
            .check_size(1.0)
            .entry_valuation(4.0)
            .build();
        let config = SimulationConfig {
            follow_on: FollowOnStrategy {
                enabled: true,
                rate: 100.0,
                multiple: 1.0,
                ..Default::default()
            },
            ..no_fees(1)
        };
        let trial = trial_from_draws(&[inv], &config, &[PathDraws::constant(0.5)]);

        assert!((trial.paid_in - 2.0).abs() < 1e-12);
        assert!((trial.distributed - 3.5).abs() < 1e-12);
        assert_eq!(trial.investments[0].follow_on_year, Some(2.0));

        let npv = |r: f64| -1.0 - 1.0 / (1.0 + r).powi(2) + 3.5 / (1.0 + r).powi(5);
        assert!((trial.irr - 0.147).abs() < 1e-3);
        assert!(npv(trial.irr).abs() < 1e-2);
        // Calling both checks at year 0 would report a lower rate
        let upfront = (3.5_f64 / 2.0).powf(1.0 / 5.0) - 1.0;
        assert!(trial.irr > upfront + 0.02);
    }

    #[test]
    fn test_round_gap_past_horizon_rejected() {
        let mut inv = InvestmentBuilder::certain("Forever", 10.0).build();
        inv.rounds.seed.years = ValueRange::fixed(1.0e19);
        let err = simulate_fund(&[inv], &no_fees(1), None).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Invalid(ValidationError::BeyondHorizon { .. })
        ));
    }

    #[test]
    fn test_fees_count_toward_paid_in() {
        let inv = InvestmentBuilder::certain("Sure", 10.0)
            .check_size(100.0)
            .entry_valuation(100.0)
            .build();
        let config = SimulationConfig {
            fees: FeeSchedule {
                setup_fee_percent: 1.0,
                management_fee_percent: 2.0,
                fee_years: 5,
            },
            ..no_fees(1)
        };
        let trial = trial_from_draws(&[inv], &config, &[PathDraws::constant(0.5)]);
        assert!((trial.fees - 11.0).abs() < 1e-9);
        assert!((trial.paid_in - 111.0).abs() < 1e-9);
        assert!((trial.moic - trial.distributed / trial.paid_in).abs() < 1e-12);
    }

    #[test]
    fn test_recycling_capped_by_fees() {
        // Exits after one year, well inside the fee period
        let inv = InvestmentBuilder::certain("Quick", 200.0)
            .entry_stage(crate::model::Stage::Ipo)
            .check_size(100.0)
            .entry_valuation(100.0)
            .build();
        let config = SimulationConfig {
            fees: FeeSchedule {
                setup_fee_percent: 0.0,
                management_fee_percent: 2.0,
                fee_years: 10,
            },
            follow_on: FollowOnStrategy {
                recycling_enabled: true,
                recycling_rate: 50.0,
                ..Default::default()
            },
            ..no_fees(1)
        };
        let trial = trial_from_draws(&[inv], &config, &[PathDraws::constant(0.5)]);

        // 50% of 200 proceeds wanted, capped at 20 of fees
        assert!((trial.recycled_capital - 20.0).abs() < 1e-9);
        assert!((trial.total_invested - 120.0).abs() < 1e-9);
        // Recycled capital earns the 2x gross multiple: 200 - 20 + 40
        assert!((trial.distributed - 220.0).abs() < 1e-9);
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let investments = vec![
            InvestmentBuilder::new("A").build(),
            InvestmentBuilder::new("B").check_size(500_000.0).build(),
        ];
        let config = SimulationConfig {
            trials: 750,
            ..Default::default()
        };
        let a = simulate_fund(&investments, &config, None).unwrap();
        let b = simulate_fund(&investments, &config, None).unwrap();
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn test_seed_changes_results() {
        let investments = vec![InvestmentBuilder::new("A").build()];
        let a = simulate_fund(&investments, &SimulationConfig::default(), None).unwrap();
        let b = simulate_fund(
            &investments,
            &SimulationConfig {
                seed: 7,
                ..Default::default()
            },
            None,
        )
        .unwrap();
        assert_ne!(a.metrics.average_distributed, b.metrics.average_distributed);
    }

    #[test]
    fn test_retained_trials_match_count() {
        let investments = vec![InvestmentBuilder::new("A").build()];
        let config = SimulationConfig {
            trials: 250,
            retain_trials: true,
            ..Default::default()
        };
        let result = simulate_fund(&investments, &config, None).unwrap();
        assert_eq!(result.trials.map(|t| t.len()), Some(250));
        assert_eq!(result.metrics.num_trials, 250);
    }

    #[test]
    fn test_progress_counts_trials() {
        let investments = vec![InvestmentBuilder::new("A").build()];
        let progress = RunProgress::new();
        simulate_fund(&investments, &no_fees(321), Some(&progress)).unwrap();
        assert_eq!(progress.trials_completed(), 321);
    }

    #[test]
    fn test_cancelled_before_start() {
        let investments = vec![InvestmentBuilder::new("A").build()];
        let progress = RunProgress::new();
        progress.cancel();
        let err = simulate_fund(&investments, &no_fees(500), Some(&progress)).unwrap_err();
        assert_eq!(err, SimulationError::Cancelled);
    }

    #[test]
    fn test_invalid_input_rejected_before_running() {
        let bad = InvestmentBuilder::new("Bad").check_size(-1.0).build();
        let progress = RunProgress::new();
        let err = simulate_fund(&[bad], &no_fees(100), Some(&progress)).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Invalid(ValidationError::NonPositive { .. })
        ));
        assert_eq!(progress.trials_completed(), 0);
    }

    #[test]
    fn test_warnings_reported() {
        let inv = InvestmentBuilder::new("Loose")
            .advance_probability(crate::model::Stage::SeriesA, 140.0)
            .build();
        let result = simulate_fund(&[inv], &no_fees(10), None).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].clamped_to, 100.0);
    }

    #[test]
    fn test_with_rng_matches_manual_trials() {
        let investments = vec![InvestmentBuilder::new("A").build()];
        let config = no_fees(50);
        let result =
            simulate_fund_with_rng(&investments, &config, &mut SmallRng::seed_from_u64(3)).unwrap();

        let mut rng = SmallRng::seed_from_u64(3);
        let distributed: f64 = (0..50)
            .map(|_| run_trial(&investments, &config, &mut rng).distributed)
            .sum();
        assert!((result.metrics.average_distributed - distributed / 50.0).abs() < 1e-6);
    }
}
