//! Investment path simulator
//!
//! Walks one investment from its entry stage through successive funding
//! rounds until a round fails to close or IPO is reached, then resolves the
//! exit: a total loss, or ownership times a sampled exit valuation.

use rand::Rng;

use crate::config::FollowOnStrategy;
use crate::model::{Investment, SimulationTrial, clamp_percent, moic};
use crate::sampling::{PathDraws, value_at};

/// Follow-on capital still available within one portfolio trial
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowOnReserve {
    remaining: Option<f64>,
}

impl FollowOnReserve {
    /// No cap on follow-on capital
    #[must_use]
    pub fn unlimited() -> Self {
        Self { remaining: None }
    }

    #[must_use]
    pub fn with_budget(budget: f64) -> Self {
        Self {
            remaining: Some(budget.max(0.0)),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> Option<f64> {
        self.remaining
    }

    /// Withdraw up to `wanted`, returning the amount granted
    pub fn take(&mut self, wanted: f64) -> f64 {
        match self.remaining.as_mut() {
            None => wanted,
            Some(left) => {
                let granted = wanted.min(*left);
                *left -= granted;
                granted
            }
        }
    }
}

/// Simulate one investment's path using pre-sampled draws.
///
/// Probabilities and rates outside `[0, 100]` are clamped; callers learn
/// about them through `Investment::parameter_warnings`.
pub fn simulate_path(
    investment: &Investment,
    strategy: &FollowOnStrategy,
    draws: &PathDraws,
    reserve: &mut FollowOnReserve,
) -> SimulationTrial {
    let ownership_at_entry = investment.initial_ownership();
    let mut ownership = ownership_at_entry;
    let mut follow_on_amount = 0.0;
    let mut follow_on_year = None;
    let mut holding_period = 0.0;
    let mut stage = investment.entry_stage;

    while let Some(next) = stage.next() {
        let (Some(round), Some(slot)) = (investment.rounds.get(next), PathDraws::round_index(next))
        else {
            break;
        };

        if draws.advance[slot] >= clamp_percent(round.advance_probability) {
            break;
        }

        ownership *= 1.0 - clamp_percent(round.dilution) / 100.0;
        holding_period += value_at(&round.years, draws.years[slot]).max(0.0);
        stage = next;

        if follow_on_year.is_none()
            && strategy.qualifies(stage)
            && draws.follow_on[slot] < clamp_percent(strategy.rate)
        {
            // Priced at the midpoint of the stage's valuation range
            let price = investment.stages.get(stage).exit_valuation.midpoint();
            let wanted = investment.check_size * strategy.multiple;
            if price > 0.0 && wanted > 0.0 {
                let granted = reserve.take(wanted);
                if granted > 0.0 {
                    ownership = (ownership + granted / price).min(1.0);
                    follow_on_amount = granted;
                    follow_on_year = Some(holding_period);
                }
            }
        }
    }

    let exit = investment.stages.get(stage);
    let total_loss = draws.loss < clamp_percent(exit.loss_probability);
    let exit_amount = if total_loss {
        0.0
    } else {
        ownership * value_at(&exit.exit_valuation, draws.valuation).max(0.0)
    };

    let entry_amount = investment.check_size + follow_on_amount;

    SimulationTrial {
        entry_amount,
        follow_on_amount,
        exit_amount,
        exit_stage: stage,
        ownership_at_entry,
        ownership_at_exit: ownership,
        holding_period_years: holding_period,
        follow_on_year,
        total_loss,
        moic: moic(exit_amount, entry_amount),
    }
}

/// Simulate one investment with fresh draws from `rng` and no reserve cap
pub fn simulate_investment<R: Rng + ?Sized>(
    investment: &Investment,
    strategy: &FollowOnStrategy,
    rng: &mut R,
) -> SimulationTrial {
    let draws = PathDraws::sample(rng);
    simulate_path(
        investment,
        strategy,
        &draws,
        &mut FollowOnReserve::unlimited(),
    )
}
