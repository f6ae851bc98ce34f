//! Sampling primitives
//!
//! All randomness in the engine flows through an explicitly passed
//! generator. A path consumes a fixed bundle of uniforms (`PathDraws`)
//! whatever branch it takes, so two simulations that differ only in their
//! assumptions see the same random numbers for the same trial.

use rand::Rng;

use crate::model::{Stage, ValueRange};

/// Number of funding rounds between Pre-Seed and IPO
pub const ROUND_COUNT: usize = Stage::ALL.len() - 1;

/// Map a unit draw `u` in `[0, 1)` onto `range`.
///
/// A zero-width range returns its single bound exactly.
#[must_use]
pub fn value_at(range: &ValueRange, u: f64) -> f64 {
    let width = range.width();
    if width <= 0.0 {
        range.min
    } else {
        range.min + width * u
    }
}

/// Draw uniformly from `range`
pub fn sample_range<R: Rng + ?Sized>(range: &ValueRange, rng: &mut R) -> f64 {
    value_at(range, rng.random::<f64>())
}

/// Draw uniformly from `[0, 100)`
pub fn sample_percent<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.random::<f64>() * 100.0
}

/// Uniform draws consumed by one investment path in one trial
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathDraws {
    /// Percent draws in `[0, 100)` compared against advance probabilities
    pub advance: [f64; ROUND_COUNT],
    /// Unit draws mapped onto each round's years range
    pub years: [f64; ROUND_COUNT],
    /// Percent draws gating follow-on participation per round
    pub follow_on: [f64; ROUND_COUNT],
    /// Percent draw compared against the exit stage's loss probability
    pub loss: f64,
    /// Unit draw mapped onto the exit stage's valuation range
    pub valuation: f64,
}

impl PathDraws {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut draws = Self::constant(0.0);
        for i in 0..ROUND_COUNT {
            draws.advance[i] = sample_percent(rng);
            draws.years[i] = rng.random::<f64>();
            draws.follow_on[i] = sample_percent(rng);
        }
        draws.loss = sample_percent(rng);
        draws.valuation = rng.random::<f64>();
        draws
    }

    /// Draws with every unit value equal to `u` (percent draws are `u * 100`)
    #[must_use]
    pub fn constant(u: f64) -> Self {
        Self {
            advance: [u * 100.0; ROUND_COUNT],
            years: [u; ROUND_COUNT],
            follow_on: [u * 100.0; ROUND_COUNT],
            loss: u * 100.0,
            valuation: u,
        }
    }

    /// Slot for the round leading into `to`
    #[must_use]
    pub fn round_index(to: Stage) -> Option<usize> {
        to.index().checked_sub(1)
    }
}
