//! Internal rate of return solver.
//!
//! Newton-Raphson on `NPV(r) = Σ CF[t] / (1 + r)^t` over per-period cash
//! flows (negative = paid in, positive = distributed).
//!
//! IRR is a reporting metric, so the solver is best-effort: whenever no rate
//! is definable or the iteration degenerates, it returns 0 instead of an
//! error. The result is always finite.

/// Newton-Raphson settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrrSolverConfig {
    pub initial_guess: f64,
    /// Stop once `|NPV| < tolerance`
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for IrrSolverConfig {
    fn default() -> Self {
        Self {
            initial_guess: 0.10,
            tolerance: 0.001,
            max_iterations: 100,
        }
    }
}

/// Net present value of `cash_flows` at `rate` and its derivative
fn npv_and_derivative(cash_flows: &[f64], rate: f64) -> (f64, f64) {
    let base = 1.0 + rate;
    let mut npv = 0.0;
    let mut derivative = 0.0;
    for (t, cf) in cash_flows.iter().enumerate() {
        let discount = base.powi(t as i32);
        npv += cf / discount;
        derivative -= t as f64 * cf / (discount * base);
    }
    (npv, derivative)
}

/// Solve for the per-period IRR with default settings
#[must_use]
pub fn solve_irr(cash_flows: &[f64]) -> f64 {
    solve_irr_with(cash_flows, &IrrSolverConfig::default())
}

/// Solve for the per-period IRR.
///
/// Returns 0 for series shorter than two entries, series without both an
/// outflow and an inflow, a zero derivative, or a non-finite iterate.
#[must_use]
pub fn solve_irr_with(cash_flows: &[f64], config: &IrrSolverConfig) -> f64 {
    if cash_flows.len() < 2 || cash_flows.iter().any(|cf| !cf.is_finite()) {
        return 0.0;
    }
    let has_outflow = cash_flows.iter().any(|cf| *cf < 0.0);
    let has_inflow = cash_flows.iter().any(|cf| *cf > 0.0);
    if !has_outflow || !has_inflow {
        return 0.0;
    }

    let mut rate = config.initial_guess;
    for _ in 0..config.max_iterations {
        let (npv, derivative) = npv_and_derivative(cash_flows, rate);
        if !npv.is_finite() || !derivative.is_finite() {
            return 0.0;
        }
        if npv.abs() < config.tolerance {
            return rate;
        }
        if derivative == 0.0 {
            return 0.0;
        }

        let mut next = rate - npv / derivative;
        // A rate at or below -100% has no meaning; step halfway toward it instead
        if next <= -1.0 {
            next = f64::midpoint(rate, -1.0);
        }
        if !next.is_finite() {
            return 0.0;
        }
        rate = next;
    }

    // Best effort after the iteration cap
    if rate.is_finite() { rate } else { 0.0 }
}
