//! Venture fund Monte Carlo simulation library
//!
//! This crate provides the numerical engine behind fund-return modelling:
//! - Stochastic simulation of each investment's path through funding stages
//! - Internal rate of return from per-period fund cash flows
//! - Fund-level aggregation over many independent trials
//! - Sensitivity search that back-solves the assumption changes required to
//!   hit a target return multiple
//!
//! The engine is a pure function of its inputs and an explicit random source.
//! It performs no I/O.
//!
//! # Example
//!
//! ```ignore
//! use fundsim_core::config::{InvestmentBuilder, SimulationConfig};
//! use fundsim_core::model::Stage;
//! use fundsim_core::simulation::simulate_fund;
//!
//! let investments = vec![
//!     InvestmentBuilder::new("Acme")
//!         .entry_stage(Stage::Seed)
//!         .check_size(500_000.0)
//!         .entry_valuation(5_000_000.0)
//!         .build(),
//! ];
//!
//! let config = SimulationConfig { trials: 5_000, ..Default::default() };
//! let result = simulate_fund(&investments, &config, None)?;
//! println!("MOIC: {:.2}x", result.metrics.average_moic);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod error;
pub mod irr;
pub mod path;
pub mod progress;
pub mod sampling;
pub mod sensitivity;
pub mod simulation;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{InvestmentBuilder, SimulationConfig};
pub use error::{SimulationError, ValidationError};
pub use progress::RunProgress;
pub use sensitivity::{SensitivityConfig, SensitivityReport, analyze_sensitivity};
pub use simulation::simulate_fund;
