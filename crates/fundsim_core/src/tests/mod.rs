//! Scenario tests for the fundsim engine
//!
//! Tests are organized by topic:
//! - `paths` - Path simulator properties over many draws
//! - `fund_runner` - Fund-level aggregation, fees and follow-ons
//! - `sensitivity` - Target search, suppression, scoring and cancellation
