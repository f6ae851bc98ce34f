//! Command-line front end for the fund simulator
//!
//! Loads YAML scenarios, runs fund simulations and sensitivity searches on a
//! background worker, and renders the results as text or JSON.

pub mod format;
pub mod logging;
pub mod report;
pub mod scenario;
pub mod worker;

pub use logging::init_logging;
pub use scenario::{Overrides, Scenario, ScenarioError};
pub use worker::{SearchWorker, WorkerRequest, WorkerResponse};
