mod investment;
mod results;
mod stage;

pub use investment::{
    Investment, MAX_HORIZON_YEARS, ParameterWarning, StageAssumptions, TransitionAssumptions,
    ValueRange, clamp_percent,
};
pub use results::{FundMetrics, FundSimulationResult, PortfolioTrial, SimulationTrial, moic};
pub use stage::{RoundValues, Stage, StageValues};
