use std::fmt;

/// Structural problems with simulation or search inputs.
///
/// These are rejected before any simulation work begins.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The simulation was asked to run zero trials
    ZeroTrials,
    /// A `[min, max]` range has `min > max`
    InvertedRange {
        investment: String,
        field: String,
        min: f64,
        max: f64,
    },
    /// A value that must be strictly positive was not
    NonPositive {
        investment: String,
        field: &'static str,
        value: f64,
    },
    /// A value was NaN or infinite
    NonFinite {
        investment: String,
        field: String,
    },
    /// A year offset lies past the longest modeled fund life
    BeyondHorizon {
        investment: String,
        field: String,
        value: f64,
        limit: u32,
    },
    /// A simulation or search setting is unusable
    InvalidSetting {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    /// A target multiple is not a positive finite number
    InvalidTarget(f64),
    /// The sensitivity search was given no targets
    NoTargets,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::ZeroTrials => write!(f, "trial count must be at least 1"),
            ValidationError::InvertedRange {
                investment,
                field,
                min,
                max,
            } => write!(
                f,
                "investment '{investment}': {field} range has min {min} greater than max {max}"
            ),
            ValidationError::NonPositive {
                investment,
                field,
                value,
            } => write!(
                f,
                "investment '{investment}': {field} must be positive (got {value})"
            ),
            ValidationError::NonFinite { investment, field } => {
                write!(f, "investment '{investment}': {field} is not a finite number")
            }
            ValidationError::BeyondHorizon {
                investment,
                field,
                value,
                limit,
            } => write!(
                f,
                "investment '{investment}': {field} of {value} years exceeds the {limit}-year fund horizon"
            ),
            ValidationError::InvalidSetting {
                name,
                value,
                reason,
            } => write!(f, "invalid setting {name}={value}: {reason}"),
            ValidationError::InvalidTarget(target) => {
                write!(f, "target multiple {target} must be a positive finite number")
            }
            ValidationError::NoTargets => write!(f, "at least one target multiple is required"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors surfaced by the simulation runner and the sensitivity search
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Inputs failed structural validation
    Invalid(ValidationError),
    /// The run was cancelled through its progress handle
    Cancelled,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Invalid(e) => write!(f, "invalid configuration: {e}"),
            SimulationError::Cancelled => write!(f, "simulation cancelled"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Invalid(e) => Some(e),
            SimulationError::Cancelled => None,
        }
    }
}

impl From<ValidationError> for SimulationError {
    fn from(err: ValidationError) -> Self {
        SimulationError::Invalid(err)
    }
}
