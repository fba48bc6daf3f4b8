//! Error types.
//!
//! Only configuration validation and the geometric fit can fail. Missing
//! echoes are not errors: they surface as an unsuccessful [`SessionResult`].
//!
//! [`SessionResult`]: crate::SessionResult

use crate::echo::{TransducerId, Wall};

// ── Configuration ──────────────────────────────────────────────────────────

/// Rejected pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Window bounds are non-finite or not strictly increasing.
    InvalidWindow {
        /// Window that failed validation.
        wall: Wall,
        /// Lower bound (µs).
        low_us: f64,
        /// Upper bound (µs).
        high_us: f64,
    },
    /// Anterior window reaches into the posterior window.
    OverlappingWindows {
        /// Upper bound of the anterior window (µs).
        anterior_high_us: f64,
        /// Lower bound of the posterior window (µs).
        posterior_low_us: f64,
    },
    /// Layout has no transducers.
    EmptyLayout,
    /// Transducer id is outside the valid range.
    UnknownTransducer(TransducerId),
    /// The same transducer id appears twice in the layout.
    DuplicateTransducer(TransducerId),
    /// Mounting position is not finite.
    InvalidPosition(TransducerId),
    /// Fit-model selector names no supported model.
    UnsupportedFitModel(String),
    /// Reduction selector names no supported strategy.
    UnsupportedReduction(String),
    /// A scalar parameter is out of its valid range.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A `[low, high]` parameter range is non-finite or inverted.
    InvalidRange {
        /// Parameter name.
        name: &'static str,
        /// Offending range.
        range: [f64; 2],
    },
    /// JSON document could not be parsed.
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidWindow {
                wall,
                low_us,
                high_us,
            } => write!(
                f,
                "{:?} window must satisfy low < high with finite bounds, got ({}, {}) us",
                wall, low_us, high_us
            ),
            Self::OverlappingWindows {
                anterior_high_us,
                posterior_low_us,
            } => write!(
                f,
                "anterior window upper bound {} us must not exceed posterior lower bound {} us",
                anterior_high_us, posterior_low_us
            ),
            Self::EmptyLayout => f.write_str("transducer layout is empty"),
            Self::UnknownTransducer(id) => write!(f, "unknown transducer id {}", id.0),
            Self::DuplicateTransducer(id) => write!(f, "duplicate transducer id {}", id.0),
            Self::InvalidPosition(id) => {
                write!(f, "transducer {} has a non-finite mounting position", id.0)
            }
            Self::UnsupportedFitModel(s) => write!(f, "unsupported fit model '{}'", s),
            Self::UnsupportedReduction(s) => write!(f, "unsupported reduction strategy '{}'", s),
            Self::InvalidParameter { name, value } => {
                write!(f, "invalid value for {}: {}", name, value)
            }
            Self::InvalidRange { name, range } => write!(
                f,
                "invalid range for {}: [{}, {}]",
                name, range[0], range[1]
            ),
            Self::Parse(msg) => write!(f, "config parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ── Fitting ────────────────────────────────────────────────────────────────

/// Geometric fit failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// Fewer coordinates than the model has parameters.
    TooFewPoints {
        /// Required minimum number of points.
        needed: usize,
        /// Provided number of points.
        got: usize,
    },
    /// Input coordinates or solver state contain NaN/inf.
    NonFinite,
    /// The normal equations could not be solved, or the points do not
    /// determine every model parameter.
    SingularSystem,
    /// The iteration budget ran out before convergence.
    NotConverged {
        /// Iterations performed.
        iterations: usize,
    },
    /// The solver returned parameters outside the configured bounds.
    OutOfBounds,
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few points: need {}, got {}", needed, got)
            }
            Self::NonFinite => f.write_str("non-finite value in fit"),
            Self::SingularSystem => {
                f.write_str("singular normal equations: parameters not determined by the points")
            }
            Self::NotConverged { iterations } => {
                write!(f, "optimizer did not converge after {} iterations", iterations)
            }
            Self::OutOfBounds => f.write_str("solution left the parameter bounds"),
        }
    }
}

impl std::error::Error for FitError {}

// ── Session ────────────────────────────────────────────────────────────────

/// Error returned by [`VolumeEstimator`](crate::VolumeEstimator).
#[derive(Debug, Clone, PartialEq)]
pub enum EstimateError {
    /// Configuration was rejected before any event was processed.
    InvalidConfiguration(ConfigError),
    /// Enough data was present but the optimizer failed.
    FitFailed(FitError),
}

impl std::fmt::Display for EstimateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfiguration(e) => write!(f, "invalid configuration: {}", e),
            Self::FitFailed(e) => write!(f, "fit failed: {}", e),
        }
    }
}

impl std::error::Error for EstimateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfiguration(e) => Some(e),
            Self::FitFailed(e) => Some(e),
        }
    }
}

impl From<ConfigError> for EstimateError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfiguration(e)
    }
}

impl From<FitError> for EstimateError {
    fn from(e: FitError) -> Self {
        Self::FitFailed(e)
    }
}
