use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the surviving candidates of one window collapse to a single timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionStrategy {
    /// Earliest candidate.
    Min,
    /// Arithmetic mean of all candidates.
    #[default]
    Mean,
    /// Latest candidate.
    Max,
}

impl std::str::FromStr for ReductionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(Self::Min),
            "mean" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            _ => Err(ConfigError::UnsupportedReduction(s.to_string())),
        }
    }
}

/// Reduce a filtered window to one representative timestamp.
///
/// Returns `None` for an empty window; that is the normal "no echo" outcome.
pub fn reduce(timestamps_us: &[f64], strategy: ReductionStrategy) -> Option<f64> {
    if timestamps_us.is_empty() {
        return None;
    }
    let value = match strategy {
        ReductionStrategy::Min => timestamps_us.iter().copied().fold(f64::INFINITY, f64::min),
        ReductionStrategy::Max => timestamps_us
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max),
        ReductionStrategy::Mean => {
            timestamps_us.iter().sum::<f64>() / timestamps_us.len() as f64
        }
    };
    Some(value)
}
