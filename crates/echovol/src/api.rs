//! High-level estimation API.
//!
//! [`VolumeEstimator`] is the primary entry point. It owns a validated
//! [`PipelineConfig`] and turns the echo events of a session into a
//! [`SessionResult`].

use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::echo::EchoEvent;
use crate::error::{ConfigError, EstimateError};
use crate::pipeline::{self, SessionResult};

/// Primary estimation interface.
///
/// Encapsulates transducer layout, echo windows and fit configuration.
/// Create once, estimate many sessions.
///
/// # Examples
///
/// ```
/// use echovol::{EchoEvent, PipelineConfig, VolumeEstimator};
///
/// let estimator = VolumeEstimator::new(PipelineConfig::default()).unwrap();
/// let events = [EchoEvent::new(1, 20.0), EchoEvent::new(1, 20.4)];
/// let result = estimator.estimate(&events).unwrap();
/// assert!(!result.success);
/// ```
#[derive(Debug, Clone)]
pub struct VolumeEstimator {
    config: PipelineConfig,
}

impl VolumeEstimator {
    /// Validate `config` and build an estimator around it.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            config: PipelineConfig::from_json_str(json)?,
        })
    }

    /// Access the current configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Estimate the cavity volume from the echo events of one session.
    ///
    /// Too few corroborated echoes yield `Ok` with `success == false`;
    /// a solver failure yields [`EstimateError::FitFailed`].
    pub fn estimate(&self, events: &[EchoEvent]) -> Result<SessionResult, EstimateError> {
        Ok(pipeline::run_session(events, &self.config)?)
    }

    /// Estimate independent sessions in parallel.
    ///
    /// Output order matches `sessions`; each entry fails or succeeds on its own.
    pub fn estimate_batch(
        &self,
        sessions: &[&[EchoEvent]],
    ) -> Vec<Result<SessionResult, EstimateError>> {
        sessions
            .par_iter()
            .map(|events| self.estimate(events))
            .collect()
    }
}
