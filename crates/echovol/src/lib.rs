//! echovol — cavity volume estimation from sparse ultrasound echo timestamps.
//!
//! A small probe carries a handful of fixed piezoelectric transducers. Each
//! one reports round-trip echo times from the near (anterior) and far
//! (posterior) wall of a fluid-filled cavity. The pipeline stages are:
//!
//! 1. **Classify** – assign each echo to the anterior or posterior time window.
//! 2. **Denoise** – drop echoes without a neighbour closer than the clock tolerance.
//! 3. **Reduce** – one representative timestamp per transducer and window.
//! 4. **Gate** – skip the fit when too few measurements survive.
//! 5. **Map** – time of flight to (x, y, z) surface points in mm.
//! 6. **Fit** – bounded sphere or ellipsoid least-squares fit, volume in mL.
//!
//! # Public API
//! - [`VolumeEstimator`] as the primary entry point
//! - [`PipelineConfig`] and its parts for tuning
//! - stage functions for composing custom pipelines
//! - capture decoding for raw sensor rows

mod api;
mod capture;
mod config;
mod echo;
mod error;
mod fit;
mod geometry;
mod pipeline;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::VolumeEstimator;
pub use capture::{decode_records, split_sessions, CaptureFormat, RawRecord};
pub use config::{
    EchoWindow, FitBounds, FitConfig, FitModel, NoiseParams, PipelineConfig, SolverBackend,
    SolverParams, TransducerLayout, TransducerMount, WindowBounds, DEFAULT_NOISE_TOLERANCE_US,
    DEFAULT_SOUND_SPEED_M_S,
};
pub use echo::{
    classify_echoes, reduce, reject_isolated, ClassifiedEchoes, EchoEvent, ReductionStrategy,
    TransducerId, Wall,
};
pub use error::{ConfigError, EstimateError, FitError};
pub use fit::{fit_surface, FitResult, FittedShape};
pub use geometry::{map_coordinates, tof_to_depth_mm, SurfaceCoordinate};
pub use pipeline::{
    count_measurements, has_sufficient_data, min_measurements, refine_timestamps,
    RefinedTimestamps, SessionResult, WallTimestamps, MIN_MEASUREMENTS,
};
