//! Session pipeline.
//!
//! Glue layer wiring the stages together for one monitoring session:
//! refine (classify → reject isolated → reduce) → sufficiency gate →
//! coordinate mapping → geometric fit.
//!
//! Stage algorithms live in `crate::echo`, `crate::geometry` and `crate::fit`;
//! this module owns call order and data flow only.

mod gate;
mod refine;
mod result;


pub use gate::{count_measurements, has_sufficient_data, min_measurements, MIN_MEASUREMENTS};
pub use refine::{refine_timestamps, RefinedTimestamps, WallTimestamps};
pub use result::SessionResult;

use crate::config::PipelineConfig;
use crate::echo::EchoEvent;
use crate::error::FitError;
use crate::fit::fit_surface;
use crate::geometry::{map_coordinates, SurfaceCoordinate};

/// Run all stages on the events of one session.
///
/// `config` is assumed to be validated. Too few corroborated measurements
/// give an unsuccessful result; only the fit itself can fail.
pub(crate) fn run_session(
    events: &[EchoEvent],
    config: &PipelineConfig,
) -> Result<SessionResult, FitError> {
    let refined = refine_timestamps(events, &config.layout, &config.windows, &config.noise);
    let n_meas = count_measurements(&refined);
    let needed = min_measurements(config.fit.model);
    tracing::debug!(
        "session: {} events, {} corroborated measurements (need {})",
        events.len(),
        n_meas,
        needed
    );
    if n_meas < needed {
        tracing::debug!("insufficient data, skipping fit");
        return Ok(SessionResult::insufficient());
    }

    let coordinates = map_coordinates(&refined, &config.layout, config.sound_speed_m_s);
    let points: Vec<[f64; 3]> = coordinates.iter().map(SurfaceCoordinate::xyz).collect();
    let fit = fit_surface(&points, &config.fit).map_err(|e| {
        tracing::warn!("{:?} fit on {} points failed: {}", config.fit.model, points.len(), e);
        e
    })?;
    tracing::info!(
        "{:?} fit: volume {:.2} mL, rms {:.3} mm, {} iterations",
        fit.shape.model(),
        fit.volume_ml,
        fit.rms_residual_mm,
        fit.iterations
    );

    Ok(SessionResult {
        success: true,
        fit: Some(fit),
        coordinates,
        refined_timestamps: refined,
    })
}
