use serde::{Deserialize, Serialize};

use crate::fit::FitResult;
use crate::geometry::SurfaceCoordinate;

use super::RefinedTimestamps;

/// Outcome of one monitoring session.
///
/// `success == false` means too few corroborated (transducer, wall)
/// measurements were found; the fit was not attempted and `fit` is `None`.
/// The threshold depends on the fit model (see
/// [`min_measurements`](crate::min_measurements)): 4 for the sphere, but 6
/// for the ellipsoid, which has six parameters. An ellipsoid session with 4
/// or 5 measurements is therefore unsuccessful even though a sphere fit
/// would have run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub success: bool,
    /// Fitted surface and volume, present exactly when `success` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitResult>,
    /// Surface points handed to the fitter.
    pub coordinates: Vec<SurfaceCoordinate>,
    /// Per-transducer reduced timestamps behind `coordinates`.
    pub refined_timestamps: RefinedTimestamps,
}

impl SessionResult {
    /// Result of a session that did not reach the fitting stage.
    pub fn insufficient() -> Self {
        Self {
            success: false,
            fit: None,
            coordinates: Vec::new(),
            refined_timestamps: RefinedTimestamps::default(),
        }
    }

    /// Estimated volume in mL, if the fit ran.
    pub fn volume_ml(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.volume_ml)
    }
}
