use crate::config::FitModel;

use super::RefinedTimestamps;

/// Fewest surface points for which any fit is attempted.
pub const MIN_MEASUREMENTS: usize = 4;

/// Points required before fitting `model`: never fewer than the model has parameters.
///
/// The sphere keeps the base threshold of [`MIN_MEASUREMENTS`]; the
/// six-parameter ellipsoid raises it to 6.
pub fn min_measurements(model: FitModel) -> usize {
    MIN_MEASUREMENTS.max(model.n_params())
}

/// Number of (transducer, wall) pairs that produced a reduced timestamp.
pub fn count_measurements(refined: &RefinedTimestamps) -> usize {
    refined.measurement_count()
}

/// Whether enough corroborated measurements exist to fit `model`.
pub fn has_sufficient_data(refined: &RefinedTimestamps, model: FitModel) -> bool {
    count_measurements(refined) >= min_measurements(model)
}
