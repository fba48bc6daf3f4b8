//! Bounded geometric fitting of the cavity surface.
//!
//! Implements:
//! - Sphere fit on geometric residuals `|p - c| - r`.
//! - Axis-aligned ellipsoid fit on the implicit-form residual.
//! - Two solver backends: projected Levenberg-Marquardt (bounded) and
//!   `tiny-solver` (unbounded, checked against the box afterwards).
//!
//! The initial guess is the centroid of the input points with a fixed radius
//! (or fixed semi-axes), projected into the parameter box.

mod ellipsoid;
mod solver;
mod sphere;
mod tiny;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::config::{FitConfig, FitModel, SolverBackend};
use crate::error::FitError;

use solver::{solve_projected_lm, BoxBounds, LeastSquaresProblem};

/// Smallest accepted ratio of extreme singular values of the column-scaled
/// Jacobian at the solution.
const MIN_RELATIVE_SINGULAR_VALUE: f64 = 1e-8;

/// Fitted primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum FittedShape {
    Sphere {
        /// Center (x, y, z) in mm.
        center_mm: [f64; 3],
        radius_mm: f64,
    },
    Ellipsoid {
        /// Center (x, y, z) in mm.
        center_mm: [f64; 3],
        /// Semi-axis lengths along x, y, z in mm.
        semi_axes_mm: [f64; 3],
    },
}

impl FittedShape {
    pub fn center_mm(&self) -> [f64; 3] {
        match *self {
            Self::Sphere { center_mm, .. } | Self::Ellipsoid { center_mm, .. } => center_mm,
        }
    }

    /// Enclosed volume in mL.
    pub fn volume_ml(&self) -> f64 {
        match *self {
            Self::Sphere { radius_mm, .. } => sphere::volume_ml(radius_mm),
            Self::Ellipsoid { semi_axes_mm, .. } => ellipsoid::volume_ml(semi_axes_mm),
        }
    }

    pub fn model(&self) -> FitModel {
        match self {
            Self::Sphere { .. } => FitModel::Sphere,
            Self::Ellipsoid { .. } => FitModel::Ellipsoid,
        }
    }
}

/// Outcome of a converged fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub shape: FittedShape,
    /// Enclosed volume in mL.
    pub volume_ml: f64,
    /// RMS geometric residual of the input points (mm).
    pub rms_residual_mm: f64,
    /// Solver iterations; 0 when the backend does not report them.
    pub iterations: usize,
}

fn centroid(points: &[[f64; 3]]) -> [f64; 3] {
    let n = points.len() as f64;
    let mut c = [0.0; 3];
    for p in points {
        for k in 0..3 {
            c[k] += p[k];
        }
    }
    c.map(|v| v / n)
}

fn parameter_box(cfg: &FitConfig) -> BoxBounds {
    let b = &cfg.bounds;
    let [lat_lo, lat_hi] = b.lateral_mm;
    let [z_lo, z_hi] = b.depth_mm;
    match cfg.model {
        FitModel::Sphere => BoxBounds::new(
            &[lat_lo, lat_lo, z_lo, b.min_radius_mm],
            &[lat_hi, lat_hi, z_hi, b.max_radius_mm()],
        ),
        FitModel::Ellipsoid => {
            let (lo, hi) = (b.min_radius_mm, b.max_semi_axis_mm);
            BoxBounds::new(
                &[lat_lo, lat_lo, z_lo, lo, lo, lo],
                &[lat_hi, lat_hi, z_hi, hi, hi, hi],
            )
        }
    }
}

fn initial_guess(points: &[[f64; 3]], cfg: &FitConfig) -> DVector<f64> {
    let [cx, cy, cz] = centroid(points);
    let r0 = cfg.initial_radius_mm;
    match cfg.model {
        FitModel::Sphere => DVector::from_vec(vec![cx, cy, cz, r0]),
        FitModel::Ellipsoid => DVector::from_vec(vec![cx, cy, cz, r0, r0, r0]),
    }
}

fn least_squares_problem<'a>(
    model: FitModel,
    points: &'a [[f64; 3]],
) -> Box<dyn LeastSquaresProblem + 'a> {
    match model {
        FitModel::Sphere => Box::new(sphere::SphereProblem { points }),
        FitModel::Ellipsoid => Box::new(ellipsoid::EllipsoidProblem { points }),
    }
}

/// Whether the data pin down every parameter at `theta`.
///
/// Columns are normalized first so the test does not depend on parameter
/// units. A zero column or a near-zero singular value means a direction in
/// parameter space the residuals cannot see, e.g. an ellipsoid sampled on
/// only two distinct x (or y) positions.
fn is_identifiable(problem: &dyn LeastSquaresProblem, theta: &[f64]) -> bool {
    let mut j = problem.jacobian(&DVector::from_column_slice(theta));
    for mut col in j.column_iter_mut() {
        let n = col.norm();
        if !(n > 0.0 && n.is_finite()) {
            return false;
        }
        col /= n;
    }
    let sv = j.svd(false, false).singular_values;
    let max = sv.max();
    max > 0.0 && sv.min() / max >= MIN_RELATIVE_SINGULAR_VALUE
}

fn shape_from_params(model: FitModel, theta: &[f64]) -> FittedShape {
    let center_mm = [theta[0], theta[1], theta[2]];
    match model {
        FitModel::Sphere => FittedShape::Sphere {
            center_mm,
            radius_mm: theta[3],
        },
        FitModel::Ellipsoid => FittedShape::Ellipsoid {
            center_mm,
            semi_axes_mm: [theta[3], theta[4], theta[5]],
        },
    }
}

fn rms_residual_mm(shape: &FittedShape, points: &[[f64; 3]]) -> f64 {
    match *shape {
        FittedShape::Sphere {
            center_mm,
            radius_mm,
        } => sphere::rms_residual_mm(points, center_mm, radius_mm),
        FittedShape::Ellipsoid {
            center_mm,
            semi_axes_mm,
        } => ellipsoid::rms_residual_mm(points, center_mm, semi_axes_mm),
    }
}

/// Fit the configured primitive to surface points (x, y, z in mm).
///
/// Requires at least as many points as the model has parameters. A solver
/// that fails to converge, or (for the unbounded backend) converges outside
/// the parameter box, yields an error rather than a volume. So does a
/// solution the points cannot determine uniquely
/// ([`FitError::SingularSystem`]).
pub fn fit_surface(points: &[[f64; 3]], cfg: &FitConfig) -> Result<FitResult, FitError> {
    let needed = cfg.model.n_params();
    if points.len() < needed {
        return Err(FitError::TooFewPoints {
            needed,
            got: points.len(),
        });
    }
    if points.iter().flatten().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let bounds = parameter_box(cfg);
    let mut init = initial_guess(points, cfg);
    bounds.project(&mut init);

    let problem = least_squares_problem(cfg.model, points);
    let (theta, iterations) = match cfg.solver.backend {
        SolverBackend::ProjectedLm => {
            let sol = solve_projected_lm(problem.as_ref(), init, &bounds, &cfg.solver)?;
            (sol.theta.iter().copied().collect::<Vec<f64>>(), sol.iterations)
        }
        SolverBackend::TinySolver => {
            let theta = tiny::solve(cfg.model, points, init.as_slice(), &cfg.solver)?;
            if !bounds.contains(&theta) {
                return Err(FitError::OutOfBounds);
            }
            (theta, 0)
        }
    };
    if !is_identifiable(problem.as_ref(), &theta) {
        tracing::debug!(
            "{:?} fit on {} points is not identifiable",
            cfg.model,
            points.len()
        );
        return Err(FitError::SingularSystem);
    }

    let shape = shape_from_params(cfg.model, &theta);
    Ok(FitResult {
        shape,
        volume_ml: shape.volume_ml(),
        rms_residual_mm: rms_residual_mm(&shape, points),
        iterations,
    })
}
