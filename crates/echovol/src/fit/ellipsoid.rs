//! Axis-aligned ellipsoid model: θ = (x0, y0, z0, a, b, c).
//!
//! Residual is the implicit form
//! `((x-x0)/a)^2 + ((y-y0)/b)^2 + ((z-z0)/c)^2 - 1`.

use nalgebra::{DMatrix, DVector};

use super::solver::LeastSquaresProblem;

pub(super) const N_PARAMS: usize = 6;

pub(super) struct EllipsoidProblem<'a> {
    pub points: &'a [[f64; 3]],
}

#[inline]
fn implicit(p: &[f64; 3], c: &[f64; 3], axes: &[f64; 3]) -> f64 {
    (0..3)
        .map(|k| {
            let u = (p[k] - c[k]) / axes[k];
            u * u
        })
        .sum()
}

fn split(theta: &DVector<f64>) -> ([f64; 3], [f64; 3]) {
    (
        [theta[0], theta[1], theta[2]],
        [theta[3], theta[4], theta[5]],
    )
}

impl LeastSquaresProblem for EllipsoidProblem<'_> {
    fn residuals(&self, theta: &DVector<f64>) -> DVector<f64> {
        let (c, axes) = split(theta);
        DVector::from_iterator(
            self.points.len(),
            self.points.iter().map(|p| implicit(p, &c, &axes) - 1.0),
        )
    }

    fn jacobian(&self, theta: &DVector<f64>) -> DMatrix<f64> {
        let (c, axes) = split(theta);
        let mut j = DMatrix::<f64>::zeros(self.points.len(), N_PARAMS);
        for (i, p) in self.points.iter().enumerate() {
            for k in 0..3 {
                let d = p[k] - c[k];
                let a2 = axes[k] * axes[k];
                j[(i, k)] = -2.0 * d / a2;
                j[(i, 3 + k)] = -2.0 * d * d / (a2 * axes[k]);
            }
        }
        j
    }
}

/// RMS radial distance (mm) from the points to the ellipsoid surface.
///
/// Distance is measured along the ray from the center through each point.
pub(super) fn rms_residual_mm(points: &[[f64; 3]], center: [f64; 3], axes: [f64; 3]) -> f64 {
    if points.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = points
        .iter()
        .map(|p| {
            let q = implicit(p, &center, &axes);
            let rho = (0..3).map(|k| (p[k] - center[k]).powi(2)).sum::<f64>().sqrt();
            let e = if q > 0.0 { rho * (1.0 - 1.0 / q.sqrt()) } else { 0.0 };
            e * e
        })
        .sum();
    (sum / points.len() as f64).sqrt()
}

/// Ellipsoid volume in mL from semi-axes in mm.
pub(super) fn volume_ml(axes: [f64; 3]) -> f64 {
    4.0 / 3.0 * std::f64::consts::PI * axes[0] * axes[1] * axes[2] / 1000.0
}
