//! Sphere model: θ = (x0, y0, z0, r), residual `|p - c| - r`.

use nalgebra::{DMatrix, DVector};

use super::solver::LeastSquaresProblem;

pub(super) const N_PARAMS: usize = 4;

pub(super) struct SphereProblem<'a> {
    pub points: &'a [[f64; 3]],
}

impl LeastSquaresProblem for SphereProblem<'_> {
    fn residuals(&self, theta: &DVector<f64>) -> DVector<f64> {
        let c = [theta[0], theta[1], theta[2]];
        let r = theta[3];
        DVector::from_iterator(
            self.points.len(),
            self.points.iter().map(|p| distance(p, &c) - r),
        )
    }

    fn jacobian(&self, theta: &DVector<f64>) -> DMatrix<f64> {
        let c = [theta[0], theta[1], theta[2]];
        let mut j = DMatrix::<f64>::zeros(self.points.len(), N_PARAMS);
        for (i, p) in self.points.iter().enumerate() {
            let d = distance(p, &c);
            if d > 1e-12 {
                for k in 0..3 {
                    j[(i, k)] = (c[k] - p[k]) / d;
                }
            }
            j[(i, 3)] = -1.0;
        }
        j
    }
}

#[inline]
fn distance(p: &[f64; 3], c: &[f64; 3]) -> f64 {
    let dx = p[0] - c[0];
    let dy = p[1] - c[1];
    let dz = p[2] - c[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// RMS of `|p - c| - r` over all points.
pub(super) fn rms_residual_mm(points: &[[f64; 3]], center: [f64; 3], radius_mm: f64) -> f64 {
    if points.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = points
        .iter()
        .map(|p| {
            let e = distance(p, &center) - radius_mm;
            e * e
        })
        .sum();
    (sum / points.len() as f64).sqrt()
}

/// Sphere volume in mL from a radius in mm.
pub(super) fn volume_ml(radius_mm: f64) -> f64 {
    4.0 / 3.0 * std::f64::consts::PI * radius_mm.powi(3) / 1000.0
}
