//! `tiny-solver` backend.
//!
//! Runs the crate's Levenberg-Marquardt optimizer on the unconstrained
//! problem. Bounds are only checked afterwards: a solution outside the box is
//! reported as [`FitError::OutOfBounds`], and a run cut short by the
//! iteration budget as [`FitError::NotConverged`].

use std::collections::HashMap;

use tiny_solver::factors::na as ts_na;
use tiny_solver::Optimizer;

use nalgebra::DVector;

use crate::config::{FitModel, SolverParams};
use crate::error::FitError;

use super::solver::LeastSquaresProblem;

const PARAM_KEY: &str = "theta";

#[derive(Debug, Clone)]
struct SphereFactor {
    p: [f64; 3],
}

impl<T: ts_na::RealField> tiny_solver::factors::Factor<T> for SphereFactor {
    fn residual_func(&self, params: &[ts_na::DVector<T>]) -> ts_na::DVector<T> {
        let t = &params[0];
        let mut sq = T::zero();
        for k in 0..3 {
            let d = ts_na::convert::<f64, T>(self.p[k]) - t[k].clone();
            sq += d.clone() * d;
        }
        ts_na::DVector::<T>::from_vec(vec![sq.sqrt() - t[3].clone()])
    }
}

#[derive(Debug, Clone)]
struct EllipsoidFactor {
    p: [f64; 3],
}

impl<T: ts_na::RealField> tiny_solver::factors::Factor<T> for EllipsoidFactor {
    fn residual_func(&self, params: &[ts_na::DVector<T>]) -> ts_na::DVector<T> {
        let t = &params[0];
        let mut q = T::zero();
        for k in 0..3 {
            let u = (ts_na::convert::<f64, T>(self.p[k]) - t[k].clone()) / t[3 + k].clone();
            q += u.clone() * u;
        }
        ts_na::DVector::<T>::from_vec(vec![q - T::one()])
    }
}

fn build_problem(model: FitModel, points: &[[f64; 3]]) -> tiny_solver::Problem {
    let mut problem = tiny_solver::Problem::new();
    for &p in points {
        match model {
            FitModel::Sphere => problem.add_residual_block(
                1,
                &[PARAM_KEY],
                Box::new(SphereFactor { p }),
                None,
            ),
            FitModel::Ellipsoid => problem.add_residual_block(
                1,
                &[PARAM_KEY],
                Box::new(EllipsoidFactor { p }),
                None,
            ),
        };
    }
    problem
}

fn run(
    problem: &tiny_solver::Problem,
    init: &[f64],
    n_params: usize,
    max_iteration: usize,
) -> Option<Vec<f64>> {
    let mut initial_values = HashMap::<String, ts_na::DVector<f64>>::new();
    initial_values.insert(
        PARAM_KEY.to_string(),
        ts_na::DVector::<f64>::from_column_slice(init),
    );

    let optimizer = tiny_solver::LevenbergMarquardtOptimizer::default();
    let options = tiny_solver::OptimizerOptions {
        max_iteration,
        verbosity_level: 0,
        ..Default::default()
    };
    let result = optimizer.optimize(problem, &initial_values, Some(options))?;
    let theta = result.get(PARAM_KEY)?;
    if theta.len() != n_params {
        return None;
    }
    Some(theta.iter().copied().collect())
}

/// Cost `0.5 * |r|^2` and gradient infinity norm at `theta`.
fn cost_and_gradient(problem: &dyn LeastSquaresProblem, theta: &[f64]) -> (f64, f64) {
    let theta = DVector::from_column_slice(theta);
    let r = problem.residuals(&theta);
    let g = problem.jacobian(&theta).transpose() * &r;
    (0.5 * r.norm_squared(), g.amax())
}

/// Fit `model` to `points` starting from `init`; returns the raw parameter vector.
///
/// The optimizer returns its last iterate when the iteration budget runs out,
/// so the result is only accepted when one further iteration confirms it: the
/// step, the relative cost change or the gradient must be within tolerance.
pub(super) fn solve(
    model: FitModel,
    points: &[[f64; 3]],
    init: &[f64],
    params: &SolverParams,
) -> Result<Vec<f64>, FitError> {
    let n_params = model.n_params();
    let not_converged = FitError::NotConverged {
        iterations: params.max_iters,
    };
    let problem = build_problem(model, points);
    let theta = run(&problem, init, n_params, params.max_iters).ok_or(not_converged.clone())?;
    if theta.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }
    let next = run(&problem, init, n_params, params.max_iters + 1).ok_or(not_converged.clone())?;

    let scale = theta.iter().map(|v| v * v).sum::<f64>().sqrt();
    let moved = theta
        .iter()
        .zip(&next)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt();
    let residuals = super::least_squares_problem(model, points);
    let (cost, grad) = cost_and_gradient(residuals.as_ref(), &theta);
    let (cost_next, _) = cost_and_gradient(residuals.as_ref(), &next);

    let step_ok = moved <= params.xtol * (scale + params.xtol);
    let cost_ok = (cost - cost_next).abs() <= params.ftol * cost;
    let grad_ok = grad <= params.gtol;
    if !(step_ok || cost_ok || grad_ok) {
        tracing::debug!(
            "tiny-solver stopped at budget: step {:.3e}, cost {:.3e} -> {:.3e}, |g| {:.3e}",
            moved,
            cost,
            cost_next,
            grad
        );
        return Err(not_converged);
    }
    Ok(theta)
}
