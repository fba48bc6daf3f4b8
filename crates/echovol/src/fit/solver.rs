//! Box-constrained Levenberg-Marquardt.
//!
//! Each trial step solves the Marquardt-scaled normal equations and is then
//! projected onto the parameter box. Convergence is declared on a vanishing
//! projected gradient, a vanishing (projected) step, or a negligible relative
//! cost decrease; running out of iterations is an error.

use nalgebra::{DMatrix, DVector};

use crate::config::SolverParams;
use crate::error::FitError;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;
const DIAG_FLOOR: f64 = 1e-12;

/// Nonlinear least-squares problem: minimize `0.5 * |r(theta)|^2`.
pub(super) trait LeastSquaresProblem {
    fn residuals(&self, theta: &DVector<f64>) -> DVector<f64>;
    fn jacobian(&self, theta: &DVector<f64>) -> DMatrix<f64>;
}

/// Per-parameter lower/upper bounds.
#[derive(Debug, Clone)]
pub(super) struct BoxBounds {
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

impl BoxBounds {
    pub fn new(lower: &[f64], upper: &[f64]) -> Self {
        Self {
            lower: DVector::from_column_slice(lower),
            upper: DVector::from_column_slice(upper),
        }
    }

    pub fn project(&self, theta: &mut DVector<f64>) {
        for i in 0..theta.len() {
            theta[i] = theta[i].clamp(self.lower[i], self.upper[i]);
        }
    }

    pub fn contains(&self, theta: &[f64]) -> bool {
        theta.len() == self.lower.len()
            && theta
                .iter()
                .enumerate()
                .all(|(i, &v)| v >= self.lower[i] && v <= self.upper[i])
    }

    /// Whether component `i` sits on a bound and the descent direction `-g` points outward.
    #[inline]
    fn is_active(&self, theta: &DVector<f64>, g: &DVector<f64>, i: usize) -> bool {
        (theta[i] <= self.lower[i] && g[i] > 0.0) || (theta[i] >= self.upper[i] && g[i] < 0.0)
    }

    /// Infinity norm of the gradient restricted to free components.
    fn projected_gradient_norm(&self, theta: &DVector<f64>, g: &DVector<f64>) -> f64 {
        (0..g.len())
            .filter(|&i| !self.is_active(theta, g, i))
            .fold(0.0f64, |norm, i| norm.max(g[i].abs()))
    }
}

#[derive(Debug, Clone)]
pub(super) struct Solution {
    pub theta: DVector<f64>,
    pub iterations: usize,
}

fn half_sq_norm(r: &DVector<f64>) -> Option<f64> {
    let c = 0.5 * r.norm_squared();
    c.is_finite().then_some(c)
}

fn solve_damped(
    jtj: &DMatrix<f64>,
    diag: &DVector<f64>,
    g: &DVector<f64>,
    lambda: f64,
) -> Option<DVector<f64>> {
    let mut a = jtj.clone();
    for i in 0..a.nrows() {
        a[(i, i)] += lambda * diag[i];
    }
    let rhs = -g;
    match a.clone().cholesky() {
        Some(chol) => Some(chol.solve(&rhs)),
        None => a.lu().solve(&rhs),
    }
}

pub(super) fn solve_projected_lm<P: LeastSquaresProblem + ?Sized>(
    problem: &P,
    init: DVector<f64>,
    bounds: &BoxBounds,
    params: &SolverParams,
) -> Result<Solution, FitError> {
    let mut theta = init;
    bounds.project(&mut theta);

    let mut r = problem.residuals(&theta);
    let mut cost = half_sq_norm(&r).ok_or(FitError::NonFinite)?;
    let mut lambda = LAMBDA_INIT;

    for iter in 1..=params.max_iters {
        let j = problem.jacobian(&theta);
        if j.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite);
        }
        let g = j.transpose() * &r;
        if bounds.projected_gradient_norm(&theta, &g) <= params.gtol {
            return Ok(Solution {
                theta,
                iterations: iter - 1,
            });
        }

        let mut g = g;
        let mut jtj = j.transpose() * &j;
        // Freeze active components: their step is forced to zero.
        for i in 0..g.len() {
            if bounds.is_active(&theta, &g, i) {
                jtj.row_mut(i).fill(0.0);
                jtj.column_mut(i).fill(0.0);
                jtj[(i, i)] = 1.0;
                g[i] = 0.0;
            }
        }
        let diag = jtj.diagonal().map(|d| d.max(DIAG_FLOOR));

        loop {
            let step = solve_damped(&jtj, &diag, &g, lambda).ok_or(FitError::SingularSystem)?;
            let mut candidate = &theta + step;
            bounds.project(&mut candidate);

            let moved = (&candidate - &theta).norm();
            if !moved.is_finite() {
                return Err(FitError::NonFinite);
            }
            if moved <= params.xtol * (theta.norm() + params.xtol) {
                return Ok(Solution {
                    theta,
                    iterations: iter,
                });
            }

            let r_new = problem.residuals(&candidate);
            match half_sq_norm(&r_new) {
                Some(cost_new) if cost_new < cost => {
                    let decrease = cost - cost_new;
                    let converged = decrease <= params.ftol * cost;
                    theta = candidate;
                    r = r_new;
                    cost = cost_new;
                    lambda = (lambda * 0.1).max(LAMBDA_MIN);
                    if converged {
                        return Ok(Solution {
                            theta,
                            iterations: iter,
                        });
                    }
                    break;
                }
                _ => {
                    lambda *= 10.0;
                    if lambda > LAMBDA_MAX {
                        return Err(FitError::NotConverged { iterations: iter });
                    }
                }
            }
        }
    }

    Err(FitError::NotConverged {
        iterations: params.max_iters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// r(θ) = θ - target: minimum at target, or at the nearest box corner.
    struct Shift {
        target: Vec<f64>,
    }

    impl LeastSquaresProblem for Shift {
        fn residuals(&self, theta: &DVector<f64>) -> DVector<f64> {
            DVector::from_iterator(
                theta.len(),
                theta.iter().zip(&self.target).map(|(t, c)| t - c),
            )
        }

        fn jacobian(&self, theta: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::identity(theta.len(), theta.len())
        }
    }

    /// Rosenbrock in residual form.
    struct Rosenbrock;

    impl LeastSquaresProblem for Rosenbrock {
        fn residuals(&self, t: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![10.0 * (t[1] - t[0] * t[0]), 1.0 - t[0]])
        }

        fn jacobian(&self, t: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_row_slice(2, 2, &[-20.0 * t[0], 10.0, -1.0, 0.0])
        }
    }

    #[test]
    fn unconstrained_minimum_is_found() {
        let bounds = BoxBounds::new(&[-10.0, -10.0], &[10.0, 10.0]);
        let sol = solve_projected_lm(
            &Rosenbrock,
            DVector::from_vec(vec![-1.2, 1.0]),
            &bounds,
            &SolverParams::default(),
        )
        .expect("converges");
        assert_relative_eq!(sol.theta[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(sol.theta[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn solution_is_held_on_active_bound() {
        let problem = Shift {
            target: vec![5.0, -3.0],
        };
        let bounds = BoxBounds::new(&[0.0, 0.0], &[2.0, 2.0]);
        let sol = solve_projected_lm(
            &problem,
            DVector::from_vec(vec![1.0, 1.0]),
            &bounds,
            &SolverParams::default(),
        )
        .expect("converges");
        assert_relative_eq!(sol.theta[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(sol.theta[1], 0.0, epsilon = 1e-9);
        assert!(bounds.contains(sol.theta.as_slice()));
    }

    #[test]
    fn initial_guess_outside_box_is_projected() {
        let problem = Shift {
            target: vec![0.5],
        };
        let bounds = BoxBounds::new(&[0.0], &[1.0]);
        let sol = solve_projected_lm(
            &problem,
            DVector::from_vec(vec![50.0]),
            &bounds,
            &SolverParams::default(),
        )
        .expect("converges");
        assert_relative_eq!(sol.theta[0], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn exhausted_budget_is_reported() {
        let params = SolverParams {
            max_iters: 1,
            ..SolverParams::default()
        };
        let bounds = BoxBounds::new(&[-10.0, -10.0], &[10.0, 10.0]);
        let err = solve_projected_lm(
            &Rosenbrock,
            DVector::from_vec(vec![-1.2, 1.0]),
            &bounds,
            &params,
        )
        .unwrap_err();
        assert_eq!(err, FitError::NotConverged { iterations: 1 });
    }

    #[test]
    fn non_finite_start_is_rejected() {
        let problem = Shift {
            target: vec![f64::NAN],
        };
        let bounds = BoxBounds::new(&[0.0], &[1.0]);
        let err = solve_projected_lm(
            &problem,
            DVector::from_vec(vec![0.5]),
            &bounds,
            &SolverParams::default(),
        )
        .unwrap_err();
        assert_eq!(err, FitError::NonFinite);
    }
}
