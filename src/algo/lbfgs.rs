//! Limited-memory BFGS with backtracking line search.
//!
//! Approximates the inverse Hessian of the least-squares objective from a
//! short history of gradient differences and uses it to precondition the
//! descent direction, which makes it far less sensitive to the scale of the
//! free entries than plain gradient descent. The step length along the
//! direction is found by backtracking until a sufficient decrease
//! ([Armijo](LineSearch::Armijo)) or additionally a curvature condition
//! ([Wolfe](LineSearch::Wolfe)) holds. The iteration stops early when the
//! objective stagnates.
//!
//! # References
//!
//! \[1\] [Updating Quasi-Newton Matrices with Limited
//! Storage](https://doi.org/10.1090/S0025-5718-1980-0572855-7)
//!
//! \[2\] [Numerical Optimization](https://doi.org/10.1007/978-0-387-40065-5)

use std::collections::VecDeque;

use getset::{CopyGetters, Setters};
use nalgebra::{DMatrix, DVector};

use crate::core::{FreePattern, Solution, SolveError, Solver};
use crate::derivatives::L2Evaluator;
use crate::monitor::Monitor;

/// Line search used to pick the step length along the descent direction.
///
/// Both variants backtrack by halving from their initial step length until
/// their conditions hold.
#[derive(Debug, Clone, Copy)]
pub enum LineSearch {
    /// Sufficient decrease only, starting from step length 1.
    Armijo {
        /// Sufficient decrease coefficient.
        c: f64,
    },
    /// Sufficient decrease and curvature, starting from step length 100.
    /// When no step length in the backtracking sequence satisfies the
    /// curvature condition, falls back to sufficient decrease alone.
    Wolfe {
        /// Sufficient decrease coefficient.
        c1: f64,
        /// Curvature coefficient.
        c2: f64,
    },
}

impl Default for LineSearch {
    fn default() -> Self {
        LineSearch::Armijo { c: 1e-4 }
    }
}

/// Options of the L-BFGS algorithm.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct LbfgsOptions {
    /// Maximum number of steps. Default: 100.
    max_steps: usize,
    /// Number of curvature pairs kept. Default: 10.
    memory: usize,
    /// Stop when the objective changes less than this between steps.
    /// Default: 1e-8.
    tol: f64,
    /// Line search variant. Default: Armijo with c = 1e-4.
    line_search: LineSearch,
}

impl Default for LbfgsOptions {
    fn default() -> Self {
        Self {
            max_steps: 100,
            memory: 10,
            tol: 1e-8,
            line_search: LineSearch::default(),
        }
    }
}

/// L-BFGS solver. See [module](self) documentation for more details.
pub struct Lbfgs {
    eval: L2Evaluator,
    options: LbfgsOptions,
    monitor: Monitor,
}

impl Lbfgs {
    /// Initializes L-BFGS with default options.
    pub fn new(pattern: FreePattern) -> Self {
        Self::with_options(pattern, LbfgsOptions::default())
    }

    /// Initializes L-BFGS with given options.
    pub fn with_options(pattern: FreePattern, options: LbfgsOptions) -> Self {
        Self {
            eval: L2Evaluator::new(pattern),
            options,
            monitor: Monitor::default(),
        }
    }

    /// Attaches a progress monitor.
    pub fn with_monitor(mut self, monitor: Monitor) -> Self {
        self.monitor = monitor;
        self
    }

    /// Evaluates the objective at `prec + step`, where `step` is given in
    /// the free parameter layout. Returns `None` when the trial precision
    /// matrix is singular, which the line search treats as a failed
    /// condition.
    fn trial_objective(
        &self,
        prec: &DMatrix<f64>,
        cov_target: &DMatrix<f64>,
        step: &DVector<f64>,
    ) -> Option<(DMatrix<f64>, f64)> {
        let trial = prec + self.eval.pattern().free_vec_to_mat(step);
        let cov = trial.try_inverse()?;
        let obj = self.eval.objective(&cov, cov_target);
        Some((cov, obj))
    }

    /// Backtracks for a step length along `dir` satisfying the configured
    /// line search conditions.
    fn step_size(
        &self,
        prec: &DMatrix<f64>,
        cov_target: &DMatrix<f64>,
        obj0: f64,
        grad: &DVector<f64>,
        dir: &DVector<f64>,
    ) -> f64 {
        let ax = grad.dot(dir);
        assert!(ax < 0.0, "search direction must be a descent direction");

        let armijo = |alpha: f64, c: f64| match self.trial_objective(prec, cov_target, &(dir * alpha))
        {
            Some((_, obj)) => obj0 - obj >= -alpha * c * ax,
            None => false,
        };

        match self.options.line_search {
            LineSearch::Armijo { c } => {
                let mut alpha = 1.0;
                while !armijo(alpha, c) {
                    alpha *= 0.5;
                }
                alpha
            }
            LineSearch::Wolfe { c1, c2 } => {
                let mut alpha = 100.0;
                while alpha > 1e-16 {
                    let curvature = self
                        .trial_objective(prec, cov_target, &(dir * alpha))
                        .map(|(cov, _)| dir.dot(&self.eval.gradient_vec(&cov, cov_target)) >= c2 * ax)
                        .unwrap_or(false);
                    if armijo(alpha, c1) && curvature {
                        return alpha;
                    }
                    alpha *= 0.5;
                }

                // The halving sequence missed the curvature window.
                log::debug!("curvature condition not met, falling back to sufficient decrease");
                let mut alpha = 1.0;
                while !armijo(alpha, c1) {
                    alpha *= 0.5;
                }
                alpha
            }
        }
    }
}

/// Stores the curvature pair, skipping pairs that would break positive
/// definiteness of the Hessian approximation. The history is capped at
/// `memory` pairs, oldest first out.
fn accept_pair(
    history: &mut VecDeque<(DVector<f64>, DVector<f64>)>,
    s: DVector<f64>,
    y: DVector<f64>,
    memory: usize,
) {
    if s.dot(&y) > 0.0 {
        history.push_back((s, y));
        if history.len() > memory {
            history.pop_front();
        }
    } else {
        log::debug!("skipping curvature pair with non-positive s . y");
    }
}

/// Two-loop recursion. Applies the inverse Hessian approximation implied by
/// the curvature history to the gradient and returns the descent direction.
fn two_loop_direction(
    history: &VecDeque<(DVector<f64>, DVector<f64>)>,
    grad: &DVector<f64>,
) -> DVector<f64> {
    let mut q = grad.clone_owned();

    let mut alphas = Vec::with_capacity(history.len());
    for (s, y) in history.iter().rev() {
        let rho = 1.0 / (y.dot(s) + 1e-12);
        let alpha = rho * s.dot(&q);
        q -= y * alpha;
        alphas.push((rho, alpha));
    }

    let gamma = history
        .back()
        .map(|(s, y)| s.dot(y) / (y.dot(y) + 1e-12))
        .unwrap_or(1.0);
    let mut z = q * gamma;

    for ((s, y), &(rho, alpha)) in history.iter().zip(alphas.iter().rev()) {
        let beta = rho * y.dot(&z);
        z += s * (alpha - beta);
    }

    -z
}

impl Solver for Lbfgs {
    const NAME: &'static str = "l-bfgs";

    fn solve(
        &mut self,
        cov_target: &DMatrix<f64>,
        prec_init: &DMatrix<f64>,
    ) -> Result<Solution, SolveError> {
        let opts = self.options.clone();
        let mut prec = prec_init.clone_owned();

        let mut history = VecDeque::with_capacity(opts.memory);
        let mut prev: Option<(DVector<f64>, DVector<f64>)> = None;
        let mut obj_prev = f64::INFINITY;

        for step in 0..opts.max_steps {
            let cov = prec
                .clone()
                .try_inverse()
                .ok_or(SolveError::SingularMatrix)?;

            self.monitor
                .observe_l2(step, opts.max_steps, &self.eval, &cov, cov_target, &prec)?;

            let obj = self.eval.objective(&cov, cov_target);
            if (obj - obj_prev).abs() < opts.tol {
                log::debug!("objective stagnated after {} steps", step);
                return Ok(Solution {
                    precision: prec,
                    covariance: cov,
                });
            }
            obj_prev = obj;

            let x = self.eval.pattern().free_mat_to_vec(&prec);
            let grad = self.eval.gradient_vec(&cov, cov_target);

            if let Some((x_last, grad_last)) = prev.take() {
                accept_pair(&mut history, &x - &x_last, &grad - &grad_last, opts.memory);
            }

            let update = if history.is_empty() {
                // No curvature information yet. Take a tiny gradient step to
                // get a first pair.
                &grad * -1e-10
            } else {
                let dir = two_loop_direction(&history, &grad);
                let alpha = self.step_size(&prec, cov_target, obj, &grad, &dir);
                dir * alpha
            };

            prev = Some((x, grad));
            prec += self.eval.pattern().free_vec_to_mat(&update);
        }

        if history.is_empty() {
            return Err(SolveError::ConvergenceFailure);
        }

        log::debug!("step budget exhausted before the objective stagnated");

        let covariance = prec
            .clone()
            .try_inverse()
            .ok_or(SolveError::SingularMatrix)?;

        Ok(Solution {
            precision: prec,
            covariance,
        })
    }
}
