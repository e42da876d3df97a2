//! Fixed-step gradient descent on the least-squares objective.
//!
//! The simplest of the iterative algorithms. Each step inverts the current
//! precision matrix, evaluates the analytic gradient of the squared
//! deviation of the free covariance entries from their targets, and moves
//! the free precision entries against it with a constant learning rate. The
//! step budget is always exhausted; there is no convergence test, so the
//! learning rate has to be chosen to fit the scale of the problem.

use getset::{CopyGetters, Setters};
use nalgebra::DMatrix;

use crate::core::{FreePattern, Solution, SolveError, Solver};
use crate::derivatives::L2Evaluator;
use crate::monitor::Monitor;

/// Options of the gradient descent algorithm.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct GradientDescentOptions {
    /// Learning rate. Default: 1.
    lr: f64,
    /// Number of steps to take. Default: 100.
    max_steps: usize,
}

impl Default for GradientDescentOptions {
    fn default() -> Self {
        Self {
            lr: 1.0,
            max_steps: 100,
        }
    }
}

/// Gradient descent solver. See [module](self) documentation for more
/// details.
pub struct GradientDescent {
    eval: L2Evaluator,
    options: GradientDescentOptions,
    monitor: Monitor,
}

impl GradientDescent {
    /// Initializes gradient descent with default options.
    pub fn new(pattern: FreePattern) -> Self {
        Self::with_options(pattern, GradientDescentOptions::default())
    }

    /// Initializes gradient descent with given options.
    pub fn with_options(pattern: FreePattern, options: GradientDescentOptions) -> Self {
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
}

impl Solver for GradientDescent {
    const NAME: &'static str = "gradient descent";

    fn solve(
        &mut self,
        cov_target: &DMatrix<f64>,
        prec_init: &DMatrix<f64>,
    ) -> Result<Solution, SolveError> {
        let mut prec = prec_init.clone_owned();

        for step in 0..self.options.max_steps {
            let cov = prec
                .clone()
                .try_inverse()
                .ok_or(SolveError::SingularMatrix)?;

            self.monitor.observe_l2(
                step,
                self.options.max_steps,
                &self.eval,
                &cov,
                cov_target,
                &prec,
            )?;

            let grad = self.eval.gradient_mat(&cov, cov_target);
            prec -= grad * self.options.lr;
        }

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
