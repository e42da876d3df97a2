//! Adam, gradient descent with per-entry adaptive step sizes.
//!
//! Keeps exponential moving averages of the gradient and its elementwise
//! square and scales each free entry's step by the inverse root of the
//! second moment. This makes the effective step size roughly uniform across
//! entries regardless of their scale, which suits precision matrices whose
//! free entries span orders of magnitude. The moment estimates are seeded
//! with the first gradient rather than with zeros. As with plain gradient
//! descent, the step budget is always exhausted.
//!
//! # References
//!
//! \[1\] [Adam: A Method for Stochastic
//! Optimization](https://arxiv.org/abs/1412.6980)

use getset::{CopyGetters, Setters};
use nalgebra::DMatrix;

use crate::core::{FreePattern, Solution, SolveError, Solver};
use crate::derivatives::L2Evaluator;
use crate::monitor::Monitor;

/// Options of the Adam algorithm.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct AdamOptions {
    /// Learning rate. Default: 0.01.
    lr: f64,
    /// Number of steps to take. Default: 100.
    max_steps: usize,
    /// Decay rate of the first moment estimate. Default: 0.9.
    beta1: f64,
    /// Decay rate of the second moment estimate. Default: 0.999.
    beta2: f64,
    /// Denominator offset guarding against division by zero. Default: 1e-8.
    eps: f64,
}

impl Default for AdamOptions {
    fn default() -> Self {
        Self {
            lr: 0.01,
            max_steps: 100,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }
}

/// Adam solver. See [module](self) documentation for more details.
pub struct Adam {
    eval: L2Evaluator,
    options: AdamOptions,
    monitor: Monitor,
}

impl Adam {
    /// Initializes Adam with default options.
    pub fn new(pattern: FreePattern) -> Self {
        Self::with_options(pattern, AdamOptions::default())
    }

    /// Initializes Adam with given options.
    pub fn with_options(pattern: FreePattern, options: AdamOptions) -> Self {
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

impl Solver for Adam {
    const NAME: &'static str = "adam";

    fn solve(
        &mut self,
        cov_target: &DMatrix<f64>,
        prec_init: &DMatrix<f64>,
    ) -> Result<Solution, SolveError> {
        let opts = &self.options;
        let mut prec = prec_init.clone_owned();

        let dim = prec.nrows();
        let mut mt = DMatrix::zeros(dim, dim);
        let mut vt = DMatrix::zeros(dim, dim);

        for step in 0..opts.max_steps {
            let cov = prec
                .clone()
                .try_inverse()
                .ok_or(SolveError::SingularMatrix)?;

            self.monitor
                .observe_l2(step, opts.max_steps, &self.eval, &cov, cov_target, &prec)?;

            let grad = self.eval.gradient_mat(&cov, cov_target);

            if step == 0 {
                mt = grad.clone();
                vt = grad.component_mul(&grad);
            } else {
                mt = &mt * opts.beta1 + &grad * (1.0 - opts.beta1);
                vt = &vt * opts.beta2 + grad.component_mul(&grad) * (1.0 - opts.beta2);
            }

            let mt_hat = &mt / (1.0 - opts.beta1.powi(step as i32 + 1));
            let vt_hat = &vt / (1.0 - opts.beta2.powi(step as i32 + 1));

            prec -= mt_hat
                .component_div(&vt_hat.map(f64::sqrt).add_scalar(opts.eps))
                * opts.lr;
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
