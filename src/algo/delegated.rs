//! Estimation delegated to an external optimizer.
//!
//! Wraps the least-squares objective into the flat callback form that
//! general-purpose minimizers consume and hands the whole run over to a
//! [`BlackBoxOptimizer`] implementation. This is the integration point for
//! bindings to optimization libraries: the binding implements the trait,
//! this solver does the matrix bookkeeping on both sides of the call.
//!
//! The callback reports a singular trial point by returning
//! [`f64::INFINITY`] with a zero gradient, so any minimizer that respects
//! objective values will back away from it.

use nalgebra::{DMatrix, DVector};

use crate::core::{BlackBoxOptimizer, FreePattern, Solution, SolveError, Solver};
use crate::derivatives::L2Evaluator;

/// Solver that delegates the minimization. See [module](self) documentation
/// for more details.
pub struct Delegated<O> {
    eval: L2Evaluator,
    delegate: O,
}

impl<O: BlackBoxOptimizer> Delegated<O> {
    /// Initializes the solver with the optimizer to delegate to.
    pub fn new(pattern: FreePattern, delegate: O) -> Self {
        Self {
            eval: L2Evaluator::new(pattern),
            delegate,
        }
    }
}

impl<O: BlackBoxOptimizer> Solver for Delegated<O> {
    const NAME: &'static str = O::NAME;

    fn solve(
        &mut self,
        cov_target: &DMatrix<f64>,
        prec_init: &DMatrix<f64>,
    ) -> Result<Solution, SolveError> {
        let eval = &self.eval;
        let pattern = eval.pattern();

        // The non-free entries of the initial guess are carried through
        // unchanged; the optimizer only sees the free entries.
        let base = pattern.zero_free_elements(prec_init);
        let x0 = pattern.free_mat_to_vec(prec_init);

        let mut f = |x: &DVector<f64>, grad_out: &mut DVector<f64>| -> f64 {
            let prec = &base + pattern.free_vec_to_mat(x);
            match prec.try_inverse() {
                Some(cov) => {
                    grad_out.copy_from(&eval.gradient_vec(&cov, cov_target));
                    eval.objective(&cov, cov_target)
                }
                None => {
                    grad_out.fill(0.0);
                    f64::INFINITY
                }
            }
        };

        let report = self.delegate.minimize(x0, &mut f);
        log::info!(
            "{} finished with objective {} (success: {})",
            O::NAME,
            report.value,
            report.success
        );

        if !report.success {
            return Err(SolveError::ConvergenceFailure);
        }

        let precision = &base + pattern.free_vec_to_mat(&report.x);
        let covariance = precision
            .clone()
            .try_inverse()
            .ok_or(SolveError::SingularMatrix)?;

        Ok(Solution {
            precision,
            covariance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::dmatrix;

    use crate::core::BlackBoxReport;

    /// Minimal external optimizer stand-in: fixed-step gradient descent on
    /// the callback.
    struct FixedStepGd {
        lr: f64,
        steps: usize,
    }

    impl BlackBoxOptimizer for FixedStepGd {
        const NAME: &'static str = "fixed-step gd";

        fn minimize(
            &self,
            x0: DVector<f64>,
            f: &mut dyn FnMut(&DVector<f64>, &mut DVector<f64>) -> f64,
        ) -> BlackBoxReport {
            let mut x = x0;
            let mut grad = DVector::zeros(x.len());
            let mut value = f(&x, &mut grad);
            for _ in 0..self.steps {
                x -= &grad * self.lr;
                value = f(&x, &mut grad);
            }

            BlackBoxReport {
                x,
                value,
                success: true,
            }
        }
    }

    #[test]
    fn delegate_drives_the_estimation() {
        let prec_true = dmatrix![
            1.5, -0.3;
            -0.3, 1.0
        ];
        let cov_target = prec_true.clone().try_inverse().unwrap();

        let pattern = FreePattern::new(2, vec![(0, 0), (0, 1), (1, 1)]).unwrap();
        let delegate = FixedStepGd {
            lr: 0.05,
            steps: 5000,
        };
        let mut solver = Delegated::new(pattern, delegate);

        let solution = solver
            .solve(&cov_target, &DMatrix::identity(2, 2))
            .unwrap();

        assert_abs_diff_eq!(solution.precision, prec_true, epsilon = 1e-4);
    }

    #[test]
    fn singular_trial_points_report_infinity() {
        struct Probe;

        impl BlackBoxOptimizer for Probe {
            const NAME: &'static str = "probe";

            fn minimize(
                &self,
                x0: DVector<f64>,
                f: &mut dyn FnMut(&DVector<f64>, &mut DVector<f64>) -> f64,
            ) -> BlackBoxReport {
                let zero = DVector::zeros(x0.len());
                let mut grad = DVector::from_element(x0.len(), 1.0);
                let value = f(&zero, &mut grad);
                assert!(value.is_infinite());
                assert_eq!(grad.amax(), 0.0);

                BlackBoxReport {
                    x: x0,
                    value: 0.0,
                    success: true,
                }
            }
        }

        let pattern = FreePattern::new(2, vec![(0, 0), (0, 1), (1, 1)]).unwrap();
        let mut solver = Delegated::new(pattern, Probe);

        let cov_target = DMatrix::identity(2, 2);
        let solution = solver
            .solve(&cov_target, &DMatrix::identity(2, 2))
            .unwrap();
        assert_eq!(solution.precision, DMatrix::identity(2, 2));
    }

    #[test]
    fn failed_delegate_is_reported() {
        struct Failing;

        impl BlackBoxOptimizer for Failing {
            const NAME: &'static str = "failing";

            fn minimize(
                &self,
                x0: DVector<f64>,
                _f: &mut dyn FnMut(&DVector<f64>, &mut DVector<f64>) -> f64,
            ) -> BlackBoxReport {
                BlackBoxReport {
                    x: x0,
                    value: f64::INFINITY,
                    success: false,
                }
            }
        }

        let pattern = FreePattern::new(2, vec![(0, 0), (1, 1)]).unwrap();
        let mut solver = Delegated::new(pattern, Failing);

        let result = solver.solve(&DMatrix::identity(2, 2), &DMatrix::identity(2, 2));
        assert!(matches!(result, Err(SolveError::ConvergenceFailure)));
    }
}
