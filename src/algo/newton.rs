//! Newton root finding on the equation M C = I.
//!
//! Instead of minimizing a least-squares objective, this algorithm treats
//! the problem as a square system of equations in the upper triangle of
//! M C − I. The unknowns are the free entries of the precision matrix M
//! together with the non-free entries of the covariance matrix C; the free
//! covariance entries stay pinned to their targets throughout. Each step
//! solves the linearized system for an additive update of both groups.
//!
//! Because M C is bilinear in the unknowns, the Jacobian has a closed form
//! and no matrix inversion is needed along the way, only one linear solve
//! per step. Convergence is declared when the maximum or the mean absolute
//! residual drops below its threshold; when the step budget runs out first,
//! the current iterate is returned as-is.

use getset::{CopyGetters, Setters};
use nalgebra::{DMatrix, DVector};

use crate::core::{FreePattern, Solution, SolveError, Solver};
use crate::monitor::Monitor;

/// Options of the Newton root-finding algorithm.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct NewtonOptions {
    /// Maximum number of steps. Default: 100.
    max_steps: usize,
    /// Convergence threshold on the maximum absolute residual.
    /// Default: 0.01.
    max_abs_res: f64,
    /// Convergence threshold on the mean absolute residual. Default: 0.01.
    mean_abs_res: f64,
    /// Adds the residuals to the Jacobian diagonal, which damps the update
    /// when the iterate is far from a root. Default: false.
    damping: bool,
}

impl Default for NewtonOptions {
    fn default() -> Self {
        Self {
            max_steps: 100,
            max_abs_res: 0.01,
            mean_abs_res: 0.01,
            damping: false,
        }
    }
}

/// Newton root-finding solver. See [module](self) documentation for more
/// details.
pub struct NewtonRootFinder {
    pattern: FreePattern,
    options: NewtonOptions,
    monitor: Monitor,
}

impl NewtonRootFinder {
    /// Initializes the root finder with default options.
    pub fn new(pattern: FreePattern) -> Self {
        Self::with_options(pattern, NewtonOptions::default())
    }

    /// Initializes the root finder with given options.
    pub fn with_options(pattern: FreePattern, options: NewtonOptions) -> Self {
        Self {
            pattern,
            options,
            monitor: Monitor::default(),
        }
    }

    /// Attaches a progress monitor.
    pub fn with_monitor(mut self, monitor: Monitor) -> Self {
        self.monitor = monitor;
        self
    }

    /// Upper triangle of M C − I, flattened row-major.
    pub fn residuals(&self, prec: &DMatrix<f64>, cov: &DMatrix<f64>) -> DVector<f64> {
        let dim = self.pattern.dim();
        self.pattern
            .upper_tri_to_vec(&(prec * cov - DMatrix::identity(dim, dim)))
    }

    /// Jacobian of the residuals with respect to the unknowns: the free
    /// precision entries followed by the non-free covariance entries.
    ///
    /// Each unknown moves a symmetric pair of entries of its matrix, so the
    /// derivative of M C with respect to the unknown at `(k, l)` is
    /// `E_kl C` for precision entries and `M E_kl` for covariance entries,
    /// where `E_kl` is the symmetric elementary matrix.
    pub fn jacobian(&self, prec: &DMatrix<f64>, cov: &DMatrix<f64>) -> DMatrix<f64> {
        let dim = self.pattern.dim();
        let n_dofs = dim * (dim + 1) / 2;
        let mut jac = DMatrix::zeros(n_dofs, n_dofs);

        for (x, &(k, l)) in self.pattern.free_pairs().iter().enumerate() {
            let col = self.pattern.upper_tri_to_vec(&(self.pattern.sym_unit_mat(k, l) * cov));
            jac.set_column(x, &col);
        }

        let n_free = self.pattern.n_free();
        for (x, &(k, l)) in self.pattern.non_free_pairs().iter().enumerate() {
            let col = self.pattern.upper_tri_to_vec(&(prec * self.pattern.sym_unit_mat(k, l)));
            jac.set_column(n_free + x, &col);
        }

        jac
    }
}

impl Solver for NewtonRootFinder {
    const NAME: &'static str = "newton root finding";

    fn solve(
        &mut self,
        cov_target: &DMatrix<f64>,
        prec_init: &DMatrix<f64>,
    ) -> Result<Solution, SolveError> {
        let opts = &self.options;
        let n_free = self.pattern.n_free();
        let n_non_free = self.pattern.n_non_free();

        let mut prec = prec_init.clone_owned();
        let mut cov = cov_target.clone_owned();

        for step in 0..opts.max_steps {
            let res = self.residuals(&prec, &cov);

            self.monitor
                .observe_newton(step, opts.max_steps, &self.pattern, &res, &prec, &cov)?;

            if res.amax() < opts.max_abs_res || res.abs().mean() < opts.mean_abs_res {
                log::debug!("residuals converged after {} steps", step);
                return Ok(Solution {
                    precision: prec,
                    covariance: cov,
                });
            }

            let mut jac = self.jacobian(&prec, &cov);
            if opts.damping {
                for k in 0..res.len() {
                    jac[(k, k)] += res[k];
                }
            }

            let update = jac
                .lu()
                .solve(&(-&res))
                .ok_or(SolveError::SingularMatrix)?;

            prec += self
                .pattern
                .free_vec_to_mat(&update.rows(0, n_free).into_owned());
            cov += self
                .pattern
                .non_free_vec_to_mat(&update.rows(n_free, n_non_free).into_owned());
        }

        log::debug!("step budget exhausted before the residuals converged");

        Ok(Solution {
            precision: prec,
            covariance: cov,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    use crate::testing;

    #[test]
    fn residuals_vanish_at_exact_solution() {
        let pattern = testing::three_dim_pattern();
        let solver = NewtonRootFinder::new(pattern);

        let cov = testing::three_dim_target();
        let prec = cov.clone().try_inverse().unwrap();

        assert!(solver.residuals(&prec, &cov).amax() < 1e-12);
    }

    #[test]
    fn jacobian_is_square() {
        let pattern = testing::five_dim_pattern();
        let solver = NewtonRootFinder::new(pattern);

        let cov = testing::five_dim_target();
        let prec = DMatrix::identity(5, 5);

        let jac = solver.jacobian(&prec, &cov);
        assert_eq!(jac.nrows(), 5 * 6 / 2);
        assert_eq!(jac.ncols(), 5 * 6 / 2);
    }

    #[test]
    fn singular_jacobian_is_reported() {
        // A zero precision matrix zeroes out every non-free column of the
        // Jacobian, so the linear solve must fail.
        let mut solver = NewtonRootFinder::new(testing::three_dim_pattern());

        let result = solver.solve(&testing::three_dim_target(), &DMatrix::zeros(3, 3));
        assert!(matches!(result, Err(SolveError::SingularMatrix)));
    }

    #[test]
    fn converges_on_three_dim_fixture() {
        let cov_target = testing::three_dim_target();
        let prec_init = DMatrix::identity(3, 3) * 0.01;

        let mut options = NewtonOptions::default();
        options.set_max_abs_res(1e-8).set_mean_abs_res(1e-8);
        let mut solver = NewtonRootFinder::with_options(testing::three_dim_pattern(), options);

        let solution = solver.solve(&cov_target, &prec_init).unwrap();

        // The covariance satisfies M C = I.
        let dim = 3;
        assert_abs_diff_eq!(
            &solution.precision * &solution.covariance,
            DMatrix::identity(dim, dim),
            epsilon = 1e-6
        );

        // The free covariance entries are pinned to the target throughout.
        for &(i, j) in testing::three_dim_pattern().free_pairs() {
            assert_eq!(solution.covariance[(i, j)], cov_target[(i, j)]);
        }

        // The non-free precision entries keep their initial value.
        for &(i, j) in testing::three_dim_pattern().non_free_pairs() {
            if i != j {
                assert_eq!(solution.precision[(i, j)], 0.0);
            }
        }
    }

    #[test]
    fn converges_with_damping() {
        let cov_target = testing::three_dim_target();
        let prec_init = DMatrix::identity(3, 3) * 0.01;

        let mut options = NewtonOptions::default();
        options.set_damping(true).set_max_steps(1000);
        let mut solver = NewtonRootFinder::with_options(testing::three_dim_pattern(), options);

        let solution = solver.solve(&cov_target, &prec_init).unwrap();

        let check = NewtonRootFinder::new(testing::three_dim_pattern());
        let res = check.residuals(&solution.precision, &solution.covariance);
        assert!(res.abs().mean() < 0.01, "mean residual is {}", res.abs().mean());
    }
}
