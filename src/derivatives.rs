//! Analytic derivatives of the matrix inverse and the least-squares
//! objective built on top of them.
//!
//! For a symmetric, invertible precision matrix M with covariance
//! C = M⁻¹, the derivative of an entry of C with respect to an entry of M
//! has a closed form obtained from dC = −C dM C. Because M is symmetric, a
//! perturbation of the off-diagonal entry (i, j) also perturbs (j, i),
//! which contributes a second term. [`first_deriv_inv`] and
//! [`second_deriv_inv`] implement these forms; [`L2Evaluator`] combines
//! them into the objective, gradient, and Hessian that the iterative
//! solvers consume.

use nalgebra::{DMatrix, DVector};

use crate::core::FreePattern;

/// Derivative of the covariance entry `(n1, n2)` with respect to the
/// precision entry `(d1, d2)`, evaluated at the covariance `cov`.
///
/// The pair `(d1, d2)` is unordered: for off-diagonal entries, both
/// symmetric positions move together.
pub fn first_deriv_inv(cov: &DMatrix<f64>, d1: usize, d2: usize, n1: usize, n2: usize) -> f64 {
    let mut ret = -cov[(n1, d1)] * cov[(n2, d2)];
    if d1 != d2 {
        ret -= cov[(n1, d2)] * cov[(n2, d1)];
    }

    ret
}

/// Second derivative of the covariance entry `(n1, n2)` with respect to the
/// precision entries `(d1, d2)` and `(d3, d4)`, evaluated at `cov`.
pub fn second_deriv_inv(
    cov: &DMatrix<f64>,
    d1: usize,
    d2: usize,
    d3: usize,
    d4: usize,
    n1: usize,
    n2: usize,
) -> f64 {
    let mut ret = -first_deriv_inv(cov, d1, d2, n1, d3) * cov[(n2, d4)]
        - cov[(n1, d3)] * first_deriv_inv(cov, d1, d2, n2, d4);
    if d3 != d4 {
        ret -= first_deriv_inv(cov, d1, d2, n1, d4) * cov[(n2, d3)]
            + cov[(n1, d4)] * first_deriv_inv(cov, d1, d2, n2, d3);
    }

    ret
}

/// Least-squares objective over the free covariance entries.
///
/// The objective is the sum of squared deviations between the current and
/// the target covariance over the free entries of the pattern, each
/// unordered entry counted once. The gradient and Hessian are taken with
/// respect to the free precision entries, using the analytic inverse
/// derivatives.
#[derive(Debug, Clone)]
pub struct L2Evaluator {
    pattern: FreePattern,
}

impl L2Evaluator {
    /// Creates an evaluator for the given free/non-free structure.
    pub fn new(pattern: FreePattern) -> Self {
        Self { pattern }
    }

    /// The underlying pattern.
    pub fn pattern(&self) -> &FreePattern {
        &self.pattern
    }

    /// Sum of squared deviations over the free entries.
    pub fn objective(&self, cov_curr: &DMatrix<f64>, cov_target: &DMatrix<f64>) -> f64 {
        self.pattern
            .free_pairs()
            .iter()
            .map(|&(i, j)| {
                let diff = cov_curr[(i, j)] - cov_target[(i, j)];
                diff * diff
            })
            .sum()
    }

    /// Gradient of the objective with respect to the free precision
    /// entries, laid out as a symmetric matrix with zeros in the non-free
    /// positions.
    pub fn gradient_mat(&self, cov_curr: &DMatrix<f64>, cov_target: &DMatrix<f64>) -> DMatrix<f64> {
        let dim = self.pattern.dim();
        let mut grad = DMatrix::zeros(dim, dim);

        for &(i, j) in self.pattern.free_pairs() {
            let mut entry = 0.0;
            for &(k, l) in self.pattern.free_pairs() {
                let diff = cov_curr[(k, l)] - cov_target[(k, l)];
                entry += 2.0 * diff * first_deriv_inv(cov_curr, i, j, k, l);
            }
            grad[(i, j)] = entry;
            grad[(j, i)] = entry;
        }

        grad
    }

    /// [`gradient_mat`](Self::gradient_mat) flattened into the free
    /// parameter layout.
    pub fn gradient_vec(&self, cov_curr: &DMatrix<f64>, cov_target: &DMatrix<f64>) -> DVector<f64> {
        self.pattern
            .free_mat_to_vec(&self.gradient_mat(cov_curr, cov_target))
    }

    /// Hessian of the objective with respect to the free precision entries,
    /// in the free parameter layout.
    pub fn hessian(&self, cov_curr: &DMatrix<f64>, cov_target: &DMatrix<f64>) -> DMatrix<f64> {
        let n_free = self.pattern.n_free();
        let mut hess = DMatrix::zeros(n_free, n_free);

        for (idx1, &(x, y)) in self.pattern.free_pairs().iter().enumerate() {
            for (idx2, &(i, j)) in self.pattern.free_pairs().iter().enumerate() {
                let mut entry = 0.0;
                for &(k, l) in self.pattern.free_pairs() {
                    let diff = cov_curr[(k, l)] - cov_target[(k, l)];
                    entry += 2.0
                        * first_deriv_inv(cov_curr, x, y, k, l)
                        * first_deriv_inv(cov_curr, i, j, k, l);
                    entry += 2.0 * diff * second_deriv_inv(cov_curr, x, y, i, j, k, l);
                }
                hess[(idx1, idx2)] = entry;
            }
        }

        hess
    }

    /// Mean and maximum relative deviation of the free covariance entries,
    /// in percent of the current value.
    pub fn percent_error(&self, cov_curr: &DMatrix<f64>, cov_target: &DMatrix<f64>) -> (f64, f64) {
        if self.pattern.n_free() == 0 {
            return (0.0, 0.0);
        }

        let mut sum = 0.0;
        let mut max = 0.0_f64;
        for &(i, j) in self.pattern.free_pairs() {
            let err = 100.0 * ((cov_curr[(i, j)] - cov_target[(i, j)]) / cov_curr[(i, j)]).abs();
            sum += err;
            max = max.max(err);
        }

        (sum / self.pattern.n_free() as f64, max)
    }
}
