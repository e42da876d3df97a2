use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// The result of a successful estimation.
///
/// Holds the estimated precision matrix together with its inverse, the
/// implied covariance matrix. The implied covariance matches the target in
/// the free entries (up to the solver's tolerance) while the precision
/// matrix is exactly zero, or whatever the initial guess prescribed, in the
/// non-free entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// The estimated precision matrix.
    pub precision: DMatrix<f64>,
    /// The covariance matrix implied by the precision matrix.
    pub covariance: DMatrix<f64>,
}

/// Error while estimating the precision matrix.
#[derive(Debug, Error)]
pub enum SolveError {
    /// A matrix that had to be inverted or factorized was singular.
    #[error("encountered a singular matrix")]
    SingularMatrix,
    /// The solver could not make progress towards a solution.
    #[error("solver failed to converge")]
    ConvergenceFailure,
    /// Writing monitoring output failed.
    #[error("error while writing monitoring output")]
    Io(#[from] std::io::Error),
}

/// Common interface for the estimation algorithms.
///
/// A solver takes the target covariance matrix and an initial guess for the
/// precision matrix and produces a [`Solution`]. The free/non-free structure
/// is part of each solver's construction, not of this trait.
pub trait Solver {
    /// Name of the solver.
    const NAME: &'static str;

    /// Runs the estimation.
    fn solve(
        &mut self,
        cov_target: &DMatrix<f64>,
        prec_init: &DMatrix<f64>,
    ) -> Result<Solution, SolveError>;
}

/// Outcome reported by an external optimizer.
#[derive(Debug, Clone)]
pub struct BlackBoxReport {
    /// The best point found, in the flat free-parameter layout.
    pub x: DVector<f64>,
    /// Objective value at `x`.
    pub value: f64,
    /// Whether the optimizer considers the run successful.
    pub success: bool,
}

/// An external gradient-based minimizer that the estimation can be handed
/// off to.
///
/// Implementors receive the objective through a callback that evaluates the
/// value at `x` and writes the gradient into its output argument. The
/// callback signals an infeasible point (singular precision matrix) by
/// returning [`f64::INFINITY`] with a zero gradient.
pub trait BlackBoxOptimizer {
    /// Name of the optimizer.
    const NAME: &'static str;

    /// Minimizes the objective starting from `x0`.
    fn minimize(
        &self,
        x0: DVector<f64>,
        f: &mut dyn FnMut(&DVector<f64>, &mut DVector<f64>) -> f64,
    ) -> BlackBoxReport;
}
