//! Closed-form solutions for recognized free/non-free patterns.
//!
//! For a handful of patterns, the estimation problem has an exact algebraic
//! solution and no iteration is needed. Two families are recognized:
//!
//! * every entry free — the precision matrix is the plain inverse of the
//!   target covariance,
//! * a three-dimensional chain, with all diagonal entries and the edges
//!   (0, 2) and (1, 2) free — the missing edge (0, 1) of the precision
//!   matrix is zero, which fixes the non-free covariance entry to
//!   `C(0, 2) C(1, 2) / C(2, 2)` and yields the precision entries in closed
//!   form.
//!
//! Pattern recognition is order-independent: the free pairs can be listed
//! in any order and either orientation. Patterns outside the registry are
//! rejected at construction.

use nalgebra::DMatrix;
use thiserror::Error;

use crate::core::{FreePattern, Solution, SolveError, Solver};

/// Error when no closed-form solution is known for a pattern.
#[derive(Debug, Error)]
#[error("no closed-form solution is known for the given pattern")]
pub struct UnsupportedModelError;

#[derive(Debug, Clone, Copy)]
enum Model {
    FullTriangle,
    ThreeChain,
}

fn recognize(pattern: &FreePattern) -> Option<Model> {
    let dim = pattern.dim();

    if pattern.n_free() == dim * (dim + 1) / 2 {
        return Some(Model::FullTriangle);
    }

    let three_chain = [(0, 0), (1, 1), (2, 2), (0, 2), (1, 2)];
    if dim == 3
        && pattern.n_free() == three_chain.len()
        && three_chain.iter().all(|&(i, j)| pattern.is_free(i, j))
    {
        return Some(Model::ThreeChain);
    }

    None
}

/// Closed-form solver. See [module](self) documentation for more details.
pub struct Analytic {
    model: Model,
}

impl Analytic {
    /// Initializes the solver, failing when the pattern is not in the
    /// registry of closed-form solutions.
    pub fn new(pattern: &FreePattern) -> Result<Self, UnsupportedModelError> {
        let model = recognize(pattern).ok_or(UnsupportedModelError)?;
        Ok(Self { model })
    }
}

impl Solver for Analytic {
    const NAME: &'static str = "analytic";

    /// Solves the model. The initial precision matrix is ignored.
    fn solve(
        &mut self,
        cov_target: &DMatrix<f64>,
        _prec_init: &DMatrix<f64>,
    ) -> Result<Solution, SolveError> {
        match self.model {
            Model::FullTriangle => {
                let precision = cov_target
                    .clone()
                    .try_inverse()
                    .ok_or(SolveError::SingularMatrix)?;
                Ok(Solution {
                    precision,
                    covariance: cov_target.clone_owned(),
                })
            }
            Model::ThreeChain => solve_three_chain(cov_target),
        }
    }
}

fn solve_three_chain(cov_target: &DMatrix<f64>) -> Result<Solution, SolveError> {
    let na = cov_target[(0, 0)];
    let nb = cov_target[(0, 2)];
    let nc = cov_target[(1, 1)];
    let nd = cov_target[(1, 2)];
    let ne = cov_target[(2, 2)];

    // Schur complements of the two free 2x2 blocks.
    let det_a = na * ne - nb * nb;
    let det_b = nc * ne - nd * nd;
    if ne == 0.0 || det_a == 0.0 || det_b == 0.0 {
        return Err(SolveError::SingularMatrix);
    }

    let mut precision = DMatrix::zeros(3, 3);
    precision[(0, 0)] = ne / det_a;
    precision[(1, 1)] = ne / det_b;
    precision[(2, 2)] = (na * nc * ne * ne - nb * nb * nd * nd) / (ne * det_a * det_b);
    precision[(0, 2)] = -nb / det_a;
    precision[(2, 0)] = precision[(0, 2)];
    precision[(1, 2)] = -nd / det_b;
    precision[(2, 1)] = precision[(1, 2)];

    // A zero precision entry (0, 1) pins the implied covariance there.
    let mut covariance = cov_target.clone_owned();
    covariance[(0, 1)] = nb * nd / ne;
    covariance[(1, 0)] = covariance[(0, 1)];

    Ok(Solution {
        precision,
        covariance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::dmatrix;

    use crate::testing;

    #[test]
    fn full_triangle_is_plain_inversion() {
        let cov_target = dmatrix![
            2.0, 0.3;
            0.3, 1.5
        ];

        let pattern = FreePattern::new(2, vec![(0, 0), (0, 1), (1, 1)]).unwrap();
        let mut solver = Analytic::new(&pattern).unwrap();

        let solution = solver.solve(&cov_target, &DMatrix::zeros(2, 2)).unwrap();

        assert_eq!(solution.covariance, cov_target);
        assert_abs_diff_eq!(
            &solution.precision * &cov_target,
            DMatrix::identity(2, 2),
            epsilon = 1e-12
        );
    }

    #[test]
    fn three_chain_solution_is_exact() {
        let cov_target = testing::three_dim_target();

        let pattern = testing::three_dim_pattern();
        let mut solver = Analytic::new(&pattern).unwrap();

        let solution = solver.solve(&cov_target, &DMatrix::zeros(3, 3)).unwrap();

        // The precision matrix is the exact inverse of the implied
        // covariance.
        assert_abs_diff_eq!(
            &solution.precision * &solution.covariance,
            DMatrix::identity(3, 3),
            epsilon = 1e-12
        );

        // The free covariance entries match the target, the non-free one is
        // implied by the zero precision entry.
        for &(i, j) in pattern.free_pairs() {
            assert_eq!(solution.covariance[(i, j)], cov_target[(i, j)]);
        }
        assert_abs_diff_eq!(solution.covariance[(0, 1)], 6.0);
        assert_eq!(solution.precision[(0, 1)], 0.0);
    }

    #[test]
    fn recognition_ignores_pair_order_and_orientation() {
        let pattern = FreePattern::new(3, vec![(2, 1), (2, 2), (0, 0), (2, 0), (1, 1)]).unwrap();
        assert!(Analytic::new(&pattern).is_ok());
    }

    #[test]
    fn unknown_patterns_are_rejected() {
        let pattern = FreePattern::new(3, vec![(0, 0), (0, 1), (1, 1), (1, 2), (2, 2)]).unwrap();
        assert!(Analytic::new(&pattern).is_err());

        let pattern = FreePattern::new(4, vec![(0, 0), (1, 1)]).unwrap();
        assert!(Analytic::new(&pattern).is_err());
    }

    #[test]
    fn singular_target_is_reported() {
        let cov_target = DMatrix::zeros(2, 2);
        let pattern = FreePattern::new(2, vec![(0, 0), (0, 1), (1, 1)]).unwrap();
        let mut solver = Analytic::new(&pattern).unwrap();

        assert!(matches!(
            solver.solve(&cov_target, &DMatrix::zeros(2, 2)),
            Err(SolveError::SingularMatrix)
        ));
    }
}
