//! Precision matrix estimation for Gaussian graphical models.
//!
//! A Gaussian graphical model constrains selected entries of the precision
//! matrix (the inverse covariance) to zero: the missing edges of the graph.
//! Estimating the model then means finding a precision matrix M whose
//! *free* entries are adjusted so that its inverse matches a target
//! covariance in those same entries, while the remaining entries of M keep
//! their prescribed values.
//!
//! ```text
//! find M such that (M^-1)_ij = (C_target)_ij for all free (i, j),
//! with M_ij fixed for all non-free (i, j)
//! ```
//!
//! This is a partial matrix inversion: with every entry free it reduces to
//! the plain inverse, with fewer free entries it becomes a root-finding or
//! least-squares problem over the free entries.
//!
//! # Algorithms
//!
//! The [`algo`] module provides several interchangeable algorithms behind
//! the [`Solver`] trait: gradient descent, Adam, L-BFGS, Newton root
//! finding on M C = I, closed-form solutions for recognized patterns, and
//! delegation to external optimizers. See the [module](algo) documentation
//! for guidance on choosing one; L-BFGS is a good default for patterns
//! without a closed form.
//!
//! # Usage
//!
//! Describe the free entries with a [`FreePattern`], pick an algorithm, and
//! call [`solve`](Solver::solve) with the target covariance and an initial
//! guess for the precision matrix.
//!
//! ```rust
//! use ggm_inversion::algo::lbfgs::{Lbfgs, LbfgsOptions};
//! use ggm_inversion::nalgebra::{dmatrix, DMatrix};
//! use ggm_inversion::{FreePattern, Solver};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // All entries free except (0, 1), which is a missing edge.
//! let pattern = FreePattern::new(3, vec![(0, 0), (1, 1), (2, 2), (0, 2), (1, 2)])?;
//!
//! let cov_target = dmatrix![
//!     100.0, 0.0, 10.0;
//!     0.0, 80.0, 30.0;
//!     10.0, 30.0, 50.0
//! ];
//! let prec_init = DMatrix::identity(3, 3) * 0.01;
//!
//! let mut options = LbfgsOptions::default();
//! options.set_max_steps(1000);
//! let mut solver = Lbfgs::with_options(pattern.clone(), options);
//! let solution = solver.solve(&cov_target, &prec_init)?;
//!
//! // The implied covariance matches the target in the free entries and the
//! // precision matrix is zero in the missing edge.
//! for &(i, j) in pattern.free_pairs() {
//!     assert!((solution.covariance[(i, j)] - cov_target[(i, j)]).abs() < 1.0);
//! }
//! assert!(solution.precision[(0, 1)].abs() < 1e-6);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod algo;
mod core;
pub mod derivatives;
pub mod monitor;

#[cfg(feature = "testing")]
pub mod testing;
#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use crate::core::*;

pub use nalgebra;
