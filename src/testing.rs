//! Testing fixtures: target matrices, free patterns, and random
//! symmetric positive definite matrices.
//!
//! This module is gated behind the `testing` feature and is meant for
//! testing and benchmarking of estimation algorithms.

#![allow(unused)]

use nalgebra::{dmatrix, DMatrix};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::core::FreePattern;

/// Free pairs of the three-dimensional fixture: the diagonal and the two
/// edges of a chain through the last variable.
pub fn three_dim_pairs() -> Vec<(usize, usize)> {
    vec![(0, 0), (1, 1), (2, 2), (0, 2), (1, 2)]
}

/// Pattern of the three-dimensional fixture.
pub fn three_dim_pattern() -> FreePattern {
    FreePattern::new(3, three_dim_pairs()).unwrap()
}

/// Target covariance of the three-dimensional fixture.
pub fn three_dim_target() -> DMatrix<f64> {
    dmatrix![
        100.0, 0.0, 10.0;
        0.0, 80.0, 30.0;
        10.0, 30.0, 50.0
    ]
}

/// Free pairs of the five-dimensional fixture.
pub fn five_dim_pairs() -> Vec<(usize, usize)> {
    vec![
        (0, 0),
        (1, 1),
        (2, 2),
        (3, 3),
        (4, 4),
        (0, 3),
        (1, 2),
        (2, 4),
        (3, 4),
    ]
}

/// Pattern of the five-dimensional fixture.
pub fn five_dim_pattern() -> FreePattern {
    FreePattern::new(5, five_dim_pairs()).unwrap()
}

/// Target covariance of the five-dimensional fixture. The free entries span
/// three orders of magnitude.
pub fn five_dim_target() -> DMatrix<f64> {
    dmatrix![
        100.0, 0.0, 0.0, 20.0, 0.0;
        0.0, 80.0, 3.0, 0.0, 0.0;
        0.0, 3.0, 6.0, 0.0, 4.0;
        20.0, 0.0, 0.0, 40.0, 10.0;
        0.0, 0.0, 4.0, 10.0, 6000.0
    ]
}

/// A reproducible random symmetric positive definite matrix, diagonally
/// shifted to keep it well-conditioned.
pub fn random_spd(n: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let a = DMatrix::from_fn(n, n, |_, _| -> f64 { rng.sample(StandardNormal) });
    &a * a.transpose() + DMatrix::identity(n, n) * n as f64
}
