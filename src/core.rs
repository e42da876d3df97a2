//! Core abstractions and types for GGM inversion.
//!
//! *Users* are mainly interested in constructing a [`FreePattern`] describing
//! which entries of the precision matrix are free, and in picking a solving
//! strategy from [`algo`](crate::algo).
//!
//! Solver *developers* are interested in implementing the [`Solver`] trait
//! and using the index-algebra helpers of [`FreePattern`] as well as the
//! tools in [`derivatives`](crate::derivatives).

mod pattern;
mod solver;

pub use pattern::*;
pub use solver::*;
