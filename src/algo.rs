//! The estimation algorithms.
//!
//! All algorithms implement the common [`Solver`](crate::Solver) interface
//! and differ in how they move from the initial precision matrix towards
//! one whose inverse matches the target covariance in the free entries.
//!
//! * [Gradient descent](gradient_descent) — fixed-step descent on the
//!   least-squares objective.
//! * [Adam](adam) — descent with per-entry adaptive step sizes.
//! * [L-BFGS](lbfgs) — quasi-Newton descent with line search.
//! * [Newton root finding](newton) — solves M C = I directly for the free
//!   entries of M and the non-free entries of C.
//! * [Analytic](analytic) — closed-form solutions for recognized patterns.
//! * [Delegated](delegated) — hands the objective to an external
//!   optimizer.

pub mod adam;
pub mod analytic;
pub mod delegated;
pub mod gradient_descent;
pub mod lbfgs;
pub mod newton;

pub use adam::Adam;
pub use analytic::Analytic;
pub use delegated::Delegated;
pub use gradient_descent::GradientDescent;
pub use lbfgs::Lbfgs;
pub use newton::NewtonRootFinder;
