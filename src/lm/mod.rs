//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides the nonlinear least-squares solver used to fit
//! measurement equations. The solver works on any [`Problem`](crate::problem::Problem):
//! residuals are reduced to real curvature and gradient terms by a
//! [`RealReduction`], steps are solved by Gauss-Jordan elimination, and
//! convergence is decided by a damping-aware chi-squared heuristic.
//!
//! After convergence the curvature matrix is inverted to give the parameter
//! covariance and examined for unconstrained directions ([`eigenanalysis`]).

pub mod config;
pub mod convergence;
pub mod eigen;
pub mod engine;
pub mod parallel;
pub mod reduction;
pub mod solver;

// Re-export key types
pub use config::SolverConfig;
pub use convergence::{parameter_change_condition, DampingHeuristic, FitStatus};
pub use eigen::{eigenanalysis, Eigenanalysis, NullspaceDirection};
pub use engine::{FitMatrices, LevenbergMarquardt};
pub use parallel::fit_batch;
pub use reduction::{JonesReduction, RealReduction, ScalarReduction};
pub use solver::{ConvergenceCondition, FitSummary, IterationState, Solver};
