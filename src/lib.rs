//! # jonesfit
//!
//! `jonesfit` solves polarimetric measurement equations: it fits the
//! parameters of composable Jones-matrix models of signal paths and input
//! polarization states to observed Stokes parameters, using a
//! Levenberg-Marquardt solver that works directly with complex 2x2 matrices.
//!
//! The library provides:
//! - Value types for polarimetric algebra (Jones matrices, Stokes vectors, estimates)
//! - An arena of leaf functions, products and chain substitutions with
//!   analytic gradients and a shared parameter scope
//! - A measurement-equation model (`ReceptionModel`) that observes many
//!   inputs through many signal paths
//! - A Levenberg-Marquardt solver with adaptive damping, covariance
//!   estimation, and eigenanalysis of the curvature matrix
//! - Weighted straight-line regression and text reports
//!
//! ## Basic Usage
//!
//! ```
//! use jonesfit::algebra::Stokes;
//! use jonesfit::function::complex2::{polar, Coherency};
//! use jonesfit::function::Function;
//! use jonesfit::lm::{Solver, SolverConfig};
//! use jonesfit::reception::{simulate, ReceptionModel};
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(3);
//! let mut model = ReceptionModel::new();
//! let arena = model.arena_mut();
//! let receiver = polar(arena).unwrap();
//! model.add_transformation(receiver).unwrap();
//! for stokes in [
//!     Stokes::new(1.0, 0.0, 0.0, 0.0),
//!     Stokes::new(1.0, 0.9, 0.0, 0.0),
//!     Stokes::new(1.0, 0.0, 0.9, 0.0),
//!     Stokes::new(1.0, 0.0, 0.0, 0.9),
//! ] {
//!     let state = model.arena_mut().add_complex2(Coherency::new(stokes));
//!     model.add_input(state).unwrap();
//! }
//! // the input states are known
//! for index in 0..16 {
//!     model.set_infit(index, false).unwrap();
//! }
//!
//! let set = simulate::observe(&mut model, 0, &[], &[0, 1, 2, 3], 1e-6, &mut rng).unwrap();
//! model.add_data(set).unwrap();
//!
//! let mut solver = Solver::new(SolverConfig::default());
//! model.solve(&mut solver).unwrap();
//! assert!(solver.solved());
//! ```

pub mod algebra;
pub mod error;
pub mod function;
pub mod interface;
pub mod linalg;
pub mod lm;
pub mod parameters;
pub mod problem;
pub mod reception;
pub mod registry;
pub mod report;
pub mod stat;
pub mod uncertainty;
mod utils;

// Re-exports for convenience
pub use algebra::{Estimate, Jones, Stokes};
pub use error::{JonesFitError, Result, ResultExt};
pub use function::{Arena, AxisId, Function, NodeId};
pub use lm::{Solver, SolverConfig};
pub use problem::Problem;
pub use reception::ReceptionModel;
pub use registry::FunctionRegistry;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
