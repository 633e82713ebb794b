//! Dense linear algebra primitives used by the solver.

pub mod gauss_jordan;

pub use gauss_jordan::{gauss_jordan, Determinant};
