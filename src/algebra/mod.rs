//! # Polarimetric algebra
//!
//! Value types shared by every part of the solver:
//!
//! - [`Jones`]: a 2x2 complex matrix, either a linear transformation of the
//!   electric field or a coherency (density) matrix
//! - [`Stokes`]: the four Stokes parameters `(I, Q, U, V)`
//! - [`Estimate`]: a value paired with its variance
//!
//! The [`pauli`] module converts between coherency matrices and Stokes vectors.

pub mod estimate;
pub mod jones;
pub mod pauli;
pub mod stokes;

pub use estimate::Estimate;
pub use jones::Jones;
pub use stokes::Stokes;
