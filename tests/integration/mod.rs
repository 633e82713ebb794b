//! Integration tests for the jonesfit library
//!
//! These tests exercise the library as a whole: models built in an arena,
//! observed through a measurement equation, and fit by the solver.

// Recovery of simulated receivers and sources
pub mod recovery;

// Detection of unconstrained and redundant parameters
pub mod diagnostics;

// Evaluation of composed and parsed models
pub mod composition;

// Scalar fits, batches and reports
pub mod fitting;
