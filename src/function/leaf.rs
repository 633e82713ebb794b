//! Leaf functions: the parameterized building blocks of every model.
//!
//! A leaf is a pure function of its own parameter values (and, for scalar
//! leaves, of abscissa arguments). The arena owns the parameters; the leaf
//! only describes their initial state and how to evaluate.

use std::fmt;

use crate::algebra::Jones;
use crate::parameters::ParameterSet;

/// A leaf whose value is a Jones matrix.
pub trait Complex2Leaf: fmt::Debug + Send + Sync {
    /// Name of the function type.
    fn name(&self) -> &'static str;

    /// Initial parameters (names, values, fit flags).
    fn parameters(&self) -> ParameterSet;

    /// Evaluate the value and, if requested, one gradient matrix per parameter.
    ///
    /// `params` and `grad` both have one entry per parameter.
    fn evaluate(&self, params: &[f64], grad: Option<&mut [Jones]>) -> Jones;
}

/// A leaf whose value is a real scalar function of abscissa arguments.
pub trait ScalarLeaf: fmt::Debug + Send + Sync {
    /// Name of the function type.
    fn name(&self) -> &'static str;

    /// Number of abscissa arguments.
    fn ndim(&self) -> usize;

    /// Initial parameters (names, values, fit flags).
    fn parameters(&self) -> ParameterSet;

    /// Evaluate at the given arguments; `args.len() == self.ndim()`.
    fn evaluate(&self, params: &[f64], args: &[f64], grad: Option<&mut [f64]>) -> f64;
}

/// A leaf of either value type.
#[derive(Debug)]
pub enum Leaf {
    /// Jones-valued leaf
    Complex2(Box<dyn Complex2Leaf>),
    /// Scalar-valued leaf
    Scalar(Box<dyn ScalarLeaf>),
}

impl Leaf {
    /// Name of the function type.
    pub fn name(&self) -> &'static str {
        match self {
            Leaf::Complex2(leaf) => leaf.name(),
            Leaf::Scalar(leaf) => leaf.name(),
        }
    }

    /// Initial parameters.
    pub fn parameters(&self) -> ParameterSet {
        match self {
            Leaf::Complex2(leaf) => leaf.parameters(),
            Leaf::Scalar(leaf) => leaf.parameters(),
        }
    }

    /// Number of abscissa arguments (zero for Jones-valued leaves).
    pub fn ndim(&self) -> usize {
        match self {
            Leaf::Complex2(_) => 0,
            Leaf::Scalar(leaf) => leaf.ndim(),
        }
    }
}
