//! A measured value with its variance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value and its variance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Estimate<T> {
    /// Best estimate of the value
    pub val: T,
    /// Variance of the value
    pub var: T,
}

impl<T> Estimate<T> {
    /// Create an estimate from a value and its variance.
    pub fn new(val: T, var: T) -> Self {
        Self { val, var }
    }
}

impl Estimate<f64> {
    /// One-sigma uncertainty, the square root of the variance.
    pub fn error(&self) -> f64 {
        self.var.sqrt()
    }
}

impl fmt::Display for Estimate<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} +/- {})", self.val, self.error())
    }
}
