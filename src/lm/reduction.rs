//! Reduction of function values to the real numbers accumulated by the solver.

use crate::algebra::jones::{trace, trace_product, Jones};
use crate::function::Element;

/// Maps products of function values onto real curvature and gradient terms.
pub trait RealReduction {
    /// Value type being reduced.
    type Element: Element;

    /// Real part of a value as seen by the normal equations.
    fn to_real(&self, value: &Self::Element) -> f64;

    /// `to_real(a * b)`.
    fn reduce_product(&self, a: &Self::Element, b: &Self::Element) -> f64;
}

/// Reduction of Jones matrices: `2 Re(trace(J))`.
///
/// With the Pauli convention `rho = (1/2) sum S_k sigma_k`, twice the real
/// trace of `W(a) b` is the weighted inner product of the complex Stokes
/// parameters of `a` and `b`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JonesReduction;

impl JonesReduction {
    /// Factor applied to the real trace.
    pub const TRACE_FACTOR: f64 = 2.0;
}

impl RealReduction for JonesReduction {
    type Element = Jones;

    fn to_real(&self, value: &Jones) -> f64 {
        Self::TRACE_FACTOR * trace(value).re
    }

    fn reduce_product(&self, a: &Jones, b: &Jones) -> f64 {
        Self::TRACE_FACTOR * trace_product(a, b).re
    }
}

/// Identity reduction of real scalars.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarReduction;

impl RealReduction for ScalarReduction {
    type Element = f64;

    fn to_real(&self, value: &f64) -> f64 {
        *value
    }

    fn reduce_product(&self, a: &f64, b: &f64) -> f64 {
        a * b
    }
}
