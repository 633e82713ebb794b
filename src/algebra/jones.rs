//! Jones matrices and elementary operations on them.

use nalgebra::Matrix2;
use num_complex::Complex64;

/// A 2x2 complex matrix.
///
/// Used both for signal-path transformations and for coherency matrices.
pub type Jones = Matrix2<Complex64>;

/// Real scalar as a complex number.
#[inline]
pub fn real(value: f64) -> Complex64 {
    Complex64::new(value, 0.0)
}

/// Build a Jones matrix from its four elements in row-major order.
#[inline]
pub fn jones(j00: Complex64, j01: Complex64, j10: Complex64, j11: Complex64) -> Jones {
    Jones::new(j00, j01, j10, j11)
}

/// The identity matrix.
#[inline]
pub fn identity() -> Jones {
    Jones::identity()
}

/// The zero matrix.
#[inline]
pub fn zero() -> Jones {
    Jones::zeros()
}

/// Hermitian transpose.
#[inline]
pub fn herm(j: &Jones) -> Jones {
    j.adjoint()
}

/// Determinant.
#[inline]
pub fn det(j: &Jones) -> Complex64 {
    j[(0, 0)] * j[(1, 1)] - j[(0, 1)] * j[(1, 0)]
}

/// Trace.
#[inline]
pub fn trace(j: &Jones) -> Complex64 {
    j[(0, 0)] + j[(1, 1)]
}

/// Trace of the product `a * b`, without forming the product.
#[inline]
pub fn trace_product(a: &Jones, b: &Jones) -> Complex64 {
    a[(0, 0)] * b[(0, 0)] + a[(0, 1)] * b[(1, 0)] + a[(1, 0)] * b[(0, 1)] + a[(1, 1)] * b[(1, 1)]
}

/// Sum of the squared moduli of the four elements.
#[inline]
pub fn norm(j: &Jones) -> f64 {
    j.iter().map(|z| z.norm_sqr()).sum()
}

/// Multiply every element by a real factor.
#[inline]
pub fn scale(j: &Jones, factor: f64) -> Jones {
    j.map(|z| z * factor)
}

/// True when every element is finite.
#[inline]
pub fn is_finite(j: &Jones) -> bool {
    j.iter().all(|z| z.re.is_finite() && z.im.is_finite())
}

/// Inverse of a 2x2 matrix, or `None` when the determinant vanishes.
pub fn inv(j: &Jones) -> Option<Jones> {
    let d = det(j);
    if d.norm_sqr() == 0.0 {
        return None;
    }
    Some(Jones::new(j[(1, 1)], -j[(0, 1)], -j[(1, 0)], j[(0, 0)]).map(|z| z / d))
}
