//! Conversions between coherency matrices and Stokes parameters.
//!
//! The Pauli basis used throughout the crate is
//!
//! ```text
//! sigma_0 = [1 0; 0 1]   sigma_1 = [1 0; 0 -1]
//! sigma_2 = [0 1; 1 0]   sigma_3 = [0 -i; i 0]
//! ```
//!
//! so that `rho = (1/2) sum_k S_k sigma_k` and `S_k = trace(sigma_k rho)`.

use num_complex::Complex64;

use super::jones::{herm, jones, real, Jones};
use super::stokes::Stokes;

const I: Complex64 = Complex64::new(0.0, 1.0);

/// The Pauli matrix `sigma_k` for `k` in `0..4`.
///
/// # Panics
///
/// Panics if `k > 3`.
pub fn sigma(k: usize) -> Jones {
    let zero = real(0.0);
    let one = real(1.0);
    match k {
        0 => jones(one, zero, zero, one),
        1 => jones(one, zero, zero, -one),
        2 => jones(zero, one, one, zero),
        3 => jones(zero, -I, I, zero),
        _ => panic!("Pauli matrix index {} out of range", k),
    }
}

/// Coherency matrix of a real Stokes vector.
pub fn coherency(stokes: &Stokes<f64>) -> Jones {
    convert(&stokes.map(|s| real(*s)))
}

/// Matrix `(1/2) sum_k S_k sigma_k` of complex Stokes parameters.
pub fn convert(stokes: &Stokes<Complex64>) -> Jones {
    let [s0, s1, s2, s3] = *stokes.as_array();
    jones(
        (s0 + s1) * 0.5,
        (s2 - I * s3) * 0.5,
        (s2 + I * s3) * 0.5,
        (s0 - s1) * 0.5,
    )
}

/// Complex Stokes parameters `trace(sigma_k J)` of an arbitrary matrix.
pub fn complex_stokes(j: &Jones) -> Stokes<Complex64> {
    Stokes::new(
        j[(0, 0)] + j[(1, 1)],
        j[(0, 0)] - j[(1, 1)],
        j[(0, 1)] + j[(1, 0)],
        I * (j[(0, 1)] - j[(1, 0)]),
    )
}

/// Stokes parameters of a coherency matrix (real parts of [`complex_stokes`]).
pub fn stokes(j: &Jones) -> Stokes<f64> {
    complex_stokes(j).map(|s| s.re)
}

/// Stokes parameters after the congruence transformation `J rho J^H`.
pub fn transform(input: &Stokes<f64>, j: &Jones) -> Stokes<f64> {
    stokes(&(j * coherency(input) * herm(j)))
}

/// Hermitian matrix `s0 I + v . sigma`.
pub fn hermitian(s0: f64, v: [f64; 3]) -> Jones {
    coherency(&Stokes::new(s0, v[0], v[1], v[2])).map(|z| z * 2.0)
}

/// Matrix `s0 I + i v . sigma`; unitary when `s0^2 + |v|^2 = 1`.
pub fn unitary(s0: f64, v: [f64; 3]) -> Jones {
    let mut result = sigma(0).map(|z| z * s0);
    for (k, component) in v.iter().enumerate() {
        result += sigma(k + 1).map(|z| z * I * *component);
    }
    result
}
