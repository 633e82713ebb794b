//! Small statistics helpers used alongside the solver.

pub mod linear_regression;

pub use linear_regression::{LinearFit, LinearRegression};

use crate::error::{JonesFitError, Result};

/// First, second and third quartiles of `data` (nearest-rank, no interpolation).
///
/// # Errors
///
/// * `JonesFitError::InvalidState` if `data` is empty or contains NaN
pub fn quartiles(data: &[f64]) -> Result<(f64, f64, f64)> {
    if data.is_empty() {
        return Err(JonesFitError::InvalidState("quartiles: empty data".to_string()));
    }
    if data.iter().any(|x| x.is_nan()) {
        return Err(JonesFitError::InvalidState("quartiles: NaN in data".to_string()));
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    Ok((sorted[n / 4], sorted[n / 2], sorted[(3 * n) / 4]))
}
