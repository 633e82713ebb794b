//! # Covariance Matrix Calculations
//!
//! Helpers for reading fitted covariance matrices: correlation coefficients
//! and first-order propagation onto derived quantities.

use ndarray::{Array1, Array2};

use crate::error::{JonesFitError, Result};

/// Calculate correlation matrix from covariance matrix.
///
/// The correlation matrix is calculated as:
///   correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])
///
/// Rows of parameters with zero variance (fixed parameters) are zero,
/// apart from the unit diagonal.
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    let mut correl = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..n {
            if i == j {
                correl[[i, j]] = 1.0;
            } else {
                let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
                if denom > 0.0 {
                    correl[[i, j]] = covar[[i, j]] / denom;
                }
            }
        }
    }

    correl
}

/// First-order propagation of a covariance onto a derived quantity.
///
/// Given the gradient `g` of the derived quantity with respect to every
/// parameter, returns the covariance row `C g` (the covariance of the
/// derived quantity with each parameter) and the variance `g^T C g`.
pub fn propagate(gradient: &Array1<f64>, covar: &Array2<f64>) -> Result<(Array1<f64>, f64)> {
    if covar.nrows() != gradient.len() || covar.ncols() != gradient.len() {
        return Err(JonesFitError::DimensionMismatch(format!(
            "gradient of length {} with {}x{} covariance",
            gradient.len(),
            covar.nrows(),
            covar.ncols()
        )));
    }
    let row = covar.t().dot(gradient);
    let variance = gradient.dot(&row);
    Ok((row, variance))
}
