//! Weights of an observed coherency matrix.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::algebra::jones::Jones;
use crate::algebra::pauli::{complex_stokes, convert};
use crate::algebra::Stokes;
use crate::error::{JonesFitError, Result};

use super::WeightingScheme;

/// Inverse variances of the four Stokes parameters of an observation.
///
/// Residuals are general complex matrices, so each complex Stokes
/// parameter carries separate weights for its real and imaginary parts.
/// Setting a real variance assigns the same weight to both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationUncertainty {
    inv_variance: Stokes<Complex64>,
}

impl Default for ObservationUncertainty {
    fn default() -> Self {
        Self {
            inv_variance: Stokes::from_array([Complex64::new(1.0, 1.0); 4]),
        }
    }
}

fn invert(variance: f64) -> f64 {
    1.0 / variance
}

impl ObservationUncertainty {
    /// Unit weights.
    pub fn new() -> Self {
        Self::default()
    }

    /// Weights from the variances of the Stokes parameters.
    pub fn from_variance(variance: &Stokes<f64>) -> Result<Self> {
        let mut uncertainty = Self::default();
        uncertainty.set_variance(variance)?;
        Ok(uncertainty)
    }

    /// Set the weights from the variances of the Stokes parameters.
    ///
    /// # Errors
    ///
    /// * `JonesFitError::InvalidState` if a variance is not positive or its
    ///   inverse is not finite
    pub fn set_variance(&mut self, variance: &Stokes<f64>) -> Result<()> {
        self.set_complex_variance(&variance.map(|v| Complex64::new(*v, *v)))
    }

    /// Set separate real and imaginary weights from complex variances.
    pub fn set_complex_variance(&mut self, variance: &Stokes<Complex64>) -> Result<()> {
        if variance.iter().any(|v| !(v.re > 0.0) || !(v.im > 0.0)) {
            return Err(JonesFitError::InvalidState(format!(
                "ObservationUncertainty::set_variance non-positive variance={:?}",
                variance.as_array()
            )));
        }
        let inv = variance.map(|v| Complex64::new(invert(v.re), invert(v.im)));
        if inv.iter().any(|w| !w.re.is_finite() || !w.im.is_finite()) {
            return Err(JonesFitError::InvalidState(format!(
                "ObservationUncertainty::set_variance non-finite inverse variance={:?} variance={:?}",
                inv.as_array(),
                variance.as_array()
            )));
        }
        self.inv_variance = inv;
        Ok(())
    }

    /// The inverse variances.
    pub fn inverse_variance(&self) -> &Stokes<Complex64> {
        &self.inv_variance
    }

    /// The complex variances; a zero weight reports zero variance.
    pub fn complex_variance(&self) -> Stokes<Complex64> {
        let variance = |w: f64| if w == 0.0 { 0.0 } else { 1.0 / w };
        self.inv_variance
            .map(|w| Complex64::new(variance(w.re), variance(w.im)))
    }

    /// The variances of the real parts.
    pub fn variance(&self) -> Stokes<f64> {
        self.complex_variance().map(|v| v.re)
    }

    /// Complex Stokes parameters of `matrix` scaled by the square root of the weights.
    pub fn weighted_components(&self, matrix: &Jones) -> Stokes<Complex64> {
        let stokes = complex_stokes(matrix);
        let mut weighted = stokes;
        for k in 0..4 {
            let w = self.inv_variance[k];
            weighted[k] = Complex64::new(stokes[k].re * w.re.sqrt(), stokes[k].im * w.im.sqrt());
        }
        weighted
    }

    /// Combine with an independent uncertainty: variances add.
    pub fn add(&mut self, other: &ObservationUncertainty) -> Result<()> {
        let a = self.complex_variance();
        let b = other.complex_variance();
        let mut sum = a;
        for k in 0..4 {
            sum[k] = a[k] + b[k];
        }
        self.set_complex_variance(&sum)
    }
}

impl WeightingScheme<Jones> for ObservationUncertainty {
    fn weighted_norm(&self, residual: &Jones) -> Result<f64> {
        let stokes = complex_stokes(residual);
        let mut norm = 0.0;
        for k in 0..4 {
            let w = self.inv_variance[k];
            norm += stokes[k].re * stokes[k].re * w.re + stokes[k].im * stokes[k].im * w.im;
        }
        if !norm.is_finite() {
            return Err(JonesFitError::InvalidState(format!(
                "ObservationUncertainty::weighted_norm non-finite norm={} residual stokes={:?}",
                norm,
                stokes.as_array()
            )));
        }
        Ok(norm)
    }

    fn weighted_conjugate(&self, gradient: &Jones) -> Jones {
        let stokes = complex_stokes(gradient);
        let mut weighted = stokes;
        for k in 0..4 {
            let w = self.inv_variance[k];
            weighted[k] = Complex64::new(w.re * stokes[k].re, -w.im * stokes[k].im);
        }
        convert(&weighted)
    }
}
