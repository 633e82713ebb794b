//! # Uncertainty and weighting
//!
//! This module provides the weighting policies used to build the generalized
//! chi-squared of a fit, and helpers for reading the fitted covariance:
//!
//! - [`WeightingScheme`]: weighted norm and weighted conjugate of a residual
//! - [`ObservationUncertainty`]: per-Stokes complex inverse-variance weights
//!   of an observed coherency matrix
//! - [`InverseVariance`]: the weight of a scalar observation
//! - correlation and first-order propagation of covariance

mod covariance;
mod observation;

pub use covariance::{calculate_correlation, propagate};
pub use observation::ObservationUncertainty;

use crate::error::{JonesFitError, Result};

/// Weights applied to the residuals of one observation.
///
/// For a residual `d` and gradient `g` of the model, the curvature and
/// gradient contributions are `reduce(W(g) * g')` and `reduce(W(g) * d)`,
/// where `W` is [`WeightingScheme::weighted_conjugate`]; the chi-squared
/// contribution is [`WeightingScheme::weighted_norm`].
pub trait WeightingScheme<E> {
    /// Weighted squared norm of a residual.
    ///
    /// # Errors
    ///
    /// * `JonesFitError::InvalidState` if the norm is not finite
    fn weighted_norm(&self, residual: &E) -> Result<f64>;

    /// The weighted conjugate `W(x)` of a model gradient.
    fn weighted_conjugate(&self, gradient: &E) -> E;
}

/// Inverse-variance weight of a scalar observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseVariance {
    inv_variance: f64,
}

impl InverseVariance {
    /// The weight of an observation with the given variance.
    pub fn new(variance: f64) -> Result<Self> {
        let inv_variance = 1.0 / variance;
        if !inv_variance.is_finite() || inv_variance < 0.0 {
            return Err(JonesFitError::InvalidState(format!(
                "InverseVariance::new invalid variance={}",
                variance
            )));
        }
        Ok(Self { inv_variance })
    }

    /// The variance.
    pub fn variance(&self) -> f64 {
        1.0 / self.inv_variance
    }
}

impl WeightingScheme<f64> for InverseVariance {
    fn weighted_norm(&self, residual: &f64) -> Result<f64> {
        let norm = residual * residual * self.inv_variance;
        if !norm.is_finite() {
            return Err(JonesFitError::InvalidState(format!(
                "InverseVariance::weighted_norm non-finite norm={} residual={}",
                norm, residual
            )));
        }
        Ok(norm)
    }

    fn weighted_conjugate(&self, gradient: &f64) -> f64 {
        gradient * self.inv_variance
    }
}
