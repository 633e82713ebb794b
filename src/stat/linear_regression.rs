//! Least-squares fit of a straight line.
//!
//! Fits `y = scale * (x - x0) + offset * a` where `a` is a per-point basis
//! coefficient (1 for ordinary and weighted least squares) and `x0` is
//! either zero or the weighted mean abscissa. Subtracting the weighted mean
//! abscissa removes the covariance between scale and offset.
//!
//! With an outlier threshold, points whose normalized residual lies beyond
//! the quartiles by more than `threshold * IQR` are masked and the fit is
//! repeated until no more points are removed.

use crate::algebra::Estimate;
use crate::error::{JonesFitError, Result};

use super::quartiles;

/// Settings of a straight-line fit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearRegression {
    /// If non-zero, iteratively mask points beyond the quartiles +/- threshold * IQR
    pub iterative_outlier_threshold: f64,
    /// If true, the weighted mean abscissa is subtracted from x
    pub subtract_weighted_mean_abscissa: bool,
}

/// Result of a straight-line fit.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    /// Best-fit slope and its formal variance
    pub scale: Estimate<f64>,
    /// Best-fit offset and its formal variance
    pub offset: Estimate<f64>,
    /// Covariance between scale and offset
    pub covariance: f64,
    /// The weighted mean abscissa
    pub weighted_mean_abscissa: f64,
    /// Chi-squared of the fit
    pub chisq: f64,
    /// Degrees of freedom: unmasked points minus two
    pub nfree: usize,
    /// The input weights with outliers set to zero
    pub masked_weights: Vec<f64>,
}

impl LinearRegression {
    /// Default settings: no outlier rejection, no abscissa offset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable iterative outlier rejection.
    pub fn with_outlier_threshold(mut self, threshold: f64) -> Self {
        self.iterative_outlier_threshold = threshold;
        self
    }

    /// Subtract the weighted mean abscissa.
    pub fn with_subtract_weighted_mean_abscissa(mut self, subtract: bool) -> Self {
        self.subtract_weighted_mean_abscissa = subtract;
        self
    }

    /// Ordinary least squares; points with a false `mask` entry are ignored.
    pub fn ordinary_least_squares(&self, y: &[f64], x: &[f64], mask: Option<&[bool]>) -> Result<LinearFit> {
        let weight: Vec<f64> = match mask {
            Some(mask) => {
                check_len("mask", mask.len(), y.len())?;
                mask.iter().map(|&m| if m { 1.0 } else { 0.0 }).collect()
            }
            None => vec![1.0; y.len()],
        };
        self.generalized_least_squares(y, x, &weight, &vec![1.0; y.len()])
    }

    /// Weighted least squares; weights are typically inverse variances.
    pub fn weighted_least_squares(&self, y: &[f64], x: &[f64], weight: &[f64]) -> Result<LinearFit> {
        self.generalized_least_squares(y, x, weight, &vec![1.0; y.len()])
    }

    /// Generalized least squares with per-point offset basis coefficients `alpha`.
    ///
    /// `alpha[i]` is the projection of the all-ones vector onto basis vector
    /// `i`, so that data already projected onto an eigenbasis can be fit.
    ///
    /// # Errors
    ///
    /// * `JonesFitError::DimensionMismatch` if the inputs differ in length
    /// * `JonesFitError::InvalidState` if the fit is degenerate (non-finite result)
    pub fn generalized_least_squares(&self, y: &[f64], x: &[f64], weight: &[f64], alpha: &[f64]) -> Result<LinearFit> {
        check_len("x", x.len(), y.len())?;
        check_len("weight", weight.len(), y.len())?;
        check_len("alpha", alpha.len(), y.len())?;

        let mut masked = weight.to_vec();
        loop {
            let (fit, residuals) = self.worker(y, x, &masked, alpha)?;

            if !(self.iterative_outlier_threshold > 0.0) {
                return Ok(LinearFit {
                    masked_weights: masked,
                    ..fit
                });
            }

            let values: Vec<f64> = residuals.iter().map(|&(_, r)| r).collect();
            let (q1, _, q3) = quartiles(&values)?;
            let iqr = q3 - q1;
            let min = q1 - self.iterative_outlier_threshold * iqr;
            let max = q3 + self.iterative_outlier_threshold * iqr;

            let mut done = true;
            for &(index, residual) in &residuals {
                if residual > max || residual < min {
                    masked[index] = 0.0;
                    done = false;
                }
            }

            if done {
                return Ok(LinearFit {
                    masked_weights: masked,
                    ..fit
                });
            }
            log::debug!(
                "LinearRegression: masked outliers beyond [{}, {}]; {} points remain",
                min,
                max,
                masked.iter().filter(|&&w| w != 0.0).count()
            );
        }
    }

    // returns the fit and the normalized residual of every unmasked point
    fn worker(&self, y: &[f64], x: &[f64], weight: &[f64], alpha: &[f64]) -> Result<(LinearFit, Vec<(usize, f64)>)> {
        let used = || (0..y.len()).filter(|&i| weight[i] != 0.0);

        let mut x_offset = 0.0;
        if self.subtract_weighted_mean_abscissa {
            let (ax, a2) = used().fold((0.0, 0.0), |(ax, a2), i| {
                (ax + alpha[i] * x[i] * weight[i], a2 + alpha[i] * alpha[i] * weight[i])
            });
            x_offset = ax / a2;
        }

        let mut alpha_x = 0.0;
        let mut alpha_y = 0.0;
        let mut alpha_2 = 0.0;
        let mut x_y = 0.0;
        let mut x_2 = 0.0;
        let mut count = 0;

        for i in used() {
            let xi = x[i] - x_offset;
            count += 1;
            x_y += y[i] * xi * weight[i];
            x_2 += xi * xi * weight[i];
            alpha_x += alpha[i] * xi * weight[i];
            alpha_y += alpha[i] * y[i] * weight[i];
            alpha_2 += alpha[i] * alpha[i] * weight[i];
        }

        let bar_x = alpha_x / alpha_2;
        let bar_y = alpha_y / alpha_2;

        let scale_var = 1.0 / (x_2 - bar_x * alpha_x);
        let scale = Estimate::new((x_y - bar_y * alpha_x) * scale_var, scale_var);
        let offset = Estimate::new(
            bar_y - scale.val * bar_x,
            (x_2 / alpha_2 + x_offset * x_offset) * scale_var,
        );

        for (name, value) in [
            ("scale", scale.val),
            ("scale variance", scale.var),
            ("offset", offset.val),
            ("offset variance", offset.var),
        ] {
            if !value.is_finite() {
                return Err(JonesFitError::InvalidState(format!(
                    "LinearRegression: non-finite {}={} count={} alpha_2={}",
                    name, value, count, alpha_2
                )));
            }
        }

        let mut chisq = 0.0;
        let mut residuals = Vec::with_capacity(count);
        for i in used() {
            let xi = x[i] - x_offset;
            let diff = y[i] - scale.val * xi - offset.val * alpha[i];
            chisq += diff * diff * weight[i];
            residuals.push((i, diff * weight[i].sqrt()));
        }

        let fit = LinearFit {
            scale,
            offset,
            covariance: -bar_x * scale_var,
            weighted_mean_abscissa: if self.subtract_weighted_mean_abscissa { x_offset } else { bar_x },
            chisq,
            nfree: count.saturating_sub(2),
            masked_weights: Vec::new(),
        };
        Ok((fit, residuals))
    }
}

fn check_len(name: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(JonesFitError::DimensionMismatch(format!(
            "LinearRegression: {} has {} elements, y has {}",
            name, len, expected
        )));
    }
    Ok(())
}
