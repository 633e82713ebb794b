//! Parameter definition and implementation
//!
//! This module provides the Parameter struct, the fundamental building block
//! of every parameterized function. A parameter carries a value, a variance
//! (set after fitting), and a flag that says whether the fit may vary it.

use crate::algebra::Estimate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Parameter '{name}' given non-finite value {value}")]
    NonFiniteValue { name: String, value: f64 },

    #[error("Parameter '{name}' given invalid variance {variance}")]
    InvalidVariance { name: String, variance: f64 },

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Parameter index {index} out of range (nparam={nparam})")]
    IndexOutOfRange { index: usize, nparam: usize },
}

/// A named scalar parameter of a function
///
/// The positional index of a parameter within its owning function is stable
/// for the lifetime of the function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Name of the parameter
    name: String,

    /// Current value of the parameter
    value: f64,

    /// Variance of the parameter (set after fitting)
    variance: f64,

    /// Whether this parameter is varied during the fit
    infit: bool,

    /// Free-form description used by reports
    #[serde(default)]
    description: String,
}

impl Parameter {
    /// Create a new free parameter with the given name and value
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the parameter
    /// * `value` - Initial value of the parameter
    ///
    /// # Examples
    ///
    /// ```
    /// use jonesfit::parameters::Parameter;
    ///
    /// let param = Parameter::new("gain", 1.0);
    /// assert_eq!(param.name(), "gain");
    /// assert_eq!(param.value(), 1.0);
    /// assert!(param.infit());
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            variance: 0.0,
            infit: true,
            description: String::new(),
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Create the parameter held fixed during the fit
    pub fn fixed(mut self) -> Self {
        self.infit = false;
        self
    }

    /// Get the current value of the parameter
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value of the parameter
    ///
    /// # Arguments
    ///
    /// * `value` - The new value for the parameter
    ///
    /// # Returns
    ///
    /// `Ok(())` if the value was set, or an error if it is not finite
    pub fn set_value(&mut self, value: f64) -> Result<(), ParameterError> {
        if !value.is_finite() {
            return Err(ParameterError::NonFiniteValue {
                name: self.name.clone(),
                value,
            });
        }
        self.value = value;
        Ok(())
    }

    /// Get the variance of the parameter
    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Set the variance of the parameter
    ///
    /// # Returns
    ///
    /// `Ok(())` if the variance was set, or an error if it is negative or not finite
    pub fn set_variance(&mut self, variance: f64) -> Result<(), ParameterError> {
        if !variance.is_finite() || variance < 0.0 {
            return Err(ParameterError::InvalidVariance {
                name: self.name.clone(),
                variance,
            });
        }
        self.variance = variance;
        Ok(())
    }

    /// The value and variance as an estimate
    pub fn estimate(&self) -> Estimate<f64> {
        Estimate::new(self.value, self.variance)
    }

    /// Get the name of the parameter
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the name of the parameter
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Check if the parameter is varied during the fit
    pub fn infit(&self) -> bool {
        self.infit
    }

    /// Set whether the parameter is varied during the fit
    pub fn set_infit(&mut self, infit: bool) {
        self.infit = infit;
    }

    /// Get the description of the parameter
    pub fn description(&self) -> &str {
        &self.description
    }
}
