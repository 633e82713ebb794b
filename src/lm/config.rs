//! Configuration options for the Levenberg-Marquardt solver.
//!
//! This module defines the convergence thresholds, iteration budget and
//! damping schedule of the solver. A configuration can be built in code,
//! read from JSON, or set property by property through its [`Interface`].

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interface::{parse_value, Configurable, Interface};

/// Configuration options for the Levenberg-Marquardt solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum number of iterations. Default: 50
    pub maximum_iterations: usize,

    /// Absolute chi-squared below which the fit has converged; 0 relies on
    /// the damping heuristics instead. Default: 0
    pub convergence_chisq: f64,

    /// Largest relative parameter change accepted by
    /// [`parameter_change_condition`](super::convergence::parameter_change_condition). Default: 0.01
    pub convergence_delta: f64,

    /// Largest acceptable reduced chi-squared; 0 accepts any. Default: 0
    pub maximum_reduced_chisq: f64,

    /// Trace every iteration at debug level. Default: false
    pub debug: bool,

    /// Largest pivot treated as zero by the Gauss-Jordan solve. Default: 0
    pub singular_threshold: f64,

    /// Initial value of the damping parameter. Default: 1e-5
    pub initial_lamda: f64,

    /// Factor applied to the damping parameter after a rejected step. Default: 10
    pub lamda_increase_factor: f64,

    /// Factor applied to the damping parameter after an accepted step. Default: 0.5
    pub lamda_decrease_factor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            maximum_iterations: 50,
            convergence_chisq: 0.0,
            convergence_delta: 0.01,
            maximum_reduced_chisq: 0.0,
            debug: false,
            singular_threshold: 0.0,
            initial_lamda: 1e-5,
            lamda_increase_factor: 10.0,
            lamda_decrease_factor: 0.5,
        }
    }
}

impl SolverConfig {
    /// Set the maximum number of iterations.
    pub fn with_maximum_iterations(mut self, maximum_iterations: usize) -> Self {
        self.maximum_iterations = maximum_iterations;
        self
    }

    /// Set the absolute chi-squared convergence threshold.
    pub fn with_convergence_chisq(mut self, convergence_chisq: f64) -> Self {
        self.convergence_chisq = convergence_chisq;
        self
    }

    /// Set the relative parameter change threshold.
    pub fn with_convergence_delta(mut self, convergence_delta: f64) -> Self {
        self.convergence_delta = convergence_delta;
        self
    }

    /// Set the largest acceptable reduced chi-squared.
    pub fn with_maximum_reduced_chisq(mut self, maximum_reduced_chisq: f64) -> Self {
        self.maximum_reduced_chisq = maximum_reduced_chisq;
        self
    }

    /// Enable iteration tracing.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the singular pivot threshold.
    pub fn with_singular_threshold(mut self, singular_threshold: f64) -> Self {
        self.singular_threshold = singular_threshold;
        self
    }

    /// Set the initial damping parameter.
    pub fn with_initial_lamda(mut self, lamda: f64) -> Self {
        self.initial_lamda = lamda;
        self
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Configurable for SolverConfig {
    fn interface() -> Interface<Self> {
        Interface::<SolverConfig>::new()
            .add(
                "maximum_iterations",
                "maximum number of iterations",
                |c| c.maximum_iterations.to_string(),
                |c, v| {
                    c.maximum_iterations = parse_value("maximum_iterations", v)?;
                    Ok(())
                },
            )
            .add(
                "convergence_chisq",
                "absolute chi-squared convergence threshold (0 = heuristics)",
                |c| c.convergence_chisq.to_string(),
                |c, v| {
                    c.convergence_chisq = parse_value("convergence_chisq", v)?;
                    Ok(())
                },
            )
            .add(
                "convergence_delta",
                "relative parameter change threshold",
                |c| c.convergence_delta.to_string(),
                |c, v| {
                    c.convergence_delta = parse_value("convergence_delta", v)?;
                    Ok(())
                },
            )
            .add(
                "maximum_reduced_chisq",
                "largest acceptable reduced chi-squared (0 = any)",
                |c| c.maximum_reduced_chisq.to_string(),
                |c, v| {
                    c.maximum_reduced_chisq = parse_value("maximum_reduced_chisq", v)?;
                    Ok(())
                },
            )
            .add(
                "debug",
                "trace every iteration",
                |c| c.debug.to_string(),
                |c, v| {
                    c.debug = parse_value("debug", v)?;
                    Ok(())
                },
            )
            .add(
                "singular_threshold",
                "largest pivot treated as zero",
                |c| c.singular_threshold.to_string(),
                |c, v| {
                    c.singular_threshold = parse_value("singular_threshold", v)?;
                    Ok(())
                },
            )
    }
}
