//! Convergence criteria for the Levenberg-Marquardt solver.
//!
//! The default criterion watches the chi-squared and the damping parameter.
//! Once a step improves the fit by less than a few units of chi-squared,
//! damping is switched off to take a full Newton step; a full step that
//! changes chi-squared by less than one unit is convergence. When a full
//! step makes the fit worse, damping is restored and the attempt counted.
//! After repeated failures, late slow progress exhausts a patience counter.

use super::solver::{ConvergenceCondition, IterationState};

/// Possible termination states of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FitStatus {
    /// The solver is still iterating.
    Running,

    /// Chi-squared fell below the absolute threshold.
    ConvergedChisq,

    /// An undamped step changed chi-squared by less than one unit.
    Converged,

    /// Progress stalled after repeated failed undamped steps.
    ConvergedPatience,

    /// The iteration budget was spent.
    MaxIterationsReached,

    /// The curvature matrix was singular.
    Singular,
}

impl FitStatus {
    /// Returns true if the fit has terminated (either converged or failed).
    pub fn is_terminated(&self) -> bool {
        !matches!(self, FitStatus::Running)
    }

    /// Returns true if the fit has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            FitStatus::ConvergedChisq | FitStatus::Converged | FitStatus::ConvergedPatience
        )
    }

    /// Returns a description of the status.
    pub fn description(&self) -> String {
        match self {
            FitStatus::Running => "Fit is still running".to_string(),
            FitStatus::ConvergedChisq => "Converged: chi-squared below threshold".to_string(),
            FitStatus::Converged => "Converged: small chi-squared change".to_string(),
            FitStatus::ConvergedPatience => "Converged: patience exhausted".to_string(),
            FitStatus::MaxIterationsReached => "Terminated: maximum iterations reached".to_string(),
            FitStatus::Singular => "Terminated: singular curvature matrix".to_string(),
        }
    }
}

/// Damping-aware chi-squared convergence heuristic.
#[derive(Debug, Clone)]
pub struct DampingHeuristic {
    convergence_chisq: f64,
    maximum_iterations: usize,
    best_chisq: f64,
    last_lamda: f64,
    stick: usize,
    patience: usize,
}

impl DampingHeuristic {
    /// Failed undamped steps before patience starts to run down.
    pub const STICK_LIMIT: usize = 5;

    /// Slow late iterations tolerated once stuck.
    pub const PATIENCE: usize = 5;

    /// Chi-squared change below which an improvement counts as small.
    pub const SMALL_IMPROVEMENT: f64 = 10.0;

    /// Relative chi-squared change below which a late iteration counts as slow.
    pub const SLOW_PROGRESS: f64 = 1e-3;

    /// A heuristic for a fit with the given thresholds.
    pub fn new(convergence_chisq: f64, maximum_iterations: usize) -> Self {
        Self {
            convergence_chisq,
            maximum_iterations,
            best_chisq: f64::INFINITY,
            last_lamda: 0.0,
            stick: 0,
            patience: Self::PATIENCE,
        }
    }

    /// Start from the chi-squared of the initial parameters.
    pub fn with_initial_chisq(mut self, chisq: f64) -> Self {
        self.best_chisq = chisq;
        self
    }

    /// Lowest chi-squared seen so far.
    pub fn best_chisq(&self) -> f64 {
        self.best_chisq
    }

    /// Number of undamped steps that made the fit worse.
    pub fn stick(&self) -> usize {
        self.stick
    }

    /// Examine the result of one iteration, possibly adjusting `lamda`.
    ///
    /// `iteration` counts from zero; the patience counter only runs down in
    /// the second half of the iteration budget.
    ///
    /// `conditions` is asked whether the user-supplied criteria accept the
    /// best chi-squared; the heuristic only declares convergence when they do.
    pub fn update<F: FnOnce(f64) -> bool>(
        &mut self,
        iteration: usize,
        chisq: f64,
        lamda: &mut f64,
        conditions: F,
    ) -> Option<FitStatus> {
        if self.convergence_chisq > 0.0 {
            return if chisq < self.convergence_chisq {
                Some(FitStatus::ConvergedChisq)
            } else {
                None
            };
        }

        let delta = chisq - self.best_chisq;
        if chisq < self.best_chisq {
            self.best_chisq = chisq;
        }

        if !conditions(self.best_chisq) {
            return None;
        }

        if *lamda == 0.0 && delta.abs() < 1.0 && delta <= 0.0 {
            return Some(FitStatus::Converged);
        }

        if *lamda == 0.0 && delta > 0.0 {
            // the undamped step failed
            *lamda = self.last_lamda;
            self.stick += 1;
            log::trace!("DampingHeuristic: restore lamda={} stick={}", self.last_lamda, self.stick);
        }

        if delta <= 0.0 && delta.abs() < Self::SMALL_IMPROVEMENT {
            if self.stick >= Self::STICK_LIMIT {
                if iteration >= self.maximum_iterations / 2
                    && delta.abs() / self.best_chisq < Self::SLOW_PROGRESS
                {
                    self.patience = self.patience.saturating_sub(1);
                    if self.patience == 0 {
                        return Some(FitStatus::ConvergedPatience);
                    }
                }
            } else {
                if *lamda != 0.0 {
                    self.last_lamda = *lamda;
                }
                *lamda = 0.0;
            }
        }

        None
    }
}

/// A convergence condition requiring the largest relative change of the
/// last step's free parameters to fall below `convergence_delta`.
pub fn parameter_change_condition(convergence_delta: f64) -> ConvergenceCondition {
    Box::new(move |state: &IterationState| state.parameter_change < convergence_delta)
}
