//! The solver driver: iterate, decide convergence, and report the fit.

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{JonesFitError, Result, ResultExt};
use crate::problem::Problem;

use super::config::SolverConfig;
use super::convergence::{DampingHeuristic, FitStatus};
use super::eigen::{eigenanalysis, Eigenanalysis};
use super::engine::LevenbergMarquardt;
use super::reduction::RealReduction;

/// State of the solver after one iteration, passed to convergence conditions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationState {
    /// Iterations completed
    pub iteration: usize,
    /// Chi-squared of the last trial step
    pub chisq: f64,
    /// Lowest chi-squared so far
    pub best_chisq: f64,
    /// Damping parameter
    pub lamda: f64,
    /// Largest relative change of a free parameter in the last step
    pub parameter_change: f64,
}

/// A user-supplied condition that must hold before the fit may converge.
pub type ConvergenceCondition = Box<dyn Fn(&IterationState) -> bool + Send + Sync>;

/// Summary of a finished fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Termination status
    pub status: FitStatus,
    /// True when the fit converged and passed the reduced chi-squared check
    pub solved: bool,
    /// True when the curvature matrix was singular
    pub singular: bool,
    /// Iterations performed
    pub iterations: usize,
    /// Best chi-squared
    pub chisq: f64,
    /// Degrees of freedom
    pub nfree: usize,
    /// Natural log of the curvature determinant
    pub log_det_curvature: f64,
    /// Natural log of the chi-squared Hessian determinant
    pub log_det_hessian: f64,
    /// Natural log of the curvature condition number
    pub log_cond_curvature: f64,
    /// Fitted parameter names and values
    pub parameters: Vec<(String, f64)>,
}

impl FitSummary {
    /// Chi-squared per degree of freedom (infinite when there are none).
    pub fn reduced_chisq(&self) -> f64 {
        if self.nfree == 0 {
            f64::INFINITY
        } else {
            self.chisq / self.nfree as f64
        }
    }
}

impl fmt::Display for FitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit Summary:")?;
        writeln!(f, "  Status: {}", self.status.description())?;
        writeln!(f, "  Solved: {}", self.solved)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Chi-squared: {:.6e} (nfree={})", self.chisq, self.nfree)?;
        writeln!(f, "  log(det(curvature)): {:.6}", self.log_det_curvature)?;
        writeln!(f, "  log(det(Hessian)): {:.6}", self.log_det_hessian)?;
        writeln!(f, "  log(cond(curvature)): {:.6}", self.log_cond_curvature)?;
        writeln!(f, "  Parameters:")?;
        for (name, value) in &self.parameters {
            writeln!(f, "    {}: {:.6e}", name, value)?;
        }
        Ok(())
    }
}

/// Levenberg-Marquardt solver for [`Problem`]s.
///
/// # Example
///
/// ```
/// use jonesfit::algebra::Estimate;
/// use jonesfit::function::{scalar::Polynomial, Arena, Function};
/// use jonesfit::lm::{ScalarReduction, Solver, SolverConfig};
/// use jonesfit::problem::ScalarFit;
///
/// let mut arena = Arena::new();
/// let x = arena.axis("x");
/// let line = arena.add_scalar(Polynomial::new(2), &[x]).unwrap();
/// let mut fit = ScalarFit::new(arena, line, x).unwrap();
/// for i in 0..10 {
///     let x = i as f64;
///     fit.add_point(x, Estimate::new(3.0 + 0.5 * x, 0.01)).unwrap();
/// }
///
/// let mut solver = Solver::new(SolverConfig::default());
/// solver.solve(&mut fit, ScalarReduction).unwrap();
/// assert!(solver.solved());
/// assert!((fit.param(1).unwrap() - 0.5).abs() < 1e-8);
/// ```
pub struct Solver {
    config: SolverConfig,
    conditions: Vec<ConvergenceCondition>,
    status: FitStatus,
    iterations: usize,
    chisq: f64,
    nfree: usize,
    covariance: Array2<f64>,
    curvature: Array2<f64>,
    log_det_curvature: f64,
    log_det_hessian: f64,
    log_cond_curvature: f64,
    eigenanalysis: Option<Eigenanalysis>,
    singular: bool,
    solved: bool,
    parameters: Vec<(String, f64)>,
}

impl fmt::Debug for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("config", &self.config)
            .field("conditions", &self.conditions.len())
            .field("status", &self.status)
            .field("iterations", &self.iterations)
            .field("chisq", &self.chisq)
            .field("solved", &self.solved)
            .finish()
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl Solver {
    /// A solver with the given configuration.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            conditions: Vec::new(),
            status: FitStatus::Running,
            iterations: 0,
            chisq: 0.0,
            nfree: 0,
            covariance: Array2::zeros((0, 0)),
            curvature: Array2::zeros((0, 0)),
            log_det_curvature: 0.0,
            log_det_hessian: 0.0,
            log_cond_curvature: 0.0,
            eigenanalysis: None,
            singular: false,
            solved: false,
            parameters: Vec::new(),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut SolverConfig {
        &mut self.config
    }

    /// Add a condition that must hold before the fit may converge.
    pub fn add_convergence_condition(&mut self, condition: ConvergenceCondition) {
        self.conditions.push(condition);
    }

    fn reset(&mut self) {
        self.status = FitStatus::Running;
        self.iterations = 0;
        self.chisq = 0.0;
        self.nfree = 0;
        self.covariance = Array2::zeros((0, 0));
        self.curvature = Array2::zeros((0, 0));
        self.log_det_curvature = 0.0;
        self.log_det_hessian = 0.0;
        self.log_cond_curvature = 0.0;
        self.eigenanalysis = None;
        self.singular = false;
        self.solved = false;
        self.parameters.clear();
    }

    /// Fit `problem`, reducing its values with `reduction`.
    ///
    /// Running out of iterations is not an error: the solver returns with
    /// [`Solver::solved`] false and no covariance. A singular curvature
    /// matrix, or one whose inverse has a variance that is not positive, is
    /// reported as an error after [`Solver::singular`] is set. The
    /// eigenanalysis of the curvature is kept in either case.
    pub fn solve<R, P>(&mut self, problem: &mut P, reduction: R) -> Result<()>
    where
        R: RealReduction,
        P: Problem<Output = R::Element>,
    {
        self.reset();

        let mut engine = LevenbergMarquardt::new(reduction, &self.config);
        self.chisq = engine.init(problem).context("Solver::solve")?;
        let nparam_infit = engine.free_indices().len();

        let mut heuristic = DampingHeuristic::new(self.config.convergence_chisq, self.config.maximum_iterations)
            .with_initial_chisq(self.chisq);

        log::debug!(
            "Solver::solve nparam={} nparam_infit={} ndat={} chisq={}",
            problem.nparam(),
            nparam_infit,
            problem.ndat_constraint(),
            self.chisq
        );

        while self.iterations < self.config.maximum_iterations {
            let chisq = match engine.iter(problem) {
                Ok(chisq) => chisq,
                Err(err) => {
                    let err = err
                        .context(format!("iteration={}", self.iterations))
                        .context("Solver::solve");
                    if err.is_singular() {
                        self.singular = true;
                        self.status = FitStatus::Singular;
                        if let Err(cause) = self.analyse(&engine) {
                            log::warn!("Solver::solve eigenanalysis failed: {}", cause);
                        }
                    }
                    return Err(err);
                }
            };
            self.iterations += 1;
            self.chisq = engine.best_chisq();

            if self.config.debug {
                log::debug!(
                    "Solver::solve iteration={} chisq={} best={} lamda={} change={}",
                    self.iterations,
                    chisq,
                    engine.best_chisq(),
                    engine.lamda(),
                    engine.parameter_change()
                );
            }

            let state = IterationState {
                iteration: self.iterations,
                chisq,
                best_chisq: engine.best_chisq(),
                lamda: engine.lamda(),
                parameter_change: engine.parameter_change(),
            };
            let conditions = &self.conditions;
            let mut lamda = engine.lamda();
            let status = heuristic.update(self.iterations - 1, chisq, &mut lamda, |best_chisq| {
                let state = IterationState { best_chisq, ..state };
                conditions.iter().all(|condition| condition(&state))
            });
            engine.set_lamda(lamda);

            if let Some(status) = status {
                self.status = status;
                break;
            }
        }

        self.parameters = engine
            .free_indices()
            .iter()
            .zip(engine.names())
            .map(|(&index, name)| Ok((name.clone(), problem.param(index)?)))
            .collect::<Result<_>>()?;

        if self.iterations == self.config.maximum_iterations && !self.status.is_terminated() {
            self.status = FitStatus::MaxIterationsReached;
            log::warn!(
                "Solver::solve maximum iterations={} reached chisq={}",
                self.iterations,
                self.chisq
            );
            return Ok(());
        }

        if engine.curvature().nrows() != nparam_infit {
            return Err(JonesFitError::InvalidState(format!(
                "Solver::solve curvature has {} rows != nparam_infit={}",
                engine.curvature().nrows(),
                nparam_infit
            )));
        }
        self.analyse(&engine).context("Solver::solve")?;

        let matrices = match engine.result(problem) {
            Ok(matrices) => matrices,
            Err(err) => {
                let err = err.context("Solver::solve");
                if err.is_singular() {
                    self.singular = true;
                    self.status = FitStatus::Singular;
                }
                return Err(err);
            }
        };

        if matrices.covariance.nrows() != problem.nparam() {
            return Err(JonesFitError::InvalidState(format!(
                "Solver::solve covariance has {} rows != nparam={}",
                matrices.covariance.nrows(),
                problem.nparam()
            )));
        }

        if self.eigenanalysis.as_ref().map_or(false, |a| a.ndim_nullspace == 0) {
            self.log_det_curvature = matrices.determinant.log_abs;
            self.log_det_hessian = self.log_det_curvature + nparam_infit as f64 * std::f64::consts::LN_2;
        }

        self.covariance = matrices.covariance;
        self.nfree = problem.ndat_constraint().saturating_sub(nparam_infit);
        self.solved = true;

        if self.config.maximum_reduced_chisq > 0.0 {
            let reduced = self.chisq / self.nfree as f64;
            if !(reduced <= self.config.maximum_reduced_chisq) {
                log::warn!(
                    "Solver::solve reduced chisq={} > maximum={}",
                    reduced,
                    self.config.maximum_reduced_chisq
                );
                self.solved = false;
            }
        }

        log::debug!(
            "Solver::solve {} after {} iterations chisq={} nfree={}",
            self.status.description(),
            self.iterations,
            self.chisq,
            self.nfree
        );
        Ok(())
    }

    /// Store the curvature of the best fit and its eigenanalysis.
    fn analyse<R: RealReduction>(&mut self, engine: &LevenbergMarquardt<R>) -> Result<()> {
        self.curvature = engine.curvature().clone();
        let analysis = eigenanalysis(&self.curvature, engine.names())?;
        let nrank = self.curvature.nrows() - analysis.ndim_nullspace;
        self.log_det_curvature = analysis.log_det;
        // the reduction sums twice the real trace, so the Hessian of chi-squared is 2 alpha
        self.log_det_hessian = analysis.log_det + nrank as f64 * std::f64::consts::LN_2;
        self.log_cond_curvature = analysis.log_condition;
        self.eigenanalysis = Some(analysis);
        Ok(())
    }

    /// Best chi-squared.
    pub fn chisq(&self) -> f64 {
        self.chisq
    }

    /// Degrees of freedom: constraints minus free parameters.
    pub fn nfree(&self) -> usize {
        self.nfree
    }

    /// Iterations performed by the last solve.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Covariance of all parameters (empty unless solved).
    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// Curvature of the free parameters at the best fit (empty when the
    /// solve stopped before computing a result).
    pub fn curvature(&self) -> &Array2<f64> {
        &self.curvature
    }

    /// Natural log of the curvature determinant, over the non-null eigenvalues
    /// when the curvature has a nullspace.
    pub fn log_det_curvature(&self) -> f64 {
        self.log_det_curvature
    }

    /// Natural log of the determinant of the chi-squared Hessian, which is
    /// twice the curvature.
    pub fn log_det_hessian(&self) -> f64 {
        self.log_det_hessian
    }

    /// Natural log of the curvature condition number.
    pub fn log_cond_curvature(&self) -> f64 {
        self.log_cond_curvature
    }

    /// Eigenanalysis of the curvature matrix.
    pub fn eigenanalysis(&self) -> Option<&Eigenanalysis> {
        self.eigenanalysis.as_ref()
    }

    /// True when the last solve met a singular curvature matrix.
    pub fn singular(&self) -> bool {
        self.singular
    }

    /// True when the last solve converged and passed the reduced chi-squared check.
    pub fn solved(&self) -> bool {
        self.solved
    }

    /// Termination status of the last solve.
    pub fn status(&self) -> FitStatus {
        self.status
    }

    /// Summary of the last solve.
    pub fn summary(&self) -> FitSummary {
        FitSummary {
            status: self.status,
            solved: self.solved,
            singular: self.singular,
            iterations: self.iterations,
            chisq: self.chisq,
            nfree: self.nfree,
            log_det_curvature: self.log_det_curvature,
            log_det_hessian: self.log_det_hessian,
            log_cond_curvature: self.log_cond_curvature,
            parameters: self.parameters.clone(),
        }
    }
}
