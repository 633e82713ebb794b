//! The Levenberg-Marquardt iteration.
//!
//! Each residual of a [`Problem`] contributes to the curvature matrix
//! `alpha` and the gradient vector `beta` of the free parameters:
//!
//! ```text
//! alpha[p][q] += reduce(W(g_p) * g_q)
//! beta[p]     += reduce(W(g_p) * delta)
//! chisq       += |delta|_W
//! ```
//!
//! where `W` is the weighting policy of the residual. A step solves
//! `(alpha + lamda diag(alpha)) x = beta` by Gauss-Jordan elimination.

use ndarray::{Array1, Array2};

use crate::error::{JonesFitError, Result, ResultExt};
use crate::linalg::{gauss_jordan, Determinant};
use crate::problem::{Problem, Residual};

use super::config::SolverConfig;
use super::reduction::RealReduction;

/// Curvature, covariance and determinant of a finished fit.
#[derive(Debug, Clone)]
pub struct FitMatrices {
    /// Curvature of the free parameters (nparam_infit x nparam_infit)
    pub curvature: Array2<f64>,
    /// Covariance of all parameters (nparam x nparam); zero for fixed parameters
    pub covariance: Array2<f64>,
    /// Determinant of the curvature matrix
    pub determinant: Determinant,
}

/// Levenberg-Marquardt state for one problem.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt<R> {
    reduction: R,
    initial_lamda: f64,
    lamda: f64,
    lamda_increase_factor: f64,
    lamda_decrease_factor: f64,
    singular_threshold: f64,
    free: Vec<usize>,
    names: Vec<String>,
    best_alpha: Array2<f64>,
    best_beta: Array1<f64>,
    best_chisq: f64,
    parameter_change: f64,
}

impl<R: RealReduction> LevenbergMarquardt<R> {
    /// A new engine using `reduction` and the damping settings of `config`.
    pub fn new(reduction: R, config: &SolverConfig) -> Self {
        Self {
            reduction,
            initial_lamda: config.initial_lamda,
            lamda: config.initial_lamda,
            lamda_increase_factor: config.lamda_increase_factor,
            lamda_decrease_factor: config.lamda_decrease_factor,
            singular_threshold: config.singular_threshold,
            free: Vec::new(),
            names: Vec::new(),
            best_alpha: Array2::zeros((0, 0)),
            best_beta: Array1::zeros(0),
            best_chisq: f64::INFINITY,
            parameter_change: 0.0,
        }
    }

    /// Current damping parameter.
    pub fn lamda(&self) -> f64 {
        self.lamda
    }

    /// Set the damping parameter.
    pub fn set_lamda(&mut self, lamda: f64) {
        self.lamda = lamda;
    }

    /// Lowest chi-squared reached so far.
    pub fn best_chisq(&self) -> f64 {
        self.best_chisq
    }

    /// Curvature matrix at the best parameters.
    pub fn curvature(&self) -> &Array2<f64> {
        &self.best_alpha
    }

    /// Largest relative change of a free parameter in the last step.
    pub fn parameter_change(&self) -> f64 {
        self.parameter_change
    }

    /// Indices of the free parameters.
    pub fn free_indices(&self) -> &[usize] {
        &self.free
    }

    /// Names of the free parameters.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Record the free parameters and compute the starting chi-squared.
    pub fn init<P>(&mut self, problem: &mut P) -> Result<f64>
    where
        P: Problem<Output = R::Element>,
    {
        self.free = problem.free_indices()?;
        self.names = self
            .free
            .iter()
            .map(|&i| problem.param_name(i))
            .collect::<Result<_>>()?;
        self.lamda = self.initial_lamda;
        self.parameter_change = 0.0;

        let (alpha, beta, chisq) =
            lmcoff(&self.reduction, problem, &self.free).context("LevenbergMarquardt::init")?;
        self.best_alpha = alpha;
        self.best_beta = beta;
        self.best_chisq = chisq;

        log::debug!(
            "LevenbergMarquardt::init nparam_infit={} chisq={}",
            self.free.len(),
            chisq
        );
        Ok(chisq)
    }

    /// Take one damped step; returns the chi-squared of the trial parameters.
    ///
    /// An improving step is kept and the damping relaxed; otherwise the
    /// parameters are restored and the damping increased.
    pub fn iter<P>(&mut self, problem: &mut P) -> Result<f64>
    where
        P: Problem<Output = R::Element>,
    {
        let n = self.free.len();

        let mut alpha = self.best_alpha.clone();
        for i in 0..n {
            alpha[[i, i]] *= 1.0 + self.lamda;
        }
        let mut delta = self
            .best_beta
            .clone()
            .into_shape((n, 1))
            .map_err(|e| JonesFitError::InvalidState(format!("LevenbergMarquardt::iter {}", e)))?;

        gauss_jordan(&mut alpha, &mut delta, None, self.singular_threshold, Some(&self.names))
            .context("LevenbergMarquardt::iter")?;

        let mut backup = Vec::with_capacity(n);
        for &index in &self.free {
            backup.push(problem.param(index)?);
        }

        self.parameter_change = 0.0;
        for (i, &index) in self.free.iter().enumerate() {
            let step = delta[[i, 0]];
            let old = backup[i];
            let change = if old != 0.0 { (step / old).abs() } else { step.abs() };
            self.parameter_change = self.parameter_change.max(change);
            problem.set_param(index, old + step)?;
        }

        let (trial_alpha, trial_beta, chisq) = match lmcoff(&self.reduction, problem, &self.free) {
            Ok(result) => result,
            Err(err) => {
                restore(problem, &self.free, &backup)?;
                return Err(err.context("LevenbergMarquardt::iter"));
            }
        };

        if chisq < self.best_chisq {
            self.lamda *= self.lamda_decrease_factor;
            self.best_alpha = trial_alpha;
            self.best_beta = trial_beta;
            self.best_chisq = chisq;
        } else {
            self.lamda *= self.lamda_increase_factor;
            restore(problem, &self.free, &backup)?;
        }

        Ok(chisq)
    }

    /// Invert the best curvature matrix and store the parameter variances.
    pub fn result<P>(&mut self, problem: &mut P) -> Result<FitMatrices>
    where
        P: Problem<Output = R::Element>,
    {
        let n = self.free.len();
        let curvature = self.best_alpha.clone();
        let mut inverse = curvature.clone();
        let mut none = Array2::zeros((n, 0));
        let determinant = gauss_jordan(
            &mut inverse,
            &mut none,
            None,
            self.singular_threshold,
            Some(&self.names),
        )
        .context("LevenbergMarquardt::result")?;

        for (i, name) in self.names.iter().enumerate() {
            let variance = inverse[[i, i]];
            if !(variance > 0.0 && variance.is_finite()) {
                log::warn!("LevenbergMarquardt::result variance of {}={:e}", name, variance);
                let err = JonesFitError::NonPositiveVariance {
                    name: name.clone(),
                    variance,
                };
                return Err(err.context("LevenbergMarquardt::result"));
            }
        }

        let nparam = problem.nparam();
        let mut covariance = Array2::zeros((nparam, nparam));
        for (i, &pi) in self.free.iter().enumerate() {
            for (j, &pj) in self.free.iter().enumerate() {
                covariance[[pi, pj]] = inverse[[i, j]];
            }
        }
        for i in 0..nparam {
            problem
                .set_variance(i, covariance[[i, i]])
                .context("LevenbergMarquardt::result")?;
        }

        Ok(FitMatrices {
            curvature,
            covariance,
            determinant,
        })
    }
}

fn restore<P: Problem>(problem: &mut P, free: &[usize], backup: &[f64]) -> Result<()> {
    for (&index, &value) in free.iter().zip(backup) {
        problem.set_param(index, value)?;
    }
    Ok(())
}

/// Accumulate the curvature matrix, gradient vector and chi-squared.
fn lmcoff<R, P>(reduction: &R, problem: &mut P, free: &[usize]) -> Result<(Array2<f64>, Array1<f64>, f64)>
where
    R: RealReduction,
    P: Problem<Output = R::Element>,
{
    let n = free.len();
    let nparam = problem.nparam();
    let mut alpha = Array2::<f64>::zeros((n, n));
    let mut beta = Array1::<f64>::zeros(n);
    let mut chisq = 0.0;
    let mut weighted = Vec::with_capacity(n);

    problem.for_each_residual(&mut |residual: Residual<'_, R::Element>| {
        if residual.gradient.len() < nparam {
            return Err(JonesFitError::InvalidState(format!(
                "lmcoff: gradient has {} elements < nparam={}",
                residual.gradient.len(),
                nparam
            )));
        }

        weighted.clear();
        weighted.extend(
            free.iter()
                .map(|&index| residual.weighting.weighted_conjugate(&residual.gradient[index])),
        );

        for (p, wp) in weighted.iter().enumerate() {
            for (q, &iq) in free.iter().enumerate().take(p + 1) {
                alpha[[p, q]] += reduction.reduce_product(wp, &residual.gradient[iq]);
            }
            beta[p] += reduction.reduce_product(wp, &residual.delta);
        }

        chisq += residual.weighting.weighted_norm(&residual.delta)?;
        Ok(())
    })?;

    for p in 0..n {
        for q in 0..p {
            alpha[[q, p]] = alpha[[p, q]];
        }
    }

    if !chisq.is_finite() {
        return Err(JonesFitError::InvalidState(format!("lmcoff: non-finite chisq={}", chisq)));
    }

    Ok((alpha, beta, chisq))
}
