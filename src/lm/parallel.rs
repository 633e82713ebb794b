//! Fitting many independent problems in parallel.
//!
//! Each problem gets its own [`Solver`]; problems share nothing, so the
//! batch is distributed over the rayon thread pool.

use rayon::prelude::*;

use crate::error::Result;
use crate::problem::Problem;

use super::config::SolverConfig;
use super::reduction::RealReduction;
use super::solver::{FitSummary, Solver};

/// Fit every problem in `problems` with the same configuration.
///
/// The results are returned in the order of `problems`; a failed fit does
/// not affect the others.
pub fn fit_batch<P, R>(problems: &mut [P], config: &SolverConfig, reduction: R) -> Vec<Result<FitSummary>>
where
    P: Problem<Output = R::Element> + Send,
    R: RealReduction + Clone + Send + Sync,
{
    log::debug!("fit_batch: {} problems", problems.len());
    problems
        .par_iter_mut()
        .map(|problem| {
            let mut solver = Solver::new(config.clone());
            solver.solve(problem, reduction.clone())?;
            Ok(solver.summary())
        })
        .collect()
}
