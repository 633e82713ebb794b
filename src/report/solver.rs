use std::io::Write;

use crate::error::Result;
use crate::lm::Solver;

use super::Report;

/// Goodness of fit and the spectrum of the curvature matrix.
pub struct SolverReport<'a> {
    solver: &'a Solver,
}

impl<'a> SolverReport<'a> {
    pub fn new(solver: &'a Solver) -> Self {
        Self { solver }
    }
}

impl Report for SolverReport<'_> {
    fn filename(&self) -> &str {
        "solver.txt"
    }

    fn report(&self, out: &mut dyn Write) -> Result<()> {
        let solver = self.solver;
        let nfree = solver.nfree();
        writeln!(out, "status: {}", solver.status().description())?;
        writeln!(out, "iterations: {}", solver.iterations())?;
        write!(out, "chisq: {} nfree: {}", solver.chisq(), nfree)?;
        if nfree > 0 {
            write!(out, " reduced: {}", solver.chisq() / nfree as f64)?;
        }
        writeln!(out)?;
        writeln!(out, "log(det(curvature)): {}", solver.log_det_curvature())?;
        writeln!(out, "log(det(Hessian)): {}", solver.log_det_hessian())?;
        writeln!(out, "log(cond(curvature)): {}", solver.log_cond_curvature())?;

        let Some(analysis) = solver.eigenanalysis() else {
            return Ok(());
        };

        let eigenvalues: Vec<String> = analysis.eigenvalues.iter().map(|v| format!("{:e}", v)).collect();
        writeln!(out, "eigenvalues: {}", eigenvalues.join(" "))?;
        writeln!(out, "nullspace dimension: {}", analysis.ndim_nullspace)?;
        for direction in &analysis.nullspace {
            writeln!(out, "nullspace eigenvalue: {:e}", direction.eigenvalue)?;
            for (name, component) in &direction.components {
                writeln!(out, "  {} {}", name, component)?;
            }
        }
        Ok(())
    }
}
