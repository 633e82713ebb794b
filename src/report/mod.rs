//! Human-readable diagnostics of a fit.
//!
//! Each report writes plain text to any [`std::io::Write`] sink, or to a
//! file of a conventional name in a given directory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{JonesFitError, Result, ResultExt};

mod covariance;
mod parameters;
mod solver;

pub use covariance::CovarianceReport;
pub use parameters::ModelParametersReport;
pub use solver::SolverReport;

/// A text report.
pub trait Report {
    /// Conventional file name of the report.
    fn filename(&self) -> &str;

    /// Write the report.
    fn report(&self, out: &mut dyn Write) -> Result<()>;

    /// The report as a string.
    fn to_report_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.report(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| JonesFitError::InvalidState(format!("{}: {}", self.filename(), e)))
    }

    /// Write the report to `filename()` in `directory`.
    fn write_to(&self, directory: &Path) -> Result<()> {
        let path = directory.join(self.filename());
        let file = File::create(&path)
            .map_err(JonesFitError::from)
            .with_context(|| format!("Report::write_to {}", path.display()))?;
        let mut out = BufWriter::new(file);
        self.report(&mut out)?;
        out.flush()?;
        Ok(())
    }
}
