use std::io::Write;

use ndarray::Array2;

use crate::error::{JonesFitError, Result};
use crate::function::Function;
use crate::uncertainty::calculate_correlation;

use super::Report;

/// Correlation coefficients between every pair of fitted parameters.
///
/// One line per pair, `name_i name_j correlation`. Parameters with zero
/// variance (held fixed) are skipped.
pub struct CovarianceReport<'a, F: Function> {
    function: &'a F,
    covariance: &'a Array2<f64>,
}

impl<'a, F: Function> CovarianceReport<'a, F> {
    pub fn new(function: &'a F, covariance: &'a Array2<f64>) -> Self {
        Self { function, covariance }
    }
}

impl<F: Function> Report for CovarianceReport<'_, F> {
    fn filename(&self) -> &str {
        "covariance.txt"
    }

    fn report(&self, out: &mut dyn Write) -> Result<()> {
        let nparam = self.function.nparam();
        if self.covariance.nrows() != nparam || self.covariance.ncols() != nparam {
            return Err(JonesFitError::InvalidState(format!(
                "CovarianceReport::report nparam={} != covariance {}x{}",
                nparam,
                self.covariance.nrows(),
                self.covariance.ncols()
            )));
        }

        let correlation = calculate_correlation(self.covariance);
        for i in 0..nparam {
            if self.covariance[[i, i]] == 0.0 {
                continue;
            }
            for j in (i + 1)..nparam {
                if self.covariance[[j, j]] == 0.0 {
                    continue;
                }
                writeln!(
                    out,
                    "{} {} {}",
                    self.function.param_name(i)?,
                    self.function.param_name(j)?,
                    correlation[[i, j]]
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::solved_model;

    #[test]
    fn test_covariance_report() {
        let (model, solver) = solved_model();
        let text = CovarianceReport::new(&model, solver.covariance())
            .to_report_string()
            .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // one pair of free parameters
        assert_eq!(lines.len(), 1);
        let fields: Vec<&str> = lines[0].split_whitespace().collect();
        assert_eq!(fields[0], model.param_name(1).unwrap());
        assert_eq!(fields[1], model.param_name(4).unwrap());
        let r: f64 = fields[2].parse().unwrap();
        assert!(r.abs() <= 1.0);
    }

    #[test]
    fn test_size_mismatch() {
        let (model, _) = solved_model();
        let covariance = Array2::zeros((2, 2));
        assert!(CovarianceReport::new(&model, &covariance).to_report_string().is_err());
    }
}
