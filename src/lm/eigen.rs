//! Eigenanalysis of the curvature matrix.
//!
//! The eigenvalues of the curvature matrix, sorted in descending order,
//! usually fall off smoothly. A plateau followed by a sudden drop of several
//! orders of magnitude marks directions in parameter space that the data do
//! not constrain. Those directions form the nullspace; they are excluded
//! from the log-determinant and reported with the parameters that span them.

use nalgebra::SymmetricEigen;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{JonesFitError, Result};
use crate::utils::matrix_convert::ndarray_to_nalgebra;

/// Ratio of consecutive eigenvalues below which the spectrum has flattened.
pub const PLATEAU_RATIO: f64 = 1.01;

/// Drop relative to the plateau that starts the nullspace.
pub const NULLSPACE_RATIO: f64 = 1e-3;

/// Smallest eigenvector component reported for a nullspace direction.
pub const COMPONENT_THRESHOLD: f64 = 1e-5;

/// An unconstrained direction in parameter space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullspaceDirection {
    /// Eigenvalue of the direction
    pub eigenvalue: f64,
    /// Parameter names and eigenvector components above the reporting threshold
    pub components: Vec<(String, f64)>,
}

/// Spectrum of a curvature matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eigenanalysis {
    /// Eigenvalues in descending order
    pub eigenvalues: Vec<f64>,
    /// Natural log of the product of the eigenvalues outside the nullspace
    pub log_det: f64,
    /// Natural log of the ratio of the largest to the smallest eigenvalue outside the nullspace
    pub log_condition: f64,
    /// Largest eigenvalue
    pub lambda_max: f64,
    /// Smallest eigenvalue outside the nullspace
    pub lambda_min: f64,
    /// Dimension of the nullspace
    pub ndim_nullspace: usize,
    /// The nullspace directions, largest eigenvalue first
    pub nullspace: Vec<NullspaceDirection>,
}

/// Eigenanalysis of a symmetric curvature matrix whose rows are named by `names`.
///
/// # Errors
///
/// * `JonesFitError::DimensionMismatch` if the matrix is not square or `names` has the wrong length
/// * `JonesFitError::NonFinite` if the matrix contains non-finite values
pub fn eigenanalysis(curvature: &Array2<f64>, names: &[String]) -> Result<Eigenanalysis> {
    let n = curvature.nrows();
    if curvature.ncols() != n || names.len() != n {
        return Err(JonesFitError::DimensionMismatch(format!(
            "eigenanalysis: curvature is {}x{} with {} names",
            n,
            curvature.ncols(),
            names.len()
        )));
    }
    if curvature.iter().any(|v| !v.is_finite()) {
        return Err(JonesFitError::NonFinite("eigenanalysis: curvature".to_string()));
    }

    if n == 0 {
        return Ok(Eigenanalysis {
            eigenvalues: Vec::new(),
            log_det: 0.0,
            log_condition: 0.0,
            lambda_max: 0.0,
            lambda_min: 0.0,
            ndim_nullspace: 0,
            nullspace: Vec::new(),
        });
    }

    let decomposition = SymmetricEigen::new(ndarray_to_nalgebra(curvature));

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| decomposition.eigenvalues[b].total_cmp(&decomposition.eigenvalues[a]));
    let eigenvalues: Vec<f64> = order.iter().map(|&k| decomposition.eigenvalues[k]).collect();

    let lambda_max = eigenvalues[0];
    let mut lambda_min = lambda_max;
    let mut log_det = if lambda_max > 0.0 { lambda_max.ln() } else { 0.0 };

    let mut plateau = false;
    let mut ndim_nullspace = 0;
    let mut nullspace = Vec::new();

    for i in 1..n {
        let lambda = eigenvalues[i];

        if ndim_nullspace == 0 {
            if !plateau && lambda > 0.0 && lambda_min / lambda < PLATEAU_RATIO {
                plateau = true;
            } else if plateau && lambda / lambda_min < NULLSPACE_RATIO {
                ndim_nullspace = n - i;
                log::info!(
                    "eigenanalysis: nullspace of dimension {} below eigenvalue {}",
                    ndim_nullspace,
                    lambda_min
                );
            }
        }

        if ndim_nullspace > 0 {
            let column = decomposition.eigenvectors.column(order[i]);
            let components = names
                .iter()
                .zip(column.iter())
                .filter(|(_, v)| v.abs() > COMPONENT_THRESHOLD)
                .map(|(name, v)| (name.clone(), *v))
                .collect();
            nullspace.push(NullspaceDirection {
                eigenvalue: lambda,
                components,
            });
        } else {
            lambda_min = lambda;
            log_det += lambda.ln();
        }
    }

    let log_condition = lambda_max.abs().ln() - lambda_min.abs().ln();

    Ok(Eigenanalysis {
        eigenvalues,
        log_det,
        log_condition,
        lambda_max,
        lambda_min,
        ndim_nullspace,
        nullspace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("p{}", i)).collect()
    }

    #[test]
    fn test_well_conditioned() {
        let curvature = array![[4.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 1.0]];
        let analysis = eigenanalysis(&curvature, &names(3)).unwrap();
        for (value, expected) in analysis.eigenvalues.iter().zip([4.0, 2.0, 1.0]) {
            assert_relative_eq!(*value, expected, epsilon = 1e-12);
        }
        assert_eq!(analysis.ndim_nullspace, 0);
        assert_relative_eq!(analysis.log_det, 8.0f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(analysis.log_condition, 4.0f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(analysis.lambda_min, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nullspace() {
        // a plateau at 1 followed by a drop to 1e-9; the small direction mixes p2 and p3
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let mut curvature = Array2::zeros((4, 4));
        curvature[[0, 0]] = 1.0;
        curvature[[1, 1]] = 1.0;
        let (big, small) = (1.0, 1e-9);
        curvature[[2, 2]] = 0.5 * (big + small);
        curvature[[3, 3]] = 0.5 * (big + small);
        curvature[[2, 3]] = 0.5 * (big - small);
        curvature[[3, 2]] = 0.5 * (big - small);

        let analysis = eigenanalysis(&curvature, &names(4)).unwrap();
        assert_eq!(analysis.ndim_nullspace, 1);
        assert_relative_eq!(analysis.lambda_min, 1.0, epsilon = 1e-9);
        assert_relative_eq!(analysis.log_det, 0.0, epsilon = 1e-9);

        let direction = &analysis.nullspace[0];
        assert_eq!(direction.components.len(), 2);
        assert_eq!(direction.components[0].0, "p2");
        assert_eq!(direction.components[1].0, "p3");
        assert_relative_eq!(direction.components[0].1.abs(), s, epsilon = 1e-6);
        assert_relative_eq!(
            direction.components[0].1,
            -direction.components[1].1,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_dimension_errors() {
        let curvature = Array2::zeros((2, 3));
        assert!(eigenanalysis(&curvature, &names(2)).is_err());
        let curvature = Array2::<f64>::eye(2);
        assert!(eigenanalysis(&curvature, &names(3)).is_err());
        let empty = eigenanalysis(&Array2::zeros((0, 0)), &[]).unwrap();
        assert_eq!(empty.ndim_nullspace, 0);
    }
}
