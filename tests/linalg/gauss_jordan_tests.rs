//! Gauss-Jordan inversion of random matrices, checked against the product
//! with the original matrix and against the eigenvalues of a symmetric copy.

use approx::assert_relative_eq;
use jonesfit::linalg::gauss_jordan;
use jonesfit::JonesFitError;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::test_helpers::{identity_error, random_matrix};

const TOLERANCE: f64 = 1e-11;

// Returns true when the inverse and the log-determinant are both accurate
fn once(dim: usize, rng: &mut ChaCha8Rng) -> bool {
    let original = random_matrix(dim, 10.0, rng);
    let mut inverse = original.clone();
    let mut rhs = Array2::zeros((dim, 1));
    if gauss_jordan(&mut inverse, &mut rhs, None, 0.0, None).is_err() {
        return false;
    }

    if identity_error(&inverse.dot(&original)) > TOLERANCE {
        return false;
    }

    let symmetric = Array2::from_shape_fn((dim, dim), |(i, j)| original[[i.max(j), i.min(j)]]);
    let mut copy = symmetric.clone();
    let mut rhs = Array2::zeros((dim, 0));
    let determinant = match gauss_jordan(&mut copy, &mut rhs, None, 0.0, None) {
        Ok(determinant) => determinant,
        Err(_) => return false,
    };

    let matrix = DMatrix::from_fn(dim, dim, |i, j| symmetric[[i, j]]);
    let log_det: f64 = SymmetricEigen::new(matrix)
        .eigenvalues
        .iter()
        .map(|lambda| lambda.abs().ln())
        .sum();

    (determinant.log_abs - log_det).abs() < 1e-8
}

#[test]
fn test_random_inversions() {
    let mut rng = ChaCha8Rng::seed_from_u64(37);
    let ntrial = 1000;
    let nerr = (0..ntrial).filter(|_| !once(37, &mut rng)).count();
    // ill-conditioned draws are rare but possible
    assert!(nerr <= ntrial / 100, "{} errors in {} trials", nerr, ntrial);
}

#[test]
#[ignore = "slow: inverts a 273x273 matrix"]
fn test_large_inversion() {
    let mut rng = ChaCha8Rng::seed_from_u64(273);
    let original = random_matrix(273, 10.0, &mut rng);
    let mut inverse = original.clone();
    let mut rhs = Array2::zeros((273, 0));
    gauss_jordan(&mut inverse, &mut rhs, None, 0.0, None).unwrap();
    assert!(identity_error(&inverse.dot(&original)) < 1e-9);
}

#[test]
fn test_solution_and_sub_block() {
    // the leading 2x2 block is inverted; the trailing row is ignored
    let mut a = Array2::from_shape_vec((3, 3), vec![4.0, 6.0, 99.0, 6.0, 14.0, 99.0, 99.0, 99.0, 99.0]).unwrap();
    let mut b = Array2::from_shape_vec((3, 1), vec![16.0, 34.0, 99.0]).unwrap();
    let determinant = gauss_jordan(&mut a, &mut b, Some(2), 0.0, None).unwrap();

    assert_relative_eq!(b[[0, 0]], 1.0, epsilon = 1e-12);
    assert_relative_eq!(b[[1, 0]], 2.0, epsilon = 1e-12);
    assert_relative_eq!(determinant.value(), 20.0, epsilon = 1e-10);
    assert_relative_eq!(a[[0, 0]], 0.7, epsilon = 1e-12);
    assert_relative_eq!(a[[1, 1]], 0.2, epsilon = 1e-12);
    assert_eq!(b[[2, 0]], 99.0);
}

#[test]
fn test_singular_names() {
    let mut a = Array2::from_shape_vec((3, 3), vec![1.0, 2.0, 0.0, 2.0, 4.0, 0.0, 0.0, 0.0, 1.0]).unwrap();
    let mut b = Array2::zeros((3, 0));
    let names = vec!["gain".to_string(), "b_1".to_string(), "r_1".to_string()];
    let err = gauss_jordan(&mut a, &mut b, None, 1e-12, Some(&names)).unwrap_err();
    assert!(err.is_singular());
    match err.root() {
        JonesFitError::SingularMatrix { column, nrow, names, .. } => {
            assert_eq!(*column, 2);
            assert_eq!(*nrow, 3);
            assert_eq!(names.len(), 1);
        }
        other => panic!("unexpected error {}", other),
    }
}
