//! Conversion of ndarray matrices to nalgebra for the symmetric eigensolver.

use nalgebra::DMatrix;
use ndarray::Array2;

/// Convert an ndarray Array2 to a nalgebra DMatrix.
pub fn ndarray_to_nalgebra<T: nalgebra::Scalar>(arr: &Array2<T>) -> DMatrix<T> {
    DMatrix::from_fn(arr.nrows(), arr.ncols(), |i, j| arr[[i, j]].clone())
}
