//! Gauss-Jordan elimination with full pivoting.
//!
//! Solves `A X = B` in place: on return `a` holds `A^-1` and `b` holds the
//! solution vectors. This is the classic `gaussj` algorithm; the determinant
//! of `A` is tracked along the way and returned as a log-magnitude and sign
//! so that large curvature matrices do not overflow.

use ndarray::Array2;

use crate::error::{JonesFitError, Result};

/// Determinant of the eliminated matrix as `sign * exp(log_abs)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Determinant {
    /// Natural logarithm of the magnitude
    pub log_abs: f64,
    /// +1 or -1 (0 for an empty system)
    pub sign: f64,
}

impl Determinant {
    /// The determinant as a plain number (may overflow for large systems).
    pub fn value(&self) -> f64 {
        self.sign * self.log_abs.exp()
    }
}

/// Gauss-Jordan elimination with full pivoting.
///
/// # Arguments
///
/// * `a` - Square matrix; replaced by its inverse (leading `nrow` block)
/// * `b` - Right-hand sides, one per column; replaced by the solutions. May have zero columns.
/// * `nrow` - Size of the leading block to eliminate; `None` means all of `a`
/// * `singular_threshold` - Largest pivot magnitude treated as zero
/// * `names` - Optional row names reported when the matrix is singular
///
/// # Returns
///
/// The determinant of the eliminated block, sign-corrected for row swaps.
/// A zero-sized block returns a determinant with sign 0.
///
/// # Errors
///
/// * `JonesFitError::InvalidState` if `a` or `b` has fewer than `nrow` rows or columns
/// * `JonesFitError::SingularMatrix` if no pivot larger than `singular_threshold` remains
pub fn gauss_jordan(
    a: &mut Array2<f64>,
    b: &mut Array2<f64>,
    nrow: Option<usize>,
    singular_threshold: f64,
    names: Option<&[String]>,
) -> Result<Determinant> {
    let n = nrow.unwrap_or_else(|| a.nrows());

    if n == 0 {
        log::debug!("gauss_jordan: nrow=0");
        return Ok(Determinant {
            log_abs: 0.0,
            sign: 0.0,
        });
    }

    let ncol = b.ncols();
    if ncol > 0 && b.nrows() < n {
        return Err(JonesFitError::InvalidState(format!(
            "gauss_jordan: b.nrows()={} < nrow={}",
            b.nrows(),
            n
        )));
    }
    if a.nrows() < n || a.ncols() < n {
        return Err(JonesFitError::InvalidState(format!(
            "gauss_jordan: a is {}x{} < nrow={}",
            a.nrows(),
            a.ncols(),
            n
        )));
    }
    if let Some(names) = names {
        if names.len() < n {
            return Err(JonesFitError::InvalidState(format!(
                "gauss_jordan: {} names < nrow={}",
                names.len(),
                n
            )));
        }
    }

    // row names follow the row swaps
    let mut names: Option<Vec<String>> = names.map(|n| n.to_vec());

    let mut indxc = vec![0usize; n];
    let mut indxr = vec![0usize; n];
    let mut ipiv = vec![false; n];

    let mut log_abs = 0.0;
    let mut sign = 1.0;

    for i in 0..n {
        // search for the pivot element
        let mut big = 0.0;
        let mut irow = 0;
        let mut icol = 0;
        for j in (0..n).filter(|&j| !ipiv[j]) {
            for k in (0..n).filter(|&k| !ipiv[k]) {
                let value = a[[j, k]].abs();
                if value >= big {
                    big = value;
                    irow = j;
                    icol = k;
                }
            }
        }

        if !(big > singular_threshold) {
            let remaining = names
                .as_ref()
                .map(|names| names[i..n].to_vec())
                .unwrap_or_default();
            for name in &remaining {
                log::debug!("gauss_jordan: singular row name={}", name);
            }
            return Err(JonesFitError::SingularMatrix {
                column: i,
                nrow: n,
                pivot: big,
                names: remaining,
            });
        }

        ipiv[icol] = true;

        if irow != icol {
            for j in 0..n {
                a.swap([irow, j], [icol, j]);
            }
            for j in 0..ncol {
                b.swap([irow, j], [icol, j]);
            }
            if let Some(names) = names.as_mut() {
                names.swap(irow, icol);
            }
            sign = -sign;
        }

        indxr[i] = irow;
        indxc[i] = icol;

        let pivot = a[[icol, icol]];
        if pivot < 0.0 {
            sign = -sign;
        }
        log_abs += pivot.abs().ln();

        let pivinv = 1.0 / pivot;
        a[[icol, icol]] = 1.0;
        for j in 0..n {
            a[[icol, j]] *= pivinv;
        }
        for j in 0..ncol {
            b[[icol, j]] *= pivinv;
        }

        // reduce the rows except for the pivot
        for j in (0..n).filter(|&j| j != icol) {
            let dum = a[[j, icol]];
            if dum == 0.0 {
                continue;
            }
            a[[j, icol]] = 0.0;
            for k in 0..n {
                a[[j, k]] -= a[[icol, k]] * dum;
            }
            for k in 0..ncol {
                b[[j, k]] -= b[[icol, k]] * dum;
            }
        }
    }

    // unscramble the column interchanges
    for i in (0..n).rev() {
        if indxr[i] != indxc[i] {
            for j in 0..n {
                a.swap([j, indxr[i]], [j, indxc[i]]);
            }
        }
    }

    Ok(Determinant { log_abs, sign })
}
