//! Linear algebra support for the estimators.

pub mod rcond;

use nalgebra::DMatrix;

use crate::error::{Error, Result};

/// Relative tolerance used when checking a covariance for symmetry.
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Checks the reciprocal condition number is >= 0.
///
/// IEC 559 NaN values are never >= 0 so NaN is also rejected.
pub fn check_non_negative(rcond: f64, message: &str) -> Result<f64> {
    if rcond >= 0. {
        Ok(rcond)
    } else {
        Err(Error::InvalidModel(message.to_string()))
    }
}

/// Is `m` square and symmetric within a tolerance relative to its largest element.
pub fn is_symmetric(m: &DMatrix<f64>, tolerance: f64) -> bool {
    if !m.is_square() {
        return false;
    }
    let scale = m.iter().fold(1f64, |a, v| a.max(v.abs()));
    let n = m.nrows();
    (0..n).all(|i| (0..i).all(|j| (m[(i, j)] - m[(j, i)]).abs() <= tolerance * scale))
}

/// The symmetric part (M + M')/2 of a square matrix.
///
/// Removes the floating point asymmetry that accumulates in covariance products.
pub fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    (m + m.transpose()) * 0.5
}

/// Checks `m` has the expected shape, naming the matrix in the error.
pub fn check_shape(m: &DMatrix<f64>, rows: usize, cols: usize, what: &str) -> Result<()> {
    if m.shape() == (rows, cols) {
        Ok(())
    } else {
        Err(Error::InvalidModel(format!(
            "{} is {}x{}, expected {}x{}",
            what,
            m.nrows(),
            m.ncols(),
            rows,
            cols
        )))
    }
}

/// Checks `m` is a valid covariance: symmetric, finite, with a non-negative diagonal.
pub fn check_covariance(m: &DMatrix<f64>, what: &str) -> Result<()> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidModel(format!("{} has non finite elements", what)));
    }
    if !is_symmetric(m, SYMMETRY_TOLERANCE) {
        return Err(Error::InvalidModel(format!("{} is not symmetric", what)));
    }
    check_non_negative(rcond::rcond_symmetric(m), &format!("{} has a negative diagonal", what))?;
    Ok(())
}
