//! Reciprocal condition number estimates.
//!
//! Used by models and estimators to detect singular and negative covariance matrices.
//!
//! The estimate is taken from the diagonal of a symmetric matrix:
//!  the max element is used as the norm of the matrix and the min element as the norm of its inverse,
//!  therefore rcond = min/max.
//!
//! Conventions:
//!  - 0 for a semi-definite or empty matrix
//!  - 0 when min and max are both infinite
//!  - < 0 for a negative matrix (a diagonal element < 0) or any NaN element

use nalgebra as na;
use na::{allocator::Allocator, DefaultAllocator, Dim, MatrixMN, RealField, VectorN};

/// Estimate the reciprocal condition number of a diagonal matrix, passed as a vector.
pub fn rcond_vec<N: RealField, R: Dim>(dv: &VectorN<N, R>) -> N
where
    DefaultAllocator: Allocator<N, R>,
{
    min_max(dv.iter().copied())
}

/// Estimate the reciprocal condition number of a symmetric matrix from its diagonal.
///
/// Off diagonal elements are ignored, so a positive result does not prove the matrix is invertible.
pub fn rcond_symmetric<N: RealField, R: Dim, C: Dim>(sm: &MatrixMN<N, R, C>) -> N
where
    DefaultAllocator: Allocator<N, R, C>,
{
    let n = sm.nrows().min(sm.ncols());
    min_max((0..n).map(|i| sm[(i, i)]))
}

fn min_max<N: RealField>(mut diag: impl Iterator<Item = N>) -> N {
    let first = match diag.next() {
        Some(d) => d,
        None => return N::zero(),
    };
    let mut mind = first;
    let mut maxd = first;
    for d in std::iter::once(first).chain(diag) {
        if d != d {
            // NaN
            return -N::one();
        }
        if d < mind {
            mind = d;
        }
        if d > maxd {
            maxd = d;
        }
    }
    rcond_min_max(mind, maxd)
}

fn rcond_min_max<N: RealField>(mind: N, maxd: N) -> N {
    if mind < N::zero() {
        // negative matrix, mind is not an rcond
        return mind;
    }
    let rcond = mind / maxd;
    if rcond != rcond {
        // NaN: mind == maxd == zero or infinity
        N::zero()
    } else {
        rcond
    }
}
