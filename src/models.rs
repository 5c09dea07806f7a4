#![allow(non_snake_case)]

//! Linear-Gaussian state space models.
//!
//! State representations are modeled as structs.
//! The same [`LinearGaussianModel`] describes both the model a filter believes in and the model that
//! generates the truth; in an experiment the two are independent instances and are allowed to disagree.
//!
//! [`LinearGaussianModel`]: struct.LinearGaussianModel.html

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::linalg::{check_covariance, check_shape};

/// Kalman State.
///
/// Linear representation as a state vector and the state covariance (symmetric positive semi-definite) matrix.
#[derive(PartialEq, Clone, Debug)]
pub struct KalmanState {
    /// State vector
    pub x: DVector<f64>,
    /// State covariance matrix (symmetric positive semi-definite)
    pub X: DMatrix<f64>,
}

impl KalmanState {
    /// Creates a KalmanState, checking X is a square covariance matching x.
    pub fn new(x: DVector<f64>, X: DMatrix<f64>) -> Result<KalmanState> {
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidParameter("initial state has non finite elements".into()));
        }
        check_shape(&X, x.nrows(), x.nrows(), "initial covariance")
            .and_then(|_| check_covariance(&X, "initial covariance"))
            .map_err(|e| match e {
                Error::InvalidModel(msg) => Error::InvalidParameter(msg),
                other => other,
            })?;
        Ok(KalmanState { x, X })
    }

    /// A zero state with zero covariance.
    pub fn new_zero(n: usize) -> KalmanState {
        KalmanState {
            x: DVector::zeros(n),
            X: DMatrix::zeros(n, n),
        }
    }

    /// A one dimensional state.
    pub fn scalar(x: f64, X: f64) -> Result<KalmanState> {
        KalmanState::new(DVector::from_element(1, x), DMatrix::from_element(1, 1, X))
    }

    pub fn dim(&self) -> usize {
        self.x.nrows()
    }
}

/// Linear-Gaussian model.
///
/// x(t) = F.x(t-1) + B.u + w,  w ~ N(0, Q)
/// z(t) = H.x(t) + v,          v ~ N(0, R)
///
/// The control term B.u is optional.
#[derive(PartialEq, Clone, Debug)]
pub struct LinearGaussianModel {
    /// State transition matrix, n x n
    Fx: DMatrix<f64>,
    /// Observation matrix, m x n
    Hx: DMatrix<f64>,
    /// Process noise covariance, n x n
    Q: DMatrix<f64>,
    /// Observation noise covariance, m x m
    R: DMatrix<f64>,
    /// Control input matrix, n x k
    B: Option<DMatrix<f64>>,
}

impl LinearGaussianModel {
    /// Creates a model after checking dimensions and noise covariances.
    ///
    /// `F` must be n x n, `H` m x n, `Q` n x n and `R` m x m. Both covariances must be symmetric with a
    /// non-negative diagonal.
    pub fn new(F: DMatrix<f64>, H: DMatrix<f64>, Q: DMatrix<f64>, R: DMatrix<f64>) -> Result<Self> {
        let n = F.nrows();
        if n == 0 {
            return Err(Error::InvalidModel("state dimension must be at least 1".into()));
        }
        check_shape(&F, n, n, "F")?;
        let m = H.nrows();
        if m == 0 {
            return Err(Error::InvalidModel("observation dimension must be at least 1".into()));
        }
        check_shape(&H, m, n, "H")?;
        check_shape(&Q, n, n, "Q")?;
        check_shape(&R, m, m, "R")?;
        if F.iter().chain(H.iter()).any(|v| !v.is_finite()) {
            return Err(Error::InvalidModel("F or H has non finite elements".into()));
        }
        check_covariance(&Q, "Q")?;
        check_covariance(&R, "R")?;

        Ok(LinearGaussianModel {
            Fx: F,
            Hx: H,
            Q,
            R,
            B: None,
        })
    }

    /// A one dimensional model with one observation.
    pub fn scalar(f: f64, h: f64, q: f64, r: f64) -> Result<Self> {
        let one = |v: f64| DMatrix::from_element(1, 1, v);
        LinearGaussianModel::new(one(f), one(h), one(q), one(r))
    }

    /// Adds a control input matrix `B` (n x k).
    pub fn with_control(mut self, B: DMatrix<f64>) -> Result<Self> {
        if B.nrows() != self.state_dim() {
            return Err(Error::InvalidModel(format!(
                "B has {} rows, expected {}",
                B.nrows(),
                self.state_dim()
            )));
        }
        if B.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidModel("B has non finite elements".into()));
        }
        self.B = Some(B);
        Ok(self)
    }

    pub fn state_dim(&self) -> usize {
        self.Fx.nrows()
    }

    pub fn obs_dim(&self) -> usize {
        self.Hx.nrows()
    }

    /// State transition matrix F.
    pub fn transition(&self) -> &DMatrix<f64> {
        &self.Fx
    }

    /// Observation matrix H.
    pub fn observation(&self) -> &DMatrix<f64> {
        &self.Hx
    }

    /// Process noise covariance Q.
    pub fn process_noise(&self) -> &DMatrix<f64> {
        &self.Q
    }

    /// Observation noise covariance R.
    pub fn observation_noise(&self) -> &DMatrix<f64> {
        &self.R
    }

    /// Control input matrix B, if the model has one.
    pub fn control(&self) -> Option<&DMatrix<f64>> {
        self.B.as_ref()
    }
}
