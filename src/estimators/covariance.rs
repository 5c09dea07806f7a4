#![allow(non_snake_case)]

//! Covariance state estimation.
//!
//! A discrete Bayesian estimator that uses a Kalman state representation [`KalmanState`] of the system for estimation.
//! The Kalman state is simply the x,X pair; the dimensions of both are the dimensions of the system.
//!
//! [`predict`] and [`update`] are pure functions: the x,X pair is threaded through explicitly by the caller and
//! no randomness is involved, so a step is fully determined by its arguments.
//!
//! [`KalmanState`]: ../../models/struct.KalmanState.html
//! [`predict`]: fn.predict.html
//! [`update`]: fn.update.html

use nalgebra::{DMatrix, DVector};
use tracing::warn;

use crate::error::{Error, Result};
use crate::linalg::{check_non_negative, check_shape, rcond, symmetrize};
use crate::models::{KalmanState, LinearGaussianModel};

/// Singular values below this are treated as zero by the pseudo-inverse.
const PINV_EPS: f64 = 1e-12;

/// What to do when the innovation covariance S cannot be inverted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SingularPolicy {
    /// Fail the step with [`Error::SingularCovariance`].
    Fail,
    /// Use the Moore-Penrose pseudo-inverse of S instead.
    PseudoInverse,
}

/// Form of the posterior covariance computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CovarianceForm {
    /// X = (I - K.H).X
    Standard,
    /// Joseph form X = (I - K.H).X.(I - K.H)' + K.R.K', PSD preserving for any gain.
    Joseph,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateOptions {
    pub singular: SingularPolicy,
    pub form: CovarianceForm,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        UpdateOptions {
            singular: SingularPolicy::Fail,
            form: CovarianceForm::Standard,
        }
    }
}

/// Result of an observation update.
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    /// Posterior state and covariance
    pub state: KalmanState,
    /// Kalman gain K, n x m
    pub gain: DMatrix<f64>,
    /// Innovation y = z - H.x
    pub innovation: DVector<f64>,
    /// Innovation covariance S = H.X.H' + R
    pub innovation_cov: DMatrix<f64>,
}

/// Prediction step.
///
/// x_pred = F.x (+ B.u), X_pred = F.X.F' + Q
///
/// X_pred is symmetrised so floating point asymmetry does not accumulate.
pub fn predict(
    x: &DVector<f64>,
    X: &DMatrix<f64>,
    F: &DMatrix<f64>,
    Q: &DMatrix<f64>,
    control: Option<(&DMatrix<f64>, &DVector<f64>)>,
) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let n = x.nrows();
    check_shape(F, n, n, "F")?;
    check_shape(X, n, n, "X")?;
    check_shape(Q, n, n, "Q")?;

    let mut x_pred = F * x;
    if let Some((B, u)) = control {
        check_shape(B, n, u.nrows(), "B")?;
        x_pred += B * u;
    }
    // X = F.X.F' + Q
    let X_pred = symmetrize(&(F * X * F.transpose() + Q));

    Ok((x_pred, X_pred))
}

/// Observation update step.
///
/// y = z - H.x, S = H.X.H' + R, K = X.H'.inv(S), x = x + K.y, X = (I - K.H).X
///
/// Fails with [`Error::SingularCovariance`] when S is not invertible, unless the options substitute its
/// pseudo-inverse.
pub fn update(
    x: &DVector<f64>,
    X: &DMatrix<f64>,
    z: &DVector<f64>,
    H: &DMatrix<f64>,
    R: &DMatrix<f64>,
    options: UpdateOptions,
) -> Result<Update> {
    let n = x.nrows();
    let m = z.nrows();
    check_shape(X, n, n, "X")?;
    check_shape(H, m, n, "H")?;
    check_shape(R, m, m, "R")?;

    let innovation = z - H * x;
    let XHt = X * H.transpose();
    // S = H.X.H' + R
    let S = symmetrize(&(H * &XHt + R));

    let SI = match invert(&S) {
        Some(SI) => SI,
        None => match options.singular {
            SingularPolicy::Fail => return Err(Error::SingularCovariance { step: None }),
            SingularPolicy::PseudoInverse => {
                warn!("innovation covariance singular, using pseudo-inverse");
                S.clone()
                    .pseudo_inverse(PINV_EPS)
                    .map_err(|_| Error::SingularCovariance { step: None })?
            }
        },
    };
    // Kalman gain, X.H'.SI
    let K = &XHt * SI;

    let x_upd = x + &K * &innovation;
    let IKH = DMatrix::<f64>::identity(n, n) - &K * H;
    let X_upd = match options.form {
        CovarianceForm::Standard => &IKH * X,
        CovarianceForm::Joseph => &IKH * X * IKH.transpose() + &K * R * K.transpose(),
    };

    Ok(Update {
        state: KalmanState {
            x: x_upd,
            X: symmetrize(&X_upd),
        },
        gain: K,
        innovation,
        innovation_cov: S,
    })
}

/// Inverse of a symmetric S, None if S is singular or not positive.
fn invert(S: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    // A zero or negative diagonal can never be inverted as a covariance
    if rcond::rcond_symmetric(S) <= 0. {
        return None;
    }
    S.clone()
        .try_inverse()
        .filter(|SI| SI.iter().all(|v| v.is_finite()))
}

impl KalmanState {
    /// Predict with the model's F, Q and optional control input u.
    pub fn predict(&self, model: &LinearGaussianModel, u: Option<&DVector<f64>>) -> Result<KalmanState> {
        let control = match (model.control(), u) {
            (Some(B), Some(u)) => Some((B, u)),
            (None, Some(_)) => {
                return Err(Error::InvalidModel("control input given but the model has no B".into()))
            }
            _ => None,
        };
        let (x, X) = predict(&self.x, &self.X, model.transition(), model.process_noise(), control)?;
        Ok(KalmanState { x, X })
    }

    /// Observe z with the model's H and R.
    pub fn observe(&self, z: &DVector<f64>, model: &LinearGaussianModel, options: UpdateOptions) -> Result<Update> {
        update(
            &self.x,
            &self.X,
            z,
            model.observation(),
            model.observation_noise(),
            options,
        )
    }

    /// Checks X is still positive semi-definite, returning its reciprocal condition estimate.
    pub fn check_psd(&self) -> Result<f64> {
        check_non_negative(rcond::rcond_symmetric(&self.X), "X not PSD")
            .map_err(|_| Error::NotPositiveSemiDefinite { step: None })
    }

    /// Standard deviation of each state element, sqrt(diag(X)).
    pub fn std_devs(&self) -> DVector<f64> {
        self.X.diagonal().map(|v| v.max(0.).sqrt())
    }
}
