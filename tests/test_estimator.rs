#![allow(non_snake_case)]

//! Test the numerical operations of the covariance estimator.
//!
//! The predict and update functions are pure so each property is checked directly on hand built states.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kalman_lab::estimators::covariance::{predict, update, CovarianceForm, SingularPolicy, UpdateOptions};
use kalman_lab::linalg::{is_symmetric, SYMMETRY_TOLERANCE};
use kalman_lab::models::{KalmanState, LinearGaussianModel};
use kalman_lab::Error;

const DT: f64 = 0.1;
// Velocity process noise
const V_NOISE: f64 = 0.05;
// Noise on observing position
const OBS_NOISE: f64 = 0.2;

fn scalar(v: f64) -> DMatrix<f64> {
    DMatrix::from_element(1, 1, v)
}

fn vector(v: &[f64]) -> DVector<f64> {
    DVector::from_column_slice(v)
}

/// Constant velocity model, position observed.
fn constant_velocity() -> LinearGaussianModel {
    LinearGaussianModel::new(
        DMatrix::from_row_slice(2, 2, &[1., DT, 0., 1.]),
        DMatrix::from_row_slice(1, 2, &[1., 0.]),
        DMatrix::from_row_slice(2, 2, &[0., 0., 0., V_NOISE * V_NOISE]),
        scalar(OBS_NOISE * OBS_NOISE),
    )
    .unwrap()
}

#[test]
fn test_predict_scalar() {
    let (x, X) = predict(&vector(&[0.]), &scalar(1.), &scalar(1.), &scalar(0.01), None).unwrap();
    approx::assert_relative_eq!(x[0], 0.);
    approx::assert_relative_eq!(X[(0, 0)], 1.01);
}

#[test]
fn test_predict_two_states() {
    let F = DMatrix::from_row_slice(2, 2, &[1., 0.1, 0., 1.]);
    let Q = DMatrix::from_row_slice(2, 2, &[0.01, 0., 0., 0.02]);
    let (x, X) = predict(&vector(&[1., 2.]), &DMatrix::identity(2, 2), &F, &Q, None).unwrap();

    approx::assert_relative_eq!(x, vector(&[1.2, 2.]), epsilon = 1e-12);
    let expect = DMatrix::from_row_slice(2, 2, &[1.02, 0.1, 0.1, 1.02]);
    approx::assert_relative_eq!(X, expect, epsilon = 1e-12);
}

#[test]
fn test_predict_with_control() {
    let model = constant_velocity()
        .with_control(DMatrix::from_row_slice(2, 1, &[0.5, 1.]))
        .unwrap();
    let state = KalmanState::new(vector(&[1., 2.]), DMatrix::identity(2, 2)).unwrap();

    let predicted = state.predict(&model, Some(&vector(&[2.]))).unwrap();
    approx::assert_relative_eq!(predicted.x, vector(&[1. + DT * 2. + 1., 2. + 2.]), epsilon = 1e-12);

    // Without u the control term is absent
    let free = state.predict(&model, None).unwrap();
    approx::assert_relative_eq!(free.x, vector(&[1. + DT * 2., 2.]), epsilon = 1e-12);

    // A control input for a model without B is a model error
    match state.predict(&constant_velocity(), Some(&vector(&[2.]))) {
        Err(Error::InvalidModel(_)) => {}
        other => panic!("expected InvalidModel, got {:?}", other),
    }
}

#[test]
fn test_update_scalar() {
    let upd = update(
        &vector(&[0.]),
        &scalar(1.01),
        &vector(&[10.]),
        &scalar(1.),
        &scalar(0.25),
        UpdateOptions::default(),
    )
    .unwrap();

    let S = 1.01 + 0.25;
    let K = 1.01 / S;
    approx::assert_relative_eq!(upd.innovation[0], 10.);
    approx::assert_relative_eq!(upd.innovation_cov[(0, 0)], S);
    approx::assert_relative_eq!(upd.gain[(0, 0)], K, max_relative = 1e-12);
    approx::assert_relative_eq!(upd.state.x[0], K * 10., max_relative = 1e-12);
    approx::assert_relative_eq!(upd.state.X[(0, 0)], (1. - K) * 1.01, max_relative = 1e-12);
}

#[test]
fn test_covariance_symmetric_and_trace_non_increasing() {
    let model = constant_velocity();
    let mut state = KalmanState::new(vector(&[0., 1.]), DMatrix::from_row_slice(2, 2, &[10., 1., 1., 5.])).unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..200 {
        let predicted = state.predict(&model, None).unwrap();
        assert!(is_symmetric(&predicted.X, SYMMETRY_TOLERANCE));

        let z = vector(&[rng.gen_range(-5.0..5.0)]);
        let upd = predicted.observe(&z, &model, UpdateOptions::default()).unwrap();
        assert!(is_symmetric(&upd.state.X, SYMMETRY_TOLERANCE));
        assert_eq!(upd.state.X, upd.state.X.transpose());
        assert!(upd.state.X.trace() <= predicted.X.trace() + 1e-12);
        upd.state.check_psd().unwrap();

        state = upd.state;
    }
}

#[test]
fn test_observation_trusted_as_noise_vanishes() {
    let x_pred = vector(&[1., 2.]);
    let X_pred = DMatrix::from_row_slice(2, 2, &[2., 0.5, 0.5, 1.]);
    let z = vector(&[3., -1.]);
    let R = DMatrix::<f64>::identity(2, 2) * 1e-12;

    let upd = update(&x_pred, &X_pred, &z, &DMatrix::identity(2, 2), &R, UpdateOptions::default()).unwrap();
    approx::assert_relative_eq!(upd.state.x, z, epsilon = 1e-9);
    approx::assert_relative_eq!(upd.gain, DMatrix::identity(2, 2), epsilon = 1e-9);
}

#[test]
fn test_singular_innovation_covariance() {
    let res = update(
        &vector(&[1.]),
        &scalar(1.),
        &vector(&[2.]),
        &scalar(0.),
        &scalar(0.),
        UpdateOptions::default(),
    );
    assert_eq!(res, Err(Error::SingularCovariance { step: None }));

    // Singular with a positive diagonal
    let res = update(
        &vector(&[0., 0.]),
        &DMatrix::from_row_slice(2, 2, &[1., 1., 1., 1.]),
        &vector(&[1., 1.]),
        &DMatrix::identity(2, 2),
        &DMatrix::zeros(2, 2),
        UpdateOptions::default(),
    );
    assert_eq!(res, Err(Error::SingularCovariance { step: None }));
}

#[test]
fn test_singular_pseudo_inverse() {
    let options = UpdateOptions {
        singular: SingularPolicy::PseudoInverse,
        ..UpdateOptions::default()
    };
    let upd = update(&vector(&[1.]), &scalar(0.), &vector(&[2.]), &scalar(1.), &scalar(0.), options).unwrap();

    // Nothing is learnt from the observation
    approx::assert_relative_eq!(upd.gain[(0, 0)], 0.);
    approx::assert_relative_eq!(upd.state.x[0], 1.);
    approx::assert_relative_eq!(upd.state.X[(0, 0)], 0.);
}

#[test]
fn test_joseph_form_matches_standard() {
    let x_pred = vector(&[0.5, -0.2]);
    let X_pred = DMatrix::from_row_slice(2, 2, &[2., 0.3, 0.3, 0.7]);
    let H = DMatrix::from_row_slice(1, 2, &[1., 0.]);
    let z = vector(&[1.3]);
    let R = scalar(0.4);

    let standard = update(&x_pred, &X_pred, &z, &H, &R, UpdateOptions::default()).unwrap();
    let joseph = update(
        &x_pred,
        &X_pred,
        &z,
        &H,
        &R,
        UpdateOptions {
            form: CovarianceForm::Joseph,
            ..UpdateOptions::default()
        },
    )
    .unwrap();

    approx::assert_relative_eq!(standard.state.x, joseph.state.x, epsilon = 1e-12);
    approx::assert_relative_eq!(standard.state.X, joseph.state.X, epsilon = 1e-12);
}

#[test]
fn test_dimension_mismatch() {
    let res = predict(
        &vector(&[1., 2.]),
        &DMatrix::identity(2, 2),
        &DMatrix::identity(3, 3),
        &DMatrix::identity(2, 2),
        None,
    );
    match res {
        Err(Error::InvalidModel(_)) => {}
        other => panic!("expected InvalidModel, got {:?}", other),
    }

    let res = update(
        &vector(&[1., 2.]),
        &DMatrix::identity(2, 2),
        &vector(&[1.]),
        &DMatrix::identity(2, 2),
        &scalar(1.),
        UpdateOptions::default(),
    );
    match res {
        Err(Error::InvalidModel(_)) => {}
        other => panic!("expected InvalidModel, got {:?}", other),
    }
}

#[test]
fn test_check_psd() {
    let good = KalmanState::new(vector(&[0., 0.]), DMatrix::from_row_slice(2, 2, &[4., 0., 0., 1.])).unwrap();
    approx::assert_relative_eq!(good.check_psd().unwrap(), 0.25);
    approx::assert_relative_eq!(good.std_devs(), vector(&[2., 1.]));

    let bad = KalmanState {
        x: vector(&[0.]),
        X: scalar(-1.),
    };
    assert_eq!(bad.check_psd(), Err(Error::NotPositiveSemiDefinite { step: None }));
}
