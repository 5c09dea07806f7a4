#![allow(non_snake_case)]

//! Synthetic truth and measurement generation.
//!
//! A [`TrueSystem`] is propagated forward with injected process and measurement noise:
//!
//! x_true(t) = F.x_true(t-1) + w(t),  z(t) = H.x_true(t) + v(t)
//!
//! The simulator knows nothing of any filter. All randomness comes from the generator handed to
//! [`TruthSimulator::new`], so a seeded generator reproduces the same sequence.
//!
//! [`TrueSystem`]: struct.TrueSystem.html
//! [`TruthSimulator::new`]: struct.TruthSimulator.html#method.new

use nalgebra::{DMatrix, DVector};
use rand_core::RngCore;

use crate::error::{Error, Result};
use crate::models::LinearGaussianModel;
use crate::noise::{Noise, NoiseSource, UncorrelatedNoise};

/// The generative model of an experiment together with its initial state.
#[derive(Clone, Debug, PartialEq)]
pub struct TrueSystem {
    model: LinearGaussianModel,
    initial_state: DVector<f64>,
    process: Noise,
    measurement: Noise,
}

impl TrueSystem {
    /// A true system whose noise is drawn from the model's Q and R.
    pub fn new(model: LinearGaussianModel, initial_state: DVector<f64>) -> Result<Self> {
        if initial_state.nrows() != model.state_dim() {
            return Err(Error::InvalidModel(format!(
                "initial true state has {} elements, expected {}",
                initial_state.nrows(),
                model.state_dim()
            )));
        }
        let process = Noise::from_covariance(model.process_noise())?;
        let measurement = Noise::from_covariance(model.observation_noise())?;
        Ok(TrueSystem {
            model,
            initial_state,
            process,
            measurement,
        })
    }

    /// A true system with independent noise given by per element standard deviations.
    pub fn from_std_devs(
        initial_state: DVector<f64>,
        F: DMatrix<f64>,
        H: DMatrix<f64>,
        q_std: &DVector<f64>,
        r_std: &DVector<f64>,
    ) -> Result<Self> {
        let process = UncorrelatedNoise::from_std_devs(q_std)?;
        let measurement = UncorrelatedNoise::from_std_devs(r_std)?;
        let model = LinearGaussianModel::new(F, H, process.covariance(), measurement.covariance())?;
        TrueSystem::new(model, initial_state)
    }

    pub fn model(&self) -> &LinearGaussianModel {
        &self.model
    }

    pub fn initial_state(&self) -> &DVector<f64> {
        &self.initial_state
    }
}

/// One step of simulated truth.
#[derive(Clone, Debug, PartialEq)]
pub struct TruthSample {
    /// True state x_true(t)
    pub x: DVector<f64>,
    /// Observation z(t)
    pub z: DVector<f64>,
}

/// Steps a [`TrueSystem`] forward, one [`TruthSample`] per call to `next`.
///
/// The iterator never ends; use `take` or [`simulate`] to bound it.
///
/// [`TrueSystem`]: struct.TrueSystem.html
/// [`TruthSample`]: struct.TruthSample.html
/// [`simulate`]: fn.simulate.html
pub struct TruthSimulator<'a, R: RngCore> {
    system: &'a TrueSystem,
    x: DVector<f64>,
    rng: R,
}

impl<'a, R: RngCore> TruthSimulator<'a, R> {
    pub fn new(system: &'a TrueSystem, rng: R) -> Self {
        TruthSimulator {
            system,
            x: system.initial_state.clone(),
            rng,
        }
    }

    /// Advances the true state and observes it.
    pub fn step(&mut self) -> TruthSample {
        let model = &self.system.model;
        // Process noise is drawn before measurement noise
        let w = self.system.process.sample(&mut self.rng);
        self.x = model.transition() * &self.x + w;
        let v = self.system.measurement.sample(&mut self.rng);
        let z = model.observation() * &self.x + v;
        TruthSample { x: self.x.clone(), z }
    }
}

impl<'a, R: RngCore> Iterator for TruthSimulator<'a, R> {
    type Item = TruthSample;

    fn next(&mut self) -> Option<TruthSample> {
        Some(self.step())
    }
}

/// Generates `num_steps` samples of truth and observations.
pub fn simulate<R: RngCore>(system: &TrueSystem, num_steps: usize, rng: R) -> Result<Vec<TruthSample>> {
    if num_steps == 0 {
        return Err(Error::InvalidParameter("number of time steps must be positive".into()));
    }
    Ok(TruthSimulator::new(system, rng).take(num_steps).collect())
}
