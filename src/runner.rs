#![allow(non_snake_case)]

//! End to end simulation runs.
//!
//! A run generates truth and observations from a [`TrueSystem`], then filters the observations one at a time
//! with the filter's own [`LinearGaussianModel`], recording every step. A run either completes or fails with
//! the index of the failing step; partial series are never returned.
//!
//! [`TrueSystem`]: ../simulator/struct.TrueSystem.html
//! [`LinearGaussianModel`]: ../models/struct.LinearGaussianModel.html

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_core::RngCore;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::estimators::covariance::UpdateOptions;
use crate::experiment::ExperimentDefinition;
use crate::models::{KalmanState, LinearGaussianModel};
use crate::simulator::{simulate, TrueSystem, TruthSample};

/// Everything known about one time step of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct StepRecord {
    pub t: usize,
    /// True state
    pub x_true: DVector<f64>,
    /// Observation
    pub z: DVector<f64>,
    /// Posterior state estimate
    pub x_hat: DVector<f64>,
    /// Posterior covariance
    pub P: DMatrix<f64>,
    /// Kalman gain used at this step
    pub gain: DMatrix<f64>,
    pub innovation: DVector<f64>,
    pub innovation_cov: DMatrix<f64>,
}

/// The time series of a completed run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunResult {
    steps: Vec<StepRecord>,
}

/// Scalar measures of how well a run tracked the truth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    /// Root mean square of x_true - x_hat over all steps and states
    pub rmse_estimate: f64,
    /// Root mean square of x_true - z, only when observations and states have equal dimension
    pub rmse_measurement: Option<f64>,
    /// Fraction of state elements whose error lies inside the filter's own 2 sigma band
    pub within_two_sigma: f64,
}

impl RunResult {
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The last step of the run.
    pub fn final_state(&self) -> Option<&StepRecord> {
        self.steps.last()
    }

    /// Estimation error x_true - x_hat at each step.
    pub fn estimation_errors(&self) -> Vec<DVector<f64>> {
        self.steps.iter().map(|s| &s.x_true - &s.x_hat).collect()
    }

    /// Lower and upper x_hat -/+ k.sigma bands, sigma from the diagonal of P.
    ///
    /// The band is the filter's own uncertainty relative to the model it believes in. When the filter is
    /// mistuned it says nothing about the distance to the true process, which is exactly what the mistuning
    /// experiments show.
    pub fn sigma_bounds(&self, k: f64) -> Vec<(DVector<f64>, DVector<f64>)> {
        self.steps
            .iter()
            .map(|s| {
                let sigma = s.P.diagonal().map(|v| v.max(0.).sqrt());
                (&s.x_hat - &sigma * k, &s.x_hat + &sigma * k)
            })
            .collect()
    }

    /// Trace of the posterior covariance at each step.
    pub fn covariance_traces(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.P.trace()).collect()
    }

    /// Mean Frobenius norm of the Kalman gain over the run.
    pub fn mean_gain_norm(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.;
        }
        self.steps.iter().map(|s| s.gain.norm()).sum::<f64>() / self.steps.len() as f64
    }

    pub fn summary(&self) -> RunSummary {
        let mut sq_est = 0.;
        let mut sq_meas = 0.;
        let mut count = 0usize;
        let mut inside = 0usize;
        let comparable = self.steps.iter().all(|s| s.z.nrows() == s.x_true.nrows());
        for s in &self.steps {
            let err = &s.x_true - &s.x_hat;
            sq_est += err.norm_squared();
            if comparable {
                sq_meas += (&s.x_true - &s.z).norm_squared();
            }
            for i in 0..err.nrows() {
                count += 1;
                if err[i].abs() <= 2. * s.P[(i, i)].max(0.).sqrt() {
                    inside += 1;
                }
            }
        }
        let n = count.max(1) as f64;
        RunSummary {
            rmse_estimate: (sq_est / n).sqrt(),
            rmse_measurement: if comparable { Some((sq_meas / n).sqrt()) } else { None },
            within_two_sigma: inside as f64 / n,
        }
    }
}

/// Runs a filter model from an initial estimate against simulated or supplied truth.
#[derive(Clone, Debug)]
pub struct SimulationRunner {
    filter: LinearGaussianModel,
    initial: KalmanState,
    options: UpdateOptions,
}

impl SimulationRunner {
    pub fn new(filter: LinearGaussianModel, initial: KalmanState) -> Result<Self> {
        if initial.dim() != filter.state_dim() {
            return Err(Error::InvalidParameter(format!(
                "initial estimate has {} states, the filter model has {}",
                initial.dim(),
                filter.state_dim()
            )));
        }
        Ok(SimulationRunner {
            filter,
            initial,
            options: UpdateOptions::default(),
        })
    }

    /// Builds the runner for an experiment's filter parameters.
    pub fn for_experiment(experiment: &ExperimentDefinition) -> Result<Self> {
        SimulationRunner::new(experiment.params.model()?, experiment.params.initial_state()?)
    }

    pub fn with_options(mut self, options: UpdateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn filter(&self) -> &LinearGaussianModel {
        &self.filter
    }

    /// Simulates `num_steps` of the true system with `rng` and filters the observations.
    pub fn run<R: RngCore>(&self, system: &TrueSystem, num_steps: usize, rng: R) -> Result<RunResult> {
        if system.model().state_dim() != self.filter.state_dim() || system.model().obs_dim() != self.filter.obs_dim()
        {
            return Err(Error::InvalidParameter(
                "true system and filter model dimensions differ".into(),
            ));
        }
        let truth = simulate(system, num_steps, rng)?;
        self.run_with_truth(&truth)
    }

    /// Filters an existing truth sequence.
    ///
    /// Lets several filter configurations be compared on identical measurements.
    pub fn run_with_truth(&self, truth: &[TruthSample]) -> Result<RunResult> {
        if truth.is_empty() {
            return Err(Error::InvalidParameter("number of time steps must be positive".into()));
        }
        debug!(
            states = self.filter.state_dim(),
            observations = self.filter.obs_dim(),
            steps = truth.len(),
            "starting run"
        );

        let mut state = self.initial.clone();
        let mut steps = Vec::with_capacity(truth.len());
        for (t, sample) in truth.iter().enumerate() {
            if sample.x.nrows() != self.filter.state_dim() {
                return Err(Error::InvalidParameter(format!(
                    "true state {} has {} elements, expected {}",
                    t,
                    sample.x.nrows(),
                    self.filter.state_dim()
                )));
            }
            if sample.z.nrows() != self.filter.obs_dim() {
                return Err(Error::InvalidParameter(format!(
                    "observation {} has {} elements, expected {}",
                    t,
                    sample.z.nrows(),
                    self.filter.obs_dim()
                )));
            }
            let predicted = state.predict(&self.filter, None).map_err(|e| e.at(t))?;
            let update = predicted
                .observe(&sample.z, &self.filter, self.options)
                .map_err(|e| e.at(t))?;
            update.state.check_psd().map_err(|e| e.at(t))?;
            trace!(
                step = t,
                gain = update.gain.norm(),
                innovation = update.innovation.norm(),
                "step"
            );

            state = update.state;
            steps.push(StepRecord {
                t,
                x_true: sample.x.clone(),
                z: sample.z.clone(),
                x_hat: state.x.clone(),
                P: state.X.clone(),
                gain: update.gain,
                innovation: update.innovation,
                innovation_cov: update.innovation_cov,
            });
        }

        debug!(steps = steps.len(), "run complete");
        Ok(RunResult { steps })
    }
}

/// Runs an experiment with a generator seeded from `seed`.
///
/// The same definition and seed always give the same result.
pub fn run_experiment(experiment: &ExperimentDefinition, seed: u64) -> Result<RunResult> {
    let runner = SimulationRunner::for_experiment(experiment)?;
    let system = experiment.true_system.system()?;
    runner.run(&system, experiment.params.num_steps, StdRng::seed_from_u64(seed))
}
