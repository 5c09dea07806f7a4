//
// Kalman Lab, linear Kalman filter experiments.
// Derived from Bayes+Estimate the Bayesian estimation library.
// Copyright (c) 2020 Michael Stevens
//
// # Licensing
//
// The copyright notice is that of the MIT license.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction,
// including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software,
// and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON INFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY,
// WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Kalman Lab, linear Kalman filter experiments.
//!
//! A discrete linear Kalman filter estimates the state of a linear-Gaussian dynamic system from noisy
//! observations of it. The filter needs a model of the system: the state transition F, the observation matrix H
//! and the covariances Q and R of the process and observation noise. When the model's noise covariances do not
//! match the real system the filter is mistuned; it still runs, but it trusts either its prediction or the
//! observations more than it should.
//!
//! This library makes that effect observable. A true system is simulated to generate a ground truth trajectory
//! and noisy observations, the observations are filtered one step at a time, and every step of the run is
//! recorded for inspection.
//!
//! Models are represented by [`models::LinearGaussianModel`], the estimate by [`models::KalmanState`].
//! Estimation is implemented by the pure [`estimators::covariance::predict`] and
//! [`estimators::covariance::update`] functions. [`simulator`] generates truth, [`experiment`] holds the
//! catalogue of mistuning scenarios and [`runner`] ties them together.
//!
//! ```
//! use kalman_lab::experiment::ExperimentCatalogue;
//! use kalman_lab::runner::run_experiment;
//!
//! let catalogue = ExperimentCatalogue::standard();
//! let well_tuned = catalogue.get(0).unwrap();
//! let result = run_experiment(well_tuned, 42).unwrap();
//! assert_eq!(result.len(), 100);
//! ```
//!
//! All randomness comes from explicitly supplied generators. Runs share no state and can execute on separate
//! threads.

pub mod error;
pub mod estimators;
pub mod experiment;
pub mod linalg;
pub mod models;
pub mod noise;
pub mod runner;
pub mod simulator;

pub use error::{Error, Result};
