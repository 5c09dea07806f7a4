#![allow(non_snake_case)]

//! Experiment definitions and the catalogue of mistuning scenarios.
//!
//! An experiment pairs the parameters of a filter with the parameters of the true system the filter is run
//! against. Experiments differ only in data. The standard catalogue tracks a nearly constant value and
//! mistunes the filter's Q or R in each direction.
//!
//! Parameters are plain serde structs so a catalogue can also be loaded from JSON. Matrices and vectors may be
//! given as a bare number, the one dimensional shorthand, or as arrays:
//!
//! ```json
//! { "F": [[1.0, 0.1], [0.0, 1.0]], "x0_hat": [0.0, 0.0], "Q": 0.01 }
//! ```

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{KalmanState, LinearGaussianModel};
use crate::simulator::TrueSystem;

/// A matrix parameter: a scalar for 1x1, or rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatrixSpec {
    Scalar(f64),
    Rows(Vec<Vec<f64>>),
}

impl MatrixSpec {
    pub fn to_matrix(&self, what: &str) -> Result<DMatrix<f64>> {
        match self {
            MatrixSpec::Scalar(v) => Ok(DMatrix::from_element(1, 1, *v)),
            MatrixSpec::Rows(rows) => {
                let ncols = rows.first().map_or(0, |r| r.len());
                if ncols == 0 {
                    return Err(Error::InvalidParameter(format!("{} is empty", what)));
                }
                if rows.iter().any(|r| r.len() != ncols) {
                    return Err(Error::InvalidParameter(format!("{} has rows of unequal length", what)));
                }
                let data: Vec<f64> = rows.iter().flatten().copied().collect();
                Ok(DMatrix::from_row_slice(rows.len(), ncols, &data))
            }
        }
    }

    /// Smallest diagonal element. NaN if any diagonal element is NaN.
    fn diagonal_min(&self) -> f64 {
        match self {
            MatrixSpec::Scalar(v) => *v,
            MatrixSpec::Rows(rows) => rows
                .iter()
                .enumerate()
                .filter_map(|(i, r)| r.get(i).copied())
                .fold(f64::INFINITY, |a, d| if a.is_nan() || d.is_nan() { f64::NAN } else { a.min(d) }),
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            MatrixSpec::Scalar(v) => v.is_finite(),
            MatrixSpec::Rows(rows) => rows.iter().flatten().all(|v| v.is_finite()),
        }
    }
}

/// A vector parameter: a scalar for 1 element, or elements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VectorSpec {
    Scalar(f64),
    Elements(Vec<f64>),
}

impl VectorSpec {
    pub fn to_vector(&self, what: &str) -> Result<DVector<f64>> {
        match self {
            VectorSpec::Scalar(v) => Ok(DVector::from_element(1, *v)),
            VectorSpec::Elements(e) if e.is_empty() => Err(Error::InvalidParameter(format!("{} is empty", what))),
            VectorSpec::Elements(e) => Ok(DVector::from_column_slice(e)),
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            VectorSpec::Scalar(v) => v.is_finite(),
            VectorSpec::Elements(e) => e.iter().all(|v| v.is_finite()),
        }
    }
}

/// The filter side of an experiment: the model the filter believes in and its initial estimate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub F: MatrixSpec,
    pub H: MatrixSpec,
    pub Q: MatrixSpec,
    pub R: MatrixSpec,
    pub x0_hat: VectorSpec,
    pub P0_hat: MatrixSpec,
    pub num_steps: usize,
}

impl FilterParams {
    /// Checks the step count, that every value is finite and the covariance signs, reporting problems as
    /// invalid parameters.
    pub fn validate(&self) -> Result<()> {
        if self.num_steps == 0 {
            return Err(Error::InvalidParameter("number of time steps must be positive".into()));
        }
        let matrices = [
            ("F", &self.F),
            ("H", &self.H),
            ("Q", &self.Q),
            ("R", &self.R),
            ("P0_hat", &self.P0_hat),
        ];
        if let Some((what, _)) = matrices.iter().find(|(_, m)| !m.is_finite()) {
            return Err(Error::InvalidParameter(format!("{} has non finite elements", what)));
        }
        if !self.x0_hat.is_finite() {
            return Err(Error::InvalidParameter("x0_hat has non finite elements".into()));
        }
        for (what, cov) in [("Q", &self.Q), ("R", &self.R), ("P0_hat", &self.P0_hat)].iter() {
            let min = cov.diagonal_min();
            if min < 0. || min.is_nan() {
                return Err(Error::InvalidParameter(format!(
                    "covariance {} cannot be negative, got {}",
                    what, min
                )));
            }
        }
        Ok(())
    }

    /// The filter's model.
    pub fn model(&self) -> Result<LinearGaussianModel> {
        self.validate()?;
        LinearGaussianModel::new(
            self.F.to_matrix("F")?,
            self.H.to_matrix("H")?,
            self.Q.to_matrix("Q")?,
            self.R.to_matrix("R")?,
        )
    }

    /// The filter's initial estimate x0_hat, P0_hat.
    pub fn initial_state(&self) -> Result<KalmanState> {
        self.validate()?;
        KalmanState::new(self.x0_hat.to_vector("x0_hat")?, self.P0_hat.to_matrix("P0_hat")?)
    }
}

/// The true system side of an experiment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrueSystemParams {
    pub initial_true_state: VectorSpec,
    pub true_F: MatrixSpec,
    pub true_Q_stddev: VectorSpec,
    pub true_H: MatrixSpec,
    pub true_R_stddev: VectorSpec,
}

impl TrueSystemParams {
    pub fn system(&self) -> Result<TrueSystem> {
        TrueSystem::from_std_devs(
            self.initial_true_state.to_vector("initial_true_state")?,
            self.true_F.to_matrix("true_F")?,
            self.true_H.to_matrix("true_H")?,
            &self.true_Q_stddev.to_vector("true_Q_stddev")?,
            &self.true_R_stddev.to_vector("true_R_stddev")?,
        )
    }
}

/// A named experiment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    pub name: String,
    /// What the experiment sets up and what to look for in the result.
    #[serde(default)]
    pub description: String,
    pub params: FilterParams,
    pub true_system: TrueSystemParams,
}

impl ExperimentDefinition {
    /// Checks the whole definition builds: filter model, initial estimate and true system.
    ///
    /// The filter and the true system must agree on the state and observation dimensions.
    pub fn validate(&self) -> Result<()> {
        let model = self.params.model()?;
        let initial = self.params.initial_state()?;
        let system = self.true_system.system()?;
        if initial.dim() != model.state_dim() {
            return Err(Error::InvalidParameter(format!(
                "x0_hat has {} elements, the filter model has {} states",
                initial.dim(),
                model.state_dim()
            )));
        }
        if system.model().state_dim() != model.state_dim() || system.model().obs_dim() != model.obs_dim() {
            return Err(Error::InvalidParameter(format!(
                "filter model is {}x{} (states x observations) but the true system is {}x{}",
                model.state_dim(),
                model.obs_dim(),
                system.model().state_dim(),
                system.model().obs_dim()
            )));
        }
        Ok(())
    }

    /// A copy with user edits applied, validated before any simulation is run.
    pub fn with_overrides(&self, overrides: &FilterOverrides) -> Result<ExperimentDefinition> {
        let mut params = self.params.clone();
        if let Some(F) = &overrides.F {
            params.F = F.clone();
        }
        if let Some(H) = &overrides.H {
            params.H = H.clone();
        }
        if let Some(Q) = &overrides.Q {
            params.Q = Q.clone();
        }
        if let Some(R) = &overrides.R {
            params.R = R.clone();
        }
        if let Some(x0) = &overrides.x0_hat {
            params.x0_hat = x0.clone();
        }
        if let Some(P0) = &overrides.P0_hat {
            params.P0_hat = P0.clone();
        }
        if let Some(steps) = overrides.num_steps {
            if steps <= 0 {
                return Err(Error::InvalidParameter(format!(
                    "number of time steps must be positive, got {}",
                    steps
                )));
            }
            params.num_steps = steps as usize;
        }
        let edited = ExperimentDefinition {
            params,
            ..self.clone()
        };
        edited.validate()?;
        Ok(edited)
    }
}

/// User edits of a filter's parameters. Unset fields keep the experiment's value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOverrides {
    pub F: Option<MatrixSpec>,
    pub H: Option<MatrixSpec>,
    pub Q: Option<MatrixSpec>,
    pub R: Option<MatrixSpec>,
    pub x0_hat: Option<VectorSpec>,
    pub P0_hat: Option<MatrixSpec>,
    pub num_steps: Option<i64>,
}

impl FilterOverrides {
    /// Sets one parameter from text, as typed into an input field.
    ///
    /// Matrix and vector parameters take a single number (the one dimensional case).
    pub fn set(&mut self, key: &str, text: &str) -> Result<()> {
        let text = text.trim();
        let number = || {
            text.parse::<f64>()
                .map_err(|_| Error::InvalidParameter(format!("{}: '{}' is not a number", key, text)))
        };
        match key {
            "F" => self.F = Some(MatrixSpec::Scalar(number()?)),
            "H" => self.H = Some(MatrixSpec::Scalar(number()?)),
            "Q" => self.Q = Some(MatrixSpec::Scalar(number()?)),
            "R" => self.R = Some(MatrixSpec::Scalar(number()?)),
            "x0_hat" => self.x0_hat = Some(VectorSpec::Scalar(number()?)),
            "P0_hat" => self.P0_hat = Some(MatrixSpec::Scalar(number()?)),
            "num_steps" => {
                let steps = text
                    .parse::<i64>()
                    .map_err(|_| Error::InvalidParameter(format!("num_steps: '{}' is not an integer", text)))?;
                self.num_steps = Some(steps);
            }
            _ => return Err(Error::InvalidParameter(format!("unknown parameter '{}'", key))),
        }
        Ok(())
    }
}

/// An ordered, read-only collection of experiments.
#[derive(Clone, Debug, PartialEq)]
pub struct ExperimentCatalogue {
    experiments: Vec<ExperimentDefinition>,
}

impl ExperimentCatalogue {
    /// Creates a catalogue, validating every definition. Names must be unique.
    pub fn new(experiments: Vec<ExperimentDefinition>) -> Result<Self> {
        for (i, e) in experiments.iter().enumerate() {
            if experiments[..i].iter().any(|other| other.name == e.name) {
                return Err(Error::InvalidParameter(format!("duplicate experiment name '{}'", e.name)));
            }
            e.validate()?;
        }
        Ok(ExperimentCatalogue { experiments })
    }

    /// Loads a catalogue from a JSON array of experiment definitions.
    pub fn from_json(json: &str) -> Result<Self> {
        let experiments: Vec<ExperimentDefinition> = serde_json::from_str(json)?;
        ExperimentCatalogue::new(experiments)
    }

    /// The built in mistuning experiments.
    pub fn standard() -> Self {
        ExperimentCatalogue {
            experiments: vec![
                constant_value(
                    "1. Track constant value (good Q, R)",
                    "Estimate a nearly constant value from noisy measurements. The true value drifts slightly \
                     over time and the filter is given fairly accurate Q and R.\n\
                     Look at how closely the estimate tracks the truth and how much it smooths the measurements.",
                    0.01,
                    0.25,
                ),
                constant_value(
                    "2. Track constant value (filter Q too small)",
                    "The true value drifts but the filter assumes almost no drift.\n\
                     The filter becomes over confident and slow to follow changes, lagging the true state.",
                    0.0001,
                    0.25,
                ),
                constant_value(
                    "3. Track constant value (filter Q too large)",
                    "The true value drifts moderately but the filter assumes a lot of drift.\n\
                     The filter responds too strongly to each measurement and the estimate stays noisy.",
                    1.0,
                    0.25,
                ),
                constant_value(
                    "4. Track constant value (filter R too small)",
                    "The measurements are noisy but the filter assumes they are precise.\n\
                     The estimate follows the noisy measurements instead of smoothing them.",
                    0.01,
                    0.01,
                ),
                constant_value(
                    "5. Track constant value (filter R too large)",
                    "The measurements are fairly precise but the filter assumes they are very noisy.\n\
                     The filter leans on its prediction; the estimate is over smooth and slow to respond.",
                    0.01,
                    5.0,
                ),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExperimentDefinition> {
        self.experiments.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.experiments.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn get(&self, index: usize) -> Result<&ExperimentDefinition> {
        self.experiments
            .get(index)
            .ok_or_else(|| Error::NotFound(format!("no experiment at index {}", index)))
    }

    pub fn by_name(&self, name: &str) -> Result<&ExperimentDefinition> {
        debug!(experiment = name, "looking up experiment");
        self.experiments
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::NotFound(format!("no experiment named '{}'", name)))
    }
}

impl Default for ExperimentCatalogue {
    fn default() -> Self {
        ExperimentCatalogue::standard()
    }
}

/// Tracking a drifting constant near 10 with a filter started at 0.
fn constant_value(name: &str, description: &str, q: f64, r: f64) -> ExperimentDefinition {
    ExperimentDefinition {
        name: name.to_string(),
        description: description.to_string(),
        params: FilterParams {
            F: MatrixSpec::Scalar(1.0),
            H: MatrixSpec::Scalar(1.0),
            Q: MatrixSpec::Scalar(q),
            R: MatrixSpec::Scalar(r),
            x0_hat: VectorSpec::Scalar(0.0),
            P0_hat: MatrixSpec::Scalar(1.0),
            num_steps: 100,
        },
        true_system: TrueSystemParams {
            initial_true_state: VectorSpec::Scalar(10.0),
            true_F: MatrixSpec::Scalar(1.0),
            true_Q_stddev: VectorSpec::Scalar(0.1),
            true_H: MatrixSpec::Scalar(1.0),
            true_R_stddev: VectorSpec::Scalar(0.5),
        },
    }
}
