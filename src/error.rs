//! Error types for estimation, simulation and experiment handling.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed or dimensionally inconsistent model matrices.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// Non-positive step count, negative covariance entry or malformed numeric input.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The innovation covariance S could not be inverted.
    #[error("innovation covariance is singular{}", at_step(.step))]
    SingularCovariance { step: Option<usize> },

    /// A covariance lost positive semi-definiteness (negative or NaN diagonal).
    #[error("covariance is not positive semi-definite{}", at_step(.step))]
    NotPositiveSemiDefinite { step: Option<usize> },

    #[error("experiment not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Attaches the time index of a run to step level failures.
    pub fn at(self, t: usize) -> Self {
        match self {
            Error::SingularCovariance { .. } => Error::SingularCovariance { step: Some(t) },
            Error::NotPositiveSemiDefinite { .. } => Error::NotPositiveSemiDefinite { step: Some(t) },
            other => other,
        }
    }

    /// The failing time index, if the error arose inside a run.
    pub fn step(&self) -> Option<usize> {
        match self {
            Error::SingularCovariance { step } | Error::NotPositiveSemiDefinite { step } => *step,
            _ => None,
        }
    }
}

fn at_step(step: &Option<usize>) -> String {
    match step {
        Some(t) => format!(" at step {}", t),
        None => String::new(),
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidParameter(format!("experiment configuration: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
