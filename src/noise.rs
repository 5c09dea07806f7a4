#![allow(non_snake_case)]

//! Additive Gaussian noise models.
//!
//! Linear noise models are represented as structs. Each can report its covariance and draw samples from an
//! explicitly supplied random number generator; there is no process global randomness.

use nalgebra::{DMatrix, DVector};
use rand_core::RngCore;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{Error, Result};
use crate::linalg::check_covariance;

/// A source of additive zero mean Gaussian noise.
pub trait NoiseSource {
    /// Dimension of the noise vector.
    fn dim(&self) -> usize;

    /// The noise covariance.
    fn covariance(&self) -> DMatrix<f64>;

    /// Draws one noise vector.
    fn sample<R: RngCore + ?Sized>(&self, rng: &mut R) -> DVector<f64>;
}

/// Additive noise.
///
/// Noise represented as a variance vector; elements are independent.
#[derive(Clone, Debug, PartialEq)]
pub struct UncorrelatedNoise {
    /// Noise variance
    pub q: DVector<f64>,
}

impl UncorrelatedNoise {
    /// Creates noise from per element standard deviations.
    pub fn from_std_devs(std_devs: &DVector<f64>) -> Result<Self> {
        if let Some(sd) = std_devs.iter().find(|sd| !(**sd >= 0.) || !sd.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "noise standard deviation must be finite and non-negative, got {}",
                sd
            )));
        }
        Ok(UncorrelatedNoise {
            q: std_devs.map(|sd| sd * sd),
        })
    }
}

impl NoiseSource for UncorrelatedNoise {
    fn dim(&self) -> usize {
        self.q.nrows()
    }

    fn covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&self.q)
    }

    fn sample<R: RngCore + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        // One independent draw per element, in element order
        self.q.map(|q| {
            let n: f64 = StandardNormal.sample(&mut *rng);
            q.sqrt() * n
        })
    }
}

/// Additive noise.
///
/// Noise represented as a noise covariance matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelatedNoise {
    /// Noise covariance
    pub Q: DMatrix<f64>,
}

impl CorrelatedNoise {
    /// Creates a CorrelatedNoise from an UncorrelatedNoise.
    pub fn from_uncorrelated(uncorrelated: &UncorrelatedNoise) -> Self {
        CorrelatedNoise {
            Q: uncorrelated.covariance(),
        }
    }
}

/// Additive noise.
///
/// Noise represented as a variance vector and a noise coupling matrix.
/// The noise covariance is G.q.G'.
#[derive(Clone, Debug, PartialEq)]
pub struct CoupledNoise {
    /// Noise variance
    pub q: DVector<f64>,
    /// Noise coupling
    pub G: DMatrix<f64>,
}

impl CoupledNoise {
    /// Creates a CoupledNoise from a CorrelatedNoise.
    ///
    /// The CorrelatedNoise must be PSD. It is factorised by its symmetric eigen decomposition, G being the
    /// eigenvectors and q the eigenvalues. Round off can make eigenvalues of a semi-definite Q slightly
    /// negative; these are clamped to zero.
    pub fn from_correlated(correlated: &CorrelatedNoise) -> Result<Self> {
        check_covariance(&correlated.Q, "noise covariance")?;
        let eigen = correlated.Q.clone().symmetric_eigen();
        let scale = correlated.Q.iter().fold(0f64, |a, v| a.max(v.abs()));
        if let Some(lambda) = eigen.eigenvalues.iter().find(|l| **l < -1e-9 * scale.max(1.)) {
            return Err(Error::InvalidModel(format!(
                "noise covariance not PSD, eigenvalue {}",
                lambda
            )));
        }
        Ok(CoupledNoise {
            q: eigen.eigenvalues.map(|l| l.max(0.)),
            G: eigen.eigenvectors,
        })
    }
}

impl NoiseSource for CoupledNoise {
    fn dim(&self) -> usize {
        self.G.nrows()
    }

    fn covariance(&self) -> DMatrix<f64> {
        &self.G * DMatrix::from_diagonal(&self.q) * self.G.transpose()
    }

    fn sample<R: RngCore + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let independent = self.q.map(|q| {
            let n: f64 = StandardNormal.sample(&mut *rng);
            q.sqrt() * n
        });
        &self.G * independent
    }
}

/// Noise of a true system: either independent per element or with a full covariance.
#[derive(Clone, Debug, PartialEq)]
pub enum Noise {
    Uncorrelated(UncorrelatedNoise),
    Coupled(CoupledNoise),
}

impl Noise {
    /// Chooses the cheapest representation of a covariance: independent draws when Q is diagonal.
    pub fn from_covariance(Q: &DMatrix<f64>) -> Result<Self> {
        check_covariance(Q, "noise covariance")?;
        let diagonal = (0..Q.nrows()).all(|i| (0..Q.ncols()).all(|j| i == j || Q[(i, j)] == 0.));
        if diagonal {
            Ok(Noise::Uncorrelated(UncorrelatedNoise { q: Q.diagonal() }))
        } else {
            Ok(Noise::Coupled(CoupledNoise::from_correlated(&CorrelatedNoise {
                Q: Q.clone(),
            })?))
        }
    }
}

impl NoiseSource for Noise {
    fn dim(&self) -> usize {
        match self {
            Noise::Uncorrelated(n) => n.dim(),
            Noise::Coupled(n) => n.dim(),
        }
    }

    fn covariance(&self) -> DMatrix<f64> {
        match self {
            Noise::Uncorrelated(n) => n.covariance(),
            Noise::Coupled(n) => n.covariance(),
        }
    }

    fn sample<R: RngCore + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        match self {
            Noise::Uncorrelated(n) => n.sample(rng),
            Noise::Coupled(n) => n.sample(rng),
        }
    }
}
