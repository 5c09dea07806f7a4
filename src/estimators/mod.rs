//! Bayesian state estimators.

pub mod covariance;
