//! Errors for GAS models (data validation, configuration checks, family
//! domain violations, and estimator failures).
//!
//! [`GASError`] is the single error type surfaced by the `gas` module and
//! by the Python-facing API. [`ConvergenceWarning`] is not an error: it is
//! collected on a fit result when an estimator stops at its iteration
//! budget without settling.
//!
//! ## Conventions
//! - **Indices are 0-based** (match Rust/NumPy).
//! - Family domain errors (`OutOfSupport`, `NonFiniteTheta`) never escape
//!   the recursion; they are absorbed into a `-∞` log-likelihood.
//! - Optimizer/backend errors are normalized to
//!   [`GASError::OptimizationFailed`] with a human-readable status, and
//!   inference errors to [`GASError::InferenceFailed`].
use crate::{inference::errors::InferenceError, optimization::errors::OptError};
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};
use statrs::distribution::{ExpError, PoissonError};

/// Crate-wide result alias for GAS operations.
pub type GASResult<T> = Result<T, GASError>;

/// Unified error type for GAS modeling.
#[derive(Debug, Clone, PartialEq)]
pub enum GASError {
    // ---- Input/data validation ----
    /// Series is empty (before or after differencing).
    EmptySeries,

    /// A data point is NaN/±inf.
    NonFiniteData { index: usize, value: f64 },

    /// Series is too short for the requested lag structure.
    InsufficientData { len: usize, needed: usize },

    // ---- Configuration ----
    /// Lag orders are inconsistent with the data.
    InvalidModelShape { param: usize, reason: &'static str },

    /// `fit` was given a method name it does not know.
    UnknownFitMethod { name: String },

    /// Forecast horizon is zero or exceeds the available history.
    InvalidHorizon { h: usize, reason: &'static str },

    /// Number of simulations must be positive.
    InvalidNsims { nsims: usize },

    /// Generic invalid option.
    InvalidOption { name: &'static str, reason: String },

    /// θ guards must be finite with min < max.
    InvalidThetaGuards { min: f64, max: f64, reason: &'static str },

    /// Latent vector has the wrong number of coordinates.
    LatentLengthMismatch { expected: usize, actual: usize },

    // ---- Family domain ----
    /// Observation lies outside the family support.
    OutOfSupport { index: usize, value: f64 },

    /// Recursion produced a non-finite θ_t.
    NonFiniteTheta { t: usize, value: f64 },

    /// Distribution parameter rejected by the sampler backend.
    InvalidFamilyParam { reason: String },

    // ---- Estimation ----
    /// Optimizer failed; include a human-readable status/reason.
    OptimizationFailed { status: String },

    /// Posterior approximation failed.
    InferenceFailed { reason: String },

    /// Log-likelihood is not finite at the fitted point.
    InfeasibleFit,

    /// Model hasn't been fitted yet.
    ModelNotFitted,
}

impl std::error::Error for GASError {}

impl std::fmt::Display for GASError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Input/data validation ----
            GASError::EmptySeries => write!(f, "Input series is empty."),
            GASError::NonFiniteData { index, value } => {
                write!(f, "Data point at index {index} is non-finite: {value}")
            }
            GASError::InsufficientData { len, needed } => {
                write!(f, "Series of length {len} is too short; at least {needed} observations needed.")
            }
            // ---- Configuration ----
            GASError::InvalidModelShape { param, reason } => {
                write!(f, "Invalid model order {param}: {reason}")
            }
            GASError::UnknownFitMethod { name } => write!(
                f,
                "Unknown fit method '{name}'. Valid options are 'MLE', 'PML', 'Laplace', 'M-H' or 'BBVI'."
            ),
            GASError::InvalidHorizon { h, reason } => {
                write!(f, "Invalid forecast horizon {h}: {reason}")
            }
            GASError::InvalidNsims { nsims } => {
                write!(f, "Number of simulations must be positive; got {nsims}.")
            }
            GASError::InvalidOption { name, reason } => {
                write!(f, "Invalid option '{name}': {reason}")
            }
            GASError::InvalidThetaGuards { min, max, reason } => {
                write!(f, "Theta guards must be finite with min ({min}) < max ({max}); {reason}")
            }
            GASError::LatentLengthMismatch { expected, actual } => {
                write!(f, "Latent vector length mismatch: expected {expected}, got {actual}")
            }
            // ---- Family domain ----
            GASError::OutOfSupport { index, value } => {
                write!(f, "Observation at index {index} is outside the family support: {value}")
            }
            GASError::NonFiniteTheta { t, value } => {
                write!(f, "Recursion produced non-finite theta_t at index {t}: {value}")
            }
            GASError::InvalidFamilyParam { reason } => {
                write!(f, "Invalid distribution parameter: {reason}")
            }
            // ---- Estimation ----
            GASError::OptimizationFailed { status } => {
                write!(f, "Optimizer failed with status: {status}")
            }
            GASError::InferenceFailed { reason } => write!(f, "Inference failed: {reason}"),
            GASError::InfeasibleFit => {
                write!(f, "Log-likelihood is not finite at the fitted latent values.")
            }
            GASError::ModelNotFitted => write!(f, "Model hasn't been fitted yet."),
        }
    }
}

/// Convert a [`GASError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl From<GASError> for PyErr {
    fn from(err: GASError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

impl From<OptError> for GASError {
    fn from(err: OptError) -> GASError {
        GASError::OptimizationFailed { status: err.to_string() }
    }
}

impl From<InferenceError> for GASError {
    fn from(err: InferenceError) -> GASError {
        GASError::InferenceFailed { reason: err.to_string() }
    }
}

/// Domain errors become infeasible points for the optimizer.
impl From<GASError> for OptError {
    fn from(err: GASError) -> OptError {
        OptError::InfeasiblePoint { reason: err.to_string() }
    }
}

impl From<ExpError> for GASError {
    fn from(err: ExpError) -> GASError {
        GASError::InvalidFamilyParam { reason: err.to_string() }
    }
}

impl From<PoissonError> for GASError {
    fn from(err: PoissonError) -> GASError {
        GASError::InvalidFamilyParam { reason: err.to_string() }
    }
}

impl From<rand_distr::ExpError> for GASError {
    fn from(err: rand_distr::ExpError) -> GASError {
        GASError::InvalidFamilyParam { reason: err.to_string() }
    }
}

impl From<rand_distr::PoissonError> for GASError {
    fn from(err: rand_distr::PoissonError) -> GASError {
        GASError::InvalidFamilyParam { reason: err.to_string() }
    }
}

/// Non-fatal notice that an estimator stopped without settling.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceWarning {
    /// Estimator that raised the warning (`"MLE"`, `"M-H"`, ...).
    pub source: &'static str,
    pub detail: String,
}

impl std::fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source, self.detail)
    }
}
