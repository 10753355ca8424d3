//! Unified error handling for inference routines.
//!
//! `InferenceError` covers failures of the posterior-approximation layer:
//! covariance construction from an observed information matrix, the
//! Metropolis–Hastings sampler, and black-box variational inference. The
//! alias `InferenceResult<T>` standardizes the return type across
//! inference code.
use crate::optimization::errors::OptError;

/// Unified error type for inference routines.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    // ---- Covariance ----
    /// Observed information is not positive definite at the mode.
    SingularHessian {
        min_eigenvalue: f64,
    },

    /// Finite-difference Hessian could not be built.
    HessianFailed {
        reason: String,
    },

    /// Covariance contains NaN or infinite entries.
    NonFiniteCovariance,

    /// Covariance shape does not match the latent dimension.
    CovarianceDimMismatch {
        expected: usize,
        found: (usize, usize),
    },

    // ---- Samplers ----
    /// Log-posterior is not finite at the starting point.
    InfeasibleStart {
        value: f64,
    },

    /// Invalid sampler or optimizer setting.
    InvalidOption {
        name: &'static str,
        reason: &'static str,
    },

    /// Unknown stochastic optimizer name.
    UnknownStepRule {
        name: String,
    },
}

pub type InferenceResult<T> = Result<T, InferenceError>;

impl std::error::Error for InferenceError {}

impl From<OptError> for InferenceError {
    fn from(err: OptError) -> Self {
        InferenceError::HessianFailed { reason: err.to_string() }
    }
}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Covariance ----
            InferenceError::SingularHessian { min_eigenvalue } => write!(
                f,
                "Inference Error: Observed information is not positive definite (min eigenvalue = {min_eigenvalue})"
            ),
            InferenceError::HessianFailed { reason } => {
                write!(f, "Inference Error: Hessian computation failed: {reason}")
            }
            InferenceError::NonFiniteCovariance => {
                write!(f, "Inference Error: Covariance matrix has non-finite entries")
            }
            InferenceError::CovarianceDimMismatch { expected, found } => write!(
                f,
                "Inference Error: Covariance dimension mismatch: expected ({expected}, {expected}), found {found:?}"
            ),

            // ---- Samplers ----
            InferenceError::InfeasibleStart { value } => {
                write!(f, "Inference Error: Log-posterior at the starting point is {value}")
            }
            InferenceError::InvalidOption { name, reason } => {
                write!(f, "Inference Error: Invalid option '{name}': {reason}")
            }
            InferenceError::UnknownStepRule { name } => write!(
                f,
                "Inference Error: Unknown optimizer '{name}'. Valid options are 'RMSProp' or 'ADAM'"
            ),
        }
    }
}
