//! optimization::errors — failures of the mode-search layer.
//!
//! [`OptError`] covers bad optimizer settings, malformed numerical output
//! (gradients, Hessians, final estimates), points where a GAS objective
//! cannot be evaluated, and anything argmin itself reports. Model code
//! raises `InfeasiblePoint`; the rest originates inside this layer.
use argmin::core::{ArgminError, Error};

pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Derivatives ----
    /// The objective has no analytic gradient; finite differences apply.
    GradientNotImplemented,
    GradientDimMismatch {
        expected: usize,
        found: usize,
    },
    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },
    HessianDimMismatch {
        expected: usize,
        found: (usize, usize),
    },
    InvalidHessian {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- Settings ----
    InvalidTolGrad {
        tol: f64,
        reason: &'static str,
    },
    InvalidTolCost {
        tol: f64,
        reason: &'static str,
    },
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    NoTolerancesProvided,
    InvalidLineSearch {
        name: String,
        reason: &'static str,
    },
    InvalidLBFGSMem {
        mem: usize,
        reason: &'static str,
    },

    // ---- Objective and outcome ----
    NonFiniteCost {
        value: f64,
    },
    /// The GAS objective cannot be evaluated at this latent vector, e.g. an
    /// observation outside the family support or a recursion that overflowed.
    InfeasiblePoint {
        reason: String,
    },
    InvalidThetaHat {
        index: usize,
        value: f64,
        reason: &'static str,
    },
    MissingThetaHat,

    // ---- argmin ----
    /// An `ArgminError` variant, tagged with the variant name.
    Argmin {
        kind: &'static str,
        text: String,
    },
    /// Any other error that escaped an argmin run.
    BackendError {
        text: String,
    },
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptError::GradientNotImplemented => write!(f, "No analytic gradient available"),
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient has {found} entries, expected {expected}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Gradient entry {index} is {value}: {reason}")
            }
            OptError::HessianDimMismatch { expected, found } => {
                write!(f, "Hessian has shape {found:?}, expected ({expected}, {expected})")
            }
            OptError::InvalidHessian { row, col, value } => {
                write!(f, "Hessian entry ({row}, {col}) is {value}, must be finite")
            }

            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Gradient tolerance {tol} rejected: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Cost-change tolerance {tol} rejected: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Iteration cap {max_iter} rejected: {reason}")
            }
            OptError::NoTolerancesProvided => {
                write!(f, "At least one stopping rule (tol_grad, tol_cost, max_iter) is required")
            }
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Unknown line search '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "L-BFGS history size {mem} rejected: {reason}")
            }

            OptError::NonFiniteCost { value } => write!(f, "Objective evaluated to {value}"),
            OptError::InfeasiblePoint { reason } => {
                write!(f, "Objective is infeasible at the requested point: {reason}")
            }
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Estimate {index} is {value}: {reason}")
            }
            OptError::MissingThetaHat => write!(f, "Optimizer finished without an estimate"),

            OptError::Argmin { kind, text } => write!(f, "argmin {kind}: {text}"),
            OptError::BackendError { text } => write!(f, "Backend error: {text}"),
        }
    }
}

impl From<Error> for OptError {
    fn from(err: Error) -> Self {
        // Objective failures travel through argmin boxed; unwrap those first.
        let err = match err.downcast::<OptError>() {
            Ok(own) => return own,
            Err(err) => err,
        };
        match err.downcast::<ArgminError>() {
            Ok(argmin_err) => {
                let kind = match &argmin_err {
                    ArgminError::InvalidParameter { .. } => "InvalidParameter",
                    ArgminError::NotImplemented { .. } => "NotImplemented",
                    ArgminError::NotInitialized { .. } => "NotInitialized",
                    ArgminError::ConditionViolated { .. } => "ConditionViolated",
                    ArgminError::CheckpointNotFound { .. } => "CheckpointNotFound",
                    ArgminError::PotentialBug { .. } => "PotentialBug",
                    ArgminError::ImpossibleError { .. } => "ImpossibleError",
                    _ => "Error",
                };
                OptError::Argmin { kind, text: argmin_err.to_string() }
            }
            Err(other) => OptError::BackendError { text: other.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Recovery of an `OptError` boxed into `argmin::core::Error`.
    // - Tagging of `ArgminError` variants.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // An infeasible-point error raised by a GAS objective survives the
    // round trip through argmin's boxed error.
    //
    // Given
    // -----
    // - `OptError::InfeasiblePoint` boxed as `argmin::core::Error`.
    //
    // Expect
    // ------
    // - The same variant and payload after conversion.
    fn boxed_opt_error_is_recovered() {
        // Arrange
        let original = OptError::InfeasiblePoint { reason: "negative count".to_string() };
        let boxed: Error = original.clone().into();

        // Act
        let recovered = OptError::from(boxed);

        // Assert
        assert_eq!(recovered, original);
    }

    #[test]
    // Purpose
    // -------
    // argmin's own errors keep their variant name.
    //
    // Given
    // -----
    // - `ArgminError::ConditionViolated`.
    //
    // Expect
    // ------
    // - `OptError::Argmin` with kind "ConditionViolated" and the message in
    //   its text.
    fn argmin_error_is_tagged_with_its_kind() {
        // Arrange
        let boxed: Error = ArgminError::ConditionViolated { text: "bad step".to_string() }.into();

        // Act
        let err = OptError::from(boxed);

        // Assert
        match err {
            OptError::Argmin { kind, text } => {
                assert_eq!(kind, "ConditionViolated");
                assert!(text.contains("bad step"));
            }
            other => panic!("expected OptError::Argmin, got {other:?}"),
        }
    }
}
