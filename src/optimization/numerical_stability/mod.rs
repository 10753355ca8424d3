//! numerical_stability — stable transforms and shared numeric tolerances.
//!
//! Purpose
//! -------
//! Collect the small numeric primitives the rest of the crate leans on:
//! the logistic transform used by bounded latent variables and the
//! tolerances shared by the recursion (`GENERAL_TOL`) and the covariance
//! code (`EIGEN_EPS`).
//!
//! Conventions
//! -----------
//! - Pure functions on `f64`; no I/O, logging or global state.
//! - Inputs are assumed finite; validation happens in the callers.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{EIGEN_EPS, GENERAL_TOL, LOGIT_EPS, safe_logistic, safe_logit};

pub mod prelude {
    pub use super::transformations::{EIGEN_EPS, GENERAL_TOL, safe_logistic, safe_logit};
}
