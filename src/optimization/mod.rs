//! optimization — objective maximizer, numerical helpers, and error surface.
//!
//! Purpose
//! -------
//! Provide the optimization layer used by the GAS estimators: an
//! argmin-backed maximizer for log-likelihoods and log-posteriors
//! (`loglik_optimizer`), stable scalar transforms and shared tolerances
//! (`numerical_stability`), and a single error enum (`errors::OptError`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Optimizers operate in an unconstrained latent space `θ`. Points where
//!   the model cannot evaluate its objective are reported as `OptError`,
//!   never as panics.
//! - Model layers convert their own errors into `OptError::InfeasiblePoint`
//!   before they reach argmin.
//!
//! Conventions
//! -----------
//! - All solvers maximize `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`; outcomes are
//!   reported on the `ℓ` scale.
//! - Parameters, gradients, and Hessians use the `ndarray` aliases `Theta`,
//!   `Grad`, `Hessian`.
//! - The only logging is a `tracing` warning when L-BFGS hands over to the
//!   Nelder–Mead fallback, plus the optional `obs_slog` progress observer.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each submodule; end-to-end behavior is covered
//!   by the GAS integration tests.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use gas_timeseries::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
