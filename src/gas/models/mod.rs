//! models — user-facing GAS(ar, sc) model and estimator wiring.
//!
//! Purpose
//! -------
//! Sit on top of `gas::core`, connecting the θ-recursion to the L-BFGS
//! maximizer and to the posterior approximations in `inference`.
//!
//! Key behaviors
//! -------------
//! - [`GASModel`] owns the data, lag structure, family, options and latent
//!   variables, and offers `fit`, `predict`, `predict_is`,
//!   `predict_is_refit`, `sample`, `ppc` and `summary`.
//! - [`GASObjective`] adapts the recursion to both the optimizer
//!   ([`LogLikelihood`](crate::optimization::loglik_optimizer::LogLikelihood))
//!   and the samplers ([`LogPosterior`](crate::inference::LogPosterior)).
//! - [`FitResult`] records estimates, standard errors, information
//!   criteria and estimator diagnostics of the last fit.
//!
//! Invariants & assumptions
//! ------------------------
//! - Forecasting and simulation require a prior successful `fit`;
//!   otherwise `GASError::ModelNotFitted` is returned.
//! - Latent draws are taken on the unconstrained scale and transformed
//!   before entering the recursion.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`gas`] fit each estimator on a simulated exponential
//!   series; [`model_internals`] checks the chained gradient against finite
//!   differences.

pub mod gas;
pub mod model_internals;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::gas::{FitResult, GASModel, PPC_NSIMS};
pub use self::model_internals::{Discrepancy, GASObjective, aic, bic, information_covariance};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use gas_timeseries::gas::models::prelude::*;
//
// to import the main GAS model surface in a single line.

pub mod prelude {
    pub use super::gas::{FitResult, GASModel};
    pub use super::model_internals::Discrepancy;
}
