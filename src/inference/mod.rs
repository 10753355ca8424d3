//! inference — posterior approximation for fitted GAS models.
//!
//! Purpose
//! -------
//! Provide the machinery behind the non-point estimators: Gaussian
//! approximations at the posterior mode (`Laplace`), random-walk
//! Metropolis–Hastings sampling (`M-H`), and mean-field black-box
//! variational inference (`BBVI`). Everything operates in the
//! unconstrained latent space and knows nothing about the GAS recursion;
//! models plug in through the [`LogPosterior`] trait.
//!
//! Key behaviors
//! -------------
//! - [`calc_covariance`] inverts the observed information at a mode and
//!   refuses to pseudo-invert a singular one.
//! - [`metropolis_hastings`] tunes its proposal scale toward an acceptance
//!   rate in `[0.234, 0.4]` before drawing the retained chain.
//! - [`bbvi`] runs score-function gradient ascent with control variates,
//!   stepping with RMSProp or Adam ([`StepRule`]).
//!
//! Conventions
//! -----------
//! - Randomness is always injected as `&mut R` with `R: rand::Rng + ?Sized`,
//!   so callers control seeding.
//! - Failures are reported through [`InferenceError`] /
//!   [`InferenceResult`]; infeasible points inside samplers are handled as
//!   zero density instead.
//!
//! Testing notes
//! -------------
//! - Each submodule tests its routine against Gaussian targets with known
//!   moments, plus infeasible-region behavior and option validation.

pub mod bbvi;
pub mod errors;
pub mod hessian;
pub mod metropolis;
pub mod stochastic;
pub mod traits;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::bbvi::{BBVIOptions, BBVIOutcome, bbvi};
pub use self::errors::{InferenceError, InferenceResult};
pub use self::hessian::{calc_covariance, cholesky_lower, standard_errors};
pub use self::metropolis::{MHOptions, MHOutcome, metropolis_hastings};
pub use self::stochastic::StepRule;
pub use self::traits::LogPosterior;

// ---- Optional convenience prelude for downstream crates ------------------
//
// Downstream crates can `use gas_timeseries::inference::prelude::*;` to
// import the primary inference surface in a single line.

pub mod prelude {
    pub use super::bbvi::{BBVIOptions, BBVIOutcome, bbvi};
    pub use super::errors::{InferenceError, InferenceResult};
    pub use super::hessian::calc_covariance;
    pub use super::metropolis::{MHOptions, MHOutcome, metropolis_hastings};
    pub use super::stochastic::StepRule;
    pub use super::traits::LogPosterior;
}
