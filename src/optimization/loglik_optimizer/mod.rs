//! loglik_optimizer — argmin-powered maximizer for GAS objectives.
//!
//! Purpose
//! -------
//! Maximize a scalar objective `ℓ(θ)` over the unconstrained latent vector of
//! a GAS model. For `MLE` the objective is the log-likelihood; for `PML`,
//! `Laplace` and the MAP start of `M-H`/`BBVI` it is the log-posterior. The
//! model implements [`LogLikelihood`] and calls [`maximize`].
//!
//! Key behaviors
//! -------------
//! - Convert objectives into argmin cost functions `c(θ) = -ℓ(θ)` via
//!   [`adapter::ArgMinAdapter`].
//! - [`maximize`] validates the start with [`LogLikelihood::check`], runs
//!   L-BFGS (line search chosen by [`traits::LineSearcher`]) and, if that
//!   run fails, retries with Nelder–Mead from [`fallback`].
//! - [`finite_diff`] supplies gradients when no analytic one exists and the
//!   Hessian used for Laplace covariances.
//!
//! Invariants & assumptions
//! ------------------------
//! - The optimizer **always maximizes** `ℓ(θ)` by minimizing `-ℓ(θ)`; model
//!   code implements `ℓ(θ)` and `∇ℓ(θ)`, never the cost.
//! - [`LogLikelihood::value`] and [`LogLikelihood::grad`] report infeasible
//!   points as [`OptError`] values, not panics.
//! - Configuration types ([`Tolerances`], [`MLEOptions`]) are validated on
//!   construction.
//!
//! Conventions
//! -----------
//! - Parameters live in unconstrained space as [`Theta`] (`Array1<f64>`).
//! - [`OptimOutcome::value`] is always reported on the objective scale `ℓ`.
//! - Errors bubble up as [`OptResult<T>`] / [`OptError`].
//!
//! Testing notes
//! -------------
//! - Unit tests cover sign conventions in [`adapter`], solver construction and execution in
//!   [`solver`], finite differences in [`finite_diff`], the simplex
//!   fallback in [`fallback`] and option parsing in [`traits`].
//! - The GAS integration tests exercise [`maximize`] end to end.

pub mod adapter;
pub mod api;
pub mod fallback;
pub mod finite_diff;
pub mod solver;
pub mod traits;
pub mod types;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use gas_timeseries::optimization::loglik_optimizer::prelude::*;
//
// to import the main optimizer surface in a single line.

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
