//! gas — score-driven GAS(ar, sc) models: core numerics, models and errors.
//!
//! Purpose
//! -------
//! Bundle the pieces of a generalized autoregressive score model under one
//! namespace: observation families, latent variables with priors and
//! transforms, the θ-recursion with its analytic gradient, the
//! [`GASModel`] front end with five estimators, and forecasting /
//! posterior predictive routines.
//!
//! Key behaviors
//! -------------
//! - Time-varying link-scale parameter
//!   `θ_t = c + Σ φ_i θ_{t-i} + Σ α_j s_{t-j}`, driven by the (optionally
//!   inverse-Fisher scaled) score `s` of the observation density.
//! - Estimation by `MLE`, `PML`, `Laplace`, `M-H` or `BBVI` ([`FitMethod`]).
//! - Out-of-sample and rolling in-sample forecasts with simulated
//!   prediction intervals, replicated series and PPC p-values.
//!
//! Invariants & assumptions
//! ------------------------
//! - Series are finite and lie in the family support after differencing.
//! - Recursion failures surface as a `-∞` log-likelihood; only
//!   configuration and estimator failures become [`GASError`]s.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based; the oldest observation is at index 0.
//! - Randomness is injected as `&mut R` with `R: rand::Rng + ?Sized`.
//! - Estimator progress and convergence warnings are emitted through
//!   `tracing`; no subscriber is installed here.
//!
//! Downstream usage
//! ----------------
//! 1. Build a [`GASModel`] via `GASModel::new(y, ar, sc, integ, family, options)`.
//! 2. Call `fit(method, &FitOptions, &mut rng)`.
//! 3. Use `predict`, `predict_is`, `sample`, `ppc` or `summary`.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    Family, FitMethod, FitOptions, ForecastTable, GASData, GASOptions, GASShape, GASSpec,
    LatentVariableSet, Posterior, Prior, ScoreScaling, SimOpts, ThetaGuards, Transform,
};
pub use self::errors::{ConvergenceWarning, GASError, GASResult};
pub use self::models::{Discrepancy, FitResult, GASModel};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use gas_timeseries::gas::prelude::*;
//
// to import the everyday GAS surface in a single line.

pub mod prelude {
    pub use super::{
        ConvergenceWarning, Discrepancy, Family, FitMethod, FitOptions, FitResult, ForecastTable,
        GASError, GASModel, GASOptions, GASResult, ScoreScaling, SimOpts, ThetaGuards,
    };
}
