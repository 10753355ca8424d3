//! core — GAS(ar, sc) data, families, latent variables and θ-recursions.
//!
//! Purpose
//! -------
//! Collect the numerical building blocks of score-driven models: the
//! validated observation series, lag structure, observation families,
//! latent-variable set, θ-guards, the in-sample recursion with its
//! analytic gradient, and forecasting/simulation routines. The model layer
//! in `gas::models` wires these together with the estimators.
//!
//! Key behaviors
//! -------------
//! - [`GASData`] validates and differences the input series.
//! - [`Family`] exposes log-density, score, Fisher information, links and
//!   samplers for each supported observation law.
//! - [`compute_path`] and [`compute_gradient`] run the GAS recursion.
//! - [`forecast_table`], [`rolling_forecast_table`] and
//!   [`posterior_predictive`] roll the recursion beyond or inside the
//!   sample.
//!
//! Invariants & assumptions
//! ------------------------
//! - The latent vector has length `1 + ar + sc` with layout
//!   `[c, φ₁..φ_ar, α₁..α_sc]`.
//! - θ paths are finite and clamped to [`ThetaGuards`]; domain errors are
//!   surfaced as `-∞` log-likelihoods, never as NaN.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based; histories store the newest element at the end.
//! - This module performs no logging; estimators above it do.

pub mod data;
pub mod family;
pub mod forecasts;
pub mod guards;
pub mod latent;
pub mod options;
pub mod recursion;
pub mod shape;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::data::GASData;
pub use self::family::Family;
pub use self::forecasts::{
    ForecastTable, INTERVAL_LEVELS, forecast_table, posterior_predictive, rolling_forecast_table,
};
pub use self::guards::ThetaGuards;
pub use self::latent::{LatentVariable, LatentVariableSet, Posterior, Prior, Transform};
pub use self::options::{FitMethod, FitOptions, GASOptions, ScoreScaling, SimOpts};
pub use self::recursion::{GASCoefficients, GASPath, GASSpec, compute_gradient, compute_path};
pub use self::shape::GASShape;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use gas_timeseries::gas::core::prelude::*;
//
// to import the main GAS core surface in a single line.

pub mod prelude {
    pub use super::data::GASData;
    pub use super::family::Family;
    pub use super::forecasts::ForecastTable;
    pub use super::guards::ThetaGuards;
    pub use super::latent::{LatentVariableSet, Prior};
    pub use super::options::{FitMethod, FitOptions, GASOptions, ScoreScaling, SimOpts};
    pub use super::recursion::{GASSpec, compute_path};
    pub use super::shape::GASShape;
}
