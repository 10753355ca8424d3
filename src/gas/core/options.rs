//! GAS options — configuration for estimation, fitting and simulation.
//!
//! Purpose
//! -------
//! Collect the configuration knobs of a GAS model in one place so call
//! sites pass explicit, validated options instead of ad-hoc flags.
//!
//! Key behaviors
//! -------------
//! - [`GASOptions`] bundles the score scaling, θ-guards, optimizer options
//!   and interval-simulation settings fixed at model construction.
//! - [`FitMethod`] selects the estimator; it parses from the conventional
//!   method names (`"MLE"`, `"PML"`, `"Laplace"`, `"M-H"`, `"BBVI"`).
//! - [`FitOptions`] carries per-call settings for the sampling estimators.
//!
//! Invariants & assumptions
//! ------------------------
//! - Components are validated by their own constructors (`ThetaGuards::new`,
//!   `MLEOptions::new`, `MHOptions::new`, `BBVIOptions::new`,
//!   `SimOpts::new`); the bundles add no cross-field checks.
//!
//! Downstream usage
//! ----------------
//! - Pass a [`GASOptions`] to `GASModel::new`, then a [`FitMethod`] and
//!   [`FitOptions`] to `GASModel::fit`.
use crate::{
    gas::{
        core::guards::ThetaGuards,
        errors::{GASError, GASResult},
    },
    inference::{BBVIOptions, MHOptions},
    optimization::loglik_optimizer::MLEOptions,
};
use std::str::FromStr;

/// Default number of simulated paths behind prediction intervals.
pub const DEFAULT_INTERVAL_NSIMS: usize = 15000;

/// How the score is scaled before it drives the recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreScaling {
    /// Raw score `∂ log p / ∂θ`.
    Unit,
    /// Score divided by the Fisher information.
    #[default]
    InverseFisher,
}

impl FromStr for ScoreScaling {
    type Err = GASError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unit" => Ok(ScoreScaling::Unit),
            "inverse_fisher" | "inversefisher" => Ok(ScoreScaling::InverseFisher),
            _ => Err(GASError::InvalidOption {
                name: "score_scaling",
                reason: format!("unknown scaling '{s}'; valid options are 'unit' or 'inverse_fisher'"),
            }),
        }
    }
}

/// SimOpts — settings for simulation-based prediction intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimOpts {
    /// Simulated paths per forecast call.
    pub nsims: usize,
}

impl SimOpts {
    /// # Errors
    /// - `GASError::InvalidNsims` when `nsims == 0`.
    pub fn new(nsims: usize) -> GASResult<Self> {
        if nsims == 0 {
            return Err(GASError::InvalidNsims { nsims });
        }
        Ok(SimOpts { nsims })
    }
}

impl Default for SimOpts {
    fn default() -> Self {
        SimOpts { nsims: DEFAULT_INTERVAL_NSIMS }
    }
}

/// GASOptions — estimation-time configuration for GAS models.
///
/// Fields
/// ------
/// - `score_scaling`: [`ScoreScaling`]
///   Scaling applied to the score before it enters the recursion.
/// - `theta_guards`: [`ThetaGuards`]
///   Bounds applied to θ_t at every recursion step.
/// - `mle_opts`: [`MLEOptions`]
///   L-BFGS configuration for MLE, PML, Laplace and MAP warm starts.
/// - `sim_opts`: [`SimOpts`]
///   Number of simulated paths behind prediction intervals.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GASOptions {
    pub score_scaling: ScoreScaling,
    pub theta_guards: ThetaGuards,
    pub mle_opts: MLEOptions,
    pub sim_opts: SimOpts,
}

impl GASOptions {
    pub fn new(
        score_scaling: ScoreScaling, theta_guards: ThetaGuards, mle_opts: MLEOptions,
        sim_opts: SimOpts,
    ) -> Self {
        GASOptions { score_scaling, theta_guards, mle_opts, sim_opts }
    }
}

/// Estimation method for `GASModel::fit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMethod {
    /// Maximum likelihood with Hessian standard errors.
    #[default]
    MLE,
    /// Maximum likelihood penalized by the latent log-priors.
    PML,
    /// Gaussian approximation at the posterior mode.
    Laplace,
    /// Adaptive random-walk Metropolis–Hastings.
    MetropolisHastings,
    /// Black-box variational inference.
    BBVI,
}

impl FitMethod {
    pub fn name(&self) -> &'static str {
        match self {
            FitMethod::MLE => "MLE",
            FitMethod::PML => "PML",
            FitMethod::Laplace => "Laplace",
            FitMethod::MetropolisHastings => "M-H",
            FitMethod::BBVI => "BBVI",
        }
    }

    /// Whether the method yields a posterior over the latent variables
    /// rather than a point estimate.
    pub fn is_bayesian(&self) -> bool {
        matches!(self, FitMethod::Laplace | FitMethod::MetropolisHastings | FitMethod::BBVI)
    }
}

impl FromStr for FitMethod {
    type Err = GASError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mle" => Ok(FitMethod::MLE),
            "pml" => Ok(FitMethod::PML),
            "laplace" => Ok(FitMethod::Laplace),
            "m-h" => Ok(FitMethod::MetropolisHastings),
            "bbvi" => Ok(FitMethod::BBVI),
            _ => Err(GASError::UnknownFitMethod { name: s.to_string() }),
        }
    }
}

impl std::fmt::Display for FitMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-call options for the sampling estimators. Ignored by MLE, PML and
/// Laplace.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FitOptions {
    pub mh: MHOptions,
    pub bbvi: BBVIOptions,
}

impl FitOptions {
    pub fn with_mh(mh: MHOptions) -> Self {
        FitOptions { mh, ..Default::default() }
    }

    pub fn with_bbvi(bbvi: BBVIOptions) -> Self {
        FitOptions { bbvi, ..Default::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Parsing of fit methods and score scalings.
    // - Validation of `SimOpts::new`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Method names parse case-insensitively and unknown names are rejected.
    //
    // Given
    // -----
    // - The five conventional names in mixed case, and "OLS".
    //
    // Expect
    // ------
    // - Each maps to its variant; "OLS" yields `UnknownFitMethod`.
    fn fit_method_parses_conventional_names() {
        // Arrange
        let cases = [
            ("MLE", FitMethod::MLE),
            ("pml", FitMethod::PML),
            ("Laplace", FitMethod::Laplace),
            ("M-H", FitMethod::MetropolisHastings),
            ("bbvi", FitMethod::BBVI),
        ];

        // Act / Assert
        for (name, expected) in cases {
            let parsed: FitMethod = name.parse().expect("known method");
            assert_eq!(parsed, expected);
            assert_eq!(parsed.to_string().to_lowercase(), name.to_lowercase());
        }
        assert!(matches!(
            "OLS".parse::<FitMethod>(),
            Err(GASError::UnknownFitMethod { ref name }) if name == "OLS"
        ));
    }

    #[test]
    // Purpose
    // -------
    // Score scaling parses both spellings and defaults to inverse Fisher.
    //
    // Given
    // -----
    // - "unit", "inverse_fisher", "hessian".
    //
    // Expect
    // ------
    // - Unit, InverseFisher, error.
    fn score_scaling_parses_and_defaults() {
        assert_eq!("unit".parse::<ScoreScaling>().expect("valid"), ScoreScaling::Unit);
        assert_eq!(
            "inverse_fisher".parse::<ScoreScaling>().expect("valid"),
            ScoreScaling::InverseFisher
        );
        assert!("hessian".parse::<ScoreScaling>().is_err());
        assert_eq!(GASOptions::default().score_scaling, ScoreScaling::InverseFisher);
    }

    #[test]
    // Purpose
    // -------
    // `SimOpts::new` rejects zero simulations.
    //
    // Given
    // -----
    // - nsims = 0 and nsims = 50.
    //
    // Expect
    // ------
    // - Error for 0; 50 preserved.
    fn sim_opts_rejects_zero_nsims() {
        assert!(matches!(SimOpts::new(0), Err(GASError::InvalidNsims { nsims: 0 })));
        assert_eq!(SimOpts::new(50).expect("valid").nsims, 50);
        assert_eq!(SimOpts::default().nsims, DEFAULT_INTERVAL_NSIMS);
    }
}
