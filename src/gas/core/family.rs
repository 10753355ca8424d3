//! Observation families for GAS models.
//!
//! Purpose
//! -------
//! Encapsulate everything the recursion, estimators and forecaster need to
//! know about the observation density `p(y | θ)`: its log-density, score
//! `∂ log p / ∂θ`, Fisher information, link functions, mean and sampler.
//!
//! Key behaviors
//! -------------
//! - Both families use a log link: the natural parameter is `λ = exp(θ)`.
//! - [`Family::scaled_score`] returns the GAS driving innovation `u_t`,
//!   either the raw score ([`ScoreScaling::Unit`]) or the score divided by
//!   the Fisher information ([`ScoreScaling::InverseFisher`]).
//! - [`Family::score_derivative`] returns `∂u/∂θ`, used by the analytic
//!   gradient of the log-likelihood.
//!
//! Invariants & assumptions
//! ------------------------
//! - Observations outside the support yield `GASError::OutOfSupport`; they
//!   are never turned into NaN silently.
//! - `θ` is assumed finite (the recursion clamps it with `ThetaGuards`).
//!
//! | family      | log p(y given θ)   | score   | Fisher info | mean  |
//! |-------------|--------------------|---------|-------------|-------|
//! | Exponential | θ − λy             | 1 − λy  | 1           | 1/λ   |
//! | Poisson     | yθ − λ − ln y!     | y − λ   | λ           | λ     |
use crate::gas::{
    core::options::ScoreScaling,
    errors::{GASError, GASResult},
};
use ndarray::Array1;
use rand::Rng;
use rand_distr::Distribution;
use statrs::distribution::{Continuous, Discrete, Exp, Poisson};
use std::str::FromStr;

/// Supported observation families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Exponential with rate `λ = exp(θ)`; support `y ≥ 0`.
    Exponential,
    /// Poisson with intensity `λ = exp(θ)`; support non-negative integers.
    Poisson,
}

impl Family {
    pub fn name(&self) -> &'static str {
        match self {
            Family::Exponential => "Exponential",
            Family::Poisson => "Poisson",
        }
    }

    /// Natural parameter `λ` to link scale `θ = ln λ`.
    pub fn link(&self, natural: f64) -> f64 {
        natural.ln()
    }

    /// Link scale `θ` to natural parameter `λ = exp(θ)`.
    pub fn inverse_link(&self, theta: f64) -> f64 {
        theta.exp()
    }

    /// Check that observation `y` (at `index`) lies in the support.
    pub fn check_support(&self, index: usize, y: f64) -> GASResult<()> {
        let ok = match self {
            Family::Exponential => y >= 0.0,
            Family::Poisson => y >= 0.0 && y.fract() == 0.0,
        };
        if ok && y.is_finite() { Ok(()) } else { Err(GASError::OutOfSupport { index, value: y }) }
    }

    /// `log p(y | θ)` for an observation already known to be in the support.
    ///
    /// # Errors
    /// - `GASError::InvalidFamilyParam` if `exp(θ)` is not a valid rate.
    pub fn log_density(&self, y: f64, theta: f64) -> GASResult<f64> {
        let lambda = self.inverse_link(theta);
        match self {
            Family::Exponential => Ok(Exp::new(lambda)?.ln_pdf(y)),
            Family::Poisson => Ok(Poisson::new(lambda)?.ln_pmf(y as u64)),
        }
    }

    /// Score `∂ log p(y | θ) / ∂θ`.
    pub fn score(&self, y: f64, theta: f64) -> f64 {
        let lambda = self.inverse_link(theta);
        match self {
            Family::Exponential => 1.0 - lambda * y,
            Family::Poisson => y - lambda,
        }
    }

    /// Fisher information `E[score²]` at `θ`.
    pub fn fisher_information(&self, theta: f64) -> f64 {
        match self {
            Family::Exponential => 1.0,
            Family::Poisson => self.inverse_link(theta),
        }
    }

    /// GAS innovation `u = S(θ)·score`.
    pub fn scaled_score(&self, y: f64, theta: f64, scaling: ScoreScaling) -> f64 {
        match scaling {
            ScoreScaling::Unit => self.score(y, theta),
            ScoreScaling::InverseFisher => self.score(y, theta) / self.fisher_information(theta),
        }
    }

    /// `∂u/∂θ` for the innovation returned by [`Family::scaled_score`].
    pub fn score_derivative(&self, y: f64, theta: f64, scaling: ScoreScaling) -> f64 {
        let lambda = self.inverse_link(theta);
        match (self, scaling) {
            (Family::Exponential, _) => -lambda * y,
            (Family::Poisson, ScoreScaling::Unit) => -lambda,
            (Family::Poisson, ScoreScaling::InverseFisher) => -y / lambda,
        }
    }

    /// Mean of `y` given `θ`.
    pub fn mean(&self, theta: f64) -> f64 {
        let lambda = self.inverse_link(theta);
        match self {
            Family::Exponential => 1.0 / lambda,
            Family::Poisson => lambda,
        }
    }

    /// Link-scale value whose mean equals `ybar`; 0 when `ybar` is not
    /// a valid mean for the family.
    pub fn mean_transform(&self, ybar: f64) -> f64 {
        if !(ybar.is_finite() && ybar > 0.0) {
            return 0.0;
        }
        match self {
            Family::Exponential => -ybar.ln(),
            Family::Poisson => ybar.ln(),
        }
    }

    /// One draw from `p(· | θ)`.
    pub fn draw<R: Rng + ?Sized>(&self, theta: f64, rng: &mut R) -> GASResult<f64> {
        let lambda = self.inverse_link(theta);
        match self {
            Family::Exponential => Ok(rand_distr::Exp::new(lambda)?.sample(rng)),
            Family::Poisson => Ok(rand_distr::Poisson::new(lambda)?.sample(rng)),
        }
    }

    /// `n` independent draws from `p(· | θ)`.
    pub fn sample<R: Rng + ?Sized>(
        &self, theta: f64, n: usize, rng: &mut R,
    ) -> GASResult<Array1<f64>> {
        let lambda = self.inverse_link(theta);
        match self {
            Family::Exponential => {
                let dist = rand_distr::Exp::new(lambda)?;
                Ok(Array1::from_shape_fn(n, |_| dist.sample(rng)))
            }
            Family::Poisson => {
                let dist = rand_distr::Poisson::new(lambda)?;
                Ok(Array1::from_shape_fn(n, |_| dist.sample(rng)))
            }
        }
    }
}

impl FromStr for Family {
    type Err = GASError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exponential" => Ok(Family::Exponential),
            "poisson" => Ok(Family::Poisson),
            _ => Err(GASError::InvalidOption {
                name: "family",
                reason: format!("unknown family '{s}'; valid options are 'Exponential' or 'Poisson'"),
            }),
        }
    }
}
