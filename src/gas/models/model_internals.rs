//! GAS model internals — objective wiring, curvature and fit diagnostics.
//!
//! Purpose
//! -------
//! Bridge the θ-recursion to the estimators. [`GASObjective`] exposes the
//! log-likelihood (optionally plus the latent log-priors) over the
//! unconstrained latent coordinates `z`, both as a [`LogLikelihood`] for
//! the L-BFGS maximizer and as a [`LogPosterior`] for the samplers.
//!
//! Key behaviors
//! -------------
//! - Map `z → β` through each latent transform, run the recursion on `β`,
//!   and chain the analytic gradient back to `z`.
//! - Report domain errors to the optimizer as infeasible points and to the
//!   samplers as `-∞`.
//! - Provide the observed-information covariance at a mode
//!   ([`information_covariance`]), information criteria, and the
//!   discrepancy statistics used by posterior predictive checks.
//!
//! Invariants & assumptions
//! ------------------------
//! - `z.len() == latent.len() == 1 + ar + sc`.
//! - The objective never mutates the latent set; estimators write results
//!   back only after the objective is dropped.
use crate::{
    gas::{
        core::{
            latent::LatentVariableSet,
            recursion::{GASSpec, compute_gradient, try_loglik},
        },
        errors::{GASError, GASResult},
    },
    inference::{errors::InferenceResult, hessian::calc_covariance, traits::LogPosterior},
    optimization::{
        errors::OptResult,
        loglik_optimizer::{Grad, LogLikelihood, Theta},
    },
};
use ndarray::{Array1, Array2, ArrayView1};

/// GASObjective — log-likelihood or log-posterior of a GAS model in `z`.
///
/// Fields
/// ------
/// - `spec`: recursion configuration (family, shape, scaling, guards).
/// - `latent`: priors and transforms of the latent variables.
/// - `y`: series bound for [`LogPosterior`] evaluations.
/// - `penalized`: add `Σ log prior(z)` to the log-likelihood.
#[derive(Debug, Clone)]
pub struct GASObjective<'a> {
    pub spec: GASSpec,
    pub latent: &'a LatentVariableSet,
    pub y: ArrayView1<'a, f64>,
    pub penalized: bool,
}

impl<'a> GASObjective<'a> {
    pub fn new(
        spec: GASSpec, latent: &'a LatentVariableSet, y: ArrayView1<'a, f64>, penalized: bool,
    ) -> Self {
        GASObjective { spec, latent, y, penalized }
    }

    /// Objective value at `z` on series `y`.
    pub fn evaluate(&self, z: ArrayView1<f64>, y: ArrayView1<f64>) -> GASResult<f64> {
        let beta = self.latent.transform(z)?;
        let mut value = try_loglik(&self.spec, &beta, y)?;
        if self.penalized {
            value += self.latent.log_prior(z);
        }
        if !value.is_finite() {
            return Err(GASError::InfeasibleFit);
        }
        Ok(value)
    }

    /// Objective gradient at `z` on series `y`.
    pub fn gradient(&self, z: ArrayView1<f64>, y: ArrayView1<f64>) -> GASResult<Array1<f64>> {
        let beta = self.latent.transform(z)?;
        let (_, grad_beta) = compute_gradient(&self.spec, &beta, y)?;
        let mut grad = grad_beta * &self.latent.transform_derivative(z)?;
        if self.penalized {
            grad += &self.latent.log_prior_grad(z);
        }
        Ok(grad)
    }

    /// Unpenalized log-likelihood at `z` on the bound series.
    pub fn loglik(&self, z: ArrayView1<f64>) -> GASResult<f64> {
        let beta = self.latent.transform(z)?;
        try_loglik(&self.spec, &beta, self.y)
    }
}

impl LogLikelihood for GASObjective<'_> {
    type Data = Array1<f64>;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<f64> {
        Ok(self.evaluate(theta.view(), data.view())?)
    }

    /// Checks the latent length and finiteness of `θ`.
    fn check(&self, theta: &Theta, _data: &Self::Data) -> OptResult<()> {
        if theta.len() != self.latent.len() {
            return Err(GASError::LatentLengthMismatch {
                expected: self.latent.len(),
                actual: theta.len(),
            }
            .into());
        }
        if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(GASError::InvalidOption {
                name: "starting values",
                reason: format!("entry {index} is non-finite: {value}"),
            }
            .into());
        }
        Ok(())
    }

    fn grad(&self, theta: &Theta, data: &Self::Data) -> OptResult<Grad> {
        Ok(self.gradient(theta.view(), data.view())?)
    }
}

impl LogPosterior for GASObjective<'_> {
    fn dim(&self) -> usize {
        self.latent.len()
    }

    fn log_posterior(&self, z: &Array1<f64>) -> f64 {
        self.evaluate(z.view(), self.y).unwrap_or(f64::NEG_INFINITY)
    }
}

/// Inverse observed information of `obj` at mode `z_hat`.
///
/// Infeasible gradient evaluations become NaN, which the Hessian
/// validation rejects as `HessianFailed`.
pub fn information_covariance(
    obj: &GASObjective<'_>, z_hat: &Array1<f64>,
) -> InferenceResult<Array2<f64>> {
    let k = z_hat.len();
    let grad = |z: &Array1<f64>| {
        obj.gradient(z.view(), obj.y).unwrap_or_else(|_| Array1::from_elem(k, f64::NAN))
    };
    calc_covariance(&grad, z_hat)
}

/// Akaike information criterion `2k − 2ℓ`.
pub fn aic(loglik: f64, k: usize) -> f64 {
    2.0 * k as f64 - 2.0 * loglik
}

/// Bayesian information criterion `k·ln(n_eff) − 2ℓ`.
pub fn bic(loglik: f64, k: usize, n_eff: usize) -> f64 {
    k as f64 * (n_eff as f64).ln() - 2.0 * loglik
}

/// Discrepancy statistic compared by posterior predictive checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Discrepancy {
    #[default]
    Mean,
    SumOfSquares,
    Max,
    Min,
}

impl Discrepancy {
    pub fn compute(&self, x: ArrayView1<f64>) -> f64 {
        match self {
            Discrepancy::Mean => x.mean().unwrap_or(f64::NAN),
            Discrepancy::SumOfSquares => x.iter().map(|v| v * v).sum(),
            Discrepancy::Max => x.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Discrepancy::Min => x.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

impl std::str::FromStr for Discrepancy {
    type Err = GASError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" => Ok(Discrepancy::Mean),
            "sum_of_squares" | "sumofsquares" => Ok(Discrepancy::SumOfSquares),
            "max" => Ok(Discrepancy::Max),
            "min" => Ok(Discrepancy::Min),
            _ => Err(GASError::InvalidOption {
                name: "discrepancy",
                reason: format!("unknown statistic '{s}'; valid options are mean, sum_of_squares, max, min"),
            }),
        }
    }
}
