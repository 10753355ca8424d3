//! Latent variables of a GAS model.
//!
//! Purpose
//! -------
//! Hold the ordered, fixed-length set of scalar parameters of a GAS(p, q)
//! model together with their priors, transforms, current estimates and
//! posterior representation.
//!
//! Key behaviors
//! -------------
//! - [`LatentVariableSet::for_gas`] builds the `1 + p + q` variables in
//!   the order `Constant, AR(1..p), SC(1..q)`.
//! - Estimates live on the *unconstrained* optimizer coordinate `z`;
//!   [`LatentVariableSet::transform`] maps a `z` vector to the natural
//!   parameters consumed by the recursion.
//! - [`LatentVariableSet::draw`] produces joint `z` draws from whatever
//!   posterior the last fit left behind (point mass, Laplace Gaussian,
//!   M-H chain or mean-field Gaussian).
//!
//! Invariants & assumptions
//! ------------------------
//! - The number of variables is fixed at construction and never changes.
//! - Per-variable `samples` are only populated by Bayesian fits.
//!
//! Conventions
//! -----------
//! - Priors are evaluated on the natural (transformed) value; their
//!   gradients are chained through the transform.
use crate::{
    gas::{
        core::{family::Family, shape::GASShape},
        errors::{GASError, GASResult},
    },
    inference::hessian::cholesky_lower,
    optimization::numerical_stability::{safe_logistic, safe_logit},
};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;
use rand_distr::StandardNormal;
use statrs::distribution::{Continuous, Normal};

/// Number of per-variable draws stored after a Gaussian or mean-field fit.
pub const POSTERIOR_SAMPLE_SIZE: usize = 1000;

/// Prior standard deviation of the constant term.
const CONSTANT_PRIOR_SD: f64 = 3.0;

/// Prior standard deviation of AR and score coefficients.
const LAG_PRIOR_SD: f64 = 0.5;

// ---- Transforms ----

/// Bijection from the optimizer coordinate to the natural parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    #[default]
    Identity,
    Exp,
    Logistic,
}

impl Transform {
    pub fn apply(&self, z: f64) -> f64 {
        match self {
            Transform::Identity => z,
            Transform::Exp => z.exp(),
            Transform::Logistic => safe_logistic(z),
        }
    }

    pub fn inverse(&self, x: f64) -> f64 {
        match self {
            Transform::Identity => x,
            Transform::Exp => x.ln(),
            Transform::Logistic => safe_logit(x),
        }
    }

    /// `d apply(z) / dz`.
    pub fn derivative(&self, z: f64) -> f64 {
        match self {
            Transform::Identity => 1.0,
            Transform::Exp => z.exp(),
            Transform::Logistic => {
                let p = safe_logistic(z);
                p * (1.0 - p)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transform::Identity => "identity",
            Transform::Exp => "exp",
            Transform::Logistic => "logit",
        }
    }
}

// ---- Priors ----

/// Prior on a latent variable's natural value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prior {
    /// Improper uniform prior; contributes nothing.
    Flat,
    Normal { mu: f64, sigma: f64 },
}

impl Prior {
    /// # Errors
    /// - `GASError::InvalidOption` unless `mu` is finite and `sigma > 0`.
    pub fn normal(mu: f64, sigma: f64) -> GASResult<Self> {
        if !mu.is_finite() || !(sigma.is_finite() && sigma > 0.0) {
            return Err(GASError::InvalidOption {
                name: "prior",
                reason: format!("Normal prior needs finite mu and sigma > 0; got ({mu}, {sigma})"),
            });
        }
        Ok(Prior::Normal { mu, sigma })
    }

    pub fn log_pdf(&self, x: f64) -> f64 {
        match self {
            Prior::Flat => 0.0,
            Prior::Normal { mu, sigma } => {
                Normal::new(*mu, *sigma).map(|n| n.ln_pdf(x)).unwrap_or(f64::NEG_INFINITY)
            }
        }
    }

    /// `d log_pdf(x) / dx`.
    pub fn grad(&self, x: f64) -> f64 {
        match self {
            Prior::Flat => 0.0,
            Prior::Normal { mu, sigma } => -(x - mu) / (sigma * sigma),
        }
    }
}

impl std::fmt::Display for Prior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prior::Flat => write!(f, "Flat"),
            Prior::Normal { mu, sigma } => write!(f, "Normal({mu}, {sigma})"),
        }
    }
}

// ---- Posterior representation ----

/// Joint posterior over the unconstrained coordinates left by the last fit.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Posterior {
    /// Point estimate only (MLE, PML, or before fitting).
    #[default]
    Point,
    /// Laplace approximation.
    Gaussian { mean: Array1<f64>, cov: Array2<f64> },
    /// Retained M-H draws, `nsims × k`.
    Samples(Array2<f64>),
    /// BBVI mean-field approximation.
    MeanField { mean: Array1<f64>, std: Array1<f64> },
}

/// One scalar latent variable.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentVariable {
    pub name: String,
    pub prior: Prior,
    pub transform: Transform,
    /// Starting value on the unconstrained scale.
    pub start: f64,
    /// Current estimate on the unconstrained scale.
    pub value: f64,
    pub std_error: Option<f64>,
    /// Posterior draws of the natural value, when a Bayesian fit ran.
    pub samples: Option<Vec<f64>>,
}

impl LatentVariable {
    pub fn new(name: impl Into<String>, prior: Prior, transform: Transform, start: f64) -> Self {
        LatentVariable {
            name: name.into(),
            prior,
            transform,
            start,
            value: start,
            std_error: None,
            samples: None,
        }
    }

    /// Current estimate on the natural scale.
    pub fn natural_value(&self) -> f64 {
        self.transform.apply(self.value)
    }
}

/// Fixed-length, ordered collection of [`LatentVariable`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentVariableSet {
    vars: Vec<LatentVariable>,
    posterior: Posterior,
}

impl LatentVariableSet {
    pub fn new(vars: Vec<LatentVariable>) -> Self {
        LatentVariableSet { vars, posterior: Posterior::Point }
    }

    /// Default latent variables for a GAS model of the given shape.
    ///
    /// The constant starts at the link value matching `ybar`; lag
    /// coefficients start at zero.
    pub fn for_gas(shape: &GASShape, family: Family, ybar: f64) -> GASResult<Self> {
        let mut vars = Vec::with_capacity(shape.n_latent());
        vars.push(LatentVariable::new(
            "Constant",
            Prior::normal(0.0, CONSTANT_PRIOR_SD)?,
            Transform::Identity,
            family.mean_transform(ybar),
        ));
        for i in 1..=shape.ar {
            vars.push(LatentVariable::new(
                format!("AR({i})"),
                Prior::normal(0.0, LAG_PRIOR_SD)?,
                Transform::Identity,
                0.0,
            ));
        }
        for j in 1..=shape.sc {
            vars.push(LatentVariable::new(
                format!("SC({j})"),
                Prior::normal(0.0, LAG_PRIOR_SD)?,
                Transform::Identity,
                0.0,
            ));
        }
        Ok(LatentVariableSet::new(vars))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LatentVariable> {
        self.vars.iter()
    }

    pub fn get(&self, index: usize) -> Option<&LatentVariable> {
        self.vars.get(index)
    }

    pub fn names(&self) -> Vec<String> {
        self.vars.iter().map(|v| v.name.clone()).collect()
    }

    pub fn posterior(&self) -> &Posterior {
        &self.posterior
    }

    pub fn starting_values(&self) -> Array1<f64> {
        self.vars.iter().map(|v| v.start).collect()
    }

    pub fn current_values(&self) -> Array1<f64> {
        self.vars.iter().map(|v| v.value).collect()
    }

    /// Map an unconstrained vector to natural parameters.
    ///
    /// # Errors
    /// - `GASError::LatentLengthMismatch` if `z` has the wrong length.
    pub fn transform(&self, z: ArrayView1<f64>) -> GASResult<Array1<f64>> {
        self.check_len(z.len())?;
        Ok(self.vars.iter().zip(z.iter()).map(|(v, &zi)| v.transform.apply(zi)).collect())
    }

    /// Natural parameters at the current estimate.
    pub fn transformed(&self) -> Array1<f64> {
        self.vars.iter().map(LatentVariable::natural_value).collect()
    }

    /// Jacobian diagonal `d natural / d z` at `z`.
    pub fn transform_derivative(&self, z: ArrayView1<f64>) -> GASResult<Array1<f64>> {
        self.check_len(z.len())?;
        Ok(self.vars.iter().zip(z.iter()).map(|(v, &zi)| v.transform.derivative(zi)).collect())
    }

    /// Sum of prior log-densities at unconstrained `z`.
    pub fn log_prior(&self, z: ArrayView1<f64>) -> f64 {
        self.vars.iter().zip(z.iter()).map(|(v, &zi)| v.prior.log_pdf(v.transform.apply(zi))).sum()
    }

    /// Gradient of [`LatentVariableSet::log_prior`] with respect to `z`.
    pub fn log_prior_grad(&self, z: ArrayView1<f64>) -> Array1<f64> {
        self.vars
            .iter()
            .zip(z.iter())
            .map(|(v, &zi)| v.prior.grad(v.transform.apply(zi)) * v.transform.derivative(zi))
            .collect()
    }

    /// Replace the prior of variable `index`.
    ///
    /// # Errors
    /// - `GASError::InvalidOption` if `index` is out of range.
    pub fn set_prior(&mut self, index: usize, prior: Prior) -> GASResult<()> {
        let len = self.vars.len();
        let var = self.vars.get_mut(index).ok_or_else(|| GASError::InvalidOption {
            name: "prior",
            reason: format!("latent index {index} out of range for {len} variables"),
        })?;
        var.prior = prior;
        Ok(())
    }

    /// Reset every estimate to its starting value and forget the posterior.
    pub fn reset(&mut self) {
        for v in &mut self.vars {
            v.value = v.start;
            v.std_error = None;
            v.samples = None;
        }
        self.posterior = Posterior::Point;
    }

    /// Record a point estimate with optional standard errors.
    pub fn set_point(&mut self, values: &Array1<f64>, std_errors: Option<&Array1<f64>>) -> GASResult<()> {
        self.check_len(values.len())?;
        for (i, v) in self.vars.iter_mut().enumerate() {
            v.value = values[i];
            v.std_error = std_errors.map(|se| se[i]);
            v.samples = None;
        }
        self.posterior = Posterior::Point;
        Ok(())
    }

    /// Record a Bayesian fit: point estimates, standard errors and the
    /// joint posterior. Per-variable natural-scale samples are filled from
    /// the chain, or drawn from the Gaussian approximations.
    pub fn set_posterior<R: Rng + ?Sized>(
        &mut self, values: &Array1<f64>, std_errors: &Array1<f64>, posterior: Posterior,
        rng: &mut R,
    ) -> GASResult<()> {
        self.check_len(values.len())?;
        self.check_len(std_errors.len())?;
        self.posterior = posterior;
        let draws = match &self.posterior {
            Posterior::Point => None,
            Posterior::Samples(chain) => Some(chain.clone()),
            Posterior::Gaussian { .. } | Posterior::MeanField { .. } => {
                Some(self.draw(POSTERIOR_SAMPLE_SIZE, rng)?)
            }
        };
        for (i, v) in self.vars.iter_mut().enumerate() {
            v.value = values[i];
            v.std_error = Some(std_errors[i]);
            v.samples = draws
                .as_ref()
                .map(|d| d.column(i).iter().map(|&zi| v.transform.apply(zi)).collect());
        }
        Ok(())
    }

    /// `nsims × k` joint draws of the unconstrained coordinates.
    ///
    /// - `Point`: every row equals the current estimate.
    /// - `Gaussian`: `mean + L·ε` with `L` the Cholesky factor of `cov`,
    ///   falling back to the diagonal when `cov` is not positive definite.
    /// - `Samples`: rows resampled uniformly from the chain.
    /// - `MeanField`: `mean + std ∘ ε`.
    pub fn draw<R: Rng + ?Sized>(&self, nsims: usize, rng: &mut R) -> GASResult<Array2<f64>> {
        if nsims == 0 {
            return Err(GASError::InvalidNsims { nsims });
        }
        let k = self.vars.len();
        let mut out = Array2::<f64>::zeros((nsims, k));
        match &self.posterior {
            Posterior::Point => {
                let current = self.current_values();
                for mut row in out.axis_iter_mut(Axis(0)) {
                    row.assign(&current);
                }
            }
            Posterior::Gaussian { mean, cov } => {
                let factor = cholesky_lower(cov).unwrap_or_else(|| {
                    Array2::from_diag(&cov.diag().mapv(|v| v.max(0.0).sqrt()))
                });
                for mut row in out.axis_iter_mut(Axis(0)) {
                    let eps: Array1<f64> = (0..k).map(|_| rng.sample(StandardNormal)).collect();
                    row.assign(&(mean + &factor.dot(&eps)));
                }
            }
            Posterior::Samples(chain) => {
                let n = chain.nrows();
                if n == 0 {
                    return Err(GASError::InferenceFailed { reason: "empty posterior chain".into() });
                }
                for mut row in out.axis_iter_mut(Axis(0)) {
                    row.assign(&chain.row(rng.gen_range(0..n)));
                }
            }
            Posterior::MeanField { mean, std } => {
                for mut row in out.axis_iter_mut(Axis(0)) {
                    for j in 0..k {
                        let e: f64 = rng.sample(StandardNormal);
                        row[j] = mean[j] + std[j] * e;
                    }
                }
            }
        }
        Ok(out)
    }

    fn check_len(&self, actual: usize) -> GASResult<()> {
        if actual != self.vars.len() {
            return Err(GASError::LatentLengthMismatch { expected: self.vars.len(), actual });
        }
        Ok(())
    }
}
