//! θ–recursion for GAS(ar, sc): path, log-likelihood and analytic gradient.
//!
//! ## Model convention
//! `θ_t = c + Σ_{i=1..ar} φ_i θ_{t−i} + Σ_{j=1..sc} α_j u_{t−j}`
//!
//! where `u_s` is the (scaled) score of the family log-density at
//! `(y_s, θ_s)`. The latent vector is laid out as `[c, φ₁..φ_ar, α₁..α_sc]`.
//!
//! ## What this module does
//! - Seeds the first `m = max(ar, sc)` points at the unconditional level
//!   `c / (1 − Σφ)` (or `c` when the AR part is absent or unit-root).
//! - Runs the recursion forward, clamping every `θ_t` with [`ThetaGuards`].
//! - Sums `log p(y_t | θ_t)` over `t ≥ m`.
//! - Propagates the sensitivities `∂θ_t/∂β` alongside the path so the
//!   gradient of the log-likelihood is exact.
//!
//! ## Domain errors
//! An observation outside the family support or a non-finite `θ_t` aborts
//! the pass. [`compute_path`] reports this as a `-∞` log-likelihood; the
//! gradient entry point returns the error so optimizers see an infeasible
//! point.
use crate::{
    gas::{
        core::{
            family::Family,
            guards::{ThetaGuards, guard_theta},
            options::ScoreScaling,
            shape::GASShape,
        },
        errors::{GASError, GASResult},
    },
    optimization::numerical_stability::GENERAL_TOL,
};
use ndarray::{Array1, Array2, ArrayView1, s};

/// Everything the recursion needs besides the latent vector and data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GASSpec {
    pub family: Family,
    pub shape: GASShape,
    pub scaling: ScoreScaling,
    pub guards: ThetaGuards,
}

/// Latent vector split into constant, AR and score coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct GASCoefficients {
    pub constant: f64,
    pub ar: Array1<f64>,
    pub sc: Array1<f64>,
}

impl GASCoefficients {
    /// # Errors
    /// - `GASError::LatentLengthMismatch` if `params.len() != 1 + ar + sc`.
    pub fn from_vector(shape: &GASShape, params: ArrayView1<f64>) -> GASResult<Self> {
        let expected = shape.n_latent();
        if params.len() != expected {
            return Err(GASError::LatentLengthMismatch { expected, actual: params.len() });
        }
        Ok(GASCoefficients {
            constant: params[0],
            ar: params.slice(s![1..1 + shape.ar]).to_owned(),
            sc: params.slice(s![1 + shape.ar..]).to_owned(),
        })
    }

    /// Sum of AR coefficients.
    pub fn persistence(&self) -> f64 {
        self.ar.sum()
    }

    /// Whether the unconditional level `c / (1 − Σφ)` is defined.
    fn has_level(&self) -> bool {
        !self.ar.is_empty() && (1.0 - self.persistence()).abs() > GENERAL_TOL
    }

    /// Value used for the seed points.
    pub fn seed(&self) -> f64 {
        if self.has_level() { self.constant / (1.0 - self.persistence()) } else { self.constant }
    }

    /// Next θ from histories stored oldest-first (newest at the end).
    ///
    /// Requires `theta_hist.len() >= ar` and `score_hist.len() >= sc`.
    /// Returns the guarded value and whether it was clamped.
    pub fn next_theta(&self, theta_hist: &[f64], score_hist: &[f64], guards: &ThetaGuards) -> (f64, bool) {
        let mut value = self.constant;
        for (i, phi) in self.ar.iter().enumerate() {
            value += phi * theta_hist[theta_hist.len() - 1 - i];
        }
        for (j, alpha) in self.sc.iter().enumerate() {
            value += alpha * score_hist[score_hist.len() - 1 - j];
        }
        if value.is_nan() {
            return (value, false);
        }
        guard_theta(value, guards)
    }
}

/// In-sample θ path, innovations and log-likelihood.
#[derive(Debug, Clone, PartialEq)]
pub struct GASPath {
    pub theta: Array1<f64>,
    /// Scaled scores `u_t` for every t.
    pub scores: Array1<f64>,
    /// `Σ_{t ≥ m} log p(y_t | θ_t)`, or `-∞` on a domain error.
    pub loglik: f64,
}

impl GASPath {
    pub fn is_feasible(&self) -> bool {
        self.loglik.is_finite()
    }
}

/// Run the recursion and return the θ path with its log-likelihood.
///
/// Never fails: a domain error or a latent vector of the wrong length
/// yields a NaN path with `loglik = -∞`. Use [`GASPath::is_feasible`] to
/// test.
pub fn compute_path(spec: &GASSpec, params: &Array1<f64>, y: ArrayView1<f64>) -> GASPath {
    let n = y.len();
    match filter(spec, params.view(), y, false) {
        Ok(pass) => GASPath { theta: pass.theta, scores: pass.scores, loglik: pass.loglik },
        Err(_) => GASPath {
            theta: Array1::from_elem(n, f64::NAN),
            scores: Array1::from_elem(n, f64::NAN),
            loglik: f64::NEG_INFINITY,
        },
    }
}

/// Log-likelihood and its exact gradient with respect to the natural
/// latent vector.
///
/// # Errors
/// - Any domain error (`OutOfSupport`, `NonFiniteTheta`,
///   `InvalidFamilyParam`) or `LatentLengthMismatch`.
pub fn compute_gradient(
    spec: &GASSpec, params: &Array1<f64>, y: ArrayView1<f64>,
) -> GASResult<(f64, Array1<f64>)> {
    let pass = filter(spec, params.view(), y, true)?;
    let grad = pass.grad.unwrap_or_else(|| Array1::zeros(params.len()));
    Ok((pass.loglik, grad))
}

/// Fallible log-likelihood; the objective's value path.
pub fn try_loglik(spec: &GASSpec, params: &Array1<f64>, y: ArrayView1<f64>) -> GASResult<f64> {
    Ok(filter(spec, params.view(), y, false)?.loglik)
}

// ---- Helper Methods ----

struct FilterPass {
    theta: Array1<f64>,
    scores: Array1<f64>,
    loglik: f64,
    grad: Option<Array1<f64>>,
}

/// Single forward pass. With `with_grad`, also carries the `n × k`
/// sensitivity matrix `D[t, ·] = ∂θ_t/∂β`.
fn filter(
    spec: &GASSpec, params: ArrayView1<f64>, y: ArrayView1<f64>, with_grad: bool,
) -> GASResult<FilterPass> {
    let coefs = GASCoefficients::from_vector(&spec.shape, params)?;
    let (ar, sc) = (spec.shape.ar, spec.shape.sc);
    let m = spec.shape.burn_in();
    let n = y.len();
    let k = spec.shape.n_latent();

    let mut theta = Vec::with_capacity(n);
    let mut scores = Vec::with_capacity(n);
    let mut dscore = Vec::with_capacity(if with_grad { n } else { 0 });
    let mut sens = if with_grad { Array2::<f64>::zeros((n, k)) } else { Array2::zeros((0, k)) };
    let mut grad = Array1::<f64>::zeros(k);
    let mut loglik = 0.0;

    let (seed, seed_clamped) = guard_theta(coefs.seed(), &spec.guards);
    let one_minus = 1.0 - coefs.persistence();

    for t in 0..n {
        let (theta_t, clamped) = if t < m {
            (seed, seed_clamped)
        } else {
            coefs.next_theta(&theta, &scores, &spec.guards)
        };
        if !theta_t.is_finite() {
            return Err(GASError::NonFiniteTheta { t, value: theta_t });
        }
        let y_t = y[t];
        spec.family.check_support(t, y_t)?;
        let u_t = spec.family.scaled_score(y_t, theta_t, spec.scaling);

        if with_grad && !clamped {
            if t < m {
                if coefs.has_level() {
                    sens[[t, 0]] = 1.0 / one_minus;
                    for i in 0..ar {
                        sens[[t, 1 + i]] = coefs.constant / (one_minus * one_minus);
                    }
                } else {
                    sens[[t, 0]] = 1.0;
                }
            } else {
                let mut row = Array1::<f64>::zeros(k);
                row[0] = 1.0;
                for i in 0..ar {
                    row[1 + i] += theta[t - 1 - i];
                    row.scaled_add(coefs.ar[i], &sens.row(t - 1 - i));
                }
                for j in 0..sc {
                    row[1 + ar + j] += scores[t - 1 - j];
                    row.scaled_add(coefs.sc[j] * dscore[t - 1 - j], &sens.row(t - 1 - j));
                }
                sens.row_mut(t).assign(&row);
            }
        }

        if t >= m {
            loglik += spec.family.log_density(y_t, theta_t)?;
            if with_grad {
                grad.scaled_add(spec.family.score(y_t, theta_t), &sens.row(t));
            }
        }
        if with_grad {
            dscore.push(spec.family.score_derivative(y_t, theta_t, spec.scaling));
        }
        theta.push(theta_t);
        scores.push(u_t);
    }

    if !loglik.is_finite() {
        return Err(GASError::InfeasibleFit);
    }
    Ok(FilterPass {
        theta: Array1::from(theta),
        scores: Array1::from(scores),
        loglik,
        grad: with_grad.then_some(grad),
    })
}
