//! loglik_optimizer::traits — objective interface, optimizer options and
//! the normalized optimizer result.
//!
//! Every GAS mode search maximizes `ℓ(θ)` over the unconstrained latent
//! vector: the log-likelihood for MLE, the log-posterior otherwise. Models
//! implement [`LogLikelihood`] for that objective and return `∇ℓ(θ)` from
//! `grad` when they have it; the argmin adapter negates both.
//!
//! The bottom of the file holds the small numeric checks shared by the
//! options, the outcome and the finite-difference code.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::types::{Cost, FnEvalMap, Grad, Hessian, Theta},
};
use argmin::core::TerminationStatus;
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Objective maximized by [`maximize`](super::maximize).
///
/// `check` runs once on the start vector; `value` and `grad` run at every
/// trial point and report infeasible points as errors. Without a `grad`
/// override the adapter differentiates `value` numerically.
pub trait LogLikelihood {
    type Data: 'static;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Line search paired with L-BFGS. Parses case-insensitively from
/// `"MoreThuente"` and `"HagerZhang"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("morethuente") {
            Ok(LineSearcher::MoreThuente)
        } else if s.eq_ignore_ascii_case("hagerzhang") {
            Ok(LineSearcher::HagerZhang)
        } else {
            Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            })
        }
    }
}

/// Settings for one L-BFGS mode search.
///
/// The default stops on a gradient norm of `1e-6` or after 300 iterations,
/// uses More–Thuente and the crate's default history size. `verbose` only
/// has an effect with the `obs_slog` feature; `new` leaves it off.
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
}

impl MLEOptions {
    /// # Errors
    /// `OptError::InvalidLBFGSMem` when `lbfgs_mem` is `Some(0)`.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if lbfgs_mem == Some(0) {
            return Err(OptError::InvalidLBFGSMem {
                mem: 0,
                reason: "L-BFGS memory must be greater than zero.",
            });
        }
        Ok(Self { tols, line_searcher, verbose: false, lbfgs_mem })
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances { tol_grad: Some(1e-6), tol_cost: None, max_iter: Some(300) },
            line_searcher: LineSearcher::MoreThuente,
            verbose: false,
            lbfgs_mem: None,
        }
    }
}

/// Stopping rules: gradient norm, cost change and iteration cap.
///
/// Each rule is optional, but a run needs at least one of them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// # Errors
    /// - `NoTolerancesProvided` when every rule is `None`.
    /// - `InvalidTolGrad` / `InvalidTolCost` for a tolerance that is not a
    ///   finite positive number.
    /// - `InvalidMaxIter` for a zero iteration cap.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        if let Some(tol) = tol_cost {
            positive_tolerance(tol)
                .map_err(|reason| OptError::InvalidTolCost { tol, reason })?;
        }
        if let Some(tol) = tol_grad {
            positive_tolerance(tol)
                .map_err(|reason| OptError::InvalidTolGrad { tol, reason })?;
        }
        if max_iter == Some(0) {
            return Err(OptError::InvalidMaxIter {
                max_iter: 0,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Result of [`maximize`](super::maximize), on the objective scale.
///
/// `value` is `ℓ(θ̂)`, never the cost. `converged` is false only when argmin
/// stopped without a termination reason; `status` is that reason as text.
/// `fn_evals` keeps argmin's counter names (`cost_count`, `gradient_count`).
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Package the final solver state.
    ///
    /// # Errors
    /// - `MissingThetaHat` when the solver never recorded a best parameter.
    /// - `InvalidThetaHat` for the first non-finite coordinate of `θ̂`.
    /// - `NonFiniteCost` when `value` is not finite.
    pub fn new(
        theta_hat: Option<Theta>, value: f64, termination: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = theta_hat.ok_or(OptError::MissingThetaHat)?;
        if let Some((index, &value)) = first_non_finite(theta_hat.iter()) {
            return Err(OptError::InvalidThetaHat {
                index,
                value,
                reason: "Parameter estimates must be finite.",
            });
        }
        if !value.is_finite() {
            return Err(OptError::NonFiniteCost { value });
        }
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            other => (true, format!("{other:?}")),
        };
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm: grad.map(|g| g.l2_norm()),
        })
    }
}

// ---- Checks ----

fn positive_tolerance(tol: f64) -> Result<(), &'static str> {
    if !tol.is_finite() {
        Err("Tolerance must be finite.")
    } else if tol <= 0.0 {
        Err("Tolerance must be positive.")
    } else {
        Ok(())
    }
}

fn first_non_finite<'a, I>(values: I) -> Option<(usize, &'a f64)>
where
    I: Iterator<Item = &'a f64>,
{
    values.enumerate().find(|(_, v)| !v.is_finite())
}

/// Reject a gradient of the wrong length or with a non-finite entry.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    match first_non_finite(grad.iter()) {
        Some((index, &value)) => Err(OptError::InvalidGradient {
            index,
            value,
            reason: "Gradient elements must be finite.",
        }),
        None => Ok(()),
    }
}

/// Reject a Hessian that is not `dim × dim` or holds a non-finite entry.
pub fn validate_hessian(hessian: &Hessian, dim: usize) -> OptResult<()> {
    if hessian.dim() != (dim, dim) {
        return Err(OptError::HessianDimMismatch { expected: dim, found: hessian.dim() });
    }
    match hessian.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), &value)) => Err(OptError::InvalidHessian { row, col, value }),
        None => Ok(()),
    }
}
