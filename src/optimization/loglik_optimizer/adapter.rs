//! Adapters that expose a user `LogLikelihood` as an `argmin` problem.
//!
//! Maximizing an objective `ℓ(θ)` becomes minimizing `c(θ) = -ℓ(θ)`.
//! Two flavors exist:
//!
//! - [`ArgMinAdapter`] for gradient-based solvers (L-BFGS). A failing or
//!   non-finite evaluation is a hard error, which lets the line search fail
//!   fast and hand control to the fallback path.
//! - [`SimplexAdapter`] for the derivative-free Nelder–Mead fallback. Here an
//!   infeasible point is not an error but a very large cost, so the simplex
//!   simply contracts away from it.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        finite_diff::run_fd_diff,
        traits::{LogLikelihood, validate_grad},
        types::{Cost, Grad, Theta},
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// Cost assigned by [`SimplexAdapter`] to points where the objective cannot
/// be evaluated.
pub const INFEASIBLE_COST: f64 = 1e300;

/// Bridges a user `LogLikelihood` to `argmin`'s `CostFunction` and `Gradient`.
///
/// - `CostFunction::cost` returns `-ℓ(θ)`.
/// - `Gradient::gradient` returns:
///   - `-∇ℓ(θ)` if the user provides an analytic gradient, or
///   - a finite-difference gradient of the cost (no sign flip needed).
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    /// Construct a new adapter over a user `LogLikelihood` and its data.
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<'a, F: LogLikelihood> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate `c(θ) = -ℓ(θ)`.
    ///
    /// # Errors
    /// - Propagates any `OptError` from the user's `value`.
    /// - `OptError::NonFiniteCost` when `ℓ(θ)` is NaN or infinite.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(-output)
    }
}

impl<'a, F: LogLikelihood> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Evaluate the gradient of the cost at `θ`.
    ///
    /// With an analytic `grad` the result is validated and negated. Without
    /// one, central differences of the cost are tried first; if any cost
    /// evaluation failed or the result is non-finite, forward differences are
    /// used instead (see [`run_fd_diff`]).
    ///
    /// The finite-difference closure must return `f64`, so the first error it
    /// meets is parked in `closure_err` and `NaN` is returned in its place.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = theta.len();
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost_func = |theta: &Theta| -> f64 {
                    match self.cost(theta) {
                        Ok(val) => val,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            f64::NAN
                        }
                    }
                };
                let fd_grad = theta.central_diff(&cost_func);
                if closure_err.borrow().is_none() && validate_grad(&fd_grad, dim).is_ok() {
                    return Ok(fd_grad);
                }
                Ok(run_fd_diff(theta, &cost_func, &closure_err)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Derivative-free view of a `LogLikelihood` for simplex methods.
///
/// Infeasible evaluations (errors or non-finite values) are mapped to
/// [`INFEASIBLE_COST`] instead of aborting the run.
#[derive(Debug, Clone)]
pub struct SimplexAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> SimplexAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<'a, F: LogLikelihood> CostFunction for SimplexAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        match self.f.value(theta, self.data) {
            Ok(v) if v.is_finite() => Ok(-v),
            _ => Ok(INFEASIBLE_COST),
        }
    }
}
