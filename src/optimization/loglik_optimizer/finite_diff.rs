//! loglik_optimizer::finite_diff — numerical derivatives in latent space.
//!
//! Two consumers rely on this module. The argmin adapter needs a gradient
//! when a GAS objective has none, and falls back to [`run_fd_diff`] once a
//! central difference has stepped into an infeasible region. The covariance
//! code in `inference::hessian` needs the curvature of the log-posterior at
//! its mode, which [`compute_hessian`] obtains by differencing a gradient.
//!
//! Everything is evaluated at unconstrained `Theta`, and everything returned
//! has passed [`validate_grad`] or [`validate_hessian`].
use std::cell::RefCell;

use argmin::core::Error;
use finitediff::FiniteDiff;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::{validate_grad, validate_hessian},
        types::{Grad, Hessian, Theta},
    },
};

/// Forward-difference gradient of `func`, surfacing the first captured
/// evaluation error.
///
/// `func` cannot return a `Result`, so it parks its first failure in
/// `closure_err` and yields `NaN`. The cell is cleared before differencing.
///
/// # Errors
/// The parked error, or a gradient-shape/finiteness error.
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let grad = theta.forward_diff(func);
    match closure_err.take() {
        Some(err) => Err(err.into()),
        None => validate_grad(&grad, theta.len()).map(|_| grad),
    }
}

/// Symmetric Hessian at `theta` obtained by differencing the gradient map
/// `grad_fn`.
///
/// Central differences first; forward differences only when the central
/// matrix holds a non-finite entry.
///
/// # Errors
/// `InvalidHessian` / `HessianDimMismatch` from the forward attempt.
///
/// # Examples
/// ```rust
/// # use ndarray::array;
/// # use gas_timeseries::optimization::{errors::OptError, loglik_optimizer::{Theta, finite_diff::compute_hessian}};
/// // ℓ(θ) = -θ₀² - θ₀θ₁ - θ₁²
/// let grad = |t: &Theta| array![-2.0 * t[0] - t[1], -t[0] - 2.0 * t[1]];
/// let hess = compute_hessian(&grad, &array![0.3, -0.1])?;
/// assert!((hess[[0, 1]] + 1.0).abs() < 1e-6);
/// # Ok::<(), OptError>(())
/// ```
pub fn compute_hessian<F: Fn(&Theta) -> Grad>(grad_fn: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let central = theta.central_hessian(grad_fn);
    let mut hess = match validate_hessian(&central, dim) {
        Ok(()) => central,
        Err(_) => {
            let forward = theta.forward_hessian(grad_fn);
            validate_hessian(&forward, dim)?;
            forward
        }
    };
    symmetrize(&mut hess);
    Ok(hess)
}

/// Average each mirrored off-diagonal pair.
fn symmetrize(hess: &mut Hessian) {
    let n = hess.nrows();
    for i in 1..n {
        for j in 0..i {
            let mean = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = mean;
            hess[[j, i]] = mean;
        }
    }
}
