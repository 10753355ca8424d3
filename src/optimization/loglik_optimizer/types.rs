//! loglik_optimizer::types — container aliases and solver type wiring.
//!
//! `Theta` is always the unconstrained latent vector of a GAS model, laid
//! out as constant, AR coefficients, then score coefficients. The aliases
//! pin argmin's generic parameters to those `ndarray` containers.
use std::collections::HashMap;

use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    neldermead::NelderMead,
    quasinewton::LBFGS,
};
use ndarray::{Array1, Array2};

pub type Theta = Array1<f64>;
pub type Grad = Array1<f64>;
/// `k × k` curvature matrix, `k = Theta.len()`.
pub type Hessian = Array2<f64>;
/// argmin minimizes, so this is `-ℓ(θ)`.
pub type Cost = f64;
/// argmin's named evaluation counters (`cost_count`, `gradient_count`, ...).
pub type FnEvalMap = HashMap<String, u64>;

/// L-BFGS history size when `MLEOptions::lbfgs_mem` is unset.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// The simplex fallback may iterate this many times `max_iter`.
pub const NELDER_MEAD_ITER_FACTOR: usize = 10;

/// Offset of each extra simplex vertex from the start point.
pub const NELDER_MEAD_STEP: f64 = 0.1;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
pub type NelderMeadSolver = NelderMead<Theta, Cost>;
