//! inference::metropolis — random-walk Metropolis–Hastings with tuning.
//!
//! Purpose
//! -------
//! Draw a Markov chain from an unnormalized [`LogPosterior`] in the
//! unconstrained latent space. Proposals are Gaussian random-walk steps
//! `z' = z + s·L·ε` with `L` the lower Cholesky factor of a proposal
//! covariance (usually the inverse Hessian at the posterior mode) and `s` a
//! scalar that is tuned before sampling.
//!
//! Key behaviors
//! -------------
//! - The scale starts at `2.38 / √k`.
//! - Tuning runs blocks of `tuning_block` steps and rescales `s` until the
//!   block acceptance rate lands in `[0.234, 0.4]` or `max_tuning_rounds`
//!   blocks have run. Tuning draws are discarded.
//! - The retained chain has exactly `nsims` rows; with `thinning = t` the
//!   sampler takes `nsims · t` steps and keeps every `t`-th state.
//!
//! Invariants & assumptions
//! ------------------------
//! - Proposals with a non-finite log-posterior (`-∞` or `NaN`) are always
//!   rejected, so the chain never leaves the feasible region.
//! - The starting point itself must have a finite log-posterior.
//! - If the proposal covariance has no Cholesky factor, its diagonal
//!   (floored at a small positive value) is used instead.
use crate::inference::{
    errors::{InferenceError, InferenceResult},
    hessian::cholesky_lower,
    traits::LogPosterior,
};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

/// Lower bound of the target acceptance band.
pub const TARGET_ACCEPT_LOW: f64 = 0.234;

/// Upper bound of the target acceptance band.
pub const TARGET_ACCEPT_HIGH: f64 = 0.4;

/// Floor applied to proposal variances when falling back to the diagonal.
const MIN_PROPOSAL_VAR: f64 = 1e-8;

/// Sampler configuration.
///
/// Default: `nsims = 10000`, `map_start = true`, `thinning = 1`,
/// `tuning_block = 100`, `max_tuning_rounds = 20`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MHOptions {
    /// Number of retained draws.
    pub nsims: usize,
    /// Start from the posterior mode and use its inverse Hessian as the
    /// proposal covariance.
    pub map_start: bool,
    /// Keep every `thinning`-th state.
    pub thinning: usize,
    pub tuning_block: usize,
    pub max_tuning_rounds: usize,
}

impl MHOptions {
    /// Validated options with the default tuning schedule.
    ///
    /// # Errors
    /// - `InferenceError::InvalidOption` if `nsims` or `thinning` is zero.
    pub fn new(nsims: usize, map_start: bool, thinning: usize) -> InferenceResult<Self> {
        if nsims == 0 {
            return Err(InferenceError::InvalidOption {
                name: "nsims",
                reason: "Number of draws must be positive.",
            });
        }
        if thinning == 0 {
            return Err(InferenceError::InvalidOption {
                name: "thinning",
                reason: "Thinning must be positive.",
            });
        }
        Ok(Self { nsims, map_start, thinning, ..Self::default() })
    }
}

impl Default for MHOptions {
    fn default() -> Self {
        Self { nsims: 10000, map_start: true, thinning: 1, tuning_block: 100, max_tuning_rounds: 20 }
    }
}

/// Chain and diagnostics from [`metropolis_hastings`].
#[derive(Debug, Clone, PartialEq)]
pub struct MHOutcome {
    /// `nsims × k` retained states.
    pub chain: Array2<f64>,
    /// Acceptance rate over the retained run.
    pub acceptance_rate: f64,
    /// Final proposal scale.
    pub scale: f64,
    pub tuning_rounds: usize,
    /// Whether a tuning block hit the target band.
    pub tuned: bool,
}

/// Run a tuned random-walk Metropolis–Hastings sampler.
///
/// Parameters
/// ----------
/// - `post`: target density.
/// - `start`: initial state; must have a finite log-posterior.
/// - `proposal_cov`: `k×k` proposal covariance before scaling.
/// - `opts`: draw count, thinning, tuning schedule.
/// - `rng`: random source.
///
/// Errors
/// ------
/// - `InferenceError::InfeasibleStart` if `post` is not finite at `start`.
/// - `InferenceError::CovarianceDimMismatch` if `start`, `proposal_cov` and
///   `post.dim()` disagree.
/// - `InferenceError::InvalidOption` for zero `nsims`, `thinning` or
///   `tuning_block`.
pub fn metropolis_hastings<P, R>(
    post: &P, start: &Array1<f64>, proposal_cov: &Array2<f64>, opts: &MHOptions, rng: &mut R,
) -> InferenceResult<MHOutcome>
where
    P: LogPosterior + ?Sized,
    R: Rng + ?Sized,
{
    let k = post.dim();
    if start.len() != k || proposal_cov.nrows() != k || proposal_cov.ncols() != k {
        return Err(InferenceError::CovarianceDimMismatch {
            expected: k,
            found: (proposal_cov.nrows(), proposal_cov.ncols()),
        });
    }
    if opts.nsims == 0 || opts.thinning == 0 || opts.tuning_block == 0 {
        return Err(InferenceError::InvalidOption {
            name: "MHOptions",
            reason: "nsims, thinning and tuning_block must be positive.",
        });
    }
    let lp_start = post.log_posterior(start);
    if !lp_start.is_finite() {
        return Err(InferenceError::InfeasibleStart { value: lp_start });
    }

    let chol = proposal_factor(proposal_cov);
    let mut walker = Walker { current: start.clone(), lp: lp_start, chol };
    let mut scale = 2.38 / (k.max(1) as f64).sqrt();

    let mut tuned = false;
    let mut tuning_rounds = 0;
    while tuning_rounds < opts.max_tuning_rounds {
        tuning_rounds += 1;
        let accepted =
            (0..opts.tuning_block).filter(|_| walker.step(post, scale, rng)).count();
        let rate = accepted as f64 / opts.tuning_block as f64;
        debug!(round = tuning_rounds, rate, scale, "M-H tuning block");
        if (TARGET_ACCEPT_LOW..=TARGET_ACCEPT_HIGH).contains(&rate) {
            tuned = true;
            break;
        }
        scale = rescale(scale, rate);
    }

    let mut chain = Array2::<f64>::zeros((opts.nsims, k));
    let mut accepted = 0usize;
    for mut row in chain.rows_mut() {
        for _ in 0..opts.thinning {
            if walker.step(post, scale, rng) {
                accepted += 1;
            }
        }
        row.assign(&walker.current);
    }
    let acceptance_rate = accepted as f64 / (opts.nsims * opts.thinning) as f64;

    Ok(MHOutcome { chain, acceptance_rate, scale, tuning_rounds, tuned })
}

/// Multiplicative scale adjustment for an observed acceptance rate.
///
/// Rates inside `[0.234, 0.4]` leave the scale unchanged.
pub fn rescale(scale: f64, rate: f64) -> f64 {
    if rate > 0.8 {
        scale * 2.0
    } else if rate > TARGET_ACCEPT_HIGH {
        scale * 1.3
    } else if rate >= TARGET_ACCEPT_LOW {
        scale
    } else if rate > 0.1 {
        scale / 1.3
    } else if rate > 0.05 {
        scale * 0.4
    } else if rate > 0.01 {
        scale * 0.2
    } else {
        scale * 0.1
    }
}

// ---- Helper methods ----

struct Walker {
    current: Array1<f64>,
    lp: f64,
    chol: Array2<f64>,
}

impl Walker {
    /// One proposal; returns whether it was accepted.
    fn step<P, R>(&mut self, post: &P, scale: f64, rng: &mut R) -> bool
    where
        P: LogPosterior + ?Sized,
        R: Rng + ?Sized,
    {
        let k = self.current.len();
        let eps = Array1::from_shape_fn(k, |_| rng.sample::<f64, _>(StandardNormal));
        let proposal = &self.current + &(self.chol.dot(&eps) * scale);
        let lp_new = post.log_posterior(&proposal);
        if !lp_new.is_finite() {
            return false;
        }
        let log_u = rng.gen_range(0.0_f64..1.0).ln();
        if log_u < lp_new - self.lp {
            self.current = proposal;
            self.lp = lp_new;
            true
        } else {
            false
        }
    }
}

fn proposal_factor(cov: &Array2<f64>) -> Array2<f64> {
    cholesky_lower(cov).unwrap_or_else(|| {
        Array2::from_diag(&cov.diag().mapv(|v| {
            if v.is_finite() { v.max(MIN_PROPOSAL_VAR).sqrt() } else { 1.0 }
        }))
    })
}
