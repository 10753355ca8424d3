//! loglik_optimizer::solver — quasi-Newton construction and execution.
//!
//! A GAS fit needs one L-BFGS run per mode search (MLE, PML, the Laplace
//! mode and the MAP start of the samplers). This module owns both halves of
//! that run:
//!
//! - [`lbfgs_hager_zhang`] / [`lbfgs_more_thuente`] turn [`MLEOptions`] into
//!   a configured solver (history size plus the optional stopping rules);
//! - [`execute`] drives an argmin [`Executor`] from the unconstrained start
//!   vector and packages the final state as an [`OptimOutcome`] on the
//!   log-likelihood scale.
//!
//! Any argmin failure is returned as an [`OptError`](crate::optimization::errors::OptError);
//! [`maximize`](super::maximize) reacts to it by switching to the simplex
//! fallback.
use argmin::{
    core::{Executor, IterState, Solver, State},
    solver::quasinewton::LBFGS,
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient, observers::ObserverMode};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        adapter::ArgMinAdapter,
        traits::{LogLikelihood, MLEOptions, OptimOutcome},
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// Iteration state shared by every quasi-Newton run in the crate.
pub type LbfgsState = IterState<Theta, Grad, (), (), (), Cost>;

/// L-BFGS with a Hager–Zhang line search.
pub fn lbfgs_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let memory = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    with_stopping_rules(LBFGS::new(HagerZhangLS::new(), memory), opts)
}

/// L-BFGS with a More–Thuente line search; the default for GAS fits.
pub fn lbfgs_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let memory = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    with_stopping_rules(LBFGS::new(MoreThuenteLS::new(), memory), opts)
}

/// Install the gradient-norm and cost-change tolerances that are set.
///
/// Unset tolerances keep argmin's own defaults. A tolerance argmin refuses
/// comes back as an `OptError` through the crate's `From` conversion.
pub fn with_stopping_rules<L>(
    solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    let solver = match opts.tols.tol_grad {
        Some(tol) => solver.with_tolerance_grad(tol)?,
        None => solver,
    };
    let solver = match opts.tols.tol_cost {
        Some(tol) => solver.with_tolerance_cost(tol)?,
        None => solver,
    };
    Ok(solver)
}

/// Run `solver` on `problem` starting from `theta0`.
///
/// The iteration cap comes from `opts.tols.max_iter`. With the `obs_slog`
/// feature and `opts.verbose`, the objective at the start point is logged
/// and a terminal observer reports every iteration.
///
/// The returned outcome carries the best parameter seen, `ℓ(θ̂) = -c(θ̂)`,
/// argmin's termination status and its evaluation counters.
///
/// # Errors
/// Solver and line-search failures, plus any rejection from
/// [`OptimOutcome::new`] (missing or non-finite `θ̂`).
pub fn execute<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: Solver<ArgMinAdapter<'a, F>, LbfgsState> + Send + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        report_start(&theta0, &problem)?;
    }

    let max_iter = opts.tols.max_iter;
    #[cfg_attr(not(feature = "obs_slog"), allow(unused_mut))]
    let mut executor = Executor::new(problem, solver).configure(|state| {
        let state = state.param(theta0);
        match max_iter {
            Some(cap) => state.max_iters(cap as u64),
            None => state,
        }
    });
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        executor =
            executor.add_observer(argmin_observer_slog::SlogLogger::term_noblock(), ObserverMode::Always);
    }

    let mut state = executor.run()?.state().clone();
    let iterations = state.get_iter();
    let counts = state.get_func_counts().clone();
    let status = state.get_termination_status().clone();
    let last_grad = state.take_gradient();
    let best_value = -state.get_best_cost();
    OptimOutcome::new(state.take_best_param(), best_value, status, iterations, counts, last_grad)
}

#[cfg(feature = "obs_slog")]
fn report_start<F: LogLikelihood>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()> {
    let ell = -problem.cost(theta0)?;
    match problem.gradient(theta0) {
        Ok(g) => tracing::info!(ell, grad_norm = g.l2_norm(), "GAS objective at start"),
        Err(_) => tracing::info!(ell, "GAS objective at start"),
    }
    Ok(())
}
