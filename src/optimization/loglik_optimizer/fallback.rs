//! Derivative-free fallback for likelihood maximization.
//!
//! GAS log-likelihood surfaces can contain regions where the recursion
//! saturates its guards or the observation density cannot be evaluated.
//! A line search stepping into such a region aborts the L-BFGS run; this
//! module then restarts from the original guess with argmin's Nelder–Mead
//! simplex, which tolerates infeasible vertices through
//! [`SimplexAdapter`].
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        adapter::{INFEASIBLE_COST, SimplexAdapter},
        traits::{LogLikelihood, MLEOptions, OptimOutcome},
        types::{NELDER_MEAD_ITER_FACTOR, NELDER_MEAD_STEP, NelderMeadSolver, Theta},
    },
};
use argmin::core::{Executor, State};

/// Default simplex iteration cap when `MLEOptions` carries no `max_iter`.
const DEFAULT_SIMPLEX_ITERS: usize = 3000;

/// Maximize `ℓ(θ)` with Nelder–Mead starting from `theta0`.
///
/// The initial simplex is `theta0` plus one vertex per coordinate displaced
/// by [`NELDER_MEAD_STEP`]. The iteration cap is
/// `max_iter * NELDER_MEAD_ITER_FACTOR`.
///
/// # Errors
/// - `OptError::InfeasiblePoint` if every visited vertex was infeasible.
/// - Backend errors from argmin and `OptimOutcome` validation failures.
pub fn run_nelder_mead<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    let simplex = initial_simplex(&theta0);
    let mut solver = NelderMeadSolver::new(simplex);
    if let Some(tol) = opts.tols.tol_cost {
        solver = solver.with_sd_tolerance(tol)?;
    }
    let max_iter = opts
        .tols
        .max_iter
        .map_or(DEFAULT_SIMPLEX_ITERS, |m| m.saturating_mul(NELDER_MEAD_ITER_FACTOR));

    let problem = SimplexAdapter::new(f, data);
    let mut result = Executor::new(problem, solver)
        .configure(|state| state.max_iters(max_iter as u64))
        .run()?
        .state()
        .clone();

    let best_cost = result.get_best_cost();
    if !best_cost.is_finite() || best_cost >= INFEASIBLE_COST {
        return Err(OptError::InfeasiblePoint {
            reason: "Nelder-Mead found no feasible vertex.".to_string(),
        });
    }
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    OptimOutcome::new(
        result.take_best_param(),
        -best_cost,
        termination,
        iterations,
        function_counts,
        None,
    )
}

fn initial_simplex(theta0: &Theta) -> Vec<Theta> {
    let mut simplex = Vec::with_capacity(theta0.len() + 1);
    simplex.push(theta0.clone());
    for i in 0..theta0.len() {
        let mut vertex = theta0.clone();
        vertex[i] += NELDER_MEAD_STEP;
        simplex.push(vertex);
    }
    simplex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptResult,
        loglik_optimizer::traits::{LineSearcher, Tolerances},
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction of the initial simplex.
    // - Convergence of the fallback on a concave objective with an infeasible
    //   half-space.
    // -------------------------------------------------------------------------

    struct ShiftedQuadratic;

    impl LogLikelihood for ShiftedQuadratic {
        type Data = ();
        fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
            if theta[0] < -1.0 {
                return Err(OptError::InfeasiblePoint { reason: "left of -1".to_string() });
            }
            Ok(-((theta[0] - 0.5).powi(2) + (theta[1] + 0.25).powi(2)))
        }
        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // The simplex has `k + 1` vertices, each displaced along one axis.
    //
    // Given
    // -----
    // - θ₀ = (1, 2).
    //
    // Expect
    // ------
    // - Vertices θ₀, θ₀ + step·e₀, θ₀ + step·e₁.
    fn initial_simplex_has_one_vertex_per_axis() {
        // Act
        let simplex = initial_simplex(&array![1.0, 2.0]);

        // Assert
        assert_eq!(simplex.len(), 3);
        assert_eq!(simplex[1], array![1.0 + NELDER_MEAD_STEP, 2.0]);
        assert_eq!(simplex[2], array![1.0, 2.0 + NELDER_MEAD_STEP]);
    }

    #[test]
    // Purpose
    // -------
    // Nelder–Mead finds the maximizer even when some trial vertices are
    // infeasible.
    //
    // Given
    // -----
    // - ℓ(θ) = -(θ₀ - 0.5)² - (θ₁ + 0.25)², undefined for θ₀ < -1.
    // - Start at (-0.9, 0.0).
    //
    // Expect
    // ------
    // - θ̂ ≈ (0.5, -0.25) and ℓ(θ̂) ≈ 0.
    fn run_nelder_mead_converges_on_concave_objective() {
        // Arrange
        let tols = Tolerances::new(None, Some(1e-12), Some(200)).expect("valid tolerances");
        let opts = MLEOptions::new(tols, LineSearcher::MoreThuente, None).expect("valid options");

        // Act
        let out = run_nelder_mead(&ShiftedQuadratic, array![-0.9, 0.0], &(), &opts)
            .expect("fallback should converge");

        // Assert
        assert!((out.theta_hat[0] - 0.5).abs() < 1e-3);
        assert!((out.theta_hat[1] + 0.25).abs() < 1e-3);
        assert!(out.value > -1e-5);
    }
}
