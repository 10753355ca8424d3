//! loglik_optimizer::api — the single entry point used by every GAS mode
//! search.
//!
//! L-BFGS runs first with the configured line search. Any failure it
//! reports (typically a line search that wandered into an infeasible
//! region) hands the original start vector to the Nelder–Mead fallback.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        fallback::run_nelder_mead,
        solver::{execute, lbfgs_hager_zhang, lbfgs_more_thuente},
        traits::{LineSearcher, LogLikelihood, MLEOptions},
    },
};
use tracing::warn;

/// Maximize `ℓ(θ)` from `theta0`.
///
/// `f.check` vets the start vector once. A failed L-BFGS run is logged at
/// `warn` level and retried with [`run_nelder_mead`] from the same start.
///
/// # Errors
/// - Whatever `f.check` reports.
/// - Solver construction errors (a tolerance argmin refuses).
/// - The fallback's error when both solvers fail.
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use gas_timeseries::optimization::{
///     errors::{OptError, OptResult},
///     loglik_optimizer::{maximize, LogLikelihood, MLEOptions, Theta},
/// };
///
/// /// Gaussian log-likelihood of three observations in the mean only.
/// struct MeanOnly;
/// impl LogLikelihood for MeanOnly {
///     type Data = [f64; 3];
///     fn value(&self, theta: &Theta, y: &[f64; 3]) -> OptResult<f64> {
///         Ok(-0.5 * y.iter().map(|v| (v - theta[0]).powi(2)).sum::<f64>())
///     }
///     fn check(&self, _: &Theta, _: &[f64; 3]) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&MeanOnly, array![0.0], &[1.0, 2.0, 3.0], &MLEOptions::default())?;
/// assert!((out.theta_hat[0] - 2.0).abs() < 1e-4);
/// # Ok::<(), OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    let lbfgs = match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = lbfgs_more_thuente(opts)?;
            execute(theta0.clone(), opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = lbfgs_hager_zhang(opts)?;
            execute(theta0.clone(), opts, problem, solver)
        }
    };
    match lbfgs {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            warn!(error = %err, "L-BFGS failed; retrying with Nelder-Mead");
            run_nelder_mead(f, theta0, data, opts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::{OptError, OptResult};
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - L-BFGS convergence on a smooth concave objective.
    // - Recovery through the Nelder–Mead fallback when every gradient call
    //   fails.
    // -------------------------------------------------------------------------

    struct Concave;

    impl LogLikelihood for Concave {
        type Data = ();
        fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
            Ok(-(theta[0] - 1.0).powi(2) - 2.0 * (theta[1] + 0.5).powi(2))
        }
        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
        fn grad(&self, theta: &Theta, _: &()) -> OptResult<Theta> {
            Ok(array![-2.0 * (theta[0] - 1.0), -4.0 * (theta[1] + 0.5)])
        }
    }

    struct BrokenGradient;

    impl LogLikelihood for BrokenGradient {
        type Data = ();
        fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
            Ok(-(theta[0] - 1.0).powi(2))
        }
        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
        fn grad(&self, _: &Theta, _: &()) -> OptResult<Theta> {
            Err(OptError::InfeasiblePoint { reason: "no gradient here".to_string() })
        }
    }

    #[test]
    // Purpose
    // -------
    // `maximize` finds the optimum of a concave quadratic.
    //
    // Given
    // -----
    // - ℓ(θ) = -(θ₀ - 1)² - 2(θ₁ + 0.5)², start at the origin.
    //
    // Expect
    // ------
    // - θ̂ ≈ (1, -0.5).
    fn maximize_converges_on_concave_quadratic() {
        // Act
        let out = maximize(&Concave, array![0.0, 0.0], &(), &MLEOptions::default())
            .expect("maximize should converge");

        // Assert
        assert!((out.theta_hat[0] - 1.0).abs() < 1e-4);
        assert!((out.theta_hat[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    // Purpose
    // -------
    // A failing L-BFGS run is rescued by the derivative-free fallback.
    //
    // Given
    // -----
    // - An objective whose gradient always errors.
    //
    // Expect
    // ------
    // - `maximize` still returns θ̂ ≈ 1.
    fn maximize_falls_back_to_nelder_mead() {
        // Act
        let out = maximize(&BrokenGradient, array![-2.0], &(), &MLEOptions::default())
            .expect("fallback should succeed");

        // Assert
        assert!((out.theta_hat[0] - 1.0).abs() < 1e-3);
    }
}
