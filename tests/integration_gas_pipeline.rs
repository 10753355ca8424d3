//! Integration tests for GAS models and their estimators.
//!
//! Purpose
//! -------
//! - Validate the end-to-end GAS pipeline: from a raw series, through model
//!   construction and each estimator, to forecasts, replicated series and
//!   posterior predictive checks.
//! - Exercise realistic regimes (a persistent exponential GAS(1, 1) series,
//!   a Poisson count series, differenced input) rather than toy inputs only.
//!
//! Coverage
//! --------
//! - `gas::core`: family parsing, options, differencing via `integ`.
//! - `gas::models::gas::GASModel`: `fit` with MLE, PML, Laplace, M-H and
//!   BBVI; `predict`, `predict_is`, `predict_is_refit`, `sample`, `ppc`,
//!   `summary`.
//! - `inference`: M-H and BBVI option plumbing through `FitOptions`.
//! - `optimization::loglik_optimizer`: L-BFGS via `MLEOptions` and
//!   `Tolerances`.
//!
//! Exclusions
//! ----------
//! - Fine-grained checks of the recursion, gradients, transforms and
//!   samplers; those are covered by unit tests.
//! - Python bindings.
use gas_timeseries::{
    gas::{
        core::{
            family::Family,
            guards::ThetaGuards,
            options::{FitMethod, FitOptions, GASOptions, ScoreScaling, SimOpts},
        },
        errors::GASError,
        models::{gas::GASModel, model_internals::Discrepancy},
    },
    inference::{BBVIOptions, MHOptions, StepRule},
    optimization::loglik_optimizer::{MLEOptions, Tolerances, traits::LineSearcher},
};
use approx::assert_abs_diff_eq;
use ndarray::Array1;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Exp, Poisson};

const N: usize = 200;

/// Purpose
/// -------
/// Simulate an exponential GAS(1, 1) series with rate `exp(θ_t)`:
/// `θ_{t+1} = c + φ θ_t + α (1 − λ_t y_t)`, started at the unconditional
/// level `c / (1 − φ)`.
///
/// Invariants
/// ----------
/// - Deterministic for a fixed `seed`; all values strictly positive.
fn simulate_exponential(n: usize, seed: u64) -> Array1<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (c, phi, alpha) = (0.02, 0.9, 0.1);
    let mut theta: f64 = c / (1.0 - phi);
    Array1::from_iter((0..n).map(|_| {
        let lambda = theta.exp();
        let y = Exp::new(lambda).expect("positive rate").sample(&mut rng);
        theta = c + phi * theta + alpha * (1.0 - lambda * y);
        y
    }))
}

/// Purpose
/// -------
/// Simulate a Poisson GAS(1, 1) count series with intensity `exp(θ_t)` and
/// inverse-Fisher scaled score `(y − λ) / λ`.
fn simulate_poisson(n: usize, seed: u64) -> Array1<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (c, phi, alpha) = (0.15, 0.85, 0.2);
    let mut theta: f64 = c / (1.0 - phi);
    Array1::from_iter((0..n).map(|_| {
        let lambda = theta.exp();
        let y: f64 = Poisson::new(lambda).expect("positive intensity").sample(&mut rng);
        theta = c + phi * theta + alpha * (y - lambda) / lambda;
        y
    }))
}

/// Purpose
/// -------
/// Baseline options for integration tests: inverse-Fisher scaling, default
/// θ-guards, L-BFGS with More–Thuente and a small interval simulation
/// budget to keep runtimes short.
fn test_options() -> GASOptions {
    let tols = Tolerances::new(Some(1e-6), None, Some(300))
        .expect("Tolerances::new should accept positive tolerances");
    let mle_opts = MLEOptions::new(tols, LineSearcher::MoreThuente, None)
        .expect("MLEOptions::new should succeed with reasonable tolerances");
    let guards = ThetaGuards::new((-50.0, 50.0)).expect("finite guards with min < max");
    let sim_opts = SimOpts::new(500).expect("positive nsims");
    GASOptions::new(ScoreScaling::InverseFisher, guards, mle_opts, sim_opts)
}

/// Sampler settings small enough for CI while still tuning and converging.
fn test_fit_options() -> FitOptions {
    FitOptions {
        mh: MHOptions::new(300, true, 1).expect("valid M-H options"),
        bbvi: BBVIOptions::new(200, Some(32), 1e-2, StepRule::RMSProp, true, true)
            .expect("valid BBVI options"),
    }
}

fn exponential_model() -> GASModel {
    GASModel::new(simulate_exponential(N, 2024), 1, 1, 0, Family::Exponential, test_options())
        .expect("GASModel::new should accept a positive exponential series")
}

fn strictly_ordered(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

#[test]
// Purpose
// -------
// Every estimator fits the exponential series and leaves finite, named
// estimates behind.
//
// Given
// -----
// - Simulated exponential GAS(1, 1) series, n = 200.
// - All five fit methods with small sampler budgets.
//
// Expect
// ------
// - Three latent variables named Constant, AR(1), SC(1).
// - No NaN estimates for any method; finite log-likelihood.
// - M-H reports an acceptance rate in (0, 1]; BBVI records a 200-entry
//   ELBO trace.
fn all_estimators_fit_exponential_series() {
    let opts = test_fit_options();
    let methods = [
        FitMethod::MLE,
        FitMethod::PML,
        FitMethod::Laplace,
        FitMethod::MetropolisHastings,
        FitMethod::BBVI,
    ];
    for (i, method) in methods.into_iter().enumerate() {
        // Arrange
        let mut model = exponential_model();
        let mut rng = StdRng::seed_from_u64(100 + i as u64);
        assert_eq!(model.latent.len(), 3);
        assert_eq!(model.latent.names(), vec!["Constant", "AR(1)", "SC(1)"]);

        // Act
        let result = model.fit(method, &opts, &mut rng).expect("fit should succeed");

        // Assert
        assert_eq!(result.method, method);
        assert!(result.estimates.iter().all(|v| v.is_finite()), "{method}: {:?}", result.estimates);
        assert!(result.loglik.is_finite(), "{method}: loglik {}", result.loglik);
        match method {
            FitMethod::MetropolisHastings => {
                let rate = result.acceptance_rate.expect("M-H reports acceptance");
                assert!(rate > 0.0 && rate <= 1.0);
                assert!(result.chain.is_some());
            }
            FitMethod::BBVI => {
                assert_eq!(result.elbo.as_ref().map(Vec::len), Some(200));
            }
            _ => assert!(result.optim.is_some()),
        }
    }
}

#[test]
// Purpose
// -------
// Forecast tables have the documented layout and ordered intervals under
// point and Bayesian posteriors.
//
// Given
// -----
// - Fits by MLE, M-H and BBVI; h = 10.
//
// Expect
// ------
// - `predict` and `predict_is` return 10 rows × 5 columns, no NaN.
// - Point forecasts are not all equal.
// - Interval columns are strictly increasing across 1/5/95/99%.
fn forecasts_have_ordered_intervals() {
    let opts = test_fit_options();
    for method in [FitMethod::MLE, FitMethod::MetropolisHastings, FitMethod::BBVI] {
        // Arrange
        let mut model = exponential_model();
        let mut rng = StdRng::seed_from_u64(77);
        model.fit(method, &opts, &mut rng).expect("fit should succeed");

        // Act
        let oos = model.predict(10, true, &mut rng).expect("predict");
        let is = model.predict_is(10, true, &mut rng).expect("predict_is");

        // Assert
        for table in [&oos, &is] {
            assert_eq!(table.nrows(), 10);
            assert_eq!(table.ncols(), 5);
            assert_eq!(table.columns[0], "Forecast");
            assert!(table.values.iter().all(|v| v.is_finite()));
            let point = table.point();
            assert!(
                point.iter().any(|v| (v - point[0]).abs() > 1e-12),
                "{method}: constant point forecasts"
            );
            for row in table.values.rows() {
                let bands: Vec<f64> = row.iter().skip(1).copied().collect();
                assert!(strictly_ordered(&bands), "{method}: unordered bands {bands:?}");
            }
        }
    }
}

#[test]
// Purpose
// -------
// Replicated series and PPC p-values are well formed.
//
// Given
// -----
// - MLE fit of GAS(1, 1) on n = 200.
//
// Expect
// ------
// - `sample(50)` has shape 50 × 199 and only positive values.
// - `ppc` and `ppc_with(SumOfSquares)` lie in [0, 1].
fn samples_and_ppc_are_well_formed() {
    // Arrange
    let mut model = exponential_model();
    let mut rng = StdRng::seed_from_u64(5);
    model.fit(FitMethod::MLE, &FitOptions::default(), &mut rng).expect("MLE fit");

    // Act
    let sims = model.sample(50, &mut rng).expect("sample");
    let p_mean = model.ppc(&mut rng).expect("ppc");
    let p_ss = model.ppc_with(200, Discrepancy::SumOfSquares, &mut rng).expect("ppc_with");

    // Assert
    assert_eq!(sims.dim(), (50, N - 1));
    assert!(sims.iter().all(|v| *v > 0.0 && v.is_finite()));
    assert!((0.0..=1.0).contains(&p_mean));
    assert!((0.0..=1.0).contains(&p_ss));
}

#[test]
// Purpose
// -------
// Holdout refitting produces rolling forecasts without touching the fit.
//
// Given
// -----
// - An MLE fit, then `predict_is_refit(20, PML)`.
//
// Expect
// ------
// - 20 rows of finite point forecasts; `results` unchanged.
fn predict_is_refit_rolls_over_holdout() {
    // Arrange
    let mut model = exponential_model();
    let mut rng = StdRng::seed_from_u64(13);
    model.fit(FitMethod::MLE, &FitOptions::default(), &mut rng).expect("MLE fit");
    let before = model.results.clone();

    // Act
    let table = model
        .predict_is_refit(20, FitMethod::PML, &FitOptions::default(), false, &mut rng)
        .expect("refit forecasts");

    // Assert
    assert_eq!(table.nrows(), 20);
    assert_eq!(table.ncols(), 1);
    assert!(table.point().iter().all(|v| v.is_finite() && *v > 0.0));
    assert_eq!(model.results, before);
}

#[test]
// Purpose
// -------
// Differenced input is modeled on the differenced scale.
//
// Given
// -----
// - A cumulative sum of exponential observations with `integ = 1`, so
//   the differenced series is the original positive draws.
//
// Expect
// ------
// - The modeled series has n − 1 points; MLE fits and forecasts are finite.
fn differenced_series_is_modeled() {
    // Arrange
    let draws = simulate_exponential(N, 31);
    let mut level = 0.0;
    let raw = Array1::from_iter(std::iter::once(0.0).chain(draws.iter().map(|d| {
        level += d;
        level
    })));
    let mut rng = StdRng::seed_from_u64(31);

    // Act
    let mut model = GASModel::new(raw, 1, 1, 1, Family::Exponential, test_options())
        .expect("differenced model");
    model.fit(FitMethod::MLE, &FitOptions::default(), &mut rng).expect("MLE fit");
    let table = model.predict(3, false, &mut rng).expect("predict");

    // Assert
    assert_eq!(model.data.len(), N);
    for (got, want) in model.data.data.iter().zip(draws.iter()) {
        assert_abs_diff_eq!(*got, *want, epsilon = 1e-9);
    }
    assert!(table.point().iter().all(|v| v.is_finite() && *v > 0.0));
}

#[test]
// Purpose
// -------
// The Poisson family runs through the same pipeline.
//
// Given
// -----
// - Simulated Poisson GAS(1, 1) counts; Laplace fit.
//
// Expect
// ------
// - Finite estimates; 5-step forecasts with ordered intervals; integer
//   replicated counts.
fn poisson_pipeline_runs() {
    // Arrange
    let y = simulate_poisson(N, 8);
    let mut model =
        GASModel::new(y, 1, 1, 0, Family::Poisson, test_options()).expect("Poisson model");
    let mut rng = StdRng::seed_from_u64(8);

    // Act
    let result = model.fit(FitMethod::Laplace, &FitOptions::default(), &mut rng).expect("fit");
    let table = model.predict(5, true, &mut rng).expect("predict");
    let sims = model.sample(20, &mut rng).expect("sample");

    // Assert
    assert!(result.estimates.iter().all(|v| v.is_finite()));
    for row in table.values.rows() {
        assert!(row[1] <= row[2] && row[2] <= row[3] && row[3] <= row[4]);
    }
    assert!(sims.iter().all(|v| *v >= 0.0 && v.fract() == 0.0));
    assert!(model.summary().expect("fitted").contains("Poisson GAS(1, 1)"));
}

#[test]
// Purpose
// -------
// Configuration errors are reported, not panicked on.
//
// Given
// -----
// - An unknown method name, a lag order too large for the series, and
//   forecasting before fitting.
//
// Expect
// ------
// - `UnknownFitMethod`, `InvalidModelShape`/`InsufficientData`, and
//   `ModelNotFitted` respectively.
fn configuration_errors_are_reported() {
    let mut model = exponential_model();
    let mut rng = StdRng::seed_from_u64(1);

    let err = model.fit_named("OLS", &FitOptions::default(), &mut rng).expect_err("unknown");
    assert!(matches!(err, GASError::UnknownFitMethod { ref name } if name == "OLS"));

    let short = simulate_exponential(4, 1);
    let shape_err = GASModel::new(short, 6, 1, 0, Family::Exponential, test_options())
        .expect_err("lag order exceeds series");
    assert!(matches!(
        shape_err,
        GASError::InvalidModelShape { .. } | GASError::InsufficientData { .. }
    ));

    assert!(matches!(model.predict(3, false, &mut rng), Err(GASError::ModelNotFitted)));
    assert!(matches!(model.ppc(&mut rng), Err(GASError::ModelNotFitted)));
}
