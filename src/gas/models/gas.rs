//! GAS(ar, sc) model: estimation, forecasting and posterior predictive checks.
//!
//! This module wires a validated series, a lag structure and an observation
//! family to the estimators in [`crate::inference`] and the L-BFGS
//! maximizer in [`crate::optimization`]. All estimators optimize or sample
//! the same objective ([`GASObjective`]) over the unconstrained latent
//! coordinates; they differ only in what they leave behind in the
//! [`LatentVariableSet`]:
//!
//! | method  | objective          | posterior left behind          |
//! |---------|--------------------|--------------------------------|
//! | MLE     | log-likelihood     | point + Hessian standard errors |
//! | PML     | log-posterior      | point + Hessian standard errors |
//! | Laplace | log-posterior      | Gaussian at the mode            |
//! | M-H     | log-posterior      | retained chain                  |
//! | BBVI    | log-posterior      | mean-field Gaussian             |
//!
//! Forecasts, samples and PPCs draw latent vectors from that posterior, so
//! a point fit yields intervals that reflect observation noise only.
use crate::{
    gas::{
        core::{
            data::GASData,
            family::Family,
            forecasts::{
                ForecastTable, forecast_table, posterior_predictive, quantile_sorted,
                rolling_forecast_table,
            },
            latent::{LatentVariableSet, Posterior},
            options::{FitMethod, FitOptions, GASOptions},
            recursion::GASSpec,
            shape::GASShape,
        },
        errors::{ConvergenceWarning, GASError, GASResult},
        models::model_internals::{Discrepancy, GASObjective, aic, bic, information_covariance},
    },
    inference::{
        bbvi::bbvi,
        hessian::standard_errors,
        metropolis::metropolis_hastings,
    },
    optimization::{
        errors::OptError,
        loglik_optimizer::{OptimOutcome, maximize},
    },
};
use ndarray::{Array1, Array2, Axis, s};
use rand::Rng;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, info, warn};

/// Posterior draws behind the default posterior predictive check.
pub const PPC_NSIMS: usize = 1000;

/// FitResult — summary of the last estimation run.
///
/// Estimates are on the natural scale; standard errors are on the
/// unconstrained scale and NaN when undefined (e.g. singular Hessian).
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub method: FitMethod,
    pub names: Vec<String>,
    pub estimates: Array1<f64>,
    pub std_errors: Array1<f64>,
    /// Log-likelihood at the estimates.
    pub loglik: f64,
    /// Objective value at the mode for PML and Laplace.
    pub log_posterior: Option<f64>,
    pub aic: f64,
    pub bic: f64,
    /// Observations entering the likelihood.
    pub n_eff: usize,
    pub warnings: Vec<ConvergenceWarning>,
    /// Optimizer outcome for mode-based methods.
    pub optim: Option<OptimOutcome>,
    /// BBVI ELBO trace when `record_elbo` was set.
    pub elbo: Option<Vec<f64>>,
    /// M-H acceptance rate over the retained run.
    pub acceptance_rate: Option<f64>,
    /// Retained M-H draws (`nsims × k`, unconstrained scale).
    pub chain: Option<Array2<f64>>,
}

/// GAS(ar, sc) model over one observation series.
#[derive(Debug, Clone, PartialEq)]
pub struct GASModel {
    pub data: GASData,
    pub shape: GASShape,
    pub family: Family,
    pub options: GASOptions,
    pub latent: LatentVariableSet,
    /// Populated by `fit`.
    pub results: Option<FitResult>,
}

/// Mode found by an optimizer, with its curvature when available.
struct Mode {
    z_hat: Array1<f64>,
    cov: Option<Array2<f64>>,
    /// Objective at `z_hat`; `-inf` when no feasible point was found.
    value: f64,
    outcome: Option<OptimOutcome>,
}

impl GASModel {
    /// Build a GAS(ar, sc) model.
    ///
    /// # Arguments
    /// - `data`: raw series; differenced `integ` times before modeling.
    /// - `ar`, `sc`: autoregressive and score lag orders.
    /// - `family`: observation family.
    /// - `options`: scaling, guards, optimizer and simulation settings.
    ///
    /// # Errors
    /// - Data validation errors from [`GASData::new`].
    /// - `GASError::InvalidModelShape` if a lag order is not below the
    ///   differenced sample size.
    pub fn new(
        data: Array1<f64>, ar: usize, sc: usize, integ: usize, family: Family,
        options: GASOptions,
    ) -> GASResult<GASModel> {
        let data = GASData::new(data, integ)?;
        let shape = GASShape::new(ar, sc, data.len())?;
        let latent = LatentVariableSet::for_gas(&shape, family, data.mean())?;
        Ok(GASModel { data, shape, family, options, latent, results: None })
    }

    pub fn spec(&self) -> GASSpec {
        GASSpec {
            family: self.family,
            shape: self.shape,
            scaling: self.options.score_scaling,
            guards: self.options.theta_guards,
        }
    }

    /// Observations entering the likelihood.
    pub fn n_eff(&self) -> usize {
        self.data.len() - self.shape.burn_in()
    }

    /// Fit the model and cache the result.
    ///
    /// `opts` is consulted only by M-H (`opts.mh`) and BBVI (`opts.bbvi`).
    ///
    /// # Errors
    /// - `GASError::OptimizationFailed` when both L-BFGS and the Nelder–Mead
    ///   fallback fail.
    /// - `GASError::InferenceFailed` for invalid sampler options or an
    ///   infeasible starting point.
    pub fn fit<R: Rng + ?Sized>(
        &mut self, method: FitMethod, opts: &FitOptions, rng: &mut R,
    ) -> GASResult<FitResult> {
        let y = self.data.data.clone();
        self.fit_on(&y, method, opts, rng)
    }

    /// [`GASModel::fit`] with the method given by name (`"MLE"`, `"PML"`,
    /// `"Laplace"`, `"M-H"`, `"BBVI"`).
    pub fn fit_named<R: Rng + ?Sized>(
        &mut self, method: &str, opts: &FitOptions, rng: &mut R,
    ) -> GASResult<FitResult> {
        self.fit(method.parse()?, opts, rng)
    }

    /// Out-of-sample forecast table for `h` steps.
    ///
    /// Column `"Forecast"` holds `E[y | θ̂]` along the zero-score path;
    /// with `intervals`, the 1/5/95/99% quantiles of `options.sim_opts.nsims`
    /// simulated futures follow.
    ///
    /// # Errors
    /// - `GASError::ModelNotFitted` before `fit`.
    /// - `GASError::InvalidHorizon` for `h == 0`.
    pub fn predict<R: Rng + ?Sized>(
        &self, h: usize, intervals: bool, rng: &mut R,
    ) -> GASResult<ForecastTable> {
        self.require_fit()?;
        if h == 0 {
            return Err(GASError::InvalidHorizon { h, reason: "horizon must be positive" });
        }
        let params = self.latent.transformed();
        let draws = self.interval_draws(intervals, rng)?;
        forecast_table(&self.spec(), &params, &draws, self.data.data.view(), h, intervals, rng)
    }

    /// One-step-ahead forecasts of the last `h` observations using the
    /// current fit.
    ///
    /// # Errors
    /// - `GASError::ModelNotFitted` before `fit`.
    /// - `GASError::InvalidHorizon` if `h == 0` or the holdout leaves fewer
    ///   than `max(ar, sc) + 1` observations.
    pub fn predict_is<R: Rng + ?Sized>(
        &self, h: usize, intervals: bool, rng: &mut R,
    ) -> GASResult<ForecastTable> {
        self.require_fit()?;
        let params = self.latent.transformed();
        let draws = self.interval_draws(intervals, rng)?;
        rolling_forecast_table(
            &self.spec(),
            &params,
            &draws,
            self.data.data.view(),
            h,
            intervals,
            rng,
        )
    }

    /// Like [`GASModel::predict_is`], but first refits with `method` on the
    /// series without its last `h` points. The model's own fit is left
    /// untouched.
    pub fn predict_is_refit<R: Rng + ?Sized>(
        &self, h: usize, method: FitMethod, opts: &FitOptions, intervals: bool, rng: &mut R,
    ) -> GASResult<ForecastTable> {
        let n = self.data.len();
        if h == 0 || h + self.shape.burn_in() >= n {
            return Err(GASError::InvalidHorizon {
                h,
                reason: "holdout leaves too few observations to seed the recursion",
            });
        }
        let train = self.data.data.slice(s![..n - h]).to_owned();
        let mut holdout = self.clone();
        holdout.fit_on(&train, method, opts, rng)?;
        holdout.predict_is(h, intervals, rng)
    }

    /// `nsims × (n − max(ar, sc))` replicated series drawn from the
    /// posterior predictive distribution.
    ///
    /// # Errors
    /// - `GASError::ModelNotFitted` before `fit`.
    /// - `GASError::InvalidNsims` for `nsims == 0`.
    pub fn sample<R: Rng + ?Sized>(&self, nsims: usize, rng: &mut R) -> GASResult<Array2<f64>> {
        self.require_fit()?;
        let draws = self.natural_draws(nsims, rng)?;
        posterior_predictive(
            &self.spec(),
            &self.latent.transformed(),
            &draws,
            self.data.data.view(),
            rng,
        )
    }

    /// Posterior predictive p-value of the mean statistic over
    /// [`PPC_NSIMS`] replicated series.
    pub fn ppc<R: Rng + ?Sized>(&self, rng: &mut R) -> GASResult<f64> {
        self.ppc_with(PPC_NSIMS, Discrepancy::Mean, rng)
    }

    /// Fraction of replicated series whose `statistic` exceeds the
    /// observed one. Always in `[0, 1]`.
    pub fn ppc_with<R: Rng + ?Sized>(
        &self, nsims: usize, statistic: Discrepancy, rng: &mut R,
    ) -> GASResult<f64> {
        let sims = self.sample(nsims, rng)?;
        let observed = statistic.compute(self.data.data.slice(s![self.shape.burn_in()..]));
        let exceed =
            sims.axis_iter(Axis(0)).filter(|row| statistic.compute(row.view()) > observed).count();
        Ok(exceed as f64 / nsims as f64)
    }

    /// Formatted table of the last fit.
    ///
    /// # Errors
    /// - `GASError::ModelNotFitted` before `fit`.
    pub fn summary(&self) -> GASResult<String> {
        let res = self.results.as_ref().ok_or(GASError::ModelNotFitted)?;
        let mut out = String::new();
        let title = format!("{} GAS({}, {})", self.family.name(), self.shape.ar, self.shape.sc);
        out.push_str(&format!("{title:<40}Method: {}\n", res.method));
        out.push_str(&format!(
            "{:<40}Log Likelihood: {:.4}\n",
            format!("Number of observations: {}", self.data.len()),
            res.loglik
        ));
        out.push_str(&format!(
            "{:<40}AIC: {:.4}  BIC: {:.4}\n",
            format!("Unnormalized Log Posterior: {}", fmt_opt(res.log_posterior)),
            res.aic,
            res.bic
        ));
        out.push_str(&"=".repeat(88));
        out.push('\n');
        if matches!(res.method, FitMethod::MetropolisHastings | FitMethod::BBVI) {
            out.push_str(&format!(
                "{:<16}{:>14}{:>14}{:>22}\n",
                "Latent Variable", "Median", "Mean", "95% Credibility Interval"
            ));
            for var in self.latent.iter() {
                let samples = var.samples.clone().unwrap_or_default();
                let mut sorted = samples.clone();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let q = |p: f64| quantile_sorted(&sorted, p);
                let mean = if samples.is_empty() {
                    var.natural_value()
                } else {
                    samples.iter().sum::<f64>() / samples.len() as f64
                };
                out.push_str(&format!(
                    "{:<16}{:>14.4}{:>14.4}{:>22}\n",
                    var.name,
                    q(0.5),
                    mean,
                    format!("({:.4} | {:.4})", q(0.025), q(0.975))
                ));
            }
        } else {
            out.push_str(&format!(
                "{:<16}{:>12}{:>12}{:>10}{:>10}{:>24}\n",
                "Latent Variable", "Estimate", "Std Error", "z", "P>|z|", "95% C.I."
            ));
            let normal = Normal::new(0.0, 1.0).map_err(|e| GASError::InvalidFamilyParam {
                reason: e.to_string(),
            })?;
            for (i, var) in self.latent.iter().enumerate() {
                let est = res.estimates[i];
                let se = res.std_errors[i];
                let z = var.value / se;
                let p = 2.0 * (1.0 - normal.cdf(z.abs()));
                out.push_str(&format!(
                    "{:<16}{:>12.4}{:>12.4}{:>10.4}{:>10.4}{:>24}\n",
                    var.name,
                    est,
                    se,
                    z,
                    p,
                    format!(
                        "({:.4} | {:.4})",
                        var.transform.apply(var.value - 1.96 * se),
                        var.transform.apply(var.value + 1.96 * se)
                    )
                ));
            }
        }
        out.push_str(&"=".repeat(88));
        out.push('\n');
        for w in &res.warnings {
            out.push_str(&format!("Warning: {w}\n"));
        }
        Ok(out)
    }

    // ---- Estimation ----

    fn fit_on<R: Rng + ?Sized>(
        &mut self, y: &Array1<f64>, method: FitMethod, opts: &FitOptions, rng: &mut R,
    ) -> GASResult<FitResult> {
        self.latent.reset();
        info!(method = %method, ar = self.shape.ar, sc = self.shape.sc, n = y.len(), "fitting GAS model");
        let result = match method {
            FitMethod::MLE => self.fit_point(y, method, false)?,
            FitMethod::PML => self.fit_point(y, method, true)?,
            FitMethod::Laplace => self.fit_laplace(y, rng)?,
            FitMethod::MetropolisHastings => self.fit_mh(y, opts, rng)?,
            FitMethod::BBVI => self.fit_bbvi(y, opts, rng)?,
        };
        for w in &result.warnings {
            warn!(source = w.source, "{}", w.detail);
        }
        if result.estimates.iter().any(|v| !v.is_finite()) {
            return Err(GASError::InfeasibleFit);
        }
        self.results = Some(result.clone());
        Ok(result)
    }

    /// Maximize the (penalized) objective and try to invert its curvature.
    ///
    /// An objective that cannot be evaluated anywhere the optimizer looked
    /// (e.g. negative differences under an Exponential family) keeps the
    /// starting values with no covariance and records a warning.
    fn find_mode(
        &self, y: &Array1<f64>, penalized: bool, warnings: &mut Vec<ConvergenceWarning>,
        source: &'static str,
    ) -> GASResult<Mode> {
        let obj = GASObjective::new(self.spec(), &self.latent, y.view(), penalized);
        let start = self.latent.starting_values();
        let outcome = match maximize(&obj, start.clone(), y, &self.options.mle_opts) {
            Ok(outcome) => outcome,
            Err(err @ (OptError::InfeasiblePoint { .. } | OptError::NonFiniteCost { .. })) => {
                warnings.push(ConvergenceWarning {
                    source,
                    detail: format!("objective is infeasible ({err}); keeping starting values"),
                });
                return Ok(Mode { z_hat: start, cov: None, value: f64::NEG_INFINITY, outcome: None });
            }
            Err(err) => return Err(err.into()),
        };
        debug!(iterations = outcome.iterations, value = outcome.value, status = %outcome.status, "mode found");
        if !outcome.converged {
            warnings.push(ConvergenceWarning {
                source,
                detail: format!("optimizer stopped without converging ({})", outcome.status),
            });
        }
        let cov = match information_covariance(&obj, &outcome.theta_hat) {
            Ok(cov) => Some(cov),
            Err(err) => {
                warnings.push(ConvergenceWarning {
                    source,
                    detail: format!("covariance unavailable: {err}"),
                });
                None
            }
        };
        Ok(Mode { z_hat: outcome.theta_hat.clone(), cov, value: outcome.value, outcome: Some(outcome) })
    }

    fn fit_point(
        &mut self, y: &Array1<f64>, method: FitMethod, penalized: bool,
    ) -> GASResult<FitResult> {
        let mut warnings = Vec::new();
        let mode = self.find_mode(y, penalized, &mut warnings, method.name())?;
        let se = mode
            .cov
            .as_ref()
            .map(standard_errors)
            .unwrap_or_else(|| Array1::from_elem(mode.z_hat.len(), f64::NAN));
        self.latent.set_point(&mode.z_hat, Some(&se))?;
        let log_posterior = penalized.then_some(mode.value);
        self.build_result(y, method, se, log_posterior, warnings, mode.outcome)
    }

    fn fit_laplace<R: Rng + ?Sized>(
        &mut self, y: &Array1<f64>, rng: &mut R,
    ) -> GASResult<FitResult> {
        let mut warnings = Vec::new();
        let mode = self.find_mode(y, true, &mut warnings, "Laplace")?;
        let log_posterior = Some(mode.value);
        let se = match mode.cov {
            Some(cov) => {
                let se = standard_errors(&cov);
                let posterior = Posterior::Gaussian { mean: mode.z_hat.clone(), cov };
                self.latent.set_posterior(&mode.z_hat, &se, posterior, rng)?;
                se
            }
            None => {
                let se = Array1::from_elem(mode.z_hat.len(), f64::NAN);
                self.latent.set_point(&mode.z_hat, Some(&se))?;
                se
            }
        };
        self.build_result(y, FitMethod::Laplace, se, log_posterior, warnings, mode.outcome)
    }

    fn fit_mh<R: Rng + ?Sized>(
        &mut self, y: &Array1<f64>, opts: &FitOptions, rng: &mut R,
    ) -> GASResult<FitResult> {
        let mut warnings = Vec::new();
        let k = self.latent.len();
        let (start, proposal) = if opts.mh.map_start {
            match self.find_mode(y, true, &mut warnings, "M-H") {
                Ok(mode) => {
                    let diag = mode
                        .cov
                        .as_ref()
                        .map(|c| c.diag().mapv(|v| if v.is_finite() && v > 0.0 { v } else { 1.0 }))
                        .unwrap_or_else(|| Array1::ones(k));
                    (mode.z_hat, Array2::from_diag(&diag))
                }
                Err(err) => {
                    warnings.push(ConvergenceWarning {
                        source: "M-H",
                        detail: format!("MAP start failed ({err}); starting from default values"),
                    });
                    (self.latent.starting_values(), Array2::eye(k))
                }
            }
        } else {
            (self.latent.starting_values(), Array2::eye(k))
        };

        let out = {
            let obj = GASObjective::new(self.spec(), &self.latent, y.view(), true);
            metropolis_hastings(&obj, &start, &proposal, &opts.mh, rng)?
        };
        info!(acceptance = out.acceptance_rate, rounds = out.tuning_rounds, "M-H finished");
        if !out.tuned {
            warnings.push(ConvergenceWarning {
                source: "M-H",
                detail: format!(
                    "acceptance rate did not reach the target band after {} tuning rounds",
                    out.tuning_rounds
                ),
            });
        }
        let mean = out.chain.mean_axis(Axis(0)).ok_or(GASError::InferenceFailed {
            reason: "empty chain".into(),
        })?;
        let std = out.chain.std_axis(Axis(0), 0.0);
        self.latent.set_posterior(&mean, &std, Posterior::Samples(out.chain.clone()), rng)?;
        let mut result =
            self.build_result(y, FitMethod::MetropolisHastings, std, None, warnings, None)?;
        result.acceptance_rate = Some(out.acceptance_rate);
        result.chain = Some(out.chain);
        Ok(result)
    }

    fn fit_bbvi<R: Rng + ?Sized>(
        &mut self, y: &Array1<f64>, opts: &FitOptions, rng: &mut R,
    ) -> GASResult<FitResult> {
        let mut warnings = Vec::new();
        let start = if opts.bbvi.map_start && opts.bbvi.mini_batch.is_none() {
            match self.find_mode(y, true, &mut warnings, "BBVI") {
                Ok(mode) => mode.z_hat,
                Err(err) => {
                    warnings.push(ConvergenceWarning {
                        source: "BBVI",
                        detail: format!("MAP start failed ({err}); starting from default values"),
                    });
                    self.latent.starting_values()
                }
            }
        } else {
            self.latent.starting_values()
        };

        let out = {
            let obj = GASObjective::new(self.spec(), &self.latent, y.view(), true);
            bbvi(&obj, &start, &opts.bbvi, rng)?
        };
        info!(final_elbo = out.final_elbo, converged = out.converged, "BBVI finished");
        if !out.converged {
            warnings.push(ConvergenceWarning {
                source: "BBVI",
                detail: "ELBO still changing over the last iterations".to_string(),
            });
        }
        let posterior = Posterior::MeanField { mean: out.mean.clone(), std: out.std.clone() };
        self.latent.set_posterior(&out.mean, &out.std, posterior, rng)?;
        let mut result = self.build_result(y, FitMethod::BBVI, out.std, None, warnings, None)?;
        result.elbo = opts.bbvi.record_elbo.then_some(out.elbo);
        Ok(result)
    }

    /// Assemble the common part of a [`FitResult`] from the latent set as
    /// it stands after estimation.
    ///
    /// A latent vector at which the series cannot be evaluated reports a
    /// log-likelihood of `-inf` (and infinite information criteria).
    fn build_result(
        &self, y: &Array1<f64>, method: FitMethod, std_errors: Array1<f64>,
        log_posterior: Option<f64>, warnings: Vec<ConvergenceWarning>,
        optim: Option<OptimOutcome>,
    ) -> GASResult<FitResult> {
        let obj = GASObjective::new(self.spec(), &self.latent, y.view(), false);
        let loglik = obj
            .loglik(self.latent.current_values().view())
            .unwrap_or(f64::NEG_INFINITY);
        let k = self.latent.len();
        let n_eff = y.len() - self.shape.burn_in();
        Ok(FitResult {
            method,
            names: self.latent.names(),
            estimates: self.latent.transformed(),
            std_errors,
            loglik,
            log_posterior,
            aic: aic(loglik, k),
            bic: bic(loglik, k, n_eff),
            n_eff,
            warnings,
            optim,
            elbo: None,
            acceptance_rate: None,
            chain: None,
        })
    }

    // ---- Posterior draws ----

    fn require_fit(&self) -> GASResult<&FitResult> {
        self.results.as_ref().ok_or(GASError::ModelNotFitted)
    }

    /// `nsims × k` natural-scale latent draws from the current posterior.
    fn natural_draws<R: Rng + ?Sized>(&self, nsims: usize, rng: &mut R) -> GASResult<Array2<f64>> {
        let mut draws = self.latent.draw(nsims, rng)?;
        for mut row in draws.axis_iter_mut(Axis(0)) {
            let natural = self.latent.transform(row.view())?;
            row.assign(&natural);
        }
        Ok(draws)
    }

    fn interval_draws<R: Rng + ?Sized>(&self, intervals: bool, rng: &mut R) -> GASResult<Array2<f64>> {
        if intervals {
            self.natural_draws(self.options.sim_opts.nsims, rng)
        } else {
            Ok(Array2::zeros((0, self.latent.len())))
        }
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "-".to_string())
}
