//! gas_timeseries — score-driven (GAS) time-series models with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes GAS models to Python via the `_gas_timeseries` extension module.
//! When the `python-bindings` feature is enabled, this module defines the
//! Python-facing classes and the `gas_models` submodule.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`gas`, `inference`, `optimization`)
//!   as the public crate surface.
//! - Define `#[pyclass]` wrappers and the `#[pymodule]` initializer for the
//!   `_gas_timeseries` Python extension.
//! - Register the `gas_timeseries.gas_models` submodule in `sys.modules` so
//!   dot-notation imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner Rust modules; this file performs
//!   only FFI glue, input conversion and error mapping.
//! - Python-visible methods mirror the signatures of [`GASModel`] with the
//!   random generator replaced by an optional integer `seed`.
//!
//! Conventions
//! -----------
//! - Errors from core Rust code are propagated as [`GASError`] internally
//!   and converted to `PyErr` values at the PyO3 boundary.
//! - Matrices cross the boundary as row-major `list[list[float]]`.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on [`gas`] directly (see
//!   [`gas::prelude`]) and can ignore the PyO3 items.
//! - The Python packaging layer imports `_gas_timeseries` and wraps its
//!   classes in user-facing Python APIs.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by the
//!   integration tests under `tests/`.

pub mod gas;
pub mod inference;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    gas::{
        core::{forecasts::ForecastTable, options::FitMethod},
        errors::GASError,
        models::gas::{FitResult, GASModel},
    },
    utils::{build_gas_model, extract_fit_options, make_rng, to_rows},
};

/// GAS — Python-facing wrapper around [`GASModel`].
///
/// Constructed from Python via
/// `GAS(data, ar, sc, integ=0, family="Exponential", ...)`. Optimizer
/// settings (`tol_grad`, `tol_cost`, `max_iter`, `line_searcher`,
/// `lbfgs_mem`) and interval simulations (`nsims`) fall back to the library
/// defaults when omitted.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "gas_timeseries.gas_models", unsendable)]
pub struct GAS {
    pub inner: GASModel,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl GAS {
    #[new]
    #[pyo3(
        signature = (
            data,
            ar,
            sc,
            integ = 0,
            family = "Exponential",
            score_scaling = None,
            theta_guards = None,
            tol_grad = None,
            tol_cost = None,
            max_iter = None,
            line_searcher = None,
            lbfgs_mem = None,
            nsims = None,
        ),
        text_signature = "(data, ar, sc, /, integ=0, family='Exponential', score_scaling=None, \
                          theta_guards=None, tol_grad=None, tol_cost=None, max_iter=None, \
                          line_searcher=None, lbfgs_mem=None, nsims=None)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new<'py>(
        py: Python<'py>, data: &Bound<'py, PyAny>, ar: usize, sc: usize, integ: usize,
        family: &str, score_scaling: Option<&str>, theta_guards: Option<(f64, f64)>,
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
        line_searcher: Option<&str>, lbfgs_mem: Option<usize>, nsims: Option<usize>,
    ) -> PyResult<Self> {
        let inner = build_gas_model(
            py,
            data,
            ar,
            sc,
            integ,
            family,
            score_scaling,
            theta_guards,
            tol_grad,
            tol_cost,
            max_iter,
            line_searcher,
            lbfgs_mem,
            nsims,
        )?;
        Ok(GAS { inner })
    }

    #[pyo3(
        signature = (
            method = "MLE",
            seed = None,
            mh_nsims = None,
            mh_thinning = None,
            map_start = None,
            iterations = None,
            mini_batch = None,
            learning_rate = None,
            optimizer = None,
            record_elbo = None,
        ),
        text_signature = "(self, /, method='MLE', seed=None, mh_nsims=None, mh_thinning=None, \
                          map_start=None, iterations=None, mini_batch=None, learning_rate=None, \
                          optimizer=None, record_elbo=None)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn fit(
        &mut self, method: &str, seed: Option<u64>, mh_nsims: Option<usize>,
        mh_thinning: Option<usize>, map_start: Option<bool>, iterations: Option<usize>,
        mini_batch: Option<usize>, learning_rate: Option<f64>, optimizer: Option<&str>,
        record_elbo: Option<bool>,
    ) -> PyResult<GASFitResult> {
        let method: FitMethod = method.parse()?;
        let opts = extract_fit_options(
            mh_nsims,
            mh_thinning,
            map_start,
            iterations,
            mini_batch,
            learning_rate,
            optimizer,
            record_elbo,
        )?;
        let mut rng = make_rng(seed);
        let result = self.inner.fit(method, &opts, &mut rng)?;
        Ok(GASFitResult { inner: result })
    }

    /// Out-of-sample forecasts as `(columns, rows)`.
    #[pyo3(signature = (h = 5, intervals = false, seed = None))]
    pub fn predict(
        &self, h: usize, intervals: bool, seed: Option<u64>,
    ) -> PyResult<(Vec<String>, Vec<Vec<f64>>)> {
        let mut rng = make_rng(seed);
        Ok(table_parts(self.inner.predict(h, intervals, &mut rng)?))
    }

    /// Rolling one-step in-sample forecasts as `(columns, rows)`.
    #[pyo3(signature = (h = 5, intervals = false, seed = None, refit_method = None))]
    pub fn predict_is(
        &self, h: usize, intervals: bool, seed: Option<u64>, refit_method: Option<&str>,
    ) -> PyResult<(Vec<String>, Vec<Vec<f64>>)> {
        let mut rng = make_rng(seed);
        let table = match refit_method {
            Some(name) => {
                let method: FitMethod = name.parse()?;
                let opts = extract_fit_options(None, None, None, None, None, None, None, None)?;
                self.inner.predict_is_refit(h, method, &opts, intervals, &mut rng)?
            }
            None => self.inner.predict_is(h, intervals, &mut rng)?,
        };
        Ok(table_parts(table))
    }

    #[pyo3(signature = (nsims = 1000, seed = None))]
    pub fn sample(&self, nsims: usize, seed: Option<u64>) -> PyResult<Vec<Vec<f64>>> {
        let mut rng = make_rng(seed);
        Ok(to_rows(&self.inner.sample(nsims, &mut rng)?))
    }

    #[pyo3(signature = (nsims = 1000, statistic = "mean", seed = None))]
    pub fn ppc(&self, nsims: usize, statistic: &str, seed: Option<u64>) -> PyResult<f64> {
        let mut rng = make_rng(seed);
        Ok(self.inner.ppc_with(nsims, statistic.parse()?, &mut rng)?)
    }

    pub fn summary(&self) -> PyResult<String> {
        Ok(self.inner.summary()?)
    }

    #[getter]
    pub fn latent_names(&self) -> Vec<String> {
        self.inner.latent.names()
    }

    #[getter]
    pub fn results(&self) -> PyResult<GASFitResult> {
        match &self.inner.results {
            Some(result) => Ok(GASFitResult { inner: result.clone() }),
            None => Err(GASError::ModelNotFitted.into()),
        }
    }
}

#[cfg(feature = "python-bindings")]
fn table_parts(table: ForecastTable) -> (Vec<String>, Vec<Vec<f64>>) {
    let rows = to_rows(&table.values);
    (table.columns, rows)
}

#[cfg(feature = "python-bindings")]
#[pyclass(module = "gas_timeseries.gas_models")]
pub struct GASFitResult {
    pub inner: FitResult,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl GASFitResult {
    #[getter]
    pub fn method(&self) -> String {
        self.inner.method.to_string()
    }

    #[getter]
    pub fn names(&self) -> Vec<String> {
        self.inner.names.clone()
    }

    #[getter]
    pub fn estimates(&self) -> Vec<f64> {
        self.inner.estimates.to_vec()
    }

    #[getter]
    pub fn std_errors(&self) -> Vec<f64> {
        self.inner.std_errors.to_vec()
    }

    #[getter]
    pub fn loglik(&self) -> f64 {
        self.inner.loglik
    }

    #[getter]
    pub fn log_posterior(&self) -> Option<f64> {
        self.inner.log_posterior
    }

    #[getter]
    pub fn aic(&self) -> f64 {
        self.inner.aic
    }

    #[getter]
    pub fn bic(&self) -> f64 {
        self.inner.bic
    }

    #[getter]
    pub fn acceptance_rate(&self) -> Option<f64> {
        self.inner.acceptance_rate
    }

    #[getter]
    pub fn elbo(&self) -> Option<Vec<f64>> {
        self.inner.elbo.clone()
    }

    #[getter]
    pub fn warnings(&self) -> Vec<String> {
        self.inner.warnings.iter().map(|w| w.to_string()).collect()
    }
}

#[cfg(feature = "python-bindings")]
#[pymodule]
fn _gas_timeseries<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let gas_models_mod = PyModule::new(_py, "gas_models")?;
    gas_models(_py, m, &gas_models_mod)?;

    // Manually add the submodule into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("gas_timeseries.gas_models", gas_models_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn gas_models<'py>(
    _py: Python, gas_timeseries: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<GAS>()?;
    m.add_class::<GASFitResult>()?;
    gas_timeseries.add_submodule(m)?;
    Ok(())
}
