//! Python-boundary helpers: array extraction, option parsing and RNG setup
//! shared by the PyO3 classes in the crate root.
#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use rand::{SeedableRng, rngs::StdRng};

#[cfg(feature = "python-bindings")]
use crate::{
    gas::{
        core::{
            family::Family,
            guards::ThetaGuards,
            options::{FitOptions, GASOptions, ScoreScaling, SimOpts},
        },
        errors::GASError,
        models::gas::GASModel,
    },
    inference::{BBVIOptions, MHOptions, StepRule},
    optimization::loglik_optimizer::traits::{LineSearcher, MLEOptions, Tolerances},
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
};

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Copy a Python 1-D array-like into an owned `Array1<f64>`.
#[cfg(feature = "python-bindings")]
pub fn extract_series<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>, name: &str,
) -> PyResult<Array1<f64>> {
    let arr = extract_f64_array(py, raw_data)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err(format!("{name} must be a 1-D contiguous float64 array or sequence"))
    })?;
    Ok(Array1::from(slice.to_vec()))
}

#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
pub fn build_gas_model<'py>(
    py: Python<'py>, data: &Bound<'py, PyAny>, ar: usize, sc: usize, integ: usize,
    family: &str, score_scaling: Option<&str>, theta_guards: Option<(f64, f64)>,
    tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    line_searcher: Option<&str>, lbfgs_mem: Option<usize>, nsims: Option<usize>,
) -> PyResult<GASModel> {
    let y = extract_series(py, data, "data")?;
    let family: Family = family.parse()?;

    let scaling = match score_scaling {
        Some(name) => name.parse::<ScoreScaling>()?,
        None => ScoreScaling::default(),
    };
    let guards = match theta_guards {
        Some(bounds) => ThetaGuards::new(bounds)?,
        None => ThetaGuards::default(),
    };
    let mle_opts = extract_mle_opts(tol_grad, tol_cost, max_iter, line_searcher, lbfgs_mem)?;
    let sim_opts = match nsims {
        Some(n) => SimOpts::new(n)?,
        None => SimOpts::default(),
    };

    let options = GASOptions::new(scaling, guards, mle_opts, sim_opts);
    Ok(GASModel::new(y, ar, sc, integ, family, options)?)
}

#[cfg(feature = "python-bindings")]
fn extract_mle_opts(
    tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    line_searcher: Option<&str>, lbfgs_mem: Option<usize>,
) -> PyResult<MLEOptions> {
    let defaults = MLEOptions::default();

    // Tolerances::new -> OptResult<Tolerances> -> GASError -> PyErr
    let tols = if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
        defaults.tols
    } else {
        Tolerances::new(tol_grad, tol_cost, max_iter).map_err(GASError::from)?
    };

    let ls = match line_searcher {
        Some(name) => name.parse::<LineSearcher>().map_err(GASError::from)?,
        None => defaults.line_searcher,
    };

    let opts = MLEOptions::new(tols, ls, lbfgs_mem).map_err(GASError::from)?;
    Ok(opts)
}

/// Sampler settings for `fit`. Unspecified values keep the library defaults.
#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
pub fn extract_fit_options(
    mh_nsims: Option<usize>, mh_thinning: Option<usize>, map_start: Option<bool>,
    bbvi_iterations: Option<usize>, mini_batch: Option<usize>, learning_rate: Option<f64>,
    optimizer: Option<&str>, record_elbo: Option<bool>,
) -> PyResult<FitOptions> {
    let mh_default = MHOptions::default();
    let mh = MHOptions::new(
        mh_nsims.unwrap_or(mh_default.nsims),
        map_start.unwrap_or(mh_default.map_start),
        mh_thinning.unwrap_or(mh_default.thinning),
    )
    .map_err(GASError::from)?;

    let bbvi_default = BBVIOptions::default();
    let rule = match optimizer {
        Some(name) => name.parse::<StepRule>().map_err(GASError::from)?,
        None => bbvi_default.optimizer,
    };
    let bbvi = BBVIOptions::new(
        bbvi_iterations.unwrap_or(bbvi_default.iterations),
        mini_batch.or(bbvi_default.mini_batch),
        learning_rate.unwrap_or(bbvi_default.learning_rate),
        rule,
        map_start.unwrap_or(bbvi_default.map_start),
        record_elbo.unwrap_or(bbvi_default.record_elbo),
    )
    .map_err(GASError::from)?;

    Ok(FitOptions { mh, bbvi })
}

/// Seeded generator when `seed` is given, entropy-seeded otherwise.
#[cfg(feature = "python-bindings")]
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Row-major `Vec<Vec<f64>>` copy of a matrix for Python consumption.
#[cfg(feature = "python-bindings")]
pub fn to_rows(values: &Array2<f64>) -> Vec<Vec<f64>> {
    values.rows().into_iter().map(|row| row.to_vec()).collect()
}
