//! Observation series for GAS models.
//!
//! Purpose
//! -------
//! Provide a validated container for the series a GAS model is fitted to,
//! including the differencing applied at construction time.
//!
//! Key behaviors
//! -------------
//! - [`GASData::new`] checks that the raw series is non-empty and finite,
//!   then differences it `integ` times.
//! - The raw series is kept alongside the modeled one so results can be
//!   reported against the original input.
//!
//! Invariants & assumptions
//! ------------------------
//! - `data.len() == raw.len() - integ` and `data.len() > 0`.
//! - Support of the observation family is **not** checked here; points
//!   outside the support are absorbed by the recursion as a `-∞`
//!   log-likelihood.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the happy path, empty and non-finite input, and
//!   repeated differencing.
use crate::gas::errors::{GASError, GASResult};
use ndarray::Array1;

/// `GASData` — validated, possibly differenced observation series.
///
/// Fields
/// ------
/// - `raw`: `Array1<f64>`
///   Series as supplied by the caller.
/// - `data`: `Array1<f64>`
///   Series after `integ` rounds of first differencing; this is what the
///   recursion sees.
/// - `integ`: `usize`
///   Differencing order.
#[derive(Debug, Clone, PartialEq)]
pub struct GASData {
    pub raw: Array1<f64>,
    pub data: Array1<f64>,
    pub integ: usize,
}

impl GASData {
    /// Construct a validated [`GASData`] from a raw series.
    ///
    /// Errors
    /// ------
    /// - `GASError::EmptySeries` if `raw` is empty.
    /// - `GASError::NonFiniteData { index, value }` for the first NaN/±∞.
    /// - `GASError::InsufficientData` if differencing leaves no observations.
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use ndarray::array;
    /// # use gas_timeseries::gas::core::data::GASData;
    /// let d = GASData::new(array![1.0, 3.0, 6.0], 1).unwrap();
    /// assert_eq!(d.data, array![2.0, 3.0]);
    /// ```
    pub fn new(raw: Array1<f64>, integ: usize) -> GASResult<Self> {
        if raw.is_empty() {
            return Err(GASError::EmptySeries);
        }
        for (index, &value) in raw.iter().enumerate() {
            if !value.is_finite() {
                return Err(GASError::NonFiniteData { index, value });
            }
        }
        if integ >= raw.len() {
            return Err(GASError::InsufficientData { len: raw.len(), needed: integ + 1 });
        }
        let mut data = raw.clone();
        for _ in 0..integ {
            data = difference(&data);
        }
        Ok(GASData { raw, data, integ })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample mean of the modeled series.
    pub fn mean(&self) -> f64 {
        self.data.mean().unwrap_or(0.0)
    }
}

fn difference(x: &Array1<f64>) -> Array1<f64> {
    Array1::from_iter(x.windows(2).into_iter().map(|w| w[1] - w[0]))
}
