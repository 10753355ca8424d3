//! θ-guards for GAS models — bound the link-scale parameter path.
//!
//! Purpose
//! -------
//! Keep the time-varying parameter `θ_t` inside a range where `exp(θ_t)`
//! and the family densities stay finite. Without a bound, an explosive
//! latent draw (e.g. `Σφ > 1` during sampling) overflows the link within a
//! few steps and poisons every downstream quantity with NaN.
//!
//! Invariants & assumptions
//! ------------------------
//! - `min < max`, both finite.
//! - A clamped `θ_t` no longer depends on the latent vector locally, so its
//!   sensitivity row in the analytic gradient is zero.
//!
//! Testing notes
//! -------------
//! - Unit tests cover validation of `ThetaGuards::new` and clamping.
use crate::gas::errors::{GASError, GASResult};

/// Default lower bound on θ (λ ≈ 2e-22 under the log link).
pub const DEFAULT_THETA_MIN: f64 = -50.0;

/// Default upper bound on θ (λ ≈ 5e21 under the log link).
pub const DEFAULT_THETA_MAX: f64 = 50.0;

/// ThetaGuards — lower/upper bounds for the GAS θ recursion.
///
/// Constructed via [`ThetaGuards::new`] from a `(min, max)` tuple; both
/// bounds must be finite with `min < max`. The type is `Copy` and is
/// carried by value inside the recursion spec.
///
/// Examples
/// --------
/// ```rust
/// # use gas_timeseries::gas::core::guards::ThetaGuards;
/// let guards = ThetaGuards::new((-20.0, 20.0)).unwrap();
/// assert!(guards.max > guards.min);
/// assert!(ThetaGuards::new((1.0, 1.0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThetaGuards {
    /// Lower bound for θ.
    pub min: f64,
    /// Upper bound for θ (must be > `min`).
    pub max: f64,
}

impl ThetaGuards {
    /// Construct validated θ bounds from a `(min, max)` tuple.
    ///
    /// # Errors
    /// - `GASError::InvalidThetaGuards` when `min >= max` or either bound is
    ///   not finite.
    pub fn new(value: (f64, f64)) -> GASResult<Self> {
        if !value.0.is_finite() || !value.1.is_finite() {
            return Err(GASError::InvalidThetaGuards {
                min: value.0,
                max: value.1,
                reason: "Theta guards must be finite.",
            });
        }
        if value.0 >= value.1 {
            return Err(GASError::InvalidThetaGuards {
                min: value.0,
                max: value.1,
                reason: "Theta guards must have min < max.",
            });
        }
        Ok(ThetaGuards { min: value.0, max: value.1 })
    }
}

impl Default for ThetaGuards {
    fn default() -> Self {
        ThetaGuards { min: DEFAULT_THETA_MIN, max: DEFAULT_THETA_MAX }
    }
}

/// Clamp a θ value into `[guards.min, guards.max]`.
///
/// Returns the clamped value and whether clamping happened. NaN is passed
/// through unchanged so the caller can report it.
pub fn guard_theta(value: f64, guards: &ThetaGuards) -> (f64, bool) {
    if value < guards.min {
        (guards.min, true)
    } else if value > guards.max {
        (guards.max, true)
    } else {
        (value, false)
    }
}
