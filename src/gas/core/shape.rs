//! Lag structure of a GAS(ar, sc) model.
//!
//! - `ar`: number of autoregressive lags on θ (coefficients φ₁…φ_ar).
//! - `sc`: number of score lags (coefficients α₁…α_sc on past u's).
//!
//! GAS(0, 0) is allowed; it is a constant-parameter model.
use crate::gas::errors::{GASError, GASResult};

/// Order of the GAS(ar, sc) model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GASShape {
    pub ar: usize,
    pub sc: usize,
}

impl GASShape {
    /// Construct a [`GASShape`] and validate it against the sample size `n`.
    ///
    /// # Errors
    /// - [`GASError::InvalidModelShape`] if `ar >= n` or `sc >= n`, since the
    ///   recursion would have no observations left after seeding.
    pub fn new(ar: usize, sc: usize, n: usize) -> GASResult<Self> {
        if ar >= n {
            return Err(GASError::InvalidModelShape {
                param: ar,
                reason: "ar must be less than the number of observations.",
            });
        }
        if sc >= n {
            return Err(GASError::InvalidModelShape {
                param: sc,
                reason: "sc must be less than the number of observations.",
            });
        }
        Ok(GASShape { ar, sc })
    }

    /// Number of seed observations excluded from the likelihood.
    pub fn burn_in(&self) -> usize {
        self.ar.max(self.sc)
    }

    /// Length of the latent vector: constant, AR and score coefficients.
    pub fn n_latent(&self) -> usize {
        self.ar + self.sc + 1
    }
}
