//! Target densities for the samplers and variational routines.

use ndarray::Array1;

/// Unnormalized log-posterior over an unconstrained latent vector `z`.
///
/// Implementors return `f64::NEG_INFINITY` where the model cannot be
/// evaluated (observation outside the family support, non-finite
/// recursion). Samplers treat such points as having zero density and never
/// propagate them as errors.
pub trait LogPosterior {
    /// Dimension of `z`.
    fn dim(&self) -> usize;

    /// `log p(y | z) + log p(z)` up to an additive constant.
    fn log_posterior(&self, z: &Array1<f64>) -> f64;
}
