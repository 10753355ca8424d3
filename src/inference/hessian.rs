//! inference::hessian — Gaussian approximation at a posterior mode.
//!
//! Purpose
//! -------
//! Turn the curvature of a log-likelihood or log-posterior at its mode into
//! a covariance matrix. This backs the `Laplace` posterior, the standard
//! errors reported after `MLE`/`PML`, and the proposal covariance of the
//! Metropolis–Hastings sampler.
//!
//! Key behaviors
//! -------------
//! - Call [`compute_hessian`] on the *negated* gradient to obtain the
//!   observed information `J(ẑ)`.
//! - Copy `J` into a `nalgebra::DMatrix` ([`fill_dmatrix`]) and take a
//!   symmetric eigendecomposition `J = Q Λ Qᵀ`.
//! - Return `Σ = Q Λ⁻¹ Qᵀ` when every eigenvalue exceeds [`EIGEN_EPS`];
//!   otherwise report [`InferenceError::SingularHessian`].
//!
//! Invariants & assumptions
//! ------------------------
//! - [`compute_hessian`] returns a finite, symmetric `k×k` matrix.
//! - No pseudoinverse is formed: a flat or convex direction means there is
//!   no Gaussian approximation, and callers decide how to degrade.
//!
//! Conventions
//! -----------
//! - All quantities live in the unconstrained latent space.
//! - Covariances are `ndarray::Array2<f64>`; `nalgebra` is used only inside
//!   this module and for Cholesky factors.
use crate::{
    inference::errors::{InferenceError, InferenceResult},
    optimization::{
        loglik_optimizer::finite_diff::compute_hessian, numerical_stability::EIGEN_EPS,
    },
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// calc_covariance — inverse observed information at a mode.
///
/// Parameters
/// ----------
/// - `grad`: `&F`
///   Gradient map `z ↦ ∇ℓ(z)` of the objective that was maximized (a
///   log-likelihood or log-posterior). Must be C¹ near `z_hat`.
/// - `z_hat`: `&Array1<f64>`
///   Mode at which the curvature is evaluated.
///
/// Returns
/// -------
/// `InferenceResult<Array2<f64>>`
///   The `k×k` covariance `J(ẑ)⁻¹` with `J = -∇²ℓ(ẑ)`.
///
/// Errors
/// ------
/// - `InferenceError::HessianFailed` when finite differencing fails.
/// - `InferenceError::SingularHessian` when the smallest eigenvalue of `J`
///   is at most `EIGEN_EPS`.
/// - `InferenceError::NonFiniteCovariance` if the inverse overflows.
///
/// Examples
/// --------
/// ```rust
/// # use ndarray::array;
/// # use gas_timeseries::inference::hessian::calc_covariance;
/// // ℓ(z) = -2 z₀² - 0.5 z₁², so J = diag(4, 1).
/// let grad = |z: &ndarray::Array1<f64>| array![-4.0 * z[0], -z[1]];
/// let cov = calc_covariance(&grad, &array![0.0, 0.0]).unwrap();
/// assert!((cov[[0, 0]] - 0.25).abs() < 1e-6);
/// assert!((cov[[1, 1]] - 1.0).abs() < 1e-6);
/// ```
pub fn calc_covariance<F: Fn(&Array1<f64>) -> Array1<f64>>(
    grad: &F, z_hat: &Array1<f64>,
) -> InferenceResult<Array2<f64>> {
    let neg_grad = |z: &Array1<f64>| -grad(z);
    let obs_info = compute_hessian(&neg_grad, z_hat)?;
    let k = obs_info.nrows();
    let mut obs_info_nalg = DMatrix::<f64>::zeros(k, k);
    fill_dmatrix(&obs_info, &mut obs_info_nalg);
    invert_information(obs_info_nalg)
}

/// Square roots of the diagonal of `cov`.
pub fn standard_errors(cov: &Array2<f64>) -> Array1<f64> {
    cov.diag().mapv(|v| v.max(0.0).sqrt())
}

/// Lower Cholesky factor of `cov`, or `None` if it is not positive definite.
pub fn cholesky_lower(cov: &Array2<f64>) -> Option<Array2<f64>> {
    let k = cov.nrows();
    let mut m = DMatrix::<f64>::zeros(k, k);
    fill_dmatrix(cov, &mut m);
    let chol = m.cholesky()?;
    let l = chol.l();
    Some(Array2::from_shape_fn((k, k), |(i, j)| l[(i, j)]))
}

// ---- Helper methods ----

/// fill_dmatrix — copy a square `ndarray` matrix into a `nalgebra::DMatrix`.
///
/// Traverses column by column to match `DMatrix` storage. No
/// symmetrization is performed. Both matrices must be `n×n`.
fn fill_dmatrix(src: &Array2<f64>, dst: &mut DMatrix<f64>) {
    let n = src.ncols();
    for j in 0..n {
        for i in j..n {
            if j == i {
                dst[(i, i)] = src[[i, i]];
            } else {
                dst[(i, j)] = src[[i, j]];
                dst[(j, i)] = src[[j, i]];
            }
        }
    }
}

/// `Q Λ⁻¹ Qᵀ` from the symmetric eigendecomposition of `obs_info`.
fn invert_information(obs_info: DMatrix<f64>) -> InferenceResult<Array2<f64>> {
    let k = obs_info.nrows();
    let eigen = obs_info.symmetric_eigen();
    let min_eigenvalue = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if !(min_eigenvalue > EIGEN_EPS) {
        return Err(InferenceError::SingularHessian { min_eigenvalue });
    }
    let q = eigen.eigenvectors;
    let lambdas = eigen.eigenvalues;
    let cov = Array2::from_shape_fn((k, k), |(i, j)| {
        (0..k).map(|m| q[(i, m)] * q[(j, m)] / lambdas[m]).sum::<f64>()
    });
    if cov.iter().any(|v| !v.is_finite()) {
        return Err(InferenceError::NonFiniteCovariance);
    }
    Ok(cov)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Correct copying of matrices from `ndarray` into `DMatrix`.
    // - Covariance of a concave quadratic with known information matrix.
    // - Rejection of flat or convex curvature.
    // - Cholesky factors for positive-definite and indefinite inputs.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `fill_dmatrix` copies entries without altering values.
    //
    // Given
    // -----
    // - A 2×2 symmetric matrix with distinct entries.
    //
    // Expect
    // ------
    // - Identical entries in the `DMatrix`.
    fn fill_dmatrix_copies_ndarray_into_dmatrix_without_modification() {
        // Arrange
        let src: Array2<f64> = array![[2.0, 0.5], [0.5, 1.0]];
        let mut dst = DMatrix::<f64>::zeros(2, 2);

        // Act
        fill_dmatrix(&src, &mut dst);

        // Assert
        assert_eq!(dst[(0, 0)], 2.0);
        assert_eq!(dst[(0, 1)], 0.5);
        assert_eq!(dst[(1, 0)], 0.5);
        assert_eq!(dst[(1, 1)], 1.0);
    }

    #[test]
    // Purpose
    // -------
    // The covariance of a correlated quadratic equals the analytic inverse.
    //
    // Given
    // -----
    // - ℓ(z) = -½ zᵀ A z with A = [[2, 0.5], [0.5, 1]].
    //
    // Expect
    // ------
    // - Σ ≈ A⁻¹ = [[1, -0.5], [-0.5, 2]] / 1.75.
    fn calc_covariance_matches_analytic_inverse() {
        // Arrange
        let a = array![[2.0, 0.5], [0.5, 1.0]];
        let grad = |z: &Array1<f64>| -a.dot(z);

        // Act
        let cov = calc_covariance(&grad, &array![0.3, -0.2]).expect("A is positive definite");

        // Assert
        let det = 1.75;
        assert!((cov[[0, 0]] - 1.0 / det).abs() < 1e-6);
        assert!((cov[[0, 1]] + 0.5 / det).abs() < 1e-6);
        assert!((cov[[1, 1]] - 2.0 / det).abs() < 1e-6);
        let se = standard_errors(&cov);
        assert!((se[1] - (2.0_f64 / det).sqrt()).abs() < 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // A direction without curvature is reported, not pseudo-inverted.
    //
    // Given
    // -----
    // - ℓ(z) = -z₀², flat in z₁.
    //
    // Expect
    // ------
    // - `InferenceError::SingularHessian`.
    fn calc_covariance_rejects_flat_direction() {
        // Arrange
        let grad = |z: &Array1<f64>| array![-2.0 * z[0], 0.0];

        // Act
        let err = calc_covariance(&grad, &array![0.0, 0.0]).expect_err("flat direction");

        // Assert
        assert!(matches!(err, InferenceError::SingularHessian { .. }));
    }

    #[test]
    // Purpose
    // -------
    // `cholesky_lower` reconstructs the input and rejects indefinite matrices.
    //
    // Given
    // -----
    // - Σ = [[4, 2], [2, 3]] and an indefinite [[1, 2], [2, 1]].
    //
    // Expect
    // ------
    // - L Lᵀ = Σ; `None` for the indefinite matrix.
    fn cholesky_lower_factors_positive_definite_only() {
        // Arrange
        let cov = array![[4.0, 2.0], [2.0, 3.0]];

        // Act
        let l = cholesky_lower(&cov).expect("positive definite");

        // Assert
        let rebuilt = l.dot(&l.t());
        for ((i, j), v) in cov.indexed_iter() {
            assert!((rebuilt[[i, j]] - v).abs() < 1e-12);
        }
        assert_eq!(l[[0, 1]], 0.0);
        assert!(cholesky_lower(&array![[1.0, 2.0], [2.0, 1.0]]).is_none());
    }
}
