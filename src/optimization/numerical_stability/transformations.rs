//! Numerically stable scalar transforms and shared tolerances.
//!
//! Latent variables of a GAS model are estimated on the real line and mapped
//! into their natural space by a transform. The logistic map and its inverse
//! are prone to overflow or cancellation in naïve form; the versions here
//! branch on the sign of the argument and clamp probabilities away from
//! `{0, 1}` so the results stay finite for every finite input.

/// Clamp applied to probabilities before taking a logit.
pub const LOGIT_EPS: f64 = 1e-12;

/// Smallest eigenvalue of an observed information matrix that still counts
/// as positive definite.
pub const EIGEN_EPS: f64 = 1e-10;

/// Generic closeness tolerance (e.g. `1 - Σφ` treated as zero).
pub const GENERAL_TOL: f64 = 1e-8;

/// Stable logistic `σ(x) = 1 / (1 + e^{-x})`.
///
/// Uses `e^{x} / (1 + e^{x})` for negative `x` so neither branch overflows.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Stable logit `ln(p / (1 - p))` with `p` clamped to `[LOGIT_EPS, 1 - LOGIT_EPS]`.
pub fn safe_logit(p: f64) -> f64 {
    let p = p.clamp(LOGIT_EPS, 1.0 - LOGIT_EPS);
    p.ln() - (-p).ln_1p()
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of `safe_logistic` with the naïve formula on a safe grid.
    // - Finite tails for extreme inputs.
    // - `safe_logit` as the inverse of `safe_logistic`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `safe_logistic` matches `1 / (1 + e^{-x})` where the naïve form is safe.
    //
    // Given
    // -----
    // - x on a grid in [-10, 10].
    //
    // Expect
    // ------
    // - Absolute difference below 1e-14.
    fn safe_logistic_matches_naive_formula() {
        for i in -20..=20 {
            // Arrange
            let x = f64::from(i) * 0.5;

            // Act
            let stable = safe_logistic(x);

            // Assert
            let naive = 1.0 / (1.0 + (-x).exp());
            assert!((stable - naive).abs() < 1e-14, "x = {x}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Extreme arguments saturate instead of producing NaN.
    //
    // Given
    // -----
    // - x = ±1000.
    //
    // Expect
    // ------
    // - σ(1000) = 1, σ(-1000) = 0, both finite.
    fn safe_logistic_saturates_in_tails() {
        // Act
        let hi = safe_logistic(1000.0);
        let lo = safe_logistic(-1000.0);

        // Assert
        assert_eq!(hi, 1.0);
        assert_eq!(lo, 0.0);
    }

    #[test]
    // Purpose
    // -------
    // `safe_logit` inverts `safe_logistic` and stays finite at the boundary.
    //
    // Given
    // -----
    // - x ∈ {-3, 0, 2.5} and p ∈ {0, 1}.
    //
    // Expect
    // ------
    // - logit(σ(x)) ≈ x and logit(0), logit(1) are finite.
    fn safe_logit_inverts_logistic() {
        for x in [-3.0, 0.0, 2.5] {
            assert!((safe_logit(safe_logistic(x)) - x).abs() < 1e-10);
        }
        assert!(safe_logit(0.0).is_finite());
        assert!(safe_logit(1.0).is_finite());
    }
}
