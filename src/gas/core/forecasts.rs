//! Forecasting and simulation for GAS(ar, sc) models.
//!
//! Purpose
//! -------
//! Roll the θ-recursion beyond (or inside) the sample to produce point
//! forecasts, simulation-based prediction intervals, and posterior
//! predictive draws of the observed series.
//!
//! Key behaviors
//! -------------
//! - Point forecasts extend θ with *zero* future scores (no new
//!   information) and report the family mean `E[y | θ̂_{T+i}]`. The first
//!   step still uses the last observed score and AR feedback decays
//!   towards the unconditional level, so the path varies across steps.
//! - Intervals simulate `nsims` futures. Each simulation takes one
//!   posterior draw of the latent vector, filters the observed data with
//!   it, then draws `y ~ p(· | θ)` step by step and feeds the simulated
//!   score back into the recursion. Quantiles are taken per step.
//! - [`rolling_forecast_table`] evaluates the last `h` in-sample points as
//!   one-step-ahead forecasts from the preceding data.
//!
//! Invariants & assumptions
//! ------------------------
//! - Latent draws that make the observed data infeasible fall back to the
//!   point estimate, so every simulation yields a finite path.
//! - Interval columns are order statistics of one sample per step, hence
//!   monotone in the quantile level.
//!
//! Conventions
//! -----------
//! - Row `i` of a forecast table is step `T + i + 1`.
//! - Column 0 is the point forecast; interval columns follow in the order
//!   of [`INTERVAL_LEVELS`].
use crate::gas::{
    core::recursion::{GASCoefficients, GASSpec, compute_path},
    errors::{GASError, GASResult},
};
use ndarray::{Array1, Array2, ArrayView1, Axis, s};
use rand::Rng;

/// Quantile levels reported as prediction intervals.
pub const INTERVAL_LEVELS: [f64; 4] = [0.01, 0.05, 0.95, 0.99];

/// Column label of the point forecast.
pub const POINT_COLUMN: &str = "Forecast";

/// Tabular forecast output: one row per step.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastTable {
    pub columns: Vec<String>,
    pub values: Array2<f64>,
}

impl ForecastTable {
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Column by label, e.g. `"5% Prediction Interval"`.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.columns.iter().position(|c| c == name).map(|j| self.values.column(j))
    }

    /// Point forecasts.
    pub fn point(&self) -> ArrayView1<'_, f64> {
        self.values.column(0)
    }
}

/// Label of the interval column for quantile `level`.
pub fn interval_label(level: f64) -> String {
    format!("{}% Prediction Interval", (level * 100.0).round())
}

fn column_labels(intervals: bool) -> Vec<String> {
    let mut cols = vec![POINT_COLUMN.to_string()];
    if intervals {
        cols.extend(INTERVAL_LEVELS.iter().map(|&q| interval_label(q)));
    }
    cols
}

/// θ̂ for `h` steps past the histories, with zero future scores.
///
/// `theta_hist` and `score_hist` are the in-sample θ path and innovations
/// (newest at the end).
pub fn forecast_theta(
    spec: &GASSpec, coefs: &GASCoefficients, theta_hist: &[f64], score_hist: &[f64], h: usize,
) -> Array1<f64> {
    let mut theta = theta_hist.to_vec();
    let mut scores = score_hist.to_vec();
    let mut out = Array1::<f64>::zeros(h);
    for i in 0..h {
        let (next, _) = coefs.next_theta(&theta, &scores, &spec.guards);
        out[i] = next;
        theta.push(next);
        scores.push(0.0);
    }
    out
}

/// One simulated future of length `h`: draws `y` at each θ and feeds the
/// simulated score back.
pub fn simulate_forward<R: Rng + ?Sized>(
    spec: &GASSpec, coefs: &GASCoefficients, theta_hist: &[f64], score_hist: &[f64], h: usize,
    rng: &mut R,
) -> GASResult<Array1<f64>> {
    let mut theta = theta_hist.to_vec();
    let mut scores = score_hist.to_vec();
    let mut out = Array1::<f64>::zeros(h);
    for i in 0..h {
        let (next, _) = coefs.next_theta(&theta, &scores, &spec.guards);
        if !next.is_finite() {
            return Err(GASError::NonFiniteTheta { t: theta.len(), value: next });
        }
        let y_sim = spec.family.draw(next, rng)?;
        out[i] = y_sim;
        theta.push(next);
        scores.push(spec.family.scaled_score(y_sim, next, spec.scaling));
    }
    Ok(out)
}

/// `h`-step forecast table past the end of `y`.
///
/// Parameters
/// ----------
/// - `params`: natural latent vector used for the point forecast.
/// - `draws`: `nsims × k` natural latent draws used for intervals.
/// - `y`: observed (modeled) series.
///
/// Errors
/// ------
/// - `GASError::InfeasibleFit` if `params` makes `y` infeasible.
/// - `GASError::InvalidNsims` if intervals are requested with no draws.
pub fn forecast_table<R: Rng + ?Sized>(
    spec: &GASSpec, params: &Array1<f64>, draws: &Array2<f64>, y: ArrayView1<f64>, h: usize,
    intervals: bool, rng: &mut R,
) -> GASResult<ForecastTable> {
    let point_path = compute_path(spec, params, y);
    if !point_path.is_feasible() {
        return Err(GASError::InfeasibleFit);
    }
    let coefs = GASCoefficients::from_vector(&spec.shape, params.view())?;
    let theta_hist = point_path.theta.to_vec();
    let score_hist = point_path.scores.to_vec();

    let theta_hat = forecast_theta(spec, &coefs, &theta_hist, &score_hist, h);
    let columns = column_labels(intervals);
    let mut values = Array2::<f64>::zeros((h, columns.len()));
    values.column_mut(0).assign(&theta_hat.mapv(|t| spec.family.mean(t)));
    if !intervals {
        return Ok(ForecastTable { columns, values });
    }

    let nsims = draws.nrows();
    if nsims == 0 {
        return Err(GASError::InvalidNsims { nsims });
    }
    let mut sims = Array2::<f64>::zeros((nsims, h));
    for (s_idx, row) in draws.axis_iter(Axis(0)).enumerate() {
        let draw = row.to_owned();
        let path = compute_path(spec, &draw, y);
        let future = match (path.is_feasible(), GASCoefficients::from_vector(&spec.shape, row)) {
            (true, Ok(c)) => {
                simulate_forward(spec, &c, &path.theta.to_vec(), &path.scores.to_vec(), h, rng)
            }
            _ => simulate_forward(spec, &coefs, &theta_hist, &score_hist, h, rng),
        };
        let future = match future {
            Ok(f) => f,
            Err(_) => simulate_forward(spec, &coefs, &theta_hist, &score_hist, h, rng)?,
        };
        sims.row_mut(s_idx).assign(&future);
    }
    for step in 0..h {
        let mut col = sims.column(step).to_vec();
        col.sort_by(|a, b| a.total_cmp(b));
        for (j, &q) in INTERVAL_LEVELS.iter().enumerate() {
            values[[step, j + 1]] = quantile_sorted(&col, q);
        }
    }
    Ok(ForecastTable { columns, values })
}

/// One-step-ahead forecasts of the last `h` points of `y`, each made from
/// the data preceding it.
///
/// Errors
/// ------
/// - `GASError::InvalidHorizon` if fewer than `max(ar, sc) + 1` points
///   would remain before the holdout.
pub fn rolling_forecast_table<R: Rng + ?Sized>(
    spec: &GASSpec, params: &Array1<f64>, draws: &Array2<f64>, y: ArrayView1<f64>, h: usize,
    intervals: bool, rng: &mut R,
) -> GASResult<ForecastTable> {
    let n = y.len();
    if h == 0 {
        return Err(GASError::InvalidHorizon { h, reason: "horizon must be positive" });
    }
    if h + spec.shape.burn_in() >= n {
        return Err(GASError::InvalidHorizon {
            h,
            reason: "holdout leaves too few observations to seed the recursion",
        });
    }
    let columns = column_labels(intervals);
    let mut values = Array2::<f64>::zeros((h, columns.len()));
    for i in 0..h {
        let train = y.slice(s![..n - h + i]);
        let step = forecast_table(spec, params, draws, train, 1, intervals, rng)?;
        values.row_mut(i).assign(&step.values.row(0));
    }
    Ok(ForecastTable { columns, values })
}

/// `nsims × (n − m)` replicated series: for each latent draw, filter `y`
/// and draw one observation at every post-burn-in θ_t.
///
/// Draws that make `y` infeasible fall back to `params`.
pub fn posterior_predictive<R: Rng + ?Sized>(
    spec: &GASSpec, params: &Array1<f64>, draws: &Array2<f64>, y: ArrayView1<f64>, rng: &mut R,
) -> GASResult<Array2<f64>> {
    let point_path = compute_path(spec, params, y);
    if !point_path.is_feasible() {
        return Err(GASError::InfeasibleFit);
    }
    let m = spec.shape.burn_in();
    let width = y.len() - m;
    let mut out = Array2::<f64>::zeros((draws.nrows(), width));
    for (s_idx, row) in draws.axis_iter(Axis(0)).enumerate() {
        let path = compute_path(spec, &row.to_owned(), y);
        let theta = if path.is_feasible() { &path.theta } else { &point_path.theta };
        for (j, &th) in theta.slice(s![m..]).iter().enumerate() {
            out[[s_idx, j]] = spec.family.draw(th, rng)?;
        }
    }
    Ok(out)
}

/// Linear-interpolation quantile of an ascending slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::core::{
        family::Family, guards::ThetaGuards, options::ScoreScaling, shape::GASShape,
    };
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Zero-score point paths and their decay to the unconditional level.
    // - Interval ordering and shape of forecast tables.
    // - Rolling holdout row count and horizon validation.
    // - Posterior predictive grid shape and support.
    // -------------------------------------------------------------------------

    fn spec(family: Family) -> GASSpec {
        GASSpec {
            family,
            shape: GASShape::new(1, 1, 100).expect("valid shape"),
            scaling: ScoreScaling::InverseFisher,
            guards: ThetaGuards::default(),
        }
    }

    fn series() -> Array1<f64> {
        array![0.8, 1.3, 0.4, 2.2, 1.1, 0.6, 0.9, 3.0, 1.4, 0.7, 0.5, 1.8, 1.2, 0.3, 2.6]
    }

    #[test]
    // Purpose
    // -------
    // Point θ forecasts follow the AR decay with zero future scores.
    //
    // Given
    // -----
    // - c = 0.1, φ = 0.5, α = 0.3, last θ = 1.0, last score = 0.4.
    //
    // Expect
    // ------
    // - θ̂₁ = 0.1 + 0.5 + 0.12, θ̂₂ = 0.1 + 0.5·θ̂₁, approaching 0.2.
    fn forecast_theta_decays_to_level() {
        // Arrange
        let s = spec(Family::Exponential);
        let coefs = GASCoefficients::from_vector(&s.shape, array![0.1, 0.5, 0.3].view())
            .expect("length matches");

        // Act
        let path = forecast_theta(&s, &coefs, &[1.0], &[0.4], 30);

        // Assert
        assert!((path[0] - 0.72).abs() < 1e-12);
        assert!((path[1] - (0.1 + 0.5 * 0.72)).abs() < 1e-12);
        assert!((path[29] - 0.2).abs() < 1e-6);
        assert!(path.iter().zip(path.iter().skip(1)).all(|(a, b)| a != b));
    }

    #[test]
    // Purpose
    // -------
    // Forecast tables carry strictly ordered interval columns.
    //
    // Given
    // -----
    // - Exponential GAS(1, 1), 500 identical latent draws, h = 4.
    //
    // Expect
    // ------
    // - 4 rows, 5 columns, 1% < 5% < 95% < 99% on every row, no NaN.
    fn forecast_table_orders_intervals() {
        // Arrange
        let s = spec(Family::Exponential);
        let params = array![0.05, 0.6, 0.2];
        let draws = Array2::from_shape_fn((500, 3), |(_, j)| params[j]);
        let mut rng = StdRng::seed_from_u64(17);
        let y = series();

        // Act
        let table = forecast_table(&s, &params, &draws, y.view(), 4, true, &mut rng)
            .expect("feasible forecast");

        // Assert
        assert_eq!(table.nrows(), 4);
        assert_eq!(table.ncols(), 5);
        assert!(table.values.iter().all(|v| v.is_finite()));
        let q1 = table.column("1% Prediction Interval").expect("column exists");
        let q5 = table.column("5% Prediction Interval").expect("column exists");
        let q95 = table.column("95% Prediction Interval").expect("column exists");
        let q99 = table.column("99% Prediction Interval").expect("column exists");
        for i in 0..4 {
            assert!(q1[i] < q5[i] && q5[i] < q95[i] && q95[i] < q99[i]);
        }
    }

    #[test]
    // Purpose
    // -------
    // Rolling forecasts produce one row per holdout point and validate h.
    //
    // Given
    // -----
    // - 15 observations, GAS(1, 1), h = 5 and h = 14.
    //
    // Expect
    // ------
    // - 5 rows for h = 5; `InvalidHorizon` for h = 14.
    fn rolling_forecast_table_validates_horizon() {
        // Arrange
        let s = spec(Family::Exponential);
        let params = array![0.0, 0.5, 0.1];
        let draws = Array2::from_shape_fn((1, 3), |(_, j)| params[j]);
        let mut rng = StdRng::seed_from_u64(2);
        let y = series();

        // Act
        let ok = rolling_forecast_table(&s, &params, &draws, y.view(), 5, false, &mut rng);
        let bad = rolling_forecast_table(&s, &params, &draws, y.view(), 14, false, &mut rng);

        // Assert
        let table = ok.expect("valid horizon");
        assert_eq!(table.nrows(), 5);
        assert_eq!(table.columns, vec![POINT_COLUMN.to_string()]);
        assert!(matches!(bad, Err(GASError::InvalidHorizon { h: 14, .. })));
    }

    #[test]
    // Purpose
    // -------
    // Posterior predictive draws skip burn-in and respect the support.
    //
    // Given
    // -----
    // - Poisson GAS(1, 1), 20 draws, count data of length 10.
    //
    // Expect
    // ------
    // - Shape 20 × 9, non-negative integers.
    fn posterior_predictive_shape_and_support() {
        // Arrange
        let s = spec(Family::Poisson);
        let params = array![0.2, 0.5, 0.1];
        let draws = Array2::from_shape_fn((20, 3), |(_, j)| params[j]);
        let y = array![1.0, 0.0, 2.0, 3.0, 1.0, 1.0, 4.0, 0.0, 2.0, 1.0];
        let mut rng = StdRng::seed_from_u64(5);

        // Act
        let sims = posterior_predictive(&s, &params, &draws, y.view(), &mut rng)
            .expect("feasible draws");

        // Assert
        assert_eq!(sims.dim(), (20, 9));
        assert!(sims.iter().all(|v| *v >= 0.0 && v.fract() == 0.0));
    }

    #[test]
    // Purpose
    // -------
    // Quantiles interpolate linearly between order statistics.
    //
    // Given
    // -----
    // - Sorted [0, 1, 2, 3, 4].
    //
    // Expect
    // ------
    // - q(0.5) = 2, q(0.1) = 0.4, q(1) = 4.
    fn quantile_sorted_interpolates() {
        let v = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&v, 0.5), 2.0);
        assert!((quantile_sorted(&v, 0.1) - 0.4).abs() < 1e-12);
        assert_eq!(quantile_sorted(&v, 1.0), 4.0);
    }
}
