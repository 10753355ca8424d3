//! inference::stochastic — adaptive step rules for stochastic gradient ascent.
//!
//! Black-box variational inference follows noisy Monte Carlo gradients of
//! the ELBO. Plain gradient steps are too sensitive to the scale of those
//! estimates, so each coordinate is rescaled by a running second-moment
//! estimate. Two rules are provided:
//!
//! - [`RMSProp`]: exponentially weighted second moment with a decaying
//!   warm-up boost to the learning rate. Parameters are held fixed for the
//!   first few iterations while the variance estimate settles.
//! - [`Adam`]: bias-corrected first and second moments.
//!
//! Both rules *ascend*: `step` returns the increment to add to the
//! parameters. Moment estimates are seeded from the first gradient. Later
//! gradients are clipped coordinatewise to [`GRAD_CLIP_RMS`] times the
//! running root mean square before they enter the moments, so a single
//! outlying Monte Carlo estimate cannot inflate the second moment and
//! freeze the steps for hundreds of iterations.
use crate::inference::errors::InferenceError;
use ndarray::Array1;
use std::str::FromStr;

/// Iterations during which RMSProp only accumulates variance.
const RMSPROP_WARMUP: usize = 5;

/// Magnitude of the decaying learning-rate boost in RMSProp.
const RMSPROP_BOOST: f64 = 15.0;

/// Gradient coordinates beyond this multiple of their running RMS are
/// clipped.
pub const GRAD_CLIP_RMS: f64 = 5.0;

/// Clip `g` coordinatewise to `±GRAD_CLIP_RMS · sqrt(v)`. Coordinates with
/// no second-moment information yet pass through.
fn clip_to_rms(g: &Array1<f64>, v: &Array1<f64>) -> Array1<f64> {
    let mut out = g.clone();
    out.zip_mut_with(v, |gi, &vi| {
        let cap = GRAD_CLIP_RMS * vi.sqrt();
        if cap > 0.0 && cap.is_finite() {
            *gi = gi.clamp(-cap, cap);
        }
    });
    out
}

/// Choice of stochastic step rule.
///
/// Parses case-insensitively from `"RMSProp"` or `"ADAM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepRule {
    #[default]
    RMSProp,
    ADAM,
}

impl FromStr for StepRule {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rmsprop" => Ok(StepRule::RMSProp),
            "adam" => Ok(StepRule::ADAM),
            _ => Err(InferenceError::UnknownStepRule { name: s.to_string() }),
        }
    }
}

impl std::fmt::Display for StepRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepRule::RMSProp => write!(f, "RMSProp"),
            StepRule::ADAM => write!(f, "ADAM"),
        }
    }
}

/// RMSProp with warm-up.
#[derive(Debug, Clone)]
pub struct RMSProp {
    learning_rate: f64,
    ewma: f64,
    epsilon: f64,
    v: Option<Array1<f64>>,
    t: usize,
}

impl RMSProp {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate, ewma: 0.99, epsilon: 1e-8, v: None, t: 0 }
    }

    pub fn with_ewma(mut self, ewma: f64) -> Self {
        self.ewma = ewma;
        self
    }

    /// Increment for gradient `g`.
    ///
    /// Returns zeros for the first `RMSPROP_WARMUP` calls.
    pub fn step(&mut self, g: &Array1<f64>) -> Array1<f64> {
        self.t += 1;
        let ewma = self.ewma;
        let g = match self.v.as_ref() {
            Some(v) => clip_to_rms(g, v),
            None => g.clone(),
        };
        if let Some(v) = self.v.as_mut() {
            v.zip_mut_with(&g, |vi, &gi| *vi = ewma * *vi + (1.0 - ewma) * gi * gi);
        } else {
            self.v = Some(g.mapv(|gi| gi * gi));
        }
        let Some(v) = self.v.as_ref() else {
            return Array1::zeros(g.len());
        };
        if self.t <= RMSPROP_WARMUP {
            return Array1::zeros(g.len());
        }
        let rate = self.learning_rate * (1.0 + RMSPROP_BOOST * ewma.powi(self.t as i32));
        let eps = self.epsilon;
        let mut out = g;
        out.zip_mut_with(v, |gi, &vi| *gi *= rate / (vi + eps).sqrt());
        out
    }
}

/// Adam with bias correction.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    m: Option<Array1<f64>>,
    v: Option<Array1<f64>>,
    t: usize,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate, beta1: 0.9, beta2: 0.999, epsilon: 1e-8, m: None, v: None, t: 0 }
    }

    pub fn with_beta1(mut self, beta1: f64) -> Self {
        self.beta1 = beta1;
        self
    }

    pub fn with_beta2(mut self, beta2: f64) -> Self {
        self.beta2 = beta2;
        self
    }

    /// Increment for gradient `g`.
    pub fn step(&mut self, g: &Array1<f64>) -> Array1<f64> {
        self.t += 1;
        let (b1, b2) = (self.beta1, self.beta2);
        let g = match self.v.as_ref() {
            Some(v) => clip_to_rms(g, v),
            None => g.clone(),
        };
        let m = self.m.get_or_insert_with(|| g.clone());
        m.zip_mut_with(&g, |mi, &gi| *mi = b1 * *mi + (1.0 - b1) * gi);
        let v = self.v.get_or_insert_with(|| g.mapv(|gi| gi * gi));
        v.zip_mut_with(&g, |vi, &gi| *vi = b2 * *vi + (1.0 - b2) * gi * gi);

        let t = self.t as i32;
        let m_scale = 1.0 / (1.0 - b1.powi(t));
        let v_scale = 1.0 / (1.0 - b2.powi(t));
        let (lr, eps) = (self.learning_rate, self.epsilon);
        let mut out = m.clone();
        out.zip_mut_with(v, |mi, &vi| {
            *mi = lr * (*mi * m_scale) / ((vi * v_scale).sqrt() + eps);
        });
        out
    }
}

/// Runtime-selected step rule.
#[derive(Debug, Clone)]
pub enum StepOptimizer {
    RMSProp(RMSProp),
    Adam(Adam),
}

impl StepOptimizer {
    pub fn new(rule: StepRule, learning_rate: f64) -> Self {
        match rule {
            StepRule::RMSProp => StepOptimizer::RMSProp(RMSProp::new(learning_rate)),
            StepRule::ADAM => StepOptimizer::Adam(Adam::new(learning_rate)),
        }
    }

    /// Ascend `params` along `grad`.
    pub fn update(&mut self, params: &mut Array1<f64>, grad: &Array1<f64>) {
        let delta = match self {
            StepOptimizer::RMSProp(o) => o.step(grad),
            StepOptimizer::Adam(o) => o.step(grad),
        };
        *params += &delta;
    }
}
