//! One-dimensional Gaussian kernel density estimation.
//!
//! # Model
//!
//! For finite samples x_1..x_n and bandwidth h:
//!
//! ```text
//! f(x) = 1/(n h) * Σ_i φ((x - x_i) / h),   φ(z) = exp(-z²/2) / sqrt(2π)
//! ```
//!
//! # Bandwidth
//!
//! The bandwidth is the unbiased sample standard deviation scaled by a rule
//! factor, the same construction `gaussian_kde` uses in SciPy:
//!
//! - Scott:     `n^(-1/5)`
//! - Silverman: `(3n/4)^(-1/5)`
//!
//! A sample set needs at least two distinct finite values; with fewer the
//! standard deviation is zero (or undefined) and there is no bandwidth.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::describe::{distinct_count, finite_samples, sample_std};

const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8; // 0.5 * ln(2*pi)

/// Minimum distinct finite values required to fit a density.
pub const MIN_DISTINCT_SAMPLES: usize = 2;

/// Automatic bandwidth selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandwidthRule {
    /// Scott's rule, n^(-1/5).
    #[default]
    Scott,
    /// Silverman's rule, (3n/4)^(-1/5).
    Silverman,
}

impl BandwidthRule {
    /// Multiplicative factor applied to the sample standard deviation.
    pub fn factor(self, n: usize) -> f64 {
        let n = n as f64;
        match self {
            BandwidthRule::Scott => n.powf(-0.2),
            BandwidthRule::Silverman => (n * 0.75).powf(-0.2),
        }
    }
}

impl std::str::FromStr for BandwidthRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scott" => Ok(BandwidthRule::Scott),
            "silverman" => Ok(BandwidthRule::Silverman),
            _ => Err(format!("unknown bandwidth rule: {}", s)),
        }
    }
}

impl std::fmt::Display for BandwidthRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BandwidthRule::Scott => write!(f, "scott"),
            BandwidthRule::Silverman => write!(f, "silverman"),
        }
    }
}

/// Errors raised while fitting a density model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KdeError {
    #[error("not enough distinct finite samples: {distinct} (min {min})")]
    InsufficientDistinct { distinct: usize, min: usize },
    #[error("non-finite sample at index {index}")]
    NonFinite { index: usize },
    #[error("invalid bandwidth: {value}")]
    InvalidBandwidth { value: f64 },
}

/// Gaussian kernel density estimate over a finite sample.
#[derive(Debug, Clone, Serialize)]
pub struct GaussianKde {
    samples: Vec<f64>,
    bandwidth: f64,
}

impl GaussianKde {
    /// Fit with Scott's rule. Every sample must be finite.
    pub fn new(samples: &[f64]) -> Result<Self, KdeError> {
        Self::with_rule(samples, BandwidthRule::Scott)
    }

    /// Fit with the given bandwidth rule. Every sample must be finite.
    pub fn with_rule(samples: &[f64], rule: BandwidthRule) -> Result<Self, KdeError> {
        if let Some(index) = samples.iter().position(|v| !v.is_finite()) {
            return Err(KdeError::NonFinite { index });
        }
        let distinct = distinct_count(samples);
        if distinct < MIN_DISTINCT_SAMPLES {
            return Err(KdeError::InsufficientDistinct {
                distinct,
                min: MIN_DISTINCT_SAMPLES,
            });
        }
        let bandwidth = sample_std(samples) * rule.factor(samples.len());
        Self::with_bandwidth(samples, bandwidth)
    }

    /// Fit after discarding non-finite values (missing measurements).
    pub fn from_raw(samples: &[f64], rule: BandwidthRule) -> Result<Self, KdeError> {
        Self::with_rule(&finite_samples(samples), rule)
    }

    /// Fit with an explicit bandwidth.
    pub fn with_bandwidth(samples: &[f64], bandwidth: f64) -> Result<Self, KdeError> {
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return Err(KdeError::InvalidBandwidth { value: bandwidth });
        }
        if samples.is_empty() {
            return Err(KdeError::InsufficientDistinct {
                distinct: 0,
                min: MIN_DISTINCT_SAMPLES,
            });
        }
        if let Some(index) = samples.iter().position(|v| !v.is_finite()) {
            return Err(KdeError::NonFinite { index });
        }
        Ok(Self {
            samples: samples.to_vec(),
            bandwidth,
        })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Density at `x`. Non-negative for any non-NaN input; 0 at ±inf.
    pub fn density(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if x.is_infinite() {
            return 0.0;
        }
        let h = self.bandwidth;
        let sum: f64 = self
            .samples
            .iter()
            .map(|xi| {
                let z = (x - xi) / h;
                (-0.5 * z * z).exp()
            })
            .sum();
        sum * (-LN_SQRT_2PI).exp() / (self.samples.len() as f64 * h)
    }

    /// Density at each point of `xs`.
    pub fn density_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.density(x)).collect()
    }

    /// ln f(x), evaluated in the log domain so far tails stay finite.
    pub fn log_density(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if x.is_infinite() {
            return f64::NEG_INFINITY;
        }
        let h = self.bandwidth;
        let exponents: Vec<f64> = self
            .samples
            .iter()
            .map(|xi| {
                let z = (x - xi) / h;
                -0.5 * z * z
            })
            .collect();
        let max = exponents.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let shifted: f64 = exponents.iter().map(|e| (e - max).exp()).sum();
        max + shifted.ln() - (self.samples.len() as f64).ln() - h.ln() - LN_SQRT_2PI
    }
}
