//! Continuous dimorphism scores.
//!
//! The log-likelihood ratio `ln((f_B(v) + eps) / (f_A(v) + eps))` is
//! positive when a value is more typical of population B. The posterior
//! `P(B | v)` is the bounded alternative on `[0, 1]`.

use super::divergence::{check_schema, fit_model};
use super::{SampleMap, Subject};
use dm_common::{Error, Population, Result};
use dm_math::{BandwidthRule, GaussianKde};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Default guard added to both densities.
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Default prior probability of population B.
pub const DEFAULT_PRIOR_B: f64 = 0.5;

/// A score, or `NotApplicable` when the measurement is missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Value(f64),
    NotApplicable,
}

impl Score {
    pub fn value(self) -> Option<f64> {
        match self {
            Score::Value(v) => Some(v),
            Score::NotApplicable => None,
        }
    }

    pub fn is_applicable(self) -> bool {
        matches!(self, Score::Value(_))
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Score::Value(v) => write!(f, "{}", v),
            Score::NotApplicable => f.write_str("NA"),
        }
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Score::Value(v) => serializer.serialize_f64(*v),
            Score::NotApplicable => serializer.serialize_str("NA"),
        }
    }
}

/// Variable → score for one subject.
pub type ScoreMap = BTreeMap<String, Score>;

fn log_ratio(density_a: f64, density_b: f64, epsilon: f64) -> f64 {
    ((density_b + epsilon) / (density_a + epsilon)).ln()
}

fn posterior_b(density_a: f64, density_b: f64, epsilon: f64, prior_b: f64) -> f64 {
    let weight_b = prior_b * (density_b + epsilon);
    let weight_a = (1.0 - prior_b) * (density_a + epsilon);
    weight_b / (weight_a + weight_b)
}

/// Scores single values against raw population samples.
///
/// Builds fresh density models on every call; use [`PopulationModels`] to
/// score many subjects against the same populations.
#[derive(Debug, Clone, Copy)]
pub struct LikelihoodScorer {
    epsilon: f64,
    prior_b: f64,
    bandwidth: BandwidthRule,
}

impl Default for LikelihoodScorer {
    fn default() -> Self {
        LikelihoodScorer {
            epsilon: DEFAULT_EPSILON,
            prior_b: DEFAULT_PRIOR_B,
            bandwidth: BandwidthRule::Scott,
        }
    }
}

impl LikelihoodScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be positive and finite; validated with the configuration.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Must lie in (0, 1); validated with the configuration.
    pub fn with_prior_b(mut self, prior_b: f64) -> Self {
        self.prior_b = prior_b;
        self
    }

    pub fn with_bandwidth(mut self, bandwidth: BandwidthRule) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Log-likelihood ratio of B over A at `value`.
    ///
    /// A missing or non-finite value scores `NotApplicable` without looking
    /// at the samples. Otherwise fails only when a population cannot support
    /// a density estimate.
    pub fn log_likelihood_ratio(
        &self,
        variable: &str,
        value: Option<f64>,
        population_a: &[f64],
        population_b: &[f64],
    ) -> Result<Score> {
        let Some(value) = value.filter(|v| v.is_finite()) else {
            return Ok(Score::NotApplicable);
        };
        let (kde_a, kde_b) = self.fit_pair(variable, population_a, population_b)?;
        Ok(Score::Value(log_ratio(
            kde_a.density(value),
            kde_b.density(value),
            self.epsilon,
        )))
    }

    /// Posterior probability of population B at `value`.
    pub fn posterior(
        &self,
        variable: &str,
        value: Option<f64>,
        population_a: &[f64],
        population_b: &[f64],
    ) -> Result<Score> {
        let Some(value) = value.filter(|v| v.is_finite()) else {
            return Ok(Score::NotApplicable);
        };
        let (kde_a, kde_b) = self.fit_pair(variable, population_a, population_b)?;
        Ok(Score::Value(posterior_b(
            kde_a.density(value),
            kde_b.density(value),
            self.epsilon,
            self.prior_b,
        )))
    }

    fn fit_pair(
        &self,
        variable: &str,
        a: &[f64],
        b: &[f64],
    ) -> Result<(GaussianKde, GaussianKde)> {
        Ok((
            fit_model(variable, Population::A, a, self.bandwidth)?,
            fit_model(variable, Population::B, b, self.bandwidth)?,
        ))
    }
}

/// Density models for every variable, fitted once.
#[derive(Debug, Clone)]
pub struct PopulationModels {
    models: BTreeMap<String, (GaussianKde, GaussianKde)>,
    scorer: LikelihoodScorer,
}

impl PopulationModels {
    /// Fit both populations for every variable.
    ///
    /// The maps must carry identical variables.
    pub fn fit(
        population_a: &SampleMap,
        population_b: &SampleMap,
        scorer: LikelihoodScorer,
    ) -> Result<Self> {
        check_schema("population maps", population_a, population_b)?;
        let mut models = BTreeMap::new();
        for (name, samples_a) in population_a {
            let pair = scorer.fit_pair(name, samples_a, &population_b[name])?;
            models.insert(name.clone(), pair);
        }
        Ok(PopulationModels { models, scorer })
    }

    pub fn variables(&self) -> impl Iterator<Item = &String> {
        self.models.keys()
    }

    fn densities(&self, variable: &str, value: f64) -> Result<(f64, f64)> {
        let (kde_a, kde_b) = self
            .models
            .get(variable)
            .ok_or_else(|| Error::UnknownVariable {
                variable: variable.to_string(),
            })?;
        Ok((kde_a.density(value), kde_b.density(value)))
    }

    pub fn log_likelihood_ratio(&self, variable: &str, value: Option<f64>) -> Result<Score> {
        match value.filter(|v| v.is_finite()) {
            None => Ok(Score::NotApplicable),
            Some(v) => {
                let (fa, fb) = self.densities(variable, v)?;
                Ok(Score::Value(log_ratio(fa, fb, self.scorer.epsilon)))
            }
        }
    }

    pub fn posterior(&self, variable: &str, value: Option<f64>) -> Result<Score> {
        match value.filter(|v| v.is_finite()) {
            None => Ok(Score::NotApplicable),
            Some(v) => {
                let (fa, fb) = self.densities(variable, v)?;
                Ok(Score::Value(posterior_b(
                    fa,
                    fb,
                    self.scorer.epsilon,
                    self.scorer.prior_b,
                )))
            }
        }
    }

    /// Score every variable the subject carries.
    pub fn score_subject(&self, subject: &Subject, posterior: bool) -> Result<ScoreMap> {
        let mut scores = ScoreMap::new();
        for (name, value) in &subject.values {
            let score = if posterior {
                self.posterior(name, *value)?
            } else {
                self.log_likelihood_ratio(name, *value)?
            };
            scores.insert(name.clone(), score);
        }
        Ok(scores)
    }
}
