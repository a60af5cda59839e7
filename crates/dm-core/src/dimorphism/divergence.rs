//! Density divergence between two populations and variable ranking.
//!
//! For each variable both populations get a Gaussian KDE. The divergence
//! magnitude is the trapezoidal integral of `|f_A - f_B|` over the merged,
//! sorted sample grid. Its sign records which population has the larger
//! mean: positive means B is larger, and equal means count as B.

use super::SampleMap;
use dm_common::{Error, Population, Result};
use dm_math::{mean, merge_sorted, sorted_finite, trapezoid, BandwidthRule, GaussianKde};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Per-variable divergence and cleaned samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableRecord {
    pub name: String,
    /// Finite samples of population A, ascending.
    #[serde(skip)]
    pub samples_a: Vec<f64>,
    /// Finite samples of population B, ascending.
    #[serde(skip)]
    pub samples_b: Vec<f64>,
    /// Integrated absolute density difference (≥ 0).
    pub magnitude: f64,
    /// Magnitude carrying the mean-comparison sign.
    pub signed: f64,
    /// Population with the larger mean. Ties go to B.
    pub larger: Population,
}

impl VariableRecord {
    pub fn larger(&self) -> Population {
        self.larger
    }

    pub fn samples(&self, population: Population) -> &[f64] {
        match population {
            Population::A => &self.samples_a,
            Population::B => &self.samples_b,
        }
    }
}

/// One line of the ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub variable: String,
    pub divergence: f64,
}

/// Output of [`DivergenceEngine::rank`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DivergenceReport {
    /// Sorted by divergence descending, ties by name descending.
    pub ranking: Vec<RankEntry>,
    #[serde(skip)]
    pub records: BTreeMap<String, VariableRecord>,
}

impl DivergenceReport {
    pub fn len(&self) -> usize {
        self.ranking.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
    }

    pub fn record(&self, variable: &str) -> Option<&VariableRecord> {
        self.records.get(variable)
    }

    pub fn signed_divergence(&self, variable: &str) -> Option<f64> {
        self.records.get(variable).map(|r| r.signed)
    }

    /// Names of the first `n` ranked variables (fewer if the ranking is shorter).
    pub fn top(&self, n: usize) -> Vec<String> {
        self.ranking
            .iter()
            .take(n)
            .map(|e| e.variable.clone())
            .collect()
    }

    /// Signed divergence for every variable.
    pub fn signed_map(&self) -> BTreeMap<String, f64> {
        self.records
            .iter()
            .map(|(name, rec)| (name.clone(), rec.signed))
            .collect()
    }
}

/// Ranks variables by how differently the two populations are distributed.
#[derive(Debug, Clone, Copy)]
pub struct DivergenceEngine {
    bandwidth: BandwidthRule,
    parallel: bool,
}

impl Default for DivergenceEngine {
    fn default() -> Self {
        DivergenceEngine {
            bandwidth: BandwidthRule::Scott,
            parallel: true,
        }
    }
}

impl DivergenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bandwidth(mut self, bandwidth: BandwidthRule) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn bandwidth(&self) -> BandwidthRule {
        self.bandwidth
    }

    /// Compute divergences for every variable and rank them.
    ///
    /// Both maps must carry exactly the same variables. Variables are
    /// independent; the parallel path yields the same report as the
    /// sequential one, and on failure the error reported is the one for the
    /// first failing variable in name order.
    pub fn rank(
        &self,
        population_a: &SampleMap,
        population_b: &SampleMap,
    ) -> Result<DivergenceReport> {
        check_schema("population maps", population_a, population_b)?;

        let names: Vec<&String> = population_a.keys().collect();
        let measure = |name: &&String| {
            measure_variable(name, &population_a[*name], &population_b[*name], self.bandwidth)
        };

        let results: Vec<Result<VariableRecord>> = if self.parallel {
            names.par_iter().map(measure).collect()
        } else {
            names.iter().map(measure).collect()
        };

        let mut records = BTreeMap::new();
        for result in results {
            let record = result?;
            records.insert(record.name.clone(), record);
        }

        let mut ranking: Vec<RankEntry> = records
            .values()
            .map(|r| RankEntry {
                variable: r.name.clone(),
                divergence: r.magnitude,
            })
            .collect();
        ranking.sort_by(|x, y| {
            y.divergence
                .total_cmp(&x.divergence)
                .then_with(|| y.variable.cmp(&x.variable))
        });

        debug!(
            variables = ranking.len(),
            top = ranking.first().map(|e| e.variable.as_str()).unwrap_or(""),
            "variables ranked"
        );

        Ok(DivergenceReport { ranking, records })
    }
}

/// Require two keyed maps to carry identical key sets.
///
/// `missing` lists keys only in the second map (absent from the first),
/// `unexpected` keys only in the first.
pub fn check_schema<V, W>(
    context: &str,
    first: &BTreeMap<String, V>,
    second: &BTreeMap<String, W>,
) -> Result<()> {
    let a: BTreeSet<&String> = first.keys().collect();
    let b: BTreeSet<&String> = second.keys().collect();
    if a == b {
        return Ok(());
    }
    Err(Error::SchemaMismatch {
        context: context.to_string(),
        missing: b.difference(&a).map(|s| s.to_string()).collect(),
        unexpected: a.difference(&b).map(|s| s.to_string()).collect(),
    })
}

/// Build a density model over the finite samples of one population.
pub(crate) fn fit_model(
    variable: &str,
    population: Population,
    samples: &[f64],
    rule: BandwidthRule,
) -> Result<GaussianKde> {
    GaussianKde::from_raw(samples, rule).map_err(|source| Error::InvalidSample {
        variable: variable.to_string(),
        population,
        source,
    })
}

fn measure_variable(
    name: &str,
    raw_a: &[f64],
    raw_b: &[f64],
    rule: BandwidthRule,
) -> Result<VariableRecord> {
    let samples_a = sorted_finite(raw_a);
    let samples_b = sorted_finite(raw_b);
    let kde_a = fit_model(name, Population::A, &samples_a, rule)?;
    let kde_b = fit_model(name, Population::B, &samples_b, rule)?;

    let magnitude = divergence(&kde_a, &kde_b, &merge_sorted(&samples_a, &samples_b));
    let larger = if mean(&samples_b) >= mean(&samples_a) {
        Population::B
    } else {
        Population::A
    };
    let signed = match larger {
        Population::B => magnitude,
        Population::A => -magnitude,
    };

    Ok(VariableRecord {
        name: name.to_string(),
        samples_a,
        samples_b,
        magnitude,
        signed,
        larger,
    })
}

/// Trapezoidal integral of `|f_A - f_B|` over an ascending grid.
pub fn divergence(kde_a: &GaussianKde, kde_b: &GaussianKde, grid: &[f64]) -> f64 {
    let diff: Vec<f64> = grid
        .iter()
        .map(|&x| (kde_a.density(x) - kde_b.density(x)).abs())
        .collect();
    trapezoid(&diff, grid)
}
