//! Analysis configuration types.
//!
//! Every field has a default so that a minimal file only names the data
//! file and the two group labels:
//!
//! ```toml
//! data = "data/brain_data.csv"
//! subject_id = "SubjectId"
//! group_by = "Gender"
//!
//! [groups]
//! a = "F"
//! b = "M"
//! ```

use dm_common::GroupLabels;
use dm_math::BandwidthRule;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Delimited data file (header row, one subject per row).
    #[serde(default)]
    pub data: Option<PathBuf>,

    /// Column holding the subject id.
    #[serde(default = "default_subject_id")]
    pub subject_id: String,

    /// Column holding the binary group label.
    #[serde(default = "default_group_by")]
    pub group_by: String,

    #[serde(default)]
    pub groups: GroupLabels,

    /// Variables to analyse. Empty means every other column.
    #[serde(default)]
    pub variables: Vec<String>,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub density: DensityConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// Top-N selection and tail thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Fraction of each population counted as its extreme end.
    #[serde(default = "default_tail_fraction")]
    pub tail_fraction: f64,
}

/// Density estimation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DensityConfig {
    #[serde(default)]
    pub bandwidth: BandwidthRule,

    /// Rank variables on all cores.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

/// Likelihood scoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Added to both densities before taking the ratio.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Prior probability of population B for posterior scoring.
    #[serde(default = "default_prior_b")]
    pub prior_b: f64,
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

fn default_subject_id() -> String {
    "SubjectId".to_string()
}

fn default_group_by() -> String {
    "Group".to_string()
}

fn default_top_n() -> usize {
    10
}

fn default_tail_fraction() -> f64 {
    1.0 / 3.0
}

fn default_parallel() -> bool {
    true
}

fn default_epsilon() -> f64 {
    1e-10
}

fn default_prior_b() -> f64 {
    0.5
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            schema_version: default_schema_version(),
            data: None,
            subject_id: default_subject_id(),
            group_by: default_group_by(),
            groups: GroupLabels::default(),
            variables: Vec::new(),
            selection: SelectionConfig::default(),
            density: DensityConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig {
            top_n: default_top_n(),
            tail_fraction: default_tail_fraction(),
        }
    }
}

impl Default for DensityConfig {
    fn default() -> Self {
        DensityConfig {
            bandwidth: BandwidthRule::default(),
            parallel: default_parallel(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            epsilon: default_epsilon(),
            prior_b: default_prior_b(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_data(mut self, data: impl Into<PathBuf>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.selection.top_n = top_n;
        self
    }

    pub fn with_tail_fraction(mut self, tail_fraction: f64) -> Self {
        self.selection.tail_fraction = tail_fraction;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_analysis() {
        let config = AnalysisConfig::default();
        assert_eq!(config.selection.top_n, 10);
        assert!((config.selection.tail_fraction - 1.0 / 3.0).abs() < 1e-15);
        assert_eq!(config.density.bandwidth, BandwidthRule::Scott);
        assert_eq!(config.scoring.epsilon, 1e-10);
        assert_eq!(config.scoring.prior_b, 0.5);
        assert!(config.variables.is_empty());
    }

    #[test]
    fn minimal_toml_fills_defaults() {
        let text = r#"
            data = "brain.csv"
            group_by = "Gender"

            [groups]
            a = "F"
            b = "M"
        "#;
        let config: AnalysisConfig = toml::from_str(text).unwrap();
        assert_eq!(config.data, Some(PathBuf::from("brain.csv")));
        assert_eq!(config.group_by, "Gender");
        assert_eq!(config.subject_id, "SubjectId");
        assert_eq!(config.groups, GroupLabels::new("F", "M"));
        assert_eq!(config.selection, SelectionConfig::default());
    }

    #[test]
    fn nested_sections_parse() {
        let text = r#"
            variables = ["v1", "v2"]

            [selection]
            top_n = 3
            tail_fraction = 0.25

            [density]
            bandwidth = "silverman"
            parallel = false
        "#;
        let config: AnalysisConfig = toml::from_str(text).unwrap();
        assert_eq!(config.variables, vec!["v1", "v2"]);
        assert_eq!(config.selection.top_n, 3);
        assert_eq!(config.selection.tail_fraction, 0.25);
        assert_eq!(config.density.bandwidth, BandwidthRule::Silverman);
        assert!(!config.density.parallel);
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = toml::from_str::<AnalysisConfig>("end_percentage = 0.3").unwrap_err();
        assert!(err.to_string().contains("end_percentage"));
    }

    #[test]
    fn builder_overrides() {
        let config = AnalysisConfig::default()
            .with_data("x.csv")
            .with_top_n(4)
            .with_tail_fraction(0.2);
        assert_eq!(config.data, Some(PathBuf::from("x.csv")));
        assert_eq!(config.selection.top_n, 4);
        assert_eq!(config.selection.tail_fraction, 0.2);
    }
}
