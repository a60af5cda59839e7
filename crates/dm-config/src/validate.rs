//! Configuration validation errors and semantic validation.

use crate::analysis::AnalysisConfig;
use std::collections::HashSet;
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::SemanticError(_) => 63,
            ValidationError::MissingField(_) => 64,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

fn invalid(field: &str, message: String) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message,
    }
}

/// Validate an analysis configuration semantically.
///
/// The data path is not checked here; a missing file surfaces when the
/// table is read.
pub fn validate_analysis(config: &AnalysisConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    if config.subject_id.trim().is_empty() {
        return Err(ValidationError::MissingField("subject_id".to_string()));
    }
    if config.group_by.trim().is_empty() {
        return Err(ValidationError::MissingField("group_by".to_string()));
    }
    if config.subject_id == config.group_by {
        return Err(ValidationError::SemanticError(format!(
            "subject_id and group_by name the same column '{}'",
            config.subject_id
        )));
    }

    validate_groups(config)?;
    validate_variables(config)?;

    let tail = config.selection.tail_fraction;
    if !(tail > 0.0 && tail < 0.5) {
        return Err(invalid(
            "selection.tail_fraction",
            format!("Must be in (0, 0.5), got {}", tail),
        ));
    }
    if config.selection.top_n == 0 {
        return Err(invalid("selection.top_n", "Must be at least 1".to_string()));
    }

    let eps = config.scoring.epsilon;
    if !eps.is_finite() || eps <= 0.0 {
        return Err(invalid(
            "scoring.epsilon",
            format!("Must be a positive finite number, got {}", eps),
        ));
    }
    let prior = config.scoring.prior_b;
    if !(prior > 0.0 && prior < 1.0) {
        return Err(invalid(
            "scoring.prior_b",
            format!("Must be in (0, 1), got {}", prior),
        ));
    }

    Ok(())
}

fn validate_groups(config: &AnalysisConfig) -> ValidationResult<()> {
    let labels = &config.groups;
    if labels.a.trim().is_empty() {
        return Err(ValidationError::MissingField("groups.a".to_string()));
    }
    if labels.b.trim().is_empty() {
        return Err(ValidationError::MissingField("groups.b".to_string()));
    }
    if labels.a.trim() == labels.b.trim() {
        return Err(ValidationError::SemanticError(format!(
            "groups.a and groups.b must differ, both are '{}'",
            labels.a
        )));
    }
    Ok(())
}

fn validate_variables(config: &AnalysisConfig) -> ValidationResult<()> {
    let mut seen = HashSet::new();
    for name in &config.variables {
        if name.trim().is_empty() {
            return Err(invalid("variables", "Variable names must be non-empty".to_string()));
        }
        if name == &config.subject_id || name == &config.group_by {
            return Err(invalid(
                "variables",
                format!("'{}' is the subject id or group column", name),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(invalid("variables", format!("Duplicate variable '{}'", name)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_common::GroupLabels;

    fn valid() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.groups = GroupLabels::new("F", "M");
        config
    }

    #[test]
    fn default_with_labels_is_valid() {
        assert_eq!(validate_analysis(&valid()), Ok(()));
    }

    #[test]
    fn rejects_tail_fraction_out_of_range() {
        for bad in [0.0, 0.5, 0.75, -0.1, f64::NAN] {
            let config = valid().with_tail_fraction(bad);
            let err = validate_analysis(&config).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "selection.tail_fraction"),
                "fraction {} gave {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn rejects_zero_top_n() {
        let err = validate_analysis(&valid().with_top_n(0)).unwrap_err();
        assert_eq!(err.code(), 65);
    }

    #[test]
    fn rejects_identical_group_labels() {
        let mut config = valid();
        config.groups = GroupLabels::new("M", "M");
        assert!(matches!(
            validate_analysis(&config),
            Err(ValidationError::SemanticError(_))
        ));
    }

    #[test]
    fn rejects_duplicate_and_reserved_variables() {
        let mut config = valid();
        config.variables = vec!["v1".into(), "v1".into()];
        assert!(validate_analysis(&config).is_err());

        config.variables = vec!["Group".into()];
        assert!(validate_analysis(&config).is_err());
    }

    #[test]
    fn rejects_bad_scoring_parameters() {
        let mut config = valid();
        config.scoring.epsilon = 0.0;
        assert!(validate_analysis(&config).is_err());

        let mut config = valid();
        config.scoring.prior_b = 1.0;
        assert!(validate_analysis(&config).is_err());
    }

    #[test]
    fn rejects_version_mismatch() {
        let mut config = valid();
        config.schema_version = "0.9.0".into();
        assert_eq!(
            validate_analysis(&config),
            Err(ValidationError::VersionMismatch {
                expected: "1.0.0".into(),
                actual: "0.9.0".into()
            })
        );
    }
}
