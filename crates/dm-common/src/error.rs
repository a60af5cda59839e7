//! Error types for Dimorph.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! Data-integrity problems (schema mismatch, degenerate samples, unusable
//! tails) are always reported as typed errors. Missing measurements are not
//! errors; they flow through the engine as explicit "not applicable" values.
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Degenerate Tail
//!   Reason: tail of population B for 'Left-Hippocampus' is degenerate: ...
//!   Fix: Add data or exclude the variable.
//! ```

use crate::population::Population;
use dm_math::KdeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Dimorph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Variable sets disagree between inputs.
    Schema,
    /// Sample sets unusable for density estimation.
    Sample,
    /// Tail fraction or tail cutoffs unusable.
    Tail,
    /// Variable selection errors.
    Selection,
    /// Tabular ingestion errors.
    Ingest,
    /// Configuration errors.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Schema => write!(f, "schema"),
            ErrorCategory::Sample => write!(f, "sample"),
            ErrorCategory::Tail => write!(f, "tail"),
            ErrorCategory::Selection => write!(f, "selection"),
            ErrorCategory::Ingest => write!(f, "ingest"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Dimorph.
#[derive(Error, Debug)]
pub enum Error {
    // Schema errors (10-19)
    #[error("schema mismatch in {context}: missing {missing:?}, unexpected {unexpected:?}")]
    SchemaMismatch {
        context: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("no classification rules derived for active variable '{variable}'")]
    RulesUnavailable { variable: String },

    // Sample errors (20-29)
    #[error("invalid sample for '{variable}' in population {population}: {source}")]
    InvalidSample {
        variable: String,
        population: Population,
        #[source]
        source: KdeError,
    },

    // Tail errors (30-39)
    #[error("tail fraction must be in (0, 0.5), got {value}")]
    InvalidTailFraction { value: f64 },

    #[error(
        "tail of population {population} for '{variable}' is degenerate: \
         {count} of {size} samples at fraction {fraction}"
    )]
    DegenerateTail {
        variable: String,
        population: Population,
        size: usize,
        count: usize,
        fraction: f64,
    },

    #[error("tails overlap for '{variable}': A cutoff {cutoff_a}, B cutoff {cutoff_b}")]
    OverlappingTails {
        variable: String,
        cutoff_a: f64,
        cutoff_b: f64,
    },

    // Selection errors (40-49)
    #[error("variable count must be at least 1, got {value}")]
    InvalidCount { value: usize },

    #[error("unknown variable '{variable}'")]
    UnknownVariable { variable: String },

    // Ingest errors (50-59)
    #[error("ingest failed: {0}")]
    Ingest(String),

    #[error("column '{column}' not found in table header")]
    MissingColumn { column: String },

    // Config errors (60-69)
    #[error("configuration error: {0}")]
    Config(String),

    // I/O errors (70-79)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Schema errors
    /// - 20-29: Sample errors
    /// - 30-39: Tail errors
    /// - 40-49: Selection errors
    /// - 50-59: Ingest errors
    /// - 60-69: Configuration errors
    /// - 70-79: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::SchemaMismatch { .. } => 10,
            Error::RulesUnavailable { .. } => 11,
            Error::InvalidSample { .. } => 20,
            Error::InvalidTailFraction { .. } => 30,
            Error::DegenerateTail { .. } => 31,
            Error::OverlappingTails { .. } => 32,
            Error::InvalidCount { .. } => 40,
            Error::UnknownVariable { .. } => 41,
            Error::Ingest(_) => 50,
            Error::MissingColumn { .. } => 51,
            Error::Config(_) => 60,
            Error::Io(_) => 70,
            Error::Json(_) => 71,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::SchemaMismatch { .. } | Error::RulesUnavailable { .. } => ErrorCategory::Schema,
            Error::InvalidSample { .. } => ErrorCategory::Sample,
            Error::InvalidTailFraction { .. }
            | Error::DegenerateTail { .. }
            | Error::OverlappingTails { .. } => ErrorCategory::Tail,
            Error::InvalidCount { .. } | Error::UnknownVariable { .. } => {
                ErrorCategory::Selection
            }
            Error::Ingest(_) | Error::MissingColumn { .. } => ErrorCategory::Ingest,
            Error::Config(_) => ErrorCategory::Config,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether the caller can recover by changing parameters.
    ///
    /// Schema and sample problems need upstream data fixes; tail and
    /// selection problems go away with different parameters.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::SchemaMismatch { .. } => false,
            Error::RulesUnavailable { .. } => false, // internal invariant broken
            Error::InvalidSample { .. } => false,
            Error::InvalidTailFraction { .. } => true,
            Error::DegenerateTail { .. } => true,
            Error::OverlappingTails { .. } => true,
            Error::InvalidCount { .. } => true,
            Error::UnknownVariable { .. } => true,
            Error::Ingest(_) => false,
            Error::MissingColumn { .. } => true,
            Error::Config(_) => true,
            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::SchemaMismatch { .. } => {
                "Both populations and every subject must carry the same variables. Fix the input table or the variable list."
            }
            Error::RulesUnavailable { .. } => {
                "Rules were not derived for an active variable. This is a bug; please report it."
            }
            Error::InvalidSample { .. } => {
                "Each population needs at least two distinct measured values per variable. Exclude the variable or add data."
            }
            Error::InvalidTailFraction { .. } => {
                "Pass a tail fraction strictly between 0 and 0.5 (e.g. 0.25)."
            }
            Error::DegenerateTail { .. } => {
                "Each population needs at least two measured samples for this variable; add data or exclude the variable."
            }
            Error::OverlappingTails { .. } => {
                "The two populations' tails cross at this fraction. Use a smaller tail fraction."
            }
            Error::InvalidCount { .. } => "Select at least one variable (e.g. '--top 10').",
            Error::UnknownVariable { .. } => {
                "Check the variable name against 'dimorph rank --all'."
            }
            Error::Ingest(_) => "Check the data file format: a header row followed by delimited rows.",
            Error::MissingColumn { .. } => {
                "Check the subject id / group column names in the configuration against the data header."
            }
            Error::Config(_) => "Run 'dimorph check' to validate the configuration.",
            Error::Io(_) => "Check that the file exists and is readable, then retry.",
            Error::Json(_) => "Invalid JSON. Check the file syntax.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::SchemaMismatch { .. } => "Schema Mismatch",
            Error::RulesUnavailable { .. } => "Rules Unavailable",
            Error::InvalidSample { .. } => "Invalid Sample",
            Error::InvalidTailFraction { .. } => "Invalid Tail Fraction",
            Error::DegenerateTail { .. } => "Degenerate Tail",
            Error::OverlappingTails { .. } => "Overlapping Tails",
            Error::InvalidCount { .. } => "Invalid Variable Count",
            Error::UnknownVariable { .. } => "Unknown Variable",
            Error::Ingest(_) => "Ingest Error",
            Error::MissingColumn { .. } => "Missing Column",
            Error::Config(_) => "Configuration Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., variable, population).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::SchemaMismatch {
                context: ctx,
                missing,
                unexpected,
            } => {
                context.insert("context".to_string(), serde_json::json!(ctx));
                context.insert("missing".to_string(), serde_json::json!(missing));
                context.insert("unexpected".to_string(), serde_json::json!(unexpected));
            }
            Error::InvalidSample {
                variable,
                population,
                ..
            } => {
                context.insert("variable".to_string(), serde_json::json!(variable));
                context.insert("population".to_string(), serde_json::json!(population));
            }
            Error::DegenerateTail {
                variable,
                population,
                size,
                count,
                fraction,
            } => {
                context.insert("variable".to_string(), serde_json::json!(variable));
                context.insert("population".to_string(), serde_json::json!(population));
                context.insert("size".to_string(), serde_json::json!(size));
                context.insert("count".to_string(), serde_json::json!(count));
                context.insert("fraction".to_string(), serde_json::json!(fraction));
            }
            Error::OverlappingTails { variable, .. }
            | Error::RulesUnavailable { variable }
            | Error::UnknownVariable { variable } => {
                context.insert("variable".to_string(), serde_json::json!(variable));
            }
            Error::MissingColumn { column } => {
                context.insert("column".to_string(), serde_json::json!(column));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
