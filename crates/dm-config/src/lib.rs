//! Dimorph configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the analysis configuration (TOML or JSON)
//! - Config path resolution (CLI → env → working dir → XDG → defaults)
//! - Semantic validation

pub mod analysis;
pub mod load;
pub mod resolve;
pub mod validate;

pub use analysis::{AnalysisConfig, DensityConfig, ScoringConfig, SelectionConfig};
pub use load::{load_config, ConfigError};
pub use resolve::{resolve_config_path, ConfigSource};
pub use validate::{validate_analysis, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
