//! Dimorph common types and errors.
//!
//! This crate provides foundational types shared across dm-core modules:
//! - Population tags and group labels
//! - Common error types
//! - Output format selection

pub mod error;
pub mod output;
pub mod population;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use output::OutputFormat;
pub use population::{GroupLabels, Population};
