//! Dimorph Core Library
//!
//! This library provides the two-population dimorphism engine:
//! - Density divergence ranking of variables
//! - Extreme-tail thresholds and subject zone classification
//! - Log-likelihood-ratio and posterior scoring
//! - Table ingestion, reports, logging and exit codes
//!
//! The binary entry point is in `main.rs`.

pub mod analysis;
pub mod dimorphism;
pub mod exit_codes;
pub mod ingest;
pub mod logging;
pub mod report;

pub use analysis::{Analysis, ScoreKind};
pub use ingest::{Dataset, Table};
pub use report::AnalysisReport;
