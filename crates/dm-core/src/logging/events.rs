//! Structured event vocabulary.
//!
//! Every event carries the run id and the pipeline stage so that JSONL
//! output can be grouped per invocation.

use serde::{Deserialize, Serialize};

/// Stages of the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Reading the data table.
    Ingest,
    /// Divergence ranking.
    Rank,
    /// Tail threshold derivation.
    Threshold,
    /// Zone classification.
    Classify,
    /// Likelihood scoring.
    Score,
    /// Report rendering.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Ingest => "ingest",
            Stage::Rank => "rank",
            Stage::Threshold => "threshold",
            Stage::Classify => "classify",
            Stage::Score => "score",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";

    // Ingest
    pub const INGEST_FINISHED: &str = "ingest.finished";
    pub const INGEST_ROW_SKIPPED: &str = "ingest.row_skipped";

    // Engine
    pub const RANK_FINISHED: &str = "rank.finished";
    pub const RULES_DERIVED: &str = "threshold.rules_derived";
    pub const CLASSIFY_FINISHED: &str = "classify.finished";
    pub const SCORE_FINISHED: &str = "score.finished";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation fields shared by every event of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    pub run_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
        }
    }
}
