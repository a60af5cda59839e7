//! Two-population dimorphism engine.
//!
//! Data flows leaf-first through the submodules:
//! - [`divergence`]: per-variable density divergence and ranking
//! - [`selector`]: top-N active variables and the accumulated rule set
//! - [`threshold`]: extreme-tail cutoffs encoded as rule pairs
//! - [`classify`]: per-subject zone assignment and consistency
//! - [`likelihood`]: continuous log-likelihood-ratio scoring
//!
//! Every operation is all-or-nothing: on error no partially updated state
//! is observable.

pub mod classify;
pub mod divergence;
pub mod likelihood;
pub mod selector;
pub mod threshold;

pub use classify::{is_consistent, Subject, SubjectClassifier, Zone, ZoneMap};
pub use divergence::{DivergenceEngine, DivergenceReport, RankEntry, VariableRecord};
pub use likelihood::{LikelihoodScorer, PopulationModels, Score, ScoreMap};
pub use selector::VariableSelector;
pub use threshold::{derive_rules, tail_count, Direction, Rule, RulePair, TailFraction};

use std::collections::BTreeMap;

/// Variable name → raw samples for one population.
///
/// Non-finite entries stand for missing measurements and are filtered
/// before any density is estimated.
pub type SampleMap = BTreeMap<String, Vec<f64>>;
