//! Per-subject zone classification.

use super::selector::VariableSelector;
use super::threshold::RulePair;
use dm_common::{Error, Population, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Zone a subject's measurement falls into for one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Extreme end of population A.
    A,
    /// Extreme end of population B.
    B,
    /// Between the two extreme ends.
    Intermediate,
    /// The measurement is missing.
    NotApplicable,
}

impl Zone {
    pub fn of(population: Population) -> Self {
        match population {
            Population::A => Zone::A,
            Population::B => Zone::B,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Zone::A => "A",
            Zone::B => "B",
            Zone::Intermediate => "I",
            Zone::NotApplicable => "NA",
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Zone {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Variable → zone for the active variables of one subject.
pub type ZoneMap = BTreeMap<String, Zone>;

/// True when all measured entries sit in the same extreme end.
///
/// NA entries are ignored, so an all-NA or empty map is consistent. Any
/// intermediate entry or any A/B mix makes the map inconsistent.
pub fn is_consistent(zones: &ZoneMap) -> bool {
    let (mut a, mut b, mut i) = (0usize, 0usize, 0usize);
    for zone in zones.values() {
        match zone {
            Zone::A => a += 1,
            Zone::B => b += 1,
            Zone::Intermediate => i += 1,
            Zone::NotApplicable => {}
        }
    }
    (b == 0 && i == 0) || (a == 0 && i == 0)
}

/// One subject with its raw measurements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    pub id: String,
    /// Group label as it appears in the data.
    pub group: String,
    /// Variable → value, `None` when missing.
    pub values: BTreeMap<String, Option<f64>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    zones: ZoneMap,
}

impl Subject {
    pub fn new(
        id: impl Into<String>,
        group: impl Into<String>,
        values: BTreeMap<String, Option<f64>>,
    ) -> Self {
        Subject {
            id: id.into(),
            group: group.into(),
            values,
            zones: ZoneMap::new(),
        }
    }

    /// Measurement for a variable.
    ///
    /// `None` when the subject does not carry the variable at all,
    /// `Some(None)` when it carries it but the value is missing or
    /// non-finite.
    pub fn measurement(&self, variable: &str) -> Option<Option<f64>> {
        self.values
            .get(variable)
            .map(|v| v.filter(|x| x.is_finite()))
    }

    /// Replace the stored zones with a fresh classification.
    pub fn record_zones(&mut self, zones: ZoneMap) {
        self.zones = zones;
    }

    pub fn zones(&self) -> &ZoneMap {
        &self.zones
    }

    pub fn is_consistent(&self) -> bool {
        is_consistent(&self.zones)
    }
}

/// Classifies subjects against the selector's active variables and rules.
#[derive(Debug, Clone, Copy)]
pub struct SubjectClassifier<'a> {
    active: &'a [String],
    rules: &'a BTreeMap<String, RulePair>,
}

impl<'a> SubjectClassifier<'a> {
    pub fn new(selector: &'a VariableSelector) -> Self {
        SubjectClassifier {
            active: selector.active(),
            rules: selector.rules(),
        }
    }

    pub fn from_parts(active: &'a [String], rules: &'a BTreeMap<String, RulePair>) -> Self {
        SubjectClassifier { active, rules }
    }

    /// Zone for every active variable of `subject`.
    ///
    /// The first rule admitting the value decides the zone; a value no rule
    /// admits is intermediate and a missing value is `NotApplicable`.
    pub fn classify(&self, subject: &Subject) -> Result<ZoneMap> {
        let missing: Vec<String> = self
            .active
            .iter()
            .filter(|name| !subject.values.contains_key(*name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::SchemaMismatch {
                context: format!("subject {}", subject.id),
                missing,
                unexpected: Vec::new(),
            });
        }

        let mut zones = ZoneMap::new();
        for name in self.active {
            let rules = self.rules.get(name).ok_or_else(|| Error::RulesUnavailable {
                variable: name.clone(),
            })?;
            let zone = match subject.measurement(name).flatten() {
                None => Zone::NotApplicable,
                Some(value) => rules
                    .iter()
                    .find(|rule| rule.matches(value))
                    .map(|rule| Zone::of(rule.population))
                    .unwrap_or(Zone::Intermediate),
            };
            zones.insert(name.clone(), zone);
        }
        Ok(zones)
    }
}
