//! Extreme-tail thresholds.
//!
//! The "extreme end" of a population is its `f` fraction of most extreme
//! samples on the side where that population's mean lies. Each variable
//! gets exactly two rules, one per population, splitting the real line into
//! an A-zone, an open intermediate interval and a B-zone.

use super::divergence::VariableRecord;
use dm_common::{Error, Population, Result};
use serde::Serialize;

/// Products within this distance of an integer snap to it before rounding
/// up, so that `10 * 0.3` gives 3 and not 4.
const CEIL_TOLERANCE: f64 = 1e-9;

/// Fraction of each population assigned to its extreme end, in (0, 0.5).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct TailFraction(f64);

impl TailFraction {
    pub fn new(value: f64) -> Result<Self> {
        if value > 0.0 && value < 0.5 {
            Ok(TailFraction(value))
        } else {
            Err(Error::InvalidTailFraction { value })
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Share of each population left in the intermediate zone: `1 - 2f`.
    pub fn intermediate(self) -> f64 {
        1.0 - 2.0 * self.0
    }
}

impl Default for TailFraction {
    fn default() -> Self {
        TailFraction(1.0 / 3.0)
    }
}

impl std::fmt::Display for TailFraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the cutoff a rule admits. Both sides are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    AtLeast,
    AtMost,
}

impl Direction {
    pub fn admits(self, cutoff: f64, value: f64) -> bool {
        match self {
            Direction::AtLeast => value >= cutoff,
            Direction::AtMost => value <= cutoff,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Direction::AtLeast => ">=",
            Direction::AtMost => "<=",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::AtLeast => write!(f, "at_least"),
            Direction::AtMost => write!(f, "at_most"),
        }
    }
}

/// A value admitted by the rule falls into `population`'s extreme zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rule {
    pub population: Population,
    pub direction: Direction,
    pub cutoff: f64,
}

impl Rule {
    pub fn matches(&self, value: f64) -> bool {
        self.direction.admits(self.cutoff, value)
    }
}

/// Rules for one variable, always ordered `[A-rule, B-rule]`.
pub type RulePair = [Rule; 2];

/// Number of samples in the extreme end: `ceil(n * f)`.
///
/// At least one for any non-empty population, however small `f` is.
pub fn tail_count(size: usize, fraction: TailFraction) -> usize {
    if size == 0 {
        return 0;
    }
    let exact = size as f64 * fraction.value();
    let nearest = exact.round();
    let count = if (exact - nearest).abs() <= CEIL_TOLERANCE {
        nearest
    } else {
        exact.ceil()
    };
    (count as usize).max(1)
}

fn checked_tail_count(
    record: &VariableRecord,
    population: Population,
    fraction: TailFraction,
) -> Result<usize> {
    let size = record.samples(population).len();
    let count = tail_count(size, fraction);
    if count < 1 || count >= size {
        return Err(Error::DegenerateTail {
            variable: record.name.clone(),
            population,
            size,
            count,
            fraction: fraction.value(),
        });
    }
    Ok(count)
}

/// Derive the two extreme-zone rules for a variable.
///
/// The population with the larger mean owns the upper tail. Fails with
/// `DegenerateTail` when a tail would be empty or the whole population,
/// and with `OverlappingTails` when the two zones would intersect.
pub fn derive_rules(record: &VariableRecord, fraction: TailFraction) -> Result<RulePair> {
    let larger = record.larger();
    let mut rules = Vec::with_capacity(2);
    for population in Population::BOTH {
        let direction = if population == larger {
            Direction::AtLeast
        } else {
            Direction::AtMost
        };
        rules.push(tail_rule(record, population, direction, fraction)?);
    }
    let (rule_a, rule_b) = (rules[0], rules[1]);

    let rule_of = |population: Population| match population {
        Population::A => rule_a,
        Population::B => rule_b,
    };
    let (lower, upper) = (rule_of(larger.other()), rule_of(larger));
    if lower.cutoff >= upper.cutoff {
        return Err(Error::OverlappingTails {
            variable: record.name.clone(),
            cutoff_a: rule_a.cutoff,
            cutoff_b: rule_b.cutoff,
        });
    }

    Ok([rule_a, rule_b])
}

/// Rule admitting the `fraction` most extreme samples of `population` on
/// the side given by `direction`.
fn tail_rule(
    record: &VariableRecord,
    population: Population,
    direction: Direction,
    fraction: TailFraction,
) -> Result<Rule> {
    let count = checked_tail_count(record, population, fraction)?;
    let samples = record.samples(population);
    let cutoff = match direction {
        Direction::AtMost => samples[count - 1],
        Direction::AtLeast => samples[samples.len() - count],
    };
    Ok(Rule {
        population,
        direction,
        cutoff,
    })
}
