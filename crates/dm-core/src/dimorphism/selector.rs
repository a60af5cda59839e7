//! Top-N variable selection and the accumulated rule set.

use super::divergence::DivergenceReport;
use super::threshold::{derive_rules, RulePair, TailFraction};
use dm_common::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Holds the active prefix of the ranking and the rules derived for it.
///
/// The active list is always the first `count` entries of the ranking and
/// every active variable has a rule pair. Rules of variables that dropped
/// out of the active list (after a smaller count) are kept until the next
/// tail-fraction change.
#[derive(Debug, Clone)]
pub struct VariableSelector {
    report: DivergenceReport,
    count: usize,
    active: Vec<String>,
    tail_fraction: TailFraction,
    rules: BTreeMap<String, RulePair>,
}

impl VariableSelector {
    /// Select the top `count` variables and derive their rules.
    pub fn new(
        report: DivergenceReport,
        count: usize,
        tail_fraction: TailFraction,
    ) -> Result<Self> {
        if count == 0 {
            return Err(Error::InvalidCount { value: count });
        }
        let count = count.min(report.len());
        let active = report.top(count);
        let rules = derive_for(&report, &active, tail_fraction)?;
        debug!(
            count,
            tail_fraction = tail_fraction.value(),
            "variable selector initialised"
        );
        Ok(VariableSelector {
            report,
            count,
            active,
            tail_fraction,
            rules,
        })
    }

    /// Change the number of active variables.
    ///
    /// Values above the ranking length are clamped. Only variables that
    /// become active get new rules; existing rules are left as they are.
    pub fn set_count(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(Error::InvalidCount { value: n });
        }
        let count = n.min(self.report.len());
        let active = self.report.top(count);

        let previous: HashSet<&String> = self.active.iter().collect();
        let added: Vec<String> = active
            .iter()
            .filter(|name| !previous.contains(name))
            .cloned()
            .collect();
        let fresh = derive_for(&self.report, &added, self.tail_fraction)?;

        debug!(
            from = self.count,
            to = count,
            derived = fresh.len(),
            "active variable count changed"
        );
        self.rules.extend(fresh);
        self.count = count;
        self.active = active;
        Ok(())
    }

    /// Change the tail fraction and rederive rules for every active variable.
    ///
    /// Rules of inactive variables are dropped.
    pub fn set_tail_fraction(&mut self, fraction: f64) -> Result<()> {
        let fraction = TailFraction::new(fraction)?;
        let rules = derive_for(&self.report, &self.active, fraction)?;
        debug!(
            from = self.tail_fraction.value(),
            to = fraction.value(),
            "tail fraction changed"
        );
        self.tail_fraction = fraction;
        self.rules = rules;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn active(&self) -> &[String] {
        &self.active
    }

    pub fn tail_fraction(&self) -> TailFraction {
        self.tail_fraction
    }

    pub fn intermediate_fraction(&self) -> f64 {
        self.tail_fraction.intermediate()
    }

    pub fn rules(&self) -> &BTreeMap<String, RulePair> {
        &self.rules
    }

    pub fn rules_for(&self, variable: &str) -> Option<&RulePair> {
        self.rules.get(variable)
    }

    pub fn report(&self) -> &DivergenceReport {
        &self.report
    }
}

fn derive_for(
    report: &DivergenceReport,
    variables: &[String],
    fraction: TailFraction,
) -> Result<BTreeMap<String, RulePair>> {
    let mut rules = BTreeMap::new();
    for name in variables {
        let record = report.record(name).ok_or_else(|| Error::UnknownVariable {
            variable: name.clone(),
        })?;
        rules.insert(name.clone(), derive_rules(record, fraction)?);
    }
    Ok(rules)
}
