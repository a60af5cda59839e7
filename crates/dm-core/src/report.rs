//! Analysis reports and their renderings.
//!
//! One [`AnalysisReport`] backs every command. Sections that a command did
//! not compute are left empty and skipped by the renderers.

use crate::dimorphism::{DivergenceReport, RulePair, ScoreMap, VariableSelector, ZoneMap};
use chrono::{DateTime, Utc};
use dm_common::{GroupLabels, OutputFormat, Population, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// Column names of the source table, echoed into tabular output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnNames {
    pub subject_id: String,
    pub group_by: String,
}

/// One ranked variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub rank: usize,
    pub variable: String,
    pub divergence: f64,
    pub signed_divergence: f64,
    /// Group label of the population with the larger mean.
    pub larger: String,
}

/// Active variables and their rules at the current tail fraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionSummary {
    pub count: usize,
    pub tail_fraction: f64,
    pub intermediate_fraction: f64,
    pub active: Vec<String>,
    pub rules: BTreeMap<String, RulePair>,
}

impl SelectionSummary {
    /// Snapshot the active variables and their rules.
    pub fn from_selector(selector: &VariableSelector) -> Self {
        let active = selector.active().to_vec();
        let rules = active
            .iter()
            .filter_map(|v| selector.rules_for(v).map(|pair| (v.clone(), *pair)))
            .collect();
        SelectionSummary {
            count: selector.count(),
            tail_fraction: selector.tail_fraction().value(),
            intermediate_fraction: selector.intermediate_fraction(),
            active,
            rules,
        }
    }
}

/// Per-subject outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectReport {
    pub id: String,
    pub group: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub zones: ZoneMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent: Option<bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub scores: ScoreMap,
}

impl SubjectReport {
    pub fn new(id: impl Into<String>, group: impl Into<String>) -> Self {
        SubjectReport {
            id: id.into(),
            group: group.into(),
            zones: ZoneMap::new(),
            consistent: None,
            scores: ScoreMap::new(),
        }
    }
}

/// Full result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub columns: ColumnNames,
    pub labels: GroupLabels,
    /// `"llr"` or `"posterior"` when subjects carry scores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_kind: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ranking: Vec<RankingRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<SubjectReport>,
}

impl AnalysisReport {
    pub fn new(run_id: impl Into<String>, columns: ColumnNames, labels: GroupLabels) -> Self {
        AnalysisReport {
            run_id: run_id.into(),
            generated_at: Utc::now(),
            columns,
            labels,
            score_kind: None,
            ranking: Vec::new(),
            selection: None,
            subjects: Vec::new(),
        }
    }

    /// Attach the first `limit` ranking lines (all when `None`).
    pub fn with_ranking(mut self, report: &DivergenceReport, limit: Option<usize>) -> Self {
        let limit = limit.unwrap_or(report.len());
        self.ranking = report
            .ranking
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, entry)| {
                let record = report.record(&entry.variable);
                let larger = record.map(|r| r.larger()).unwrap_or(Population::B);
                RankingRow {
                    rank: i + 1,
                    variable: entry.variable.clone(),
                    divergence: entry.divergence,
                    signed_divergence: record.map(|r| r.signed).unwrap_or(entry.divergence),
                    larger: self.labels.label(larger).to_string(),
                }
            })
            .collect();
        self
    }

    pub fn with_selection(mut self, selection: SelectionSummary) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Attach subjects, sorted by group label then id.
    pub fn with_subjects(mut self, mut subjects: Vec<SubjectReport>) -> Self {
        subjects.sort_by(|x, y| x.group.cmp(&y.group).then_with(|| compare_ids(&x.id, &y.id)));
        self.subjects = subjects;
        self
    }

    pub fn with_score_kind(mut self, kind: impl Into<String>) -> Self {
        self.score_kind = Some(kind.into());
        self
    }

    /// Subjects classified as inconsistent.
    pub fn inconsistent_count(&self) -> usize {
        self.subjects
            .iter()
            .filter(|s| s.consistent == Some(false))
            .count()
    }

    fn classified(&self) -> bool {
        self.subjects.iter().any(|s| s.consistent.is_some())
    }

    fn scored(&self) -> bool {
        self.subjects.iter().any(|s| !s.scores.is_empty())
    }

    /// Render in the requested format.
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Csv => Ok(self.render_csv()),
            OutputFormat::Md => Ok(self.render_markdown()),
            OutputFormat::Summary => Ok(self.render_summary()),
        }
    }

    /// Tabular view of the most detailed section present.
    ///
    /// Subjects win over rules, rules over the ranking. Subject rows list
    /// the id and group columns under their source names, then consistency
    /// and zones when classified, then scores (`NA` when missing).
    pub fn render_csv(&self) -> String {
        if !self.subjects.is_empty() {
            return self.subjects_csv();
        }
        if let Some(selection) = &self.selection {
            return rules_csv(selection, &self.labels);
        }
        let mut out = String::from("rank,variable,divergence,signed_divergence,larger\n");
        for row in &self.ranking {
            let _ = writeln!(
                out,
                "{},{},{},{},{}",
                row.rank,
                escape_field(&row.variable),
                row.divergence,
                row.signed_divergence,
                escape_field(&row.larger)
            );
        }
        out
    }

    fn subjects_csv(&self) -> String {
        let classified = self.classified();
        let scored = self.scored();
        let zone_vars: BTreeSet<&String> =
            self.subjects.iter().flat_map(|s| s.zones.keys()).collect();
        let score_vars: BTreeSet<&String> =
            self.subjects.iter().flat_map(|s| s.scores.keys()).collect();
        let both = classified && scored;

        let mut header = vec![
            escape_field(&self.columns.subject_id),
            escape_field(&self.columns.group_by),
        ];
        if classified {
            header.push("consistent".to_string());
            for var in &zone_vars {
                let name = if both {
                    format!("{}_zone", var)
                } else {
                    var.to_string()
                };
                header.push(escape_field(&name));
            }
        }
        if scored {
            header.extend(score_vars.iter().map(|v| escape_field(v)));
        }

        let mut out = header.join(",");
        out.push('\n');
        for subject in &self.subjects {
            let mut row = vec![escape_field(&subject.id), escape_field(&subject.group)];
            if classified {
                row.push(
                    subject
                        .consistent
                        .map(|c| c.to_string())
                        .unwrap_or_default(),
                );
                for var in &zone_vars {
                    row.push(
                        subject
                            .zones
                            .get(*var)
                            .map(|z| z.as_str().to_string())
                            .unwrap_or_default(),
                    );
                }
            }
            if scored {
                for var in &score_vars {
                    row.push(
                        subject
                            .scores
                            .get(*var)
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "NA".to_string()),
                    );
                }
            }
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Dimorphism report\n");
        let _ = writeln!(
            out,
            "Run `{}` at {}. Population A = `{}`, population B = `{}`.\n",
            self.run_id,
            self.generated_at.to_rfc3339(),
            self.labels.a,
            self.labels.b
        );

        if !self.ranking.is_empty() {
            let _ = writeln!(out, "## Ranking\n");
            let _ = writeln!(out, "| Rank | Variable | Divergence | Larger |");
            let _ = writeln!(out, "|------|----------|------------|--------|");
            for row in &self.ranking {
                let _ = writeln!(
                    out,
                    "| {} | {} | {:.4} | {} |",
                    row.rank, row.variable, row.divergence, row.larger
                );
            }
            out.push('\n');
        }

        if let Some(selection) = &self.selection {
            let _ = writeln!(
                out,
                "## Rules (tail fraction {:.4}, intermediate {:.4})\n",
                selection.tail_fraction, selection.intermediate_fraction
            );
            let _ = writeln!(out, "| Variable | {} zone | {} zone |", self.labels.a, self.labels.b);
            let _ = writeln!(out, "|----------|--------|--------|");
            for var in &selection.active {
                if let Some([rule_a, rule_b]) = selection.rules.get(var) {
                    let _ = writeln!(
                        out,
                        "| {} | {} {} | {} {} |",
                        var,
                        rule_a.direction.symbol(),
                        rule_a.cutoff,
                        rule_b.direction.symbol(),
                        rule_b.cutoff
                    );
                }
            }
            out.push('\n');
        }

        if !self.subjects.is_empty() {
            let _ = writeln!(out, "## Subjects\n");
            let _ = writeln!(out, "| Subject | Group | Consistent | Zones | Scores |");
            let _ = writeln!(out, "|---------|-------|------------|-------|--------|");
            for s in &self.subjects {
                let consistent = match s.consistent {
                    Some(true) => "yes",
                    Some(false) => "**no**",
                    None => "",
                };
                let zones = s
                    .zones
                    .iter()
                    .map(|(v, z)| format!("{}={}", v, z))
                    .collect::<Vec<_>>()
                    .join(" ");
                let scores = s
                    .scores
                    .iter()
                    .map(|(v, sc)| match sc.value() {
                        Some(x) => format!("{}={:.3}", v, x),
                        None => format!("{}=NA", v),
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {} | {} |",
                    s.id, s.group, consistent, zones, scores
                );
            }
        }
        out
    }

    pub fn render_summary(&self) -> String {
        let mut parts = vec![format!("{}:", self.run_id)];
        if !self.ranking.is_empty() {
            let top = &self.ranking[0];
            parts.push(format!(
                "{} variables ranked (top {} {:.4})",
                self.ranking.len(),
                top.variable,
                top.divergence
            ));
        }
        if let Some(selection) = &self.selection {
            parts.push(format!(
                "{} active at tail {:.4}",
                selection.active.len(),
                selection.tail_fraction
            ));
        }
        if !self.subjects.is_empty() {
            let mut subjects = format!("{} subjects", self.subjects.len());
            if self.classified() {
                let _ = write!(subjects, ", {} inconsistent", self.inconsistent_count());
            }
            parts.push(subjects);
        }
        parts.join(" ")
    }
}

fn rules_csv(selection: &SelectionSummary, labels: &GroupLabels) -> String {
    let mut out = String::from("variable,group,population,direction,cutoff\n");
    for var in &selection.active {
        let Some(pair) = selection.rules.get(var) else {
            continue;
        };
        for rule in pair {
            let _ = writeln!(
                out,
                "{},{},{},{},{}",
                escape_field(var),
                escape_field(labels.label(rule.population)),
                rule.population,
                rule.direction,
                rule.cutoff
            );
        }
    }
    out
}

/// Numeric ids sort numerically and before non-numeric ids.
fn compare_ids(x: &str, y: &str) -> Ordering {
    match (x.parse::<f64>().ok(), y.parse::<f64>().ok()) {
        (Some(a), Some(b)) => a.total_cmp(&b).then_with(|| x.cmp(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => x.cmp(y),
    }
}

/// Escape a CSV field (quote if it contains comma, quote or newline).
pub fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimorphism::{Score, Zone};

    fn columns() -> ColumnNames {
        ColumnNames {
            subject_id: "SubjectId".into(),
            group_by: "Gender".into(),
        }
    }

    fn scored(id: &str, group: &str, v: Option<f64>) -> SubjectReport {
        let mut s = SubjectReport::new(id, group);
        s.scores.insert(
            "Cortex".into(),
            v.map(Score::Value).unwrap_or(Score::NotApplicable),
        );
        s
    }

    #[test]
    fn escape_field_quotes_when_needed() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"x\""), "\"say \"\"x\"\"\"");
    }

    #[test]
    fn ids_compare_numerically() {
        assert_eq!(compare_ids("2", "10"), Ordering::Less);
        assert_eq!(compare_ids("10", "abc"), Ordering::Less);
        assert_eq!(compare_ids("b", "a"), Ordering::Greater);
    }

    #[test]
    fn subjects_sorted_by_group_then_id() {
        let report = AnalysisReport::new("run-x", columns(), GroupLabels::new("F", "M"))
            .with_subjects(vec![
                scored("10", "M", Some(1.0)),
                scored("2", "M", Some(1.0)),
                scored("7", "F", Some(1.0)),
            ]);
        let order: Vec<(&str, &str)> = report
            .subjects
            .iter()
            .map(|s| (s.group.as_str(), s.id.as_str()))
            .collect();
        assert_eq!(order, vec![("F", "7"), ("M", "2"), ("M", "10")]);
    }

    #[test]
    fn score_csv_uses_source_columns_and_na() {
        let report = AnalysisReport::new("run-x", columns(), GroupLabels::new("F", "M"))
            .with_subjects(vec![scored("1", "F", Some(-0.5)), scored("2", "M", None)]);
        let csv = report.render_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "SubjectId,Gender,Cortex");
        assert_eq!(lines[1], "1,F,-0.5");
        assert_eq!(lines[2], "2,M,NA");
    }

    #[test]
    fn classify_csv_and_inconsistent_count() {
        let mut s1 = SubjectReport::new("1", "F");
        s1.zones.insert("v".into(), Zone::A);
        s1.consistent = Some(true);
        let mut s2 = SubjectReport::new("2", "F");
        s2.zones.insert("v".into(), Zone::Intermediate);
        s2.consistent = Some(false);
        let report = AnalysisReport::new("run-x", columns(), GroupLabels::new("F", "M"))
            .with_subjects(vec![s1, s2]);
        assert_eq!(report.inconsistent_count(), 1);
        let csv = report.render_csv();
        assert!(csv.starts_with("SubjectId,Gender,consistent,v\n"));
        assert!(csv.contains("2,F,false,I"));
        assert!(report.render_summary().contains("1 inconsistent"));
    }

    #[test]
    fn json_omits_absent_sections() {
        let report = AnalysisReport::new("run-x", columns(), GroupLabels::new("F", "M"));
        let json: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["run_id"], "run-x");
        assert!(json.get("subjects").is_none());
        assert!(json.get("selection").is_none());
        assert_eq!(json["labels"]["a"], "F");
    }
}
