//! End-to-end analysis pipeline.
//!
//! Ingest → rank → select → classify / score → report. Each command runs
//! the prefix of the pipeline it needs.

use crate::dimorphism::{
    DivergenceEngine, DivergenceReport, LikelihoodScorer, PopulationModels, ScoreMap, Subject,
    SubjectClassifier, TailFraction, VariableSelector, ZoneMap,
};
use crate::ingest::{Dataset, IngestSettings, Table};
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::report::{AnalysisReport, ColumnNames, SelectionSummary, SubjectReport};
use dm_common::{Error, Result};
use dm_config::AnalysisConfig;
use std::collections::BTreeMap;

/// Which continuous score to attach to subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    LogLikelihoodRatio,
    Posterior,
}

impl ScoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreKind::LogLikelihoodRatio => "llr",
            ScoreKind::Posterior => "posterior",
        }
    }
}

/// Ingested data plus its divergence ranking.
#[derive(Debug)]
pub struct Analysis {
    config: AnalysisConfig,
    dataset: Dataset,
    ranking: DivergenceReport,
    ctx: LogContext,
}

impl Analysis {
    /// Read the configured data file and rank its variables.
    pub fn load(config: AnalysisConfig, ctx: LogContext) -> Result<Self> {
        let path = config.data.clone().ok_or_else(|| {
            Error::Config("no data file: pass --data or set `data` in the config".to_string())
        })?;
        let table = Table::read(&path)?;
        Self::prepare(config, &table, ctx)
    }

    /// Ingest an already parsed table and rank its variables.
    pub fn prepare(config: AnalysisConfig, table: &Table, ctx: LogContext) -> Result<Self> {
        let settings = IngestSettings {
            subject_id: config.subject_id.clone(),
            group_by: config.group_by.clone(),
            labels: config.groups.clone(),
            variables: config.variables.clone(),
        };
        let dataset = Dataset::from_table(table, &settings)?;
        if dataset.skipped > 0 {
            log_event!(
                ctx,
                WARN,
                event_names::INGEST_ROW_SKIPPED,
                Stage::Ingest,
                "rows with unknown group labels skipped",
                skipped = dataset.skipped
            );
        }
        log_event!(
            ctx,
            INFO,
            event_names::INGEST_FINISHED,
            Stage::Ingest,
            "data ingested",
            subjects = dataset.subjects.len(),
            variables = dataset.variables.len()
        );

        let engine = DivergenceEngine::new()
            .with_bandwidth(config.density.bandwidth)
            .with_parallel(config.density.parallel);
        let ranking = engine.rank(&dataset.population_a, &dataset.population_b)?;
        log_event!(
            ctx,
            INFO,
            event_names::RANK_FINISHED,
            Stage::Rank,
            "variables ranked",
            variables = ranking.len()
        );

        Ok(Analysis {
            config,
            dataset,
            ranking,
            ctx,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn ranking(&self) -> &DivergenceReport {
        &self.ranking
    }

    /// Selector over the configured top-N at the configured tail fraction.
    pub fn selector(&self) -> Result<VariableSelector> {
        let fraction = TailFraction::new(self.config.selection.tail_fraction)?;
        let selector =
            VariableSelector::new(self.ranking.clone(), self.config.selection.top_n, fraction)?;
        log_event!(
            self.ctx,
            INFO,
            event_names::RULES_DERIVED,
            Stage::Threshold,
            "rules derived",
            active = selector.active().len(),
            tail_fraction = fraction.value()
        );
        Ok(selector)
    }

    /// Classify every subject and store the zones on it.
    ///
    /// Nothing is stored unless every subject classifies.
    pub fn classify_subjects(&mut self, selector: &VariableSelector) -> Result<Vec<ZoneMap>> {
        let classifier = SubjectClassifier::new(selector);
        let zones: Vec<ZoneMap> = self
            .dataset
            .subjects
            .iter()
            .map(|s| classifier.classify(s))
            .collect::<Result<_>>()?;
        for (subject, map) in self.dataset.subjects.iter_mut().zip(&zones) {
            subject.record_zones(map.clone());
        }
        let inconsistent = self
            .dataset
            .subjects
            .iter()
            .filter(|s| !s.is_consistent())
            .count();
        log_event!(
            self.ctx,
            INFO,
            event_names::CLASSIFY_FINISHED,
            Stage::Classify,
            "subjects classified",
            subjects = zones.len(),
            inconsistent = inconsistent
        );
        Ok(zones)
    }

    /// Score every subject on every analysed variable.
    pub fn score_subjects(&self, kind: ScoreKind) -> Result<BTreeMap<String, ScoreMap>> {
        let scorer = LikelihoodScorer::new()
            .with_epsilon(self.config.scoring.epsilon)
            .with_prior_b(self.config.scoring.prior_b)
            .with_bandwidth(self.config.density.bandwidth);
        let models =
            PopulationModels::fit(&self.dataset.population_a, &self.dataset.population_b, scorer)?;
        let posterior = kind == ScoreKind::Posterior;
        let scores = self
            .dataset
            .subjects
            .iter()
            .map(|s| Ok((s.id.clone(), models.score_subject(s, posterior)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        log_event!(
            self.ctx,
            INFO,
            event_names::SCORE_FINISHED,
            Stage::Score,
            "subjects scored",
            subjects = scores.len(),
            kind = kind.as_str()
        );
        Ok(scores)
    }

    /// Empty report carrying the run metadata.
    pub fn report(&self) -> AnalysisReport {
        AnalysisReport::new(
            self.ctx.run_id.clone(),
            ColumnNames {
                subject_id: self.config.subject_id.clone(),
                group_by: self.config.group_by.clone(),
            },
            self.config.groups.clone(),
        )
    }

    pub fn rank_report(&self, limit: Option<usize>) -> AnalysisReport {
        self.report().with_ranking(&self.ranking, limit)
    }

    pub fn rules_report(&self, selector: &VariableSelector) -> AnalysisReport {
        self.report()
            .with_ranking(&self.ranking, Some(selector.count()))
            .with_selection(SelectionSummary::from_selector(selector))
    }

    /// Zones and consistency for every subject.
    pub fn classify_report(&mut self, selector: &VariableSelector) -> Result<AnalysisReport> {
        self.classify_subjects(selector)?;
        let subjects = self.dataset.subjects.iter().map(classified).collect();
        Ok(self.rules_report(selector).with_subjects(subjects))
    }

    pub fn score_report(&self, kind: ScoreKind) -> Result<AnalysisReport> {
        let mut scores = self.score_subjects(kind)?;
        let subjects = self
            .dataset
            .subjects
            .iter()
            .map(|s| {
                let mut report = SubjectReport::new(&s.id, &s.group);
                report.scores = scores.remove(&s.id).unwrap_or_default();
                report
            })
            .collect();
        Ok(self
            .report()
            .with_score_kind(kind.as_str())
            .with_subjects(subjects))
    }

    /// Ranking, rules, zones and scores in one report.
    pub fn full_report(
        &mut self,
        selector: &VariableSelector,
        kind: ScoreKind,
    ) -> Result<AnalysisReport> {
        self.classify_subjects(selector)?;
        let mut scores = self.score_subjects(kind)?;
        let subjects = self
            .dataset
            .subjects
            .iter()
            .map(|s| {
                let mut report = classified(s);
                report.scores = scores.remove(&s.id).unwrap_or_default();
                report
            })
            .collect();
        Ok(self
            .report()
            .with_ranking(&self.ranking, None)
            .with_selection(SelectionSummary::from_selector(selector))
            .with_score_kind(kind.as_str())
            .with_subjects(subjects))
    }
}

fn classified(subject: &Subject) -> SubjectReport {
    let mut report = SubjectReport::new(&subject.id, &subject.group);
    report.zones = subject.zones().clone();
    report.consistent = Some(subject.is_consistent());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimorphism::{Score, Zone};
    use dm_common::GroupLabels;

    fn table() -> Table {
        let mut text = String::from("SubjectId,Sex,Cortex,Noise\n");
        for i in 0..6 {
            text.push_str(&format!("f{},F,{},{}\n", i, 1.0 + i as f64, 5.0 + (i % 3) as f64));
            text.push_str(&format!("m{},M,{},{}\n", i, 10.0 + i as f64, 5.0 + ((i + 1) % 3) as f64));
        }
        text.push_str("z0,F,,6.0\n");
        text.push_str("x0,X,3.0,3.0\n");
        Table::parse(&text).unwrap()
    }

    fn config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default()
            .with_top_n(1)
            .with_tail_fraction(0.2);
        config.group_by = "Sex".into();
        config.groups = GroupLabels::new("F", "M");
        config.density.parallel = false;
        config
    }

    fn analysis() -> Analysis {
        Analysis::prepare(config(), &table(), LogContext::new("run-test")).unwrap()
    }

    #[test]
    fn ranks_separated_variable_first() {
        let analysis = analysis();
        assert_eq!(analysis.dataset().skipped, 1);
        assert_eq!(analysis.ranking().top(1), vec!["Cortex"]);
        let report = analysis.rank_report(None);
        assert_eq!(report.ranking.len(), 2);
        assert_eq!(report.ranking[0].larger, "M");
    }

    #[test]
    fn classify_marks_missing_as_na() {
        let mut analysis = analysis();
        let selector = analysis.selector().unwrap();
        let report = analysis.classify_report(&selector).unwrap();
        let z0 = report.subjects.iter().find(|s| s.id == "z0").unwrap();
        assert_eq!(z0.zones["Cortex"], Zone::NotApplicable);
        assert_eq!(z0.consistent, Some(true));
        let f0 = report.subjects.iter().find(|s| s.id == "f0").unwrap();
        assert_eq!(f0.zones["Cortex"], Zone::A);
        let m5 = report.subjects.iter().find(|s| s.id == "m5").unwrap();
        assert_eq!(m5.zones["Cortex"], Zone::B);
        assert_eq!(report.subjects[0].group, "F");
    }

    #[test]
    fn scores_cover_every_variable() {
        let analysis = analysis();
        let report = analysis.score_report(ScoreKind::LogLikelihoodRatio).unwrap();
        assert_eq!(report.score_kind.as_deref(), Some("llr"));
        let z0 = report.subjects.iter().find(|s| s.id == "z0").unwrap();
        assert_eq!(z0.scores["Cortex"], Score::NotApplicable);
        assert!(z0.scores["Noise"].is_applicable());
        let m0 = report.subjects.iter().find(|s| s.id == "m0").unwrap();
        assert!(m0.scores["Cortex"].value().unwrap() > 0.0);
    }

    #[test]
    fn missing_data_path_is_config_error() {
        let err = Analysis::load(AnalysisConfig::default(), LogContext::new("run-test")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
